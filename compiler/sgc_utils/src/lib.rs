//! Small standalone utilities shared across the `sgc` workspace.
//!
//! Kept dependency-free (beyond `tracing`, for the logging macros) so that
//! any crate in the workspace can depend on it without dragging in the rest
//! of the compiler.

pub mod idx;
pub mod index_slice;
pub mod index_vec;
pub mod variadic_log_macros;
