//! Semantic resolution: the predeclared universe, the struct/frame layout
//! engine, the type query, and the pre-pass walker that allocates local
//! storage, interns string literals and synthesizes range-loop helpers.
//!
//! Everything here runs once per compilation unit, ahead of statement and
//! expression emission in `sgc_codegen`.

pub mod layout;
pub mod prepass;
pub mod type_query;
pub mod universe;
pub mod var_storage;
