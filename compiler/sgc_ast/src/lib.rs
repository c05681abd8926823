//! The AST node shapes this compiler operates over, the closed `Kind`
//! type system every AST type expression reduces to, and the `NodeId`
//! identity scheme used to key side tables (struct field offsets, interned
//! string literals, variable storage classes) computed by later passes.
//!
//! Lexing and parsing live outside this workspace; a demonstration driver
//! hand-assembles `Program` values directly instead of invoking a parser.

pub mod decl;
pub mod error;
pub mod expr;
pub mod node_id;
pub mod program;
pub mod stmt;
pub mod ty;
