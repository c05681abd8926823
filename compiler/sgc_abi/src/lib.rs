//! Size and layout vocabulary shared by the resolver and code generator.
//!
//! This crate knows nothing about the source language's AST; it only
//! supplies the generic [`layout::TyAndLayout`]/[`layout::Layout`] types
//! that `sgc_ast` and `sgc_resolve` fill in for each `Kind`.

pub mod layout;
pub mod size_and_align;
