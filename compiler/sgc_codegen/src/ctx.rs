use sgc_ast::program::Program;
use sgc_resolve::layout::FieldOffsets;
use sgc_resolve::prepass::{RangeHelpers, StrLitRegistry};
use sgc_resolve::universe::Universe;

use crate::asm::LabelCounter;

/// Per-compilation-unit state threaded through every emitter call.
///
/// Constructed fresh for each source file compiled (the runtime unit and
/// the program unit each get their own); nothing here is a process-wide
/// global, so compiling the two units back to back never leaks state
/// between them.
pub struct CodegenCtx<'a> {
    pub pkg: String,
    pub program: &'a Program,
    pub universe: &'a Universe,
    pub field_offsets: &'a FieldOffsets,
    pub str_lits: &'a StrLitRegistry,
    pub range_helpers: &'a RangeHelpers,
    labels: LabelCounter,
}

impl<'a> CodegenCtx<'a> {
    pub fn new(
        pkg: impl Into<String>,
        program: &'a Program,
        universe: &'a Universe,
        field_offsets: &'a FieldOffsets,
        str_lits: &'a StrLitRegistry,
        range_helpers: &'a RangeHelpers,
    ) -> Self {
        CodegenCtx {
            pkg: pkg.into(),
            program,
            universe,
            field_offsets,
            str_lits,
            range_helpers,
            labels: LabelCounter::new(),
        }
    }

    pub fn fresh_label_id(&mut self) -> u32 {
        self.labels.fresh()
    }

    pub fn func_label(&self, name: &str) -> String {
        format!("{}.{name}", self.pkg)
    }
}
