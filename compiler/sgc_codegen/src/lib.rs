//! Lowers a resolved [`sgc_ast::program::Program`] to AT&T-syntax x86-64
//! assembly text.
//!
//! [`compile_unit`] is the single entry point the driver crate calls, once
//! per compilation unit (the runtime unit and the program unit are each
//! their own `Program`, compiled independently). Everything below it --
//! the pre-pass, the addressing/expression/statement emitters, the data
//! emitter -- is plumbing `compile_unit` wires together; nothing in this
//! crate keeps state across two calls.

pub mod addr;
pub mod asm;
pub mod ctx;
pub mod data;
pub mod expr;
pub mod stmt;

use sgc_ast::error::CompileResult;
use sgc_ast::program::Program;
use sgc_resolve::layout::layout_structs;
use sgc_resolve::prepass;
use sgc_resolve::universe::Universe;
use tracing::instrument;

use crate::asm::AsmBuffer;
use crate::ctx::CodegenCtx;
use crate::data::emit_data;
use crate::stmt::emit_block;

/// Runs struct layout and the pre-pass over `program`, then emits its
/// `.text` section (one label and prologue/epilogue per function) followed
/// by its `.data` section, returning the full assembly text for this unit.
#[instrument(skip(program, universe))]
pub fn compile_unit(program: &mut Program, universe: &Universe) -> CompileResult<String> {
    let field_offsets = layout_structs(program);
    let prepass_output = prepass::run(program, universe, &field_offsets)?;
    let pkg = program.package.clone();
    let mut ctx = CodegenCtx::new(
        pkg,
        program,
        universe,
        &field_offsets,
        &prepass_output.str_lits,
        &prepass_output.range_helpers,
    );

    let mut buf = AsmBuffer::new();
    buf.raw(".text");
    for func in &program.funcs {
        let scope = prepass_output.scopes.get(&func.name).cloned().unwrap_or_default();
        let label = ctx.func_label(&func.name);
        buf.raw(&format!(".globl {label}"));
        buf.label(&label);
        buf.ins("pushq %rbp");
        buf.ins("movq %rsp, %rbp");
        let local_bytes = (-func.localarea) as u64;
        if local_bytes > 0 {
            buf.ins(&format!("subq ${local_bytes}, %rsp"));
        }
        emit_block(&mut ctx, &scope, &mut buf, &func.body)?;
        // Functions whose every path already returned leave this dead; it
        // only fires for a void function that falls off the end of its body.
        buf.ins("leave");
        buf.ins("ret");
    }

    emit_data(&ctx, &mut buf)?;
    Ok(buf.into_text())
}

#[cfg(test)]
mod tests {
    use sgc_ast::decl::{FuncDecl, Param};
    use sgc_ast::node_id::NodeIdGen;
    use sgc_ast::stmt::{Stmt, StmtKind};
    use sgc_ast::ty::Ty;
    use sgc_resolve::universe::Universe;

    use super::*;

    #[test]
    fn compiles_an_empty_void_function() {
        let mut gen = NodeIdGen::new();
        let mut program = Program::new("main");
        program.funcs.push(FuncDecl::new(
            gen.fresh(),
            "empty".to_string(),
            Vec::new(),
            None,
            Vec::new(),
        ));
        let universe = Universe::new();

        let text = compile_unit(&mut program, &universe).expect("compiles");
        assert!(text.contains("main.empty:"));
        assert!(text.contains("pushq %rbp"));
        assert!(text.contains("leave"));
        assert!(text.contains("ret"));
    }

    #[test]
    fn compiles_a_function_returning_a_parameter() {
        let mut gen = NodeIdGen::new();
        let mut program = Program::new("main");
        let body = vec![Stmt {
            id: gen.fresh(),
            kind: StmtKind::Return(vec![sgc_ast::expr::Expr::ident(gen.fresh(), "x")]),
        }];
        program.funcs.push(FuncDecl::new(
            gen.fresh(),
            "identity".to_string(),
            vec![Param {
                id: gen.fresh(),
                name: "x".to_string(),
                ty: Ty::Int,
            }],
            Some(Ty::Int),
            body,
        ));
        let universe = Universe::new();

        let text = compile_unit(&mut program, &universe).expect("compiles");
        assert!(text.contains("main.identity:"));
        assert!(text.contains("popq %rax"));
    }
}
