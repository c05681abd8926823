use sgc_ast::error::{CompileError, CompileResult};
use sgc_ast::expr::{Expr, ExprKind, UnaryOp};
use sgc_ast::ty::{Kind, Ty};
use sgc_resolve::type_query::{self, TypeQueryCtx};
use sgc_resolve::var_storage::{Scope, VarStorage};
use tracing::instrument;

use crate::asm::AsmBuffer;
use crate::ctx::CodegenCtx;
use crate::expr::emit_expr;

/// Pushes the address of an assignable expression (identifier, index,
/// selector, dereference) as a single 8-byte pointer.
///
/// This is the dedicated routine every store and every by-reference load
/// (index, selector) goes through; it never itself loads the pointee.
#[instrument(skip(ctx, scope, buf, expr))]
pub fn emit_addr(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    expr: &Expr,
) -> CompileResult<()> {
    match &expr.kind {
        ExprKind::Ident(name) => emit_addr_ident(scope, buf, name, expr),
        ExprKind::Index { subject, index } => emit_addr_index(ctx, scope, buf, subject, index),
        ExprKind::Selector { subject, field } => emit_addr_selector(ctx, scope, buf, subject, field),
        ExprKind::Unary {
            op: UnaryOp::Deref,
            expr: inner,
        } => {
            // The address of `*p` is simply the value of `p`.
            emit_expr(ctx, scope, buf, inner)
        }
        ExprKind::Paren(inner) => emit_addr(ctx, scope, buf, inner),
        _ => Err(CompileError::internal(format!(
            "expression is not addressable: {:?}",
            expr.kind
        ))),
    }
}

fn emit_addr_ident(scope: &Scope, buf: &mut AsmBuffer, name: &str, expr: &Expr) -> CompileResult<()> {
    let storage = scope
        .storage_of(name)
        .ok_or_else(|| CompileError::UnresolvedIdentifier {
            name: name.to_string(),
            node: expr.id,
        })?;
    match storage {
        VarStorage::Global { label } => {
            buf.ins(&format!("leaq {label}(%rip), %rax"));
        }
        VarStorage::Local { offset } => {
            buf.ins(&format!("leaq {offset}(%rbp), %rax"));
        }
    }
    buf.ins("pushq %rax");
    Ok(())
}

fn emit_addr_index(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    subject: &Expr,
    index: &Expr,
) -> CompileResult<()> {
    let query_ctx = TypeQueryCtx {
        scope,
        program: ctx.program,
        universe: ctx.universe,
    };
    let subject_ty = type_query::type_of(subject, &query_ctx)?;
    let elem_ty = subject_ty
        .elem_ty()
        .cloned()
        .ok_or_else(|| CompileError::internal(format!("index of non-list type {subject_ty:?}")))?;
    let elem_size = crate::expr::size_of_ty(ctx, &elem_ty)?;

    match subject_ty.kind() {
        Kind::Array => emit_addr(ctx, scope, buf, subject)?,
        Kind::Slice => {
            emit_expr(ctx, scope, buf, subject)?;
            // Slice push order is cap, len, ptr -- ptr sits on top.
            buf.ins("popq %rax");
            buf.ins("addq $8, %rsp"); // discard len
            buf.ins("addq $8, %rsp"); // discard cap
            buf.ins("pushq %rax");
        }
        other => {
            return Err(CompileError::internal(format!(
                "index on non-indexable kind {other:?}"
            )))
        }
    }

    emit_expr(ctx, scope, buf, index)?;
    buf.ins("popq %rcx"); // index
    buf.ins("popq %rax"); // base address
    buf.ins(&format!("imulq ${elem_size}, %rcx"));
    buf.ins("addq %rcx, %rax");
    buf.ins("pushq %rax");
    Ok(())
}

fn emit_addr_selector(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    subject: &Expr,
    field: &str,
) -> CompileResult<()> {
    let query_ctx = TypeQueryCtx {
        scope,
        program: ctx.program,
        universe: ctx.universe,
    };
    let subject_ty = type_query::type_of(subject, &query_ctx)?;
    let struct_name = match &subject_ty {
        Ty::Struct(name) => {
            emit_addr(ctx, scope, buf, subject)?;
            name.clone()
        }
        Ty::Pointer(inner) => match inner.as_ref() {
            Ty::Struct(name) => {
                // `x` is already a pointer value; evaluate it directly
                // rather than taking its address.
                emit_expr(ctx, scope, buf, subject)?;
                name.clone()
            }
            other => {
                return Err(CompileError::internal(format!(
                    "selector on non-struct pointee {other:?}"
                )))
            }
        },
        other => {
            return Err(CompileError::internal(format!(
                "selector on non-struct type {other:?}"
            )))
        }
    };

    let decl = ctx
        .program
        .find_struct(&struct_name)
        .ok_or_else(|| CompileError::internal(format!("no such struct `{struct_name}`")))?;
    let field_decl = decl
        .field(field)
        .ok_or_else(|| CompileError::internal(format!("struct `{struct_name}` has no field `{field}`")))?;
    let offset = ctx
        .field_offsets
        .offset_of(field_decl.id)
        .ok_or_else(|| CompileError::internal("missing struct field offset annotation".to_string()))?;

    buf.ins("popq %rax");
    if offset != 0 {
        buf.ins(&format!("addq ${offset}, %rax"));
    }
    buf.ins("pushq %rax");
    Ok(())
}
