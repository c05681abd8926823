use sgc_ast::error::{CompileError, CompileResult};
use sgc_ast::expr::{Expr, ExprKind};
use sgc_ast::stmt::{Block, IncDecOp, Stmt, StmtKind};
use sgc_ast::ty::{Kind, Ty};
use sgc_resolve::type_query::{self, TypeQueryCtx};
use sgc_resolve::universe::{Builtin, UniverseEntry};
use sgc_resolve::var_storage::{Scope, VarStorage};
use tracing::instrument;

use crate::addr::emit_addr;
use crate::asm::AsmBuffer;
use crate::ctx::CodegenCtx;
use crate::expr::{emit_expr, emit_load, emit_store, emit_zero_value, size_of_ty};

#[instrument(skip(ctx, scope, buf, block))]
pub fn emit_block(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, block: &Block) -> CompileResult<()> {
    for stmt in block {
        emit_stmt(ctx, scope, buf, stmt)?;
    }
    Ok(())
}

fn emit_stmt(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, stmt: &Stmt) -> CompileResult<()> {
    match &stmt.kind {
        StmtKind::Decl { name, ty, init } => emit_decl(ctx, scope, buf, name, ty, init.as_ref()),
        StmtKind::Assign { lhs, rhs } => emit_assign(ctx, scope, buf, lhs, rhs),
        StmtKind::Return(exprs) => emit_return(ctx, scope, buf, exprs, stmt),
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => emit_if(ctx, scope, buf, cond, then_block, else_block.as_ref()),
        StmtKind::For { init, cond, post, body } => {
            emit_for(ctx, scope, buf, init.as_deref(), cond.as_ref(), post.as_deref(), body)
        }
        StmtKind::Range {
            value_name,
            subject,
            body,
        } => emit_range(ctx, scope, buf, value_name, subject, body, stmt),
        StmtKind::IncDec { expr, op } => emit_inc_dec(ctx, scope, buf, expr, *op),
        StmtKind::ExprStmt(expr) => emit_expr_stmt(ctx, scope, buf, expr),
        StmtKind::Block(inner) => emit_block(ctx, scope, buf, inner),
    }
}

fn query(ctx: &CodegenCtx, scope: &Scope, expr: &Expr) -> CompileResult<Ty> {
    let query_ctx = TypeQueryCtx {
        scope,
        program: ctx.program,
        universe: ctx.universe,
    };
    type_query::type_of(expr, &query_ctx)
}

fn emit_addr_of_local(scope: &Scope, buf: &mut AsmBuffer, name: &str) -> CompileResult<()> {
    let storage = scope
        .storage_of(name)
        .ok_or_else(|| CompileError::internal(format!("`{name}` has no storage assigned by the pre-pass")))?;
    match storage {
        VarStorage::Global { label } => buf.ins(&format!("leaq {label}(%rip), %rax")),
        VarStorage::Local { offset } => buf.ins(&format!("leaq {offset}(%rbp), %rax")),
    }
    buf.ins("pushq %rax");
    Ok(())
}

fn emit_decl(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    name: &str,
    ty: &Ty,
    init: Option<&Expr>,
) -> CompileResult<()> {
    match init {
        Some(init) => {
            emit_addr_of_local(scope, buf, name)?;
            emit_expr(ctx, scope, buf, init)?;
            emit_store(buf, ty);
            Ok(())
        }
        None => match ty.kind() {
            Kind::Array | Kind::Struct => {
                let size = size_of_ty(ctx, ty)?;
                emit_addr_of_local(scope, buf, name)?;
                buf.ins("popq %rdi");
                buf.ins(&format!("movq ${size}, %rcx"));
                buf.ins("xorq %rax, %rax");
                buf.ins("rep stosb");
                Ok(())
            }
            _ => {
                emit_addr_of_local(scope, buf, name)?;
                emit_zero_value(buf, ty);
                emit_store(buf, ty);
                Ok(())
            }
        },
    }
}

fn emit_assign(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, lhs: &Expr, rhs: &Expr) -> CompileResult<()> {
    let ty = query(ctx, scope, lhs)?;

    match ty.kind() {
        Kind::Array | Kind::Struct => {
            let size = size_of_ty(ctx, &ty)?;
            emit_addr(ctx, scope, buf, rhs)?; // source
            emit_addr(ctx, scope, buf, lhs)?; // destination
            buf.ins("popq %rdi"); // destination
            buf.ins("popq %rsi"); // source
            buf.ins(&format!("movq ${size}, %rcx"));
            buf.ins("rep movsb");
            Ok(())
        }
        _ => {
            emit_addr(ctx, scope, buf, lhs)?;
            emit_expr(ctx, scope, buf, rhs)?;
            emit_store(buf, &ty);
            Ok(())
        }
    }
}

fn emit_return(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, exprs: &[Expr], stmt: &Stmt) -> CompileResult<()> {
    match exprs.len() {
        0 => {}
        1 => {
            let ty = query(ctx, scope, &exprs[0])?;
            emit_expr(ctx, scope, buf, &exprs[0])?;
            match ty.kind() {
                Kind::String => {
                    buf.ins("popq %rax"); // ptr
                    buf.ins("popq %rdi"); // len
                }
                Kind::Slice => {
                    buf.ins("popq %rax"); // ptr
                    buf.ins("popq %rdi"); // len
                    buf.ins("popq %rsi"); // cap
                }
                Kind::Array | Kind::Struct => {
                    return Err(CompileError::unsupported("returning a struct/array by value", stmt.id));
                }
                _ => buf.ins("popq %rax"),
            }
        }
        3 => {
            for e in exprs {
                emit_expr(ctx, scope, buf, e)?;
            }
            buf.ins("popq %rsi"); // cap
            buf.ins("popq %rdi"); // len
            buf.ins("popq %rax"); // ptr
        }
        _ => return Err(CompileError::unsupported("return with other than 0, 1, or 3 results", stmt.id)),
    }

    buf.ins("leave");
    buf.ins("ret");
    Ok(())
}

fn emit_if(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    cond: &Expr,
    then_block: &Block,
    else_block: Option<&Block>,
) -> CompileResult<()> {
    let id = ctx.fresh_label_id();
    let endif_label = format!(".L.endif.{id}");

    emit_expr(ctx, scope, buf, cond)?;
    buf.ins("popq %rax");
    buf.ins("testq %rax, %rax");

    if let Some(else_block) = else_block {
        let else_label = format!(".L.else.{id}");
        buf.ins(&format!("je {else_label}"));
        emit_block(ctx, scope, buf, then_block)?;
        buf.ins(&format!("jmp {endif_label}"));
        buf.label(&else_label);
        emit_block(ctx, scope, buf, else_block)?;
    } else {
        buf.ins(&format!("je {endif_label}"));
        emit_block(ctx, scope, buf, then_block)?;
    }

    buf.label(&endif_label);
    Ok(())
}

fn emit_for(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    init: Option<&Stmt>,
    cond: Option<&Expr>,
    post: Option<&Stmt>,
    body: &Block,
) -> CompileResult<()> {
    if let Some(init) = init {
        emit_stmt(ctx, scope, buf, init)?;
    }

    let id = ctx.fresh_label_id();
    let cond_label = format!(".L.loop.cond.{id}");
    let exit_label = format!(".L.loop.exit.{id}");

    buf.label(&cond_label);
    if let Some(cond) = cond {
        emit_expr(ctx, scope, buf, cond)?;
        buf.ins("popq %rax");
        buf.ins("testq %rax, %rax");
        buf.ins(&format!("je {exit_label}"));
    }

    emit_block(ctx, scope, buf, body)?;
    if let Some(post) = post {
        emit_stmt(ctx, scope, buf, post)?;
    }
    buf.ins(&format!("jmp {cond_label}"));
    buf.label(&exit_label);
    Ok(())
}

fn emit_range(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    value_name: &str,
    subject: &Expr,
    body: &Block,
    stmt: &Stmt,
) -> CompileResult<()> {
    let helper = ctx
        .range_helpers
        .get(stmt.id)
        .ok_or_else(|| CompileError::internal("range statement has no pre-pass-allocated hidden locals"))?;

    let subject_ty = query(ctx, scope, subject)?;
    if !matches!(subject_ty.kind(), Kind::Array | Kind::Slice) {
        return Err(CompileError::unsupported("range over a non-array, non-slice subject", stmt.id));
    }
    let elem_ty = subject_ty
        .elem_ty()
        .cloned()
        .ok_or_else(|| CompileError::internal(format!("range over non-list type {subject_ty:?}")))?;
    let elem_size = size_of_ty(ctx, &elem_ty)?;

    match &subject_ty {
        Ty::Array { len, .. } => buf.ins(&format!("movq ${len}, {}(%rbp)", helper.len_offset)),
        _ => {
            emit_expr(ctx, scope, buf, subject)?; // cap, len, ptr
            buf.ins("popq %rax"); // ptr (unused here; recomputed per iteration)
            buf.ins("popq %rcx"); // len
            buf.ins("addq $8, %rsp"); // discard cap
            buf.ins(&format!("movq %rcx, {}(%rbp)", helper.len_offset));
        }
    }
    buf.ins(&format!("movq $0, {}(%rbp)", helper.index_offset));

    let id = ctx.fresh_label_id();
    let cond_label = format!(".L.loop.cond.{id}");
    let exit_label = format!(".L.loop.exit.{id}");

    buf.label(&cond_label);
    buf.ins(&format!("movq {}(%rbp), %rax", helper.index_offset));
    buf.ins(&format!("cmpq {}(%rbp), %rax", helper.len_offset));
    buf.ins(&format!("jge {exit_label}"));

    if subject_ty.kind() == Kind::Array {
        emit_addr(ctx, scope, buf, subject)?;
    } else {
        emit_expr(ctx, scope, buf, subject)?; // cap, len, ptr
        buf.ins("popq %rax"); // ptr
        buf.ins("addq $8, %rsp"); // discard len
        buf.ins("addq $8, %rsp"); // discard cap
        buf.ins("pushq %rax");
    }
    buf.ins("popq %rax"); // base address
    buf.ins(&format!("movq {}(%rbp), %rcx", helper.index_offset));
    buf.ins(&format!("imulq ${elem_size}, %rcx"));
    buf.ins("addq %rcx, %rax");
    buf.ins("pushq %rax");
    emit_load(buf, &elem_ty);

    let value_storage = scope
        .storage_of(value_name)
        .ok_or_else(|| CompileError::internal(format!("range value `{value_name}` has no storage")))?;
    match value_storage {
        VarStorage::Global { label } => buf.ins(&format!("leaq {label}(%rip), %rax")),
        VarStorage::Local { offset } => buf.ins(&format!("leaq {offset}(%rbp), %rax")),
    }
    buf.ins("pushq %rax");
    emit_store(buf, &elem_ty);

    emit_block(ctx, scope, buf, body)?;

    buf.ins(&format!("incq {}(%rbp)", helper.index_offset));
    buf.ins(&format!("jmp {cond_label}"));
    buf.label(&exit_label);
    Ok(())
}

fn emit_inc_dec(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, expr: &Expr, op: IncDecOp) -> CompileResult<()> {
    let ty = query(ctx, scope, expr)?;
    emit_addr(ctx, scope, buf, expr)?;
    buf.ins("popq %rax");

    let width = match ty.kind() {
        Kind::Uint8 => "b",
        Kind::Uint16 => "w",
        _ => "q",
    };
    let mnemonic = match op {
        IncDecOp::Inc => "inc",
        IncDecOp::Dec => "dec",
    };
    buf.ins(&format!("{mnemonic}{width} (%rax)"));
    Ok(())
}

fn emit_expr_stmt(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, expr: &Expr) -> CompileResult<()> {
    if let ExprKind::Call { callee, .. } = &expr.kind {
        if let ExprKind::Ident(name) = &callee.kind {
            if scope.ty_of(name).is_none() {
                if matches!(ctx.universe.lookup(name), Some(UniverseEntry::Builtin(Builtin::Print))) {
                    return emit_expr(ctx, scope, buf, expr);
                }
                if let Some(func) = ctx.program.find_func(name) {
                    if func.ret.is_none() {
                        return emit_expr(ctx, scope, buf, expr);
                    }
                }
            }
        }
    }

    let ty = query(ctx, scope, expr)?;
    emit_expr(ctx, scope, buf, expr)?;
    let bytes = match ty.kind() {
        Kind::String => 16,
        Kind::Slice => 24,
        Kind::Array | Kind::Struct => {
            return Err(CompileError::unsupported("expression statement producing a struct/array value", expr.id))
        }
        _ => 8,
    };
    buf.ins(&format!("addq ${bytes}, %rsp"));
    Ok(())
}
