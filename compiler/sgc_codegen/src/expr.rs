use sgc_ast::error::{CompileError, CompileResult};
use sgc_ast::expr::{BinaryOp, Expr, ExprKind, Lit, UnaryOp};
use sgc_ast::ty::{Kind, Ty};
use sgc_resolve::type_query::{self, TypeQueryCtx};
use sgc_resolve::universe::{Builtin, ConstKind, UniverseEntry};
use sgc_resolve::var_storage::Scope;
use tracing::instrument;

use crate::addr::emit_addr;
use crate::asm::AsmBuffer;
use crate::ctx::CodegenCtx;

/// Lowers `expr` onto the runtime stack following the value-on-stack
/// convention: every expression pushes its value, multi-word values push
/// highest-indexed word first so the lowest sits on top.
#[instrument(skip(ctx, scope, buf, expr))]
pub fn emit_expr(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    expr: &Expr,
) -> CompileResult<()> {
    match &expr.kind {
        ExprKind::Ident(name) => emit_ident(ctx, scope, buf, name, expr),
        ExprKind::BasicLit(lit) => emit_basic_lit(ctx, buf, expr, lit),
        ExprKind::Unary { op, expr: inner } => emit_unary(ctx, scope, buf, *op, inner),
        ExprKind::Binary { op, left, right } => emit_binary(ctx, scope, buf, *op, left, right),
        ExprKind::Index { .. } | ExprKind::Selector { .. } => {
            let ty = query(ctx, scope, expr)?;
            emit_addr(ctx, scope, buf, expr)?;
            emit_load(buf, &ty);
            Ok(())
        }
        ExprKind::SliceExpr { subject, lo, hi } => emit_slice_expr(ctx, scope, buf, subject, lo.as_deref(), hi.as_deref()),
        ExprKind::Paren(inner) => emit_expr(ctx, scope, buf, inner),
        ExprKind::Conversion { target, expr: inner } => emit_conversion(ctx, scope, buf, target, inner),
        ExprKind::Call { callee, args } => emit_call(ctx, scope, buf, callee, args),
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

/// Size in bytes of `ty`, going through the layout engine for `STRUCT`
/// (and any `ARRAY` of structs) instead of `Ty::size_of`, which has no
/// field list to work from for a bare `Ty::Struct`.
pub(crate) fn size_of_ty(ctx: &CodegenCtx, ty: &Ty) -> CompileResult<u64> {
    match ty {
        Ty::Struct(name) => ctx
            .field_offsets
            .size_of_struct(name)
            .map(|s| s.bytes())
            .ok_or_else(|| CompileError::internal(format!("no computed layout for struct `{name}`"))),
        Ty::Array { len, elem } => Ok(size_of_ty(ctx, elem)? * len),
        _ => Ok(ty.size_of().bytes()),
    }
}

/// Pops a single address off the stack and pushes the value at that
/// address, widened per its kind's natural load width.
pub(crate) fn emit_load(buf: &mut AsmBuffer, ty: &Ty) {
    buf.ins("popq %rax");
    match ty.kind() {
        Kind::Uint8 => {
            buf.ins("movzbq (%rax), %rax");
            buf.ins("pushq %rax");
        }
        Kind::Uint16 => {
            buf.ins("movzwq (%rax), %rax");
            buf.ins("pushq %rax");
        }
        Kind::Int | Kind::Uintptr | Kind::Pointer | Kind::Bool => {
            buf.ins("movq (%rax), %rax");
            buf.ins("pushq %rax");
        }
        Kind::String => {
            buf.ins("movq 8(%rax), %rcx"); // len
            buf.ins("movq (%rax), %rdx"); // ptr
            buf.ins("pushq %rcx");
            buf.ins("pushq %rdx");
        }
        Kind::Slice => {
            buf.ins("movq 16(%rax), %rcx"); // cap
            buf.ins("movq 8(%rax), %rdx"); // len
            buf.ins("movq (%rax), %rsi"); // ptr
            buf.ins("pushq %rcx");
            buf.ins("pushq %rdx");
            buf.ins("pushq %rsi");
        }
        Kind::Array | Kind::Struct => {
            unreachable!("memory kinds are addressed, never loaded as a whole value")
        }
    }
}

/// Pops a value (in the words matching `ty`) and then an address below
/// it, storing the value at that address.
pub(crate) fn emit_store(buf: &mut AsmBuffer, ty: &Ty) {
    match ty.kind() {
        Kind::Uint8 => {
            buf.ins("popq %rax");
            buf.ins("popq %rcx");
            buf.ins("movb %al, (%rcx)");
        }
        Kind::Uint16 => {
            buf.ins("popq %rax");
            buf.ins("popq %rcx");
            buf.ins("movw %ax, (%rcx)");
        }
        Kind::Int | Kind::Uintptr | Kind::Pointer | Kind::Bool => {
            buf.ins("popq %rax");
            buf.ins("popq %rcx");
            buf.ins("movq %rax, (%rcx)");
        }
        Kind::String => {
            buf.ins("popq %rdx"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("popq %rax"); // addr
            buf.ins("movq %rdx, (%rax)");
            buf.ins("movq %rcx, 8(%rax)");
        }
        Kind::Slice => {
            buf.ins("popq %rdx"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("popq %rsi"); // cap
            buf.ins("popq %rax"); // addr
            buf.ins("movq %rdx, (%rax)");
            buf.ins("movq %rcx, 8(%rax)");
            buf.ins("movq %rsi, 16(%rax)");
        }
        Kind::Array | Kind::Struct => {
            unreachable!("memory kinds are stored field by field, never as a whole value")
        }
    }
}

/// Pushes the zero value for `ty`, occupying exactly its own stack-word
/// count -- the property the data and statement emitters both rely on.
pub(crate) fn emit_zero_value(buf: &mut AsmBuffer, ty: &Ty) {
    match ty.kind() {
        Kind::String => {
            buf.ins("pushq $0"); // len
            buf.ins("pushq $0"); // ptr
        }
        Kind::Slice => {
            buf.ins("pushq $0"); // cap
            buf.ins("pushq $0"); // len
            buf.ins("pushq $0"); // ptr
        }
        Kind::Array | Kind::Struct => {
            unreachable!("memory kinds are zeroed by the statement emitter's address-based path")
        }
        _ => buf.ins("pushq $0"),
    }
}

fn emit_ident(ctx: &mut CodegenCtx, scope: &Scope, buf: &mut AsmBuffer, name: &str, expr: &Expr) -> CompileResult<()> {
    if let Some(ty) = scope.ty_of(name) {
        let ty = ty.clone();
        emit_addr(ctx, scope, buf, expr)?;
        emit_load(buf, &ty);
        return Ok(());
    }

    match ctx.universe.lookup(name) {
        Some(UniverseEntry::Const(ConstKind::True)) => {
            buf.ins("pushq $1");
            Ok(())
        }
        Some(UniverseEntry::Const(ConstKind::False)) => {
            buf.ins("pushq $0");
            Ok(())
        }
        Some(UniverseEntry::Const(ConstKind::Nil)) => {
            buf.ins("pushq $0");
            Ok(())
        }
        _ => Err(CompileError::UnresolvedIdentifier {
            name: name.to_string(),
            node: expr.id,
        }),
    }
}

fn emit_basic_lit(ctx: &mut CodegenCtx, buf: &mut AsmBuffer, expr: &Expr, lit: &Lit) -> CompileResult<()> {
    match lit {
        Lit::Int(n) => {
            buf.ins(&format!("pushq ${n}"));
        }
        Lit::Char(c) => {
            buf.ins(&format!("pushq ${}", *c as u32));
        }
        Lit::Str(_) => {
            let descriptor = ctx
                .str_lits
                .get(expr.id)
                .ok_or_else(|| CompileError::internal("string literal was not interned by the pre-pass"))?;
            if descriptor.len == 0 {
                buf.ins("pushq $0");
                buf.ins("pushq $0");
            } else {
                buf.ins(&format!("pushq ${}", descriptor.len));
                buf.ins(&format!("leaq {}(%rip), %rax", descriptor.label));
                buf.ins("pushq %rax");
            }
        }
    }
    Ok(())
}

fn emit_unary(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    op: UnaryOp,
    inner: &Expr,
) -> CompileResult<()> {
    match op {
        UnaryOp::Neg => {
            emit_expr(ctx, scope, buf, inner)?;
            buf.ins("popq %rax");
            buf.ins("imulq $-1, %rax");
            buf.ins("pushq %rax");
            Ok(())
        }
        UnaryOp::Addr => emit_addr(ctx, scope, buf, inner),
        UnaryOp::Deref => {
            emit_expr(ctx, scope, buf, inner)?;
            let ptr_ty = query(ctx, scope, inner)?;
            let pointee = ptr_ty
                .pointee()
                .cloned()
                .ok_or_else(|| CompileError::internal(format!("dereference of non-pointer type {ptr_ty:?}")))?;
            emit_load(buf, &pointee);
            Ok(())
        }
    }
}

fn emit_binary(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> CompileResult<()> {
    let left_ty = query(ctx, scope, left)?;

    if left_ty.kind() == Kind::String {
        if op != BinaryOp::Add {
            return Err(CompileError::unsupported("non-`+` binary operator on string", left.id));
        }
        emit_expr(ctx, scope, buf, right)?;
        emit_expr(ctx, scope, buf, left)?;
        buf.ins("call runtime.catstrings");
        buf.ins("addq $32, %rsp");
        buf.ins("pushq %rdi");
        buf.ins("pushq %rax");
        return Ok(());
    }

    emit_expr(ctx, scope, buf, left)?;
    emit_expr(ctx, scope, buf, right)?;
    buf.ins("popq %rcx"); // right
    buf.ins("popq %rax"); // left

    match op {
        BinaryOp::Add => buf.ins("addq %rcx, %rax"),
        BinaryOp::Sub => buf.ins("subq %rcx, %rax"),
        BinaryOp::Mul => buf.ins("imulq %rcx, %rax"),
        BinaryOp::Div => {
            buf.ins("xorq %rdx, %rdx");
            buf.ins("divq %rcx");
        }
        BinaryOp::Rem => {
            buf.ins("xorq %rdx, %rdx");
            buf.ins("divq %rcx");
            buf.ins("movq %rdx, %rax");
        }
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            buf.ins("cmpq %rcx, %rax");
            let setcc = match op {
                BinaryOp::Eq => "sete",
                BinaryOp::Ne => "setne",
                BinaryOp::Lt => "setl",
                BinaryOp::Le => "setle",
                BinaryOp::Gt => "setg",
                BinaryOp::Ge => "setge",
                _ => unreachable!(),
            };
            buf.ins(&format!("{setcc} %al"));
            buf.ins("movzbq %al, %rax");
        }
    }

    buf.ins("pushq %rax");
    Ok(())
}

fn emit_slice_expr(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    subject: &Expr,
    lo: Option<&Expr>,
    hi: Option<&Expr>,
) -> CompileResult<()> {
    let subject_ty = query(ctx, scope, subject)?;
    let elem_size = match subject_ty.elem_ty() {
        Some(elem) => size_of_ty(ctx, elem)?,
        None => 1,
    };

    match lo {
        Some(lo) => emit_expr(ctx, scope, buf, lo)?,
        None => buf.ins("pushq $0"),
    }
    match hi {
        Some(hi) => emit_expr(ctx, scope, buf, hi)?,
        None => buf.ins("pushq $0"), // a real front end fills in len(subject) here
    }
    buf.ins("popq %rcx"); // hi
    buf.ins("popq %rax"); // lo
    buf.ins("subq %rax, %rcx"); // len = hi - lo
    // Stash lo and len on the stack, below whatever the subject's own
    // emission pushes and pops -- emitting the subject (an addressing
    // sequence, or a full expression for a slice/string subject, possibly
    // a call) is free to clobber any register, so nothing here may ride
    // out that emission in one.
    buf.ins("pushq %rax"); // lo
    buf.ins("pushq %rcx"); // len

    if subject_ty.kind() == Kind::Array {
        emit_addr(ctx, scope, buf, subject)?;
    } else {
        emit_expr(ctx, scope, buf, subject)?;
        buf.ins("popq %rax"); // ptr
        buf.ins("addq $8, %rsp"); // discard len
        buf.ins("addq $8, %rsp"); // discard cap
        buf.ins("pushq %rax");
    }
    buf.ins("popq %rax"); // base address
    buf.ins("popq %rcx"); // len, reloaded after the subject's own emission
    buf.ins("popq %rdx"); // lo, reloaded after the subject's own emission
    buf.ins(&format!("imulq ${elem_size}, %rdx"));
    buf.ins("addq %rdx, %rax"); // element address at index lo

    if subject_ty.kind() == Kind::String {
        buf.ins("pushq %rcx"); // len
        buf.ins("pushq %rax"); // ptr
    } else {
        buf.ins("pushq %rcx"); // cap (approximated as len for a freshly sliced value)
        buf.ins("pushq %rcx"); // len
        buf.ins("pushq %rax"); // ptr
    }
    Ok(())
}

fn emit_conversion(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    target: &Ty,
    inner: &Expr,
) -> CompileResult<()> {
    let src_ty = query(ctx, scope, inner)?;

    match (target.kind(), src_ty.kind()) {
        (Kind::String, Kind::Slice) => {
            emit_expr(ctx, scope, buf, inner)?;
            buf.ins("popq %rax"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("addq $8, %rsp"); // discard cap
            buf.ins("pushq %rcx");
            buf.ins("pushq %rax");
        }
        (Kind::Slice, Kind::String) => {
            emit_expr(ctx, scope, buf, inner)?;
            buf.ins("popq %rax"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("pushq %rcx"); // cap = len
            buf.ins("pushq %rcx"); // len
            buf.ins("pushq %rax"); // ptr
        }
        _ => emit_expr(ctx, scope, buf, inner)?,
    }
    Ok(())
}

fn emit_call(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    callee: &Expr,
    args: &[Expr],
) -> CompileResult<()> {
    if let ExprKind::Ident(name) = &callee.kind {
        if scope.ty_of(name).is_none() {
            if let Some(UniverseEntry::Builtin(builtin)) = ctx.universe.lookup(name).cloned() {
                return emit_builtin_call(ctx, scope, buf, builtin, args, callee);
            }
            if ctx.program.find_struct(name).is_some() || matches!(ctx.universe.lookup(name), Some(UniverseEntry::Type(_))) {
                // Type-name callee: the conversion case, `T(x)`.
                let target = type_from_name(ctx, name)?;
                return emit_conversion(ctx, scope, buf, &target, &args[0]);
            }
        }
    }

    emit_general_call(ctx, scope, buf, callee, args)
}

fn type_from_name(ctx: &CodegenCtx, name: &str) -> CompileResult<Ty> {
    if let Some(UniverseEntry::Type(ty)) = ctx.universe.lookup(name) {
        return Ok(ty.clone());
    }
    if ctx.program.find_struct(name).is_some() {
        return Ok(Ty::Struct(name.to_string()));
    }
    Err(CompileError::internal(format!("`{name}` does not name a type")))
}

fn emit_builtin_call(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    builtin: Builtin,
    args: &[Expr],
    callee: &Expr,
) -> CompileResult<()> {
    match builtin {
        Builtin::Len | Builtin::Cap => emit_len_or_cap(ctx, scope, buf, builtin, &args[0]),
        Builtin::New => {
            let target = match &args[0].kind {
                ExprKind::Ident(name) => type_from_name(ctx, name)?,
                _ => return Err(CompileError::unsupported("new() on a non-type-name argument", callee.id)),
            };
            let size = size_of_ty(ctx, &target)?;
            buf.ins(&format!("pushq ${size}"));
            buf.ins("call runtime.malloc");
            buf.ins("addq $8, %rsp");
            buf.ins("pushq %rax");
            Ok(())
        }
        Builtin::Make => {
            let elem_size = match &args[0].kind {
                ExprKind::Ident(name) => {
                    let ty = type_from_name(ctx, name)?;
                    size_of_ty(ctx, &ty)?
                }
                _ => return Err(CompileError::unsupported("make() on a non-type-name argument", callee.id)),
            };
            emit_expr(ctx, scope, buf, &args[2])?; // m (cap)
            emit_expr(ctx, scope, buf, &args[1])?; // n (len)
            buf.ins(&format!("pushq ${elem_size}"));
            buf.ins("call runtime.makeSlice");
            buf.ins("addq $24, %rsp");
            buf.ins("pushq %rsi"); // cap
            buf.ins("pushq %rdi"); // len
            buf.ins("pushq %rax"); // ptr
            Ok(())
        }
        Builtin::Append => {
            let elem_ty = query(ctx, scope, &args[1])?;
            let elem_size = size_of_ty(ctx, &elem_ty)?;
            let helper = match elem_size {
                1 => "runtime.append1",
                8 => "runtime.append8",
                16 => "runtime.append16",
                24 => "runtime.append24",
                other => {
                    return Err(CompileError::internal(format!(
                        "no append helper for element size {other}"
                    )))
                }
            };
            emit_expr(ctx, scope, buf, &args[1])?; // element
            emit_expr(ctx, scope, buf, &args[0])?; // slice
            buf.ins(&format!("call {helper}"));
            buf.ins(&format!("addq ${}, %rsp", elem_size + 24));
            buf.ins("pushq %rsi"); // cap
            buf.ins("pushq %rdi"); // len
            buf.ins("pushq %rax"); // ptr
            Ok(())
        }
        Builtin::Print => {
            let arg_ty = query(ctx, scope, &args[0])?;
            emit_expr(ctx, scope, buf, &args[0])?;
            match arg_ty.kind() {
                Kind::String => {
                    buf.ins("call runtime.printstring");
                    buf.ins("addq $16, %rsp");
                }
                _ => {
                    buf.ins("call runtime.printint");
                    buf.ins("addq $8, %rsp");
                }
            }
            Ok(())
        }
    }
}

fn emit_len_or_cap(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    builtin: Builtin,
    arg: &Expr,
) -> CompileResult<()> {
    let arg_ty = query(ctx, scope, arg)?;

    if builtin == Builtin::Cap && arg_ty.kind() == Kind::String {
        return Err(CompileError::unsupported("cap() on string", arg.id));
    }

    match arg_ty {
        Ty::Array { len, .. } => {
            buf.ins(&format!("pushq ${len}"));
            Ok(())
        }
        _ if arg_ty.kind() == Kind::Slice => {
            emit_expr(ctx, scope, buf, arg)?; // cap, len, ptr
            buf.ins("popq %rax"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("popq %rdx"); // cap
            let result = if builtin == Builtin::Len { "%rcx" } else { "%rdx" };
            buf.ins(&format!("pushq {result}"));
            Ok(())
        }
        _ if arg_ty.kind() == Kind::String => {
            emit_expr(ctx, scope, buf, arg)?; // len, ptr
            buf.ins("popq %rax"); // ptr
            buf.ins("popq %rcx"); // len
            buf.ins("pushq %rcx");
            Ok(())
        }
        other => Err(CompileError::internal(format!(
            "len()/cap() on non-list, non-string type {other:?}"
        ))),
    }
}

fn emit_general_call(
    ctx: &mut CodegenCtx,
    scope: &Scope,
    buf: &mut AsmBuffer,
    callee: &Expr,
    args: &[Expr],
) -> CompileResult<()> {
    let label = callee_label(ctx, callee)?;

    let mut total_bytes = 0u64;
    for arg in args.iter().rev() {
        let arg_ty = query(ctx, scope, arg)?;
        total_bytes += size_of_ty(ctx, &arg_ty)?;
        emit_expr(ctx, scope, buf, arg)?;
    }

    buf.ins(&format!("call {label}"));
    if total_bytes > 0 {
        buf.ins(&format!("addq ${total_bytes}, %rsp"));
    }

    let ret_ty = callee_return_ty(ctx, callee)?;
    if let Some(ret_ty) = ret_ty {
        match ret_ty.kind() {
            Kind::String => {
                buf.ins("pushq %rdi");
                buf.ins("pushq %rax");
            }
            Kind::Slice => {
                buf.ins("pushq %rsi");
                buf.ins("pushq %rdi");
                buf.ins("pushq %rax");
            }
            Kind::Array | Kind::Struct => {
                return Err(CompileError::unsupported("function returning a struct/array by value", callee.id));
            }
            _ => buf.ins("pushq %rax"),
        }
    }
    Ok(())
}

fn callee_label(ctx: &CodegenCtx, callee: &Expr) -> CompileResult<String> {
    match &callee.kind {
        ExprKind::Ident(name) => Ok(ctx.func_label(name)),
        ExprKind::Selector { subject, field } => {
            if let ExprKind::Ident(pkg) = &subject.kind {
                if matches!(ctx.universe.lookup(pkg), Some(UniverseEntry::Package)) {
                    return Ok(format!("{pkg}.{field}"));
                }
            }
            Err(CompileError::internal("call callee is not a recognized package selector"))
        }
        _ => Err(CompileError::internal("unsupported call-expression callee shape")),
    }
}

fn callee_return_ty(ctx: &CodegenCtx, callee: &Expr) -> CompileResult<Option<Ty>> {
    if let ExprKind::Ident(name) = &callee.kind {
        if let Some(func) = ctx.program.find_func(name) {
            return Ok(func.ret.clone());
        }
    }
    // External/runtime calls whose result this crate doesn't model
    // (`syscall.Write` and friends) are treated as not producing a
    // value-on-stack result the general caller needs to push.
    Ok(None)
}
