use sgc_ast::error::{CompileError, CompileResult};
use sgc_ast::expr::{BinaryOp, Expr, ExprKind, Lit, UnaryOp};
use sgc_ast::program::Program;
use sgc_ast::ty::{Kind, Ty};
use tracing::instrument;

use crate::universe::{ConstKind, Universe, UniverseEntry};
use crate::var_storage::Scope;

/// Everything the type query needs to answer "what is the type of this
/// expression": the variables visible in the current function, the
/// program's struct/function tables, and the predeclared universe.
pub struct TypeQueryCtx<'a> {
    pub scope: &'a Scope,
    pub program: &'a Program,
    pub universe: &'a Universe,
}

/// Pure function from an AST expression to its AST type.
///
/// Every shape in [`sgc_ast::expr::ExprKind`] is handled; anything the type
/// system genuinely can't express (composite literals, floating point) is
/// rejected at the AST-construction boundary, not here, so this function
/// never has a silent "unknown" case to fall through to.
#[instrument(skip(ctx))]
pub fn type_of(expr: &Expr, ctx: &TypeQueryCtx) -> CompileResult<Ty> {
    match &expr.kind {
        ExprKind::Ident(name) => type_of_ident(name, expr, ctx),
        ExprKind::BasicLit(lit) => Ok(match lit {
            Lit::Int(_) | Lit::Char(_) => Ty::Int,
            Lit::Str(_) => Ty::String,
        }),
        ExprKind::Unary { op, expr: inner } => match op {
            UnaryOp::Neg => type_of(inner, ctx),
            UnaryOp::Addr => Ok(Ty::Pointer(Box::new(type_of(inner, ctx)?))),
            UnaryOp::Deref => {
                let inner_ty = type_of(inner, ctx)?;
                inner_ty.pointee().cloned().ok_or_else(|| {
                    CompileError::internal(format!(
                        "dereference of non-pointer type {inner_ty:?}"
                    ))
                })
            }
        },
        ExprKind::Binary { op, left, .. } => {
            if op.is_comparison() {
                Ok(Ty::Bool)
            } else {
                type_of(left, ctx)
            }
        }
        ExprKind::Index { subject, .. } => {
            let subject_ty = type_of(subject, ctx)?;
            subject_ty.elem_ty().cloned().ok_or_else(|| {
                CompileError::internal(format!("index of non-list type {subject_ty:?}"))
            })
        }
        ExprKind::SliceExpr { subject, .. } => {
            let subject_ty = type_of(subject, ctx)?;
            // `s[lo:hi]` on a string yields a string, not a slice of it --
            // matching the expression emitter's own string-subject branch
            // (§4.5's slice-expression rule covers array/slice subjects;
            // string is sliceable too, the way `len`/`cap` apply to it).
            if subject_ty.kind() == Kind::String {
                return Ok(Ty::String);
            }
            let elem = subject_ty.elem_ty().cloned().ok_or_else(|| {
                CompileError::internal(format!("slice of non-list type {subject_ty:?}"))
            })?;
            Ok(Ty::Slice(Box::new(elem)))
        }
        ExprKind::Selector { subject, field } => type_of_selector(subject, field, ctx),
        ExprKind::Paren(inner) => type_of(inner, ctx),
        ExprKind::Conversion { target, .. } => Ok(target.clone()),
        ExprKind::Call { callee, .. } => type_of_call(callee, ctx),
    }
}

fn type_of_ident(name: &str, expr: &Expr, ctx: &TypeQueryCtx) -> CompileResult<Ty> {
    if let Some(ty) = ctx.scope.ty_of(name) {
        return Ok(ty.clone());
    }

    match ctx.universe.lookup(name) {
        Some(UniverseEntry::Const(ConstKind::True | ConstKind::False)) => Ok(Ty::Bool),
        // `nil`'s type is only meaningful once forced by an assignment or
        // conversion target; the type query reports the pointer-shaped
        // default the expression emitter treats as nil's zero value.
        Some(UniverseEntry::Const(ConstKind::Nil)) => Ok(Ty::Pointer(Box::new(Ty::Uintptr))),
        _ => Err(CompileError::UnresolvedIdentifier {
            name: name.to_string(),
            node: expr.id,
        }),
    }
}

fn type_of_selector(subject: &Expr, field: &str, ctx: &TypeQueryCtx) -> CompileResult<Ty> {
    let subject_ty = type_of(subject, ctx)?;
    let struct_name = match &subject_ty {
        Ty::Struct(name) => name,
        Ty::Pointer(inner) => match inner.as_ref() {
            Ty::Struct(name) => name,
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

    let decl = ctx.program.find_struct(struct_name).ok_or_else(|| {
        CompileError::internal(format!("no such struct `{struct_name}`"))
    })?;
    decl.field(field)
        .map(|f| f.ty.clone())
        .ok_or_else(|| CompileError::internal(format!("struct `{struct_name}` has no field `{field}`")))
}

fn type_of_call(callee: &Expr, ctx: &TypeQueryCtx) -> CompileResult<Ty> {
    if let ExprKind::Ident(name) = &callee.kind {
        if ctx.scope.ty_of(name).is_none() {
            match ctx.universe.lookup(name) {
                Some(UniverseEntry::Builtin(crate::universe::Builtin::Len))
                | Some(UniverseEntry::Builtin(crate::universe::Builtin::Cap)) => {
                    return Ok(Ty::Int);
                }
                Some(UniverseEntry::Type(ty)) => return Ok(ty.clone()),
                _ => {}
            }
            if let Some(decl) = ctx.program.find_struct(name) {
                return Ok(Ty::Struct(decl.name.clone()));
            }
            if let Some(func) = ctx.program.find_func(name) {
                return func.ret.clone().ok_or_else(|| {
                    CompileError::internal(format!("call to void function `{name}` used as a value"))
                });
            }
        }
    }

    Err(CompileError::internal(
        "call to unresolvable callee in type query".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgc_ast::decl::{Field, StructDecl};
    use sgc_ast::expr::ExprKind;
    use sgc_ast::node_id::NodeIdGen;
    use crate::var_storage::VarStorage;

    #[test]
    fn ident_type_comes_from_scope() {
        let mut gen = NodeIdGen::new();
        let universe = Universe::new();
        let program = Program::new("main");
        let mut scope = Scope::new();
        scope.declare("x", Ty::Int, VarStorage::Local { offset: -8 });
        let ctx = TypeQueryCtx {
            scope: &scope,
            program: &program,
            universe: &universe,
        };

        let expr = Expr::ident(gen.fresh(), "x");
        assert_eq!(type_of(&expr, &ctx).unwrap(), Ty::Int);
    }

    #[test]
    fn comparison_always_yields_bool() {
        let mut gen = NodeIdGen::new();
        let universe = Universe::new();
        let program = Program::new("main");
        let mut scope = Scope::new();
        scope.declare("x", Ty::Int, VarStorage::Local { offset: -8 });
        scope.declare("y", Ty::Int, VarStorage::Local { offset: -16 });
        let ctx = TypeQueryCtx {
            scope: &scope,
            program: &program,
            universe: &universe,
        };

        let expr = Expr {
            id: gen.fresh(),
            kind: ExprKind::Binary {
                op: BinaryOp::Lt,
                left: Box::new(Expr::ident(gen.fresh(), "x")),
                right: Box::new(Expr::ident(gen.fresh(), "y")),
            },
        };
        assert_eq!(type_of(&expr, &ctx).unwrap(), Ty::Bool);
    }

    #[test]
    fn selector_resolves_field_type_through_struct_table() {
        let mut gen = NodeIdGen::new();
        let universe = Universe::new();
        let mut program = Program::new("main");
        program.structs.push(StructDecl {
            id: gen.fresh(),
            name: "P".to_string(),
            fields: vec![
                Field {
                    id: gen.fresh(),
                    name: "x".to_string(),
                    ty: Ty::Int,
                },
                Field {
                    id: gen.fresh(),
                    name: "y".to_string(),
                    ty: Ty::Uint8,
                },
            ],
        });
        let mut scope = Scope::new();
        scope.declare(
            "p",
            Ty::Struct("P".to_string()),
            VarStorage::Local { offset: -16 },
        );
        let ctx = TypeQueryCtx {
            scope: &scope,
            program: &program,
            universe: &universe,
        };

        let expr = Expr {
            id: gen.fresh(),
            kind: ExprKind::Selector {
                subject: Box::new(Expr::ident(gen.fresh(), "p")),
                field: "y".to_string(),
            },
        };
        assert_eq!(type_of(&expr, &ctx).unwrap(), Ty::Uint8);
    }
}
