use std::collections::HashMap;

use sgc_ast::decl::Global;
use sgc_ast::error::CompileResult;
use sgc_ast::expr::{Expr, ExprKind, Lit};
use sgc_ast::node_id::NodeId;
use sgc_ast::program::Program;
use sgc_ast::stmt::{Block, Stmt, StmtKind};
use sgc_ast::ty::Ty;
use tracing::{debug, instrument, trace};

use crate::layout::FieldOffsets;
use crate::type_query::{self, TypeQueryCtx};
use crate::universe::Universe;
use crate::var_storage::{FrameCounter, Scope, VarStorage};

/// A string literal as interned by the pre-pass: its assembly label, its
/// byte length, and the raw quoted source text the data emitter writes
/// verbatim.
#[derive(Debug, Clone)]
pub struct StrLitDescriptor {
    pub label: String,
    pub len: u64,
    pub raw: String,
}

/// Every string literal the pre-pass walked, keyed by the literal node's
/// own identity. Index `n` in each label is assigned in encounter order,
/// starting at zero, per compilation unit.
#[derive(Debug, Default)]
pub struct StrLitRegistry {
    entries: HashMap<NodeId, StrLitDescriptor>,
    next_index: u32,
}

impl StrLitRegistry {
    fn intern(&mut self, pkg: &str, node: NodeId, raw: &str) -> &StrLitDescriptor {
        let label = format!(".{pkg}.S{}", self.next_index);
        self.next_index += 1;
        let backslashes = raw.bytes().filter(|&b| b == b'\\').count() as u64;
        let len = raw.len() as u64 - 2 - backslashes;
        self.entries.insert(
            node,
            StrLitDescriptor {
                label,
                len,
                raw: raw.to_string(),
            },
        );
        self.entries.get(&node).unwrap()
    }

    pub fn get(&self, node: NodeId) -> Option<&StrLitDescriptor> {
        self.entries.get(&node)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &StrLitDescriptor)> {
        self.entries.iter()
    }
}

/// The two hidden locals a range-loop statement needs: a length variable
/// and an index variable, each 8 bytes, keyed by the `Range` statement's
/// own `NodeId`.
#[derive(Debug, Clone, Copy)]
pub struct RangeHelper {
    pub len_offset: i64,
    pub index_offset: i64,
}

#[derive(Debug, Default)]
pub struct RangeHelpers {
    entries: HashMap<NodeId, RangeHelper>,
}

impl RangeHelpers {
    pub fn get(&self, stmt: NodeId) -> Option<RangeHelper> {
        self.entries.get(&stmt).copied()
    }
}

/// Output of walking every function body once: the scope (variable
/// descriptors) built for each function, the string literal registry, and
/// the hidden range-loop locals. `localarea`/`argsarea` are written back
/// directly onto each `FuncDecl` in the program.
pub struct PrePassOutput {
    pub scopes: HashMap<String, Scope>,
    pub str_lits: StrLitRegistry,
    pub range_helpers: RangeHelpers,
}

/// Walks every function in `program`, allocating stack slots for locals,
/// interning string literals, and synthesizing the hidden locals a
/// range-loop needs. Must run before any statement is handed to the
/// statement/expression emitters.
#[instrument(skip(program, universe, field_offsets))]
pub fn run(
    program: &mut Program,
    universe: &Universe,
    field_offsets: &FieldOffsets,
) -> CompileResult<PrePassOutput> {
    let global_scope = build_global_scope(&program.globals);
    let mut scopes = HashMap::new();
    let mut str_lits = StrLitRegistry::default();
    let mut range_helpers = RangeHelpers::default();

    let pkg = program.package.clone();
    let funcs = std::mem::take(&mut program.funcs);
    let mut out_funcs = Vec::with_capacity(funcs.len());

    for mut func in funcs {
        let mut scope = global_scope.clone();
        let mut frame = FrameCounter::new();

        for param in &func.params {
            let size = crate::layout::size_of_ty(&param.ty, field_offsets);
            let offset = frame.alloc_param(size);
            scope.declare(param.name.clone(), param.ty.clone(), VarStorage::Local { offset });
        }

        walk_block(
            &mut func.body,
            &pkg,
            program,
            universe,
            field_offsets,
            &mut scope,
            &mut frame,
            &mut str_lits,
            &mut range_helpers,
        )?;

        func.localarea = frame.localarea();
        func.argsarea = frame.argsarea();
        debug!(
            func = %func.name,
            localarea = func.localarea,
            argsarea = func.argsarea,
            "pre-pass complete for function"
        );

        scopes.insert(func.name.clone(), scope);
        out_funcs.push(func);
    }

    program.funcs = out_funcs;
    Ok(PrePassOutput {
        scopes,
        str_lits,
        range_helpers,
    })
}

fn build_global_scope(globals: &[Global]) -> Scope {
    let mut scope = Scope::new();
    for g in globals {
        scope.declare(
            g.name.clone(),
            g.ty.clone(),
            VarStorage::Global {
                label: g.name.clone(),
            },
        );
    }
    scope
}

#[allow(clippy::too_many_arguments)]
fn walk_block(
    block: &mut Block,
    pkg: &str,
    program: &Program,
    universe: &Universe,
    field_offsets: &FieldOffsets,
    scope: &mut Scope,
    frame: &mut FrameCounter,
    str_lits: &mut StrLitRegistry,
    range_helpers: &mut RangeHelpers,
) -> CompileResult<()> {
    for stmt in block.iter_mut() {
        walk_stmt(
            stmt,
            pkg,
            program,
            universe,
            field_offsets,
            scope,
            frame,
            str_lits,
            range_helpers,
        )?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn walk_stmt(
    stmt: &mut Stmt,
    pkg: &str,
    program: &Program,
    universe: &Universe,
    field_offsets: &FieldOffsets,
    scope: &mut Scope,
    frame: &mut FrameCounter,
    str_lits: &mut StrLitRegistry,
    range_helpers: &mut RangeHelpers,
) -> CompileResult<()> {
    match &mut stmt.kind {
        StmtKind::Decl { name, ty, init } => {
            if let Some(init) = init {
                walk_expr(init, pkg, str_lits);
            }
            let offset = frame.alloc_local(crate::layout::size_of_ty(ty, field_offsets));
            trace!(%name, offset, "local slot allocated");
            scope.declare(name.clone(), ty.clone(), VarStorage::Local { offset });
        }
        StmtKind::Assign { lhs, rhs } => {
            walk_expr(lhs, pkg, str_lits);
            walk_expr(rhs, pkg, str_lits);
        }
        StmtKind::Return(exprs) => {
            for e in exprs.iter_mut() {
                walk_expr(e, pkg, str_lits);
            }
        }
        StmtKind::If {
            cond,
            then_block,
            else_block,
        } => {
            walk_expr(cond, pkg, str_lits);
            walk_block(
                then_block, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
            )?;
            if let Some(else_block) = else_block {
                walk_block(
                    else_block, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
                )?;
            }
        }
        StmtKind::For {
            init,
            cond,
            post,
            body,
        } => {
            if let Some(init) = init {
                walk_stmt(
                    init, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
                )?;
            }
            if let Some(cond) = cond {
                walk_expr(cond, pkg, str_lits);
            }
            if let Some(post) = post {
                walk_stmt(
                    post, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
                )?;
            }
            walk_block(
                body, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
            )?;
        }
        StmtKind::Range {
            value_name,
            subject,
            body,
        } => {
            walk_expr(subject, pkg, str_lits);

            let query_ctx = TypeQueryCtx {
                scope,
                program,
                universe,
            };
            let subject_ty = type_query::type_of(subject, &query_ctx)?;
            let elem_ty = subject_ty.elem_ty().cloned().unwrap_or(Ty::Int);

            let len_offset = frame.alloc_local(8);
            let index_offset = frame.alloc_local(8);
            range_helpers.entries.insert(
                stmt.id,
                RangeHelper {
                    len_offset,
                    index_offset,
                },
            );

            let value_offset = frame.alloc_local(crate::layout::size_of_ty(&elem_ty, field_offsets));
            scope.declare(value_name.clone(), elem_ty, VarStorage::Local { offset: value_offset });

            walk_block(
                body, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
            )?;
        }
        StmtKind::IncDec { expr, .. } => walk_expr(expr, pkg, str_lits),
        StmtKind::ExprStmt(expr) => walk_expr(expr, pkg, str_lits),
        StmtKind::Block(block) => {
            walk_block(
                block, pkg, program, universe, field_offsets, scope, frame, str_lits, range_helpers,
            )?;
        }
    }
    Ok(())
}

fn walk_expr(expr: &mut Expr, pkg: &str, str_lits: &mut StrLitRegistry) {
    match &mut expr.kind {
        ExprKind::Ident(_) => {}
        ExprKind::BasicLit(Lit::Str(raw)) => {
            str_lits.intern(pkg, expr.id, raw);
        }
        ExprKind::BasicLit(_) => {}
        ExprKind::Unary { expr: inner, .. } => walk_expr(inner, pkg, str_lits),
        ExprKind::Binary { left, right, .. } => {
            walk_expr(left, pkg, str_lits);
            walk_expr(right, pkg, str_lits);
        }
        ExprKind::Index { subject, index } => {
            walk_expr(subject, pkg, str_lits);
            walk_expr(index, pkg, str_lits);
        }
        ExprKind::Selector { subject, .. } => walk_expr(subject, pkg, str_lits),
        ExprKind::SliceExpr { subject, lo, hi } => {
            walk_expr(subject, pkg, str_lits);
            if let Some(lo) = lo {
                walk_expr(lo, pkg, str_lits);
            }
            if let Some(hi) = hi {
                walk_expr(hi, pkg, str_lits);
            }
        }
        ExprKind::Paren(inner) => walk_expr(inner, pkg, str_lits),
        ExprKind::Conversion { expr: inner, .. } => walk_expr(inner, pkg, str_lits),
        ExprKind::Call { callee, args } => {
            walk_expr(callee, pkg, str_lits);
            for a in args.iter_mut() {
                walk_expr(a, pkg, str_lits);
            }
        }
    }
}

