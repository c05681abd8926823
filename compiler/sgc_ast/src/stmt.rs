use crate::expr::Expr;
use crate::node_id::NodeId;
use crate::ty::Ty;

pub type Block = Vec<Stmt>;

#[derive(Debug, Clone)]
pub struct Stmt {
    pub id: NodeId,
    pub kind: StmtKind,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    /// `var name ty [= init]`. A missing `init` emits the kind's zero value
    /// at the variable's address; a present one has assignment semantics.
    Decl {
        name: String,
        ty: Ty,
        init: Option<Expr>,
    },
    /// Single-LHS, single-RHS assignment only; multi-value assignment is an
    /// unsupported construct.
    Assign {
        lhs: Expr,
        rhs: Expr,
    },
    /// 0, 1, or 3 results (the 3-result case serves slice-returning
    /// helpers that hand back ptr/len/cap directly).
    Return(Vec<Expr>),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Block,
    },
    /// `for index_name, value_name := range subject { body }`. The pre-pass
    /// keys the two hidden locals (length, index) it synthesizes for this
    /// loop by this statement's own `NodeId`.
    Range {
        value_name: String,
        subject: Expr,
        body: Block,
    },
    IncDec {
        expr: Expr,
        op: IncDecOp,
    },
    ExprStmt(Expr),
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}
