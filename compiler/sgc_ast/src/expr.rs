use crate::node_id::NodeId;
use crate::ty::Ty;

/// An expression node. Every expression carries a `NodeId`: string literal
/// nodes use it as their key into the interned-literal registry, and it
/// gives every other expression the same stable identity for free rather
/// than special-casing just the nodes that currently need one.
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Ident(String),
    BasicLit(Lit),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Index {
        subject: Box<Expr>,
        index: Box<Expr>,
    },
    Selector {
        subject: Box<Expr>,
        field: String,
    },
    /// `subject[lo:hi]`. `lo` defaults to `0`, `hi` to `len(subject)` when
    /// omitted; the pre-pass/emitter resolves the defaults, this node just
    /// records what source text actually wrote.
    SliceExpr {
        subject: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
    },
    Paren(Box<Expr>),
    Conversion {
        target: Ty,
        expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Int(i64),
    Char(char),
    /// The raw source text of the literal, quotes included, exactly as
    /// described for string-literal length accounting (raw length minus
    /// the two quotes minus each backslash escape).
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Addr,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

impl Expr {
    pub fn ident(id: NodeId, name: impl Into<String>) -> Self {
        Expr {
            id,
            kind: ExprKind::Ident(name.into()),
        }
    }
}
