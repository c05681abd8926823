use crate::node_id::NodeId;
use crate::stmt::Block;
use crate::ty::Ty;

/// A single field of a struct type declaration.
///
/// `id` is the side-table key the layout engine uses to record this field's
/// byte offset once computed; the offset itself is not stored here (it is
/// not known at construction time, only after layout runs).
#[derive(Debug, Clone)]
pub struct Field {
    pub id: NodeId,
    pub name: String,
    pub ty: Ty,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub id: NodeId,
    pub name: String,
    pub fields: Vec<Field>,
}

impl StructDecl {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: Ty,
}

/// A function declaration.
///
/// `localarea` and `argsarea` start at their spec-given defaults (`0` and
/// `16` respectively) and are filled in by the pre-pass walker before any
/// statement in `body` is emitted.
#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<Ty>,
    pub body: Block,
    /// Final negative frame offset: the total local byte budget, stored as
    /// a non-positive integer. `0` until the pre-pass has run.
    pub localarea: i64,
    /// Final positive parameter offset after the last parameter. `16`
    /// (the offset the first parameter would take) until the pre-pass has
    /// assigned real offsets.
    pub argsarea: i64,
}

impl FuncDecl {
    pub fn new(id: NodeId, name: String, params: Vec<Param>, ret: Option<Ty>, body: Block) -> Self {
        FuncDecl {
            id,
            name,
            params,
            ret,
            body,
            localarea: 0,
            argsarea: 16,
        }
    }
}

/// A package-scope variable. Globals are addressed by a symbolic label
/// equal to their source name, never by a frame offset.
#[derive(Debug, Clone)]
pub struct Global {
    pub id: NodeId,
    pub name: String,
    pub ty: Ty,
    /// Present only for the handful of initializer shapes the data emitter
    /// supports (string literals); everything else is zero-initialized.
    pub init: Option<String>,
}
