use std::collections::HashMap;

use sgc_ast::ty::Ty;

/// Where a variable lives once resolved.
///
/// Globals are addressed by a symbolic label; parameters and locals by a
/// signed offset from the frame base pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarStorage {
    Global { label: String },
    /// Parameters get offsets `>= 16`; locals get offsets `<= 0`.
    Local { offset: i64 },
}

/// Maps every variable name visible in the current function to its
/// declared type and storage class.
///
/// The pre-pass populates one of these per function before any statement
/// in the body is emitted, satisfying the invariant that a `Var`
/// identifier always has its descriptor attached before a reference to it
/// is compiled. Name-keyed rather than `NodeId`-keyed: a variable has one
/// descriptor shared by every `Ident` expression that names it, unlike
/// string literals and struct fields, which are keyed per-node because
/// each occurrence is its own node.
#[derive(Debug, Default, Clone)]
pub struct Scope {
    vars: HashMap<String, (Ty, VarStorage)>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn declare(&mut self, name: impl Into<String>, ty: Ty, storage: VarStorage) {
        self.vars.insert(name.into(), (ty, storage));
    }

    pub fn lookup(&self, name: &str) -> Option<&(Ty, VarStorage)> {
        self.vars.get(name)
    }

    pub fn ty_of(&self, name: &str) -> Option<&Ty> {
        self.vars.get(name).map(|(ty, _)| ty)
    }

    pub fn storage_of(&self, name: &str) -> Option<&VarStorage> {
        self.vars.get(name).map(|(_, storage)| storage)
    }
}

/// Tracks the running frame-offset counter described for the layout
/// engine: parameters ascend from `+16`, locals descend from `0`.
#[derive(Debug)]
pub struct FrameCounter {
    next_param_offset: i64,
    next_local_offset: i64,
}

impl FrameCounter {
    pub fn new() -> Self {
        FrameCounter {
            next_param_offset: 16,
            next_local_offset: 0,
        }
    }

    /// Assigns the next ascending positive offset to a parameter and
    /// advances the counter by its size.
    pub fn alloc_param(&mut self, size: u64) -> i64 {
        let offset = self.next_param_offset;
        self.next_param_offset += size as i64;
        offset
    }

    /// Subtracts `size` from the running counter *before* handing out the
    /// offset, so locals always land at a negative (or zero) address.
    pub fn alloc_local(&mut self, size: u64) -> i64 {
        self.next_local_offset -= size as i64;
        self.next_local_offset
    }

    /// Final value of the parameter counter: `argsarea`.
    pub fn argsarea(&self) -> i64 {
        self.next_param_offset
    }

    /// Final value of the local counter: `localarea`, always `<= 0`.
    pub fn localarea(&self) -> i64 {
        self.next_local_offset
    }
}

impl Default for FrameCounter {
    fn default() -> Self {
        FrameCounter::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_ascend_from_sixteen() {
        let mut fc = FrameCounter::new();
        assert_eq!(fc.alloc_param(8), 16);
        assert_eq!(fc.alloc_param(8), 24);
        assert_eq!(fc.argsarea(), 32);
    }

    #[test]
    fn locals_descend_from_zero() {
        let mut fc = FrameCounter::new();
        assert_eq!(fc.alloc_local(8), -8);
        assert_eq!(fc.alloc_local(1), -9);
        assert_eq!(fc.localarea(), -9);
    }
}
