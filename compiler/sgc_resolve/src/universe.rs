use std::collections::HashMap;

use sgc_ast::ty::Ty;
use tracing::{debug, instrument};

/// A predeclared name and what it means.
#[derive(Debug, Clone)]
pub enum UniverseEntry {
    /// A predeclared type keyword (`string`, `int`, ...).
    Type(Ty),
    /// A predeclared constant (`true`, `false`, `nil`).
    Const(ConstKind),
    /// A builtin function (`new`, `make`, `append`, `len`, `cap`, `print`).
    Builtin(Builtin),
    /// A recognized external package placeholder, used only by the runtime
    /// compilation unit's direct-syscall path.
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstKind {
    True,
    False,
    Nil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    New,
    Make,
    Append,
    Len,
    Cap,
    Print,
}

/// The fixed registry of predeclared names resolution checks free
/// identifiers against.
///
/// Constructed once per compilation unit; resolution never mutates it.
#[derive(Debug)]
pub struct Universe {
    entries: HashMap<String, UniverseEntry>,
}

impl Universe {
    #[instrument]
    pub fn new() -> Self {
        let mut entries = HashMap::new();

        for (name, ty) in [
            ("string", Ty::String),
            ("uintptr", Ty::Uintptr),
            ("bool", Ty::Bool),
            ("int", Ty::Int),
            ("uint8", Ty::Uint8),
            ("uint16", Ty::Uint16),
        ] {
            entries.insert(name.to_string(), UniverseEntry::Type(ty));
        }

        for (name, c) in [
            ("true", ConstKind::True),
            ("false", ConstKind::False),
            ("nil", ConstKind::Nil),
        ] {
            entries.insert(name.to_string(), UniverseEntry::Const(c));
        }

        for (name, b) in [
            ("new", Builtin::New),
            ("make", Builtin::Make),
            ("append", Builtin::Append),
            ("len", Builtin::Len),
            ("cap", Builtin::Cap),
            ("print", Builtin::Print),
        ] {
            entries.insert(name.to_string(), UniverseEntry::Builtin(b));
        }

        // The runtime unit's direct syscall path is the one recognized
        // external package this dialect knows about.
        entries.insert("syscall".to_string(), UniverseEntry::Package);

        debug!(entry_count = entries.len(), "universe populated");
        Universe { entries }
    }

    pub fn lookup(&self, name: &str) -> Option<&UniverseEntry> {
        self.entries.get(name)
    }

    /// Binds every name in `idents` that exists in the universe; every
    /// other name is reported but does not abort resolution on its own.
    /// The parser already bound local variables and function parameters,
    /// so only free names reach this call.
    #[instrument(skip(self, idents))]
    pub fn resolve<'a>(&self, idents: &'a [String]) -> ResolveResult<'a> {
        let mut bound = HashMap::new();
        let mut unresolved = Vec::new();

        for name in idents {
            match self.entries.get(name) {
                Some(entry) => {
                    bound.insert(name.as_str(), entry.clone());
                }
                None => unresolved.push(name.as_str()),
            }
        }

        debug!(
            bound = bound.len(),
            unresolved = unresolved.len(),
            "universe resolution complete"
        );
        ResolveResult { bound, unresolved }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Universe::new()
    }
}

#[derive(Debug)]
pub struct ResolveResult<'a> {
    pub bound: HashMap<&'a str, UniverseEntry>,
    /// Names that exist nowhere in the universe. Reported, but emission is
    /// the point that actually fails if one of these is ever referenced.
    pub unresolved: Vec<&'a str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predeclared_types_resolve() {
        let universe = Universe::new();
        assert!(matches!(
            universe.lookup("int"),
            Some(UniverseEntry::Type(Ty::Int))
        ));
        assert!(matches!(
            universe.lookup("string"),
            Some(UniverseEntry::Type(Ty::String))
        ));
    }

    #[test]
    fn unknown_identifiers_are_carried_as_unresolved() {
        let universe = Universe::new();
        let idents = vec!["int".to_string(), "frobnicate".to_string()];
        let result = universe.resolve(&idents);
        assert_eq!(result.bound.len(), 1);
        assert_eq!(result.unresolved, vec!["frobnicate"]);
    }
}
