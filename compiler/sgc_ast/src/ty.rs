use sgc_abi::layout::{BackendRepr, Layout, TyAndLayout};
use sgc_abi::size_and_align::Size;

use crate::decl::StructDecl;

/// An AST type expression.
///
/// Every `Ty` maps to exactly one [`Kind`] (see [`Ty::kind`]); `Kind` is the
/// closed tag the rest of the compiler switches on, `Ty` is the recursive
/// shape that carries the element/pointee/field detail a tag alone can't.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ty {
    Int,
    Uintptr,
    Bool,
    Uint8,
    Uint16,
    String,
    Pointer(Box<Ty>),
    Slice(Box<Ty>),
    Array { len: u64, elem: Box<Ty> },
    /// A named struct type. Resolved against the program's struct table by
    /// name; the layout engine fills in field offsets once, keyed by the
    /// struct's fields' `NodeId`s.
    Struct(String),
}

/// The closed kind tag every `Ty` reduces to. Matches the type system
/// described for this dialect: no user-extensible kinds, no generics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Int,
    Uintptr,
    Pointer,
    Bool,
    Uint8,
    Uint16,
    String,
    Slice,
    Array,
    Struct,
}

impl Ty {
    pub fn kind(&self) -> Kind {
        match self {
            Ty::Int => Kind::Int,
            Ty::Uintptr => Kind::Uintptr,
            Ty::Bool => Kind::Bool,
            Ty::Uint8 => Kind::Uint8,
            Ty::Uint16 => Kind::Uint16,
            Ty::String => Kind::String,
            Ty::Pointer(_) => Kind::Pointer,
            Ty::Slice(_) => Kind::Slice,
            Ty::Array { .. } => Kind::Array,
            Ty::Struct(_) => Kind::Struct,
        }
    }

    /// The size in bytes tabulated directly by kind. Returns `None` for
    /// `ARRAY` and `STRUCT`, whose size depends on the element type or the
    /// field list and must be computed by the layout engine.
    pub fn fixed_size(&self) -> Option<Size> {
        match self.kind() {
            Kind::Int | Kind::Uintptr | Kind::Pointer | Kind::Bool => Some(Size::from_bytes(8)),
            Kind::Uint8 => Some(Size::from_bytes(1)),
            Kind::Uint16 => Some(Size::from_bytes(2)),
            Kind::String => Some(Size::from_bytes(16)),
            Kind::Slice => Some(Size::from_bytes(24)),
            Kind::Array | Kind::Struct => None,
        }
    }

    pub fn backend_repr(&self) -> BackendRepr {
        match self.kind() {
            Kind::Int | Kind::Uintptr | Kind::Pointer | Kind::Bool | Kind::Uint8 | Kind::Uint16 => {
                BackendRepr::Scalar
            }
            Kind::String => BackendRepr::ScalarPair,
            Kind::Slice => BackendRepr::ScalarTriple,
            Kind::Array | Kind::Struct => BackendRepr::Memory,
        }
    }

    /// Layout for types whose size is tabulated by kind alone. Struct and
    /// array layouts depend on extra context (the field list, the element
    /// size) and are computed by the layout engine instead.
    pub fn fixed_layout(&self) -> Option<TyAndLayout<Ty>> {
        let size = self.fixed_size()?;
        Some(TyAndLayout {
            ty: self.clone(),
            layout: Layout {
                size,
                backend_repr: self.backend_repr(),
            },
        })
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Ty::Bool)
    }

    pub fn elem_ty(&self) -> Option<&Ty> {
        match self {
            Ty::Slice(elem) | Ty::Array { elem, .. } => Some(elem),
            _ => None,
        }
    }

    pub fn pointee(&self) -> Option<&Ty> {
        match self {
            Ty::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Computes the size of a struct type given its already-resolved field list:
/// the sum of each field's own size, with no alignment padding.
pub fn struct_size(decl: &StructDecl) -> Size {
    decl.fields.iter().map(|f| f.ty.size_of()).sum()
}

impl Ty {
    /// Full size of this type, recursing into `ARRAY`/`STRUCT` shapes.
    /// For `STRUCT`, the caller should prefer the layout engine's cached
    /// offsets when one is available; this is the idempotent from-scratch
    /// computation described as always producing identical results.
    pub fn size_of(&self) -> Size {
        if let Some(size) = self.fixed_size() {
            return size;
        }
        match self {
            Ty::Array { len, elem } => elem.size_of().repeat(*len),
            Ty::Struct(_) => {
                // A bare `Ty::Struct(name)` carries no field list; callers
                // that need a struct's size must go through the layout
                // engine, which holds the program's struct table.
                unreachable!("struct size must be computed from a StructDecl, not a bare Ty")
            }
            _ => unreachable!("fixed_size already covers every other kind"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decl::Field;
    use crate::node_id::NodeIdGen;

    #[test]
    fn scalar_sizes_match_spec_table() {
        assert_eq!(Ty::Int.size_of().bytes(), 8);
        assert_eq!(Ty::Uintptr.size_of().bytes(), 8);
        assert_eq!(Ty::Pointer(Box::new(Ty::Int)).size_of().bytes(), 8);
        assert_eq!(Ty::Bool.size_of().bytes(), 8);
        assert_eq!(Ty::Uint8.size_of().bytes(), 1);
        assert_eq!(Ty::Uint16.size_of().bytes(), 2);
        assert_eq!(Ty::String.size_of().bytes(), 16);
        assert_eq!(Ty::Slice(Box::new(Ty::Int)).size_of().bytes(), 24);
    }

    #[test]
    fn array_size_is_length_times_element() {
        let arr = Ty::Array {
            len: 4,
            elem: Box::new(Ty::Int),
        };
        assert_eq!(arr.size_of().bytes(), 32);
    }

    #[test]
    fn struct_size_sums_field_sizes() {
        let mut gen = NodeIdGen::new();
        let decl = StructDecl {
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
        };
        assert_eq!(struct_size(&decl).bytes(), 9);
    }
}
