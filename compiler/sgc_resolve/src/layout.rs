use std::collections::HashMap;

use sgc_abi::size_and_align::Size;
use sgc_ast::decl::StructDecl;
use sgc_ast::node_id::NodeId;
use sgc_ast::program::Program;
use sgc_ast::ty::Ty;
use tracing::{debug, instrument};

/// Per-field byte offsets, keyed by the field's own `NodeId` rather than
/// stored on the field itself: offsets are computed once the whole struct
/// is known, not at the point each `Field` is constructed.
#[derive(Debug, Default)]
pub struct FieldOffsets {
    offsets: HashMap<NodeId, u64>,
    sizes: HashMap<String, Size>,
}

impl FieldOffsets {
    pub fn offset_of(&self, field_id: NodeId) -> Option<u64> {
        self.offsets.get(&field_id).copied()
    }

    pub fn size_of_struct(&self, name: &str) -> Option<Size> {
        self.sizes.get(name).copied()
    }
}

/// Computes field offsets for every struct declared in a program.
///
/// Fields are visited in declaration order; an accumulator starts at zero
/// and, for each field, records the current accumulator as that field's
/// offset, then advances by the field's own size. No alignment padding is
/// ever inserted: running this twice over the same program produces
/// identical offsets (it is a pure function of the field list).
#[instrument(skip(program))]
pub fn layout_structs(program: &Program) -> FieldOffsets {
    let mut result = FieldOffsets::default();

    for decl in &program.structs {
        let mut acc = 0u64;
        for field in &decl.fields {
            result.offsets.insert(field.id, acc);
            acc += size_of_ty(&field.ty, &result);
        }
        debug!(r#struct = %decl.name, size = acc, "struct laid out");
        result.sizes.insert(decl.name.clone(), Size::from_bytes(acc));
    }

    result
}

/// Size in bytes of any type, recursing into `ARRAY` and routing a
/// `STRUCT` through the sizes already computed by this layout pass.
/// `Ty::size_of` panics on a bare `Ty::Struct`, since it alone carries no
/// field list; this is the one place that needs a struct's size without a
/// `StructDecl` in hand. Used both to size struct fields (nested structs by
/// value) and, via the pre-pass, to size struct-typed locals, parameters
/// and range-loop elements.
///
/// Requires struct declarations to appear in dependency order (a struct
/// used as a field type must be declared before the struct that embeds
/// it), the same order `program.structs` is walked in.
pub fn size_of_ty(ty: &Ty, offsets: &FieldOffsets) -> u64 {
    match ty {
        Ty::Struct(name) => offsets.size_of_struct(name).map(|s| s.bytes()).unwrap_or_else(|| {
            panic!("no computed layout for struct `{name}`")
        }),
        Ty::Array { len, elem } => len * size_of_ty(elem, offsets),
        _ => ty.size_of().bytes(),
    }
}

/// Size of a struct type, preferring the layout engine's cached total over
/// a from-scratch recomputation. Falls back to summing field sizes
/// directly if the struct wasn't part of the layout pass (e.g. in a
/// standalone test that builds a `StructDecl` without a `Program`).
pub fn struct_size(decl: &StructDecl, offsets: &FieldOffsets) -> Size {
    offsets
        .size_of_struct(&decl.name)
        .unwrap_or_else(|| decl.fields.iter().map(|f| f.ty.size_of()).sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgc_ast::decl::Field;
    use sgc_ast::node_id::NodeIdGen;
    use sgc_ast::ty::Ty;

    #[test]
    fn offsets_are_sequential_sums_with_no_padding() {
        let mut gen = NodeIdGen::new();
        let fx = gen.fresh();
        let fy = gen.fresh();
        let decl = StructDecl {
            id: gen.fresh(),
            name: "P".to_string(),
            fields: vec![
                Field {
                    id: fx,
                    name: "x".to_string(),
                    ty: Ty::Int,
                },
                Field {
                    id: fy,
                    name: "y".to_string(),
                    ty: Ty::Uint8,
                },
            ],
        };
        let mut program = Program::new("main");
        program.structs.push(decl);

        let offsets = layout_structs(&program);
        assert_eq!(offsets.offset_of(fx), Some(0));
        assert_eq!(offsets.offset_of(fy), Some(8));
        assert_eq!(offsets.size_of_struct("P").unwrap().bytes(), 9);
    }

    #[test]
    fn layout_is_idempotent() {
        let mut gen = NodeIdGen::new();
        let mut program = Program::new("main");
        program.structs.push(StructDecl {
            id: gen.fresh(),
            name: "Q".to_string(),
            fields: vec![Field {
                id: gen.fresh(),
                name: "a".to_string(),
                ty: Ty::String,
            }],
        });

        let first = layout_structs(&program);
        let second = layout_structs(&program);
        assert_eq!(
            first.size_of_struct("Q").unwrap().bytes(),
            second.size_of_struct("Q").unwrap().bytes()
        );
    }
}
