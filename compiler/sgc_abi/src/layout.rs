use crate::size_and_align::Size;

/// A type paired with its computed layout.
///
/// This is threaded through the layout engine and the expression emitter so
/// that code generation never has to recompute a kind's size or word shape.
#[derive(Debug, Clone, Copy)]
pub struct TyAndLayout<T> {
    pub ty: T,
    pub layout: Layout,
}

/// The layout of a type: its size in bytes and how many stack words it
/// occupies under the value-on-stack convention.
#[derive(Debug, Clone, Copy)]
pub struct Layout {
    /// The size of the type in bytes (for `STRUCT`/`ARRAY`, the sum/product
    /// described in the layout engine; for everything else a tabulated
    /// constant).
    pub size: Size,
    /// How this type is represented once pushed onto the runtime stack.
    pub backend_repr: BackendRepr,
}

/// The shape a value takes once it has been pushed onto the runtime stack,
/// per the push order described by the value-on-stack convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRepr {
    /// A single 8-byte word: `int`, `uintptr`, `pointer`, `bool`, and the
    /// widened `uint8`/`uint16`.
    Scalar,
    /// Two 8-byte words, pushed len-then-ptr (`string`).
    ScalarPair,
    /// Three 8-byte words, pushed cap-then-len-then-ptr (`slice`).
    ScalarTriple,
    /// Never pushed as a whole value; only ever addressed (`struct`, `array`).
    Memory,
}

impl Layout {
    /// The number of 8-byte stack words a pushed value of this layout occupies.
    /// `Memory` layouts have no stack-word count; callers must address them.
    pub fn stack_words(&self) -> Option<u32> {
        match self.backend_repr {
            BackendRepr::Scalar => Some(1),
            BackendRepr::ScalarPair => Some(2),
            BackendRepr::ScalarTriple => Some(3),
            BackendRepr::Memory => None,
        }
    }

    pub fn is_memory(&self) -> bool {
        matches!(self.backend_repr, BackendRepr::Memory)
    }
}
