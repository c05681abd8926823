use std::fmt::Write as _;

/// An accumulating buffer of AT&T-syntax x86-64 assembly text.
///
/// This is the only thing the statement and expression emitters write to;
/// nothing in this crate ever opens a file or writes to stdout directly,
/// so the driver can concatenate the runtime unit's and program unit's
/// buffers however it likes.
#[derive(Debug, Default)]
pub struct AsmBuffer {
    text: String,
}

impl AsmBuffer {
    pub fn new() -> Self {
        AsmBuffer::default()
    }

    /// Emits an indented instruction line.
    pub fn ins(&mut self, instr: &str) {
        let _ = writeln!(self.text, "\t{instr}");
    }

    /// Emits a label definition (column zero, no indentation).
    pub fn label(&mut self, name: &str) {
        let _ = writeln!(self.text, "{name}:");
    }

    /// Emits a directive or comment at column zero verbatim.
    pub fn raw(&mut self, line: &str) {
        let _ = writeln!(self.text, "{line}");
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Hands out the monotonically increasing numeric suffix used by every
/// control-flow label (`.L.endif.N`, `.L.else.N`, `.L.loop.cond.N`,
/// `.L.loop.exit.N`). One counter per compilation unit; labels across
/// functions in the same unit never collide.
#[derive(Debug, Default)]
pub struct LabelCounter {
    next: u32,
}

impl LabelCounter {
    pub fn new() -> Self {
        LabelCounter::default()
    }

    pub fn fresh(&mut self) -> u32 {
        let id = self.next;
        self.next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_renders_instructions_and_labels() {
        let mut buf = AsmBuffer::new();
        buf.label("main.f");
        buf.ins("pushq %rbp");
        buf.ins("movq %rsp, %rbp");
        assert_eq!(buf.into_text(), "main.f:\n\tpushq %rbp\n\tmovq %rsp, %rbp\n");
    }

    #[test]
    fn label_counter_is_monotonic_and_unique_per_call() {
        let mut c = LabelCounter::new();
        let a = c.fresh();
        let b = c.fresh();
        assert_ne!(a, b);
        assert_eq!(b, a + 1);
    }
}
