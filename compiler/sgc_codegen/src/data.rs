use sgc_ast::decl::Global;
use sgc_ast::error::{CompileError, CompileResult};
use sgc_ast::ty::{Kind, Ty};
use tracing::instrument;

use crate::asm::AsmBuffer;
use crate::ctx::CodegenCtx;
use crate::expr::size_of_ty;

/// Emits the `.data` section for one compilation unit: every interned
/// string literal first (in assigned-label order), then every
/// package-scope global.
#[instrument(skip(ctx, buf))]
pub fn emit_data(ctx: &CodegenCtx, buf: &mut AsmBuffer) -> CompileResult<()> {
    buf.raw(".data");

    let mut literals: Vec<_> = ctx.str_lits.iter().collect();
    literals.sort_by(|a, b| a.1.label.cmp(&b.1.label));
    for (_, descriptor) in literals {
        buf.label(&descriptor.label);
        buf.raw(&format!("\t.string {}", descriptor.raw));
    }

    for global in &ctx.program.globals {
        emit_global(ctx, buf, global)?;
    }

    Ok(())
}

fn literal_len(raw: &str) -> u64 {
    let backslashes = raw.bytes().filter(|&b| b == b'\\').count() as u64;
    raw.len() as u64 - 2 - backslashes
}

fn emit_global(ctx: &CodegenCtx, buf: &mut AsmBuffer, global: &Global) -> CompileResult<()> {
    buf.label(&global.name);
    match (&global.init, global.ty.kind()) {
        (Some(raw), Kind::String) => {
            let content_label = format!(".{}.G{}", ctx.pkg, global.name);
            buf.raw(&format!("\t.quad {content_label}"));
            buf.raw(&format!("\t.quad {}", literal_len(raw)));
            buf.label(&content_label);
            buf.raw(&format!("\t.string {raw}"));
            Ok(())
        }
        (None, _) => emit_zero_directives(ctx, buf, &global.ty),
        (Some(_), other) => Err(CompileError::unsupported(
            format!("global initializer for non-string kind {other:?}"),
            global.id,
        )),
    }
}

/// Emits the zero-value directive(s) for `ty`, per §4.7's per-kind table:
/// `string`/`slice` each expand to that many `.quad 0`s, `uint8`/`uint16`
/// get their own narrow directive, every other scalar kind is a `.quad`,
/// and `array` repeats its element's zero directive `length` times.
/// `struct` has no directive of its own in that table; it falls back to a
/// single `.zero <size>` spanning the whole struct, which is byte-for-byte
/// identical to emitting each field's own zero directive in turn.
fn emit_zero_directives(ctx: &CodegenCtx, buf: &mut AsmBuffer, ty: &Ty) -> CompileResult<()> {
    match ty.kind() {
        Kind::String => {
            buf.raw("\t.quad 0");
            buf.raw("\t.quad 0");
        }
        Kind::Slice => {
            buf.raw("\t.quad 0");
            buf.raw("\t.quad 0");
            buf.raw("\t.quad 0");
        }
        Kind::Uint8 => buf.raw("\t.byte 0"),
        Kind::Uint16 => buf.raw("\t.word 0"),
        Kind::Int | Kind::Uintptr | Kind::Pointer | Kind::Bool => buf.raw("\t.quad 0"),
        Kind::Array => {
            let Ty::Array { len, elem } = ty else {
                unreachable!("Kind::Array implies Ty::Array")
            };
            for _ in 0..*len {
                emit_zero_directives(ctx, buf, elem)?;
            }
        }
        Kind::Struct => {
            let size = size_of_ty(ctx, ty)?;
            buf.raw(&format!("\t.zero {size}"));
        }
    }
    Ok(())
}
