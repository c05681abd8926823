use std::io::Write as _;

use clap::Parser;
use sgc_ast::decl::FuncDecl;
use sgc_ast::expr::{Expr, Lit};
use sgc_ast::node_id::NodeIdGen;
use sgc_ast::program::Program;
use sgc_ast::stmt::{Stmt, StmtKind};
use sgc_ast::ty::Ty;
use sgc_resolve::universe::Universe;
use tracing::debug;

/// Compiles the runtime unit and the program unit to x86-64 AT&T assembly
/// text.
///
/// Lexing and parsing a real source file are out of scope for this crate
/// (see `sgc_ast`'s module doc comment), so this driver hand-assembles the
/// two compilation units in place of the two source paths a full front end
/// would take, the same way the teacher compiler's own smoke-test `main`
/// hand-assembles IR in place of parsing a file.
#[derive(Parser)]
#[command(name = "sgc", about = "Compiles a demonstration unit to x86-64 assembly")]
struct Cli {
    /// Where to write the emitted assembly. Prints to stdout if omitted.
    #[arg(short, long)]
    output: Option<std::path::PathBuf>,

    /// Overrides SGC_LOG_FILTER for this run.
    #[arg(long)]
    log_filter: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_sgc_logger(cli.log_filter.as_deref());
    debug!("logging initialized");

    let mut runtime_unit = demo_runtime_unit();
    let mut program_unit = demo_program_unit();
    let universe = Universe::new();

    let runtime_text = compile_or_exit(&mut runtime_unit, &universe);
    let program_text = compile_or_exit(&mut program_unit, &universe);
    let text = format!("{runtime_text}{program_text}");

    match cli.output {
        Some(path) => {
            if let Err(err) = std::fs::write(&path, text) {
                eprintln!("sgc: failed to write {}: {err}", path.display());
                std::process::exit(1);
            }
        }
        None => {
            let _ = std::io::stdout().write_all(text.as_bytes());
        }
    }
}

fn compile_or_exit(program: &mut Program, universe: &Universe) -> String {
    match sgc_codegen::compile_unit(program, universe) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("sgc: {err}");
            std::process::exit(1);
        }
    }
}

/// Stand-in for the runtime unit: a package exposing one trivial helper,
/// in place of the externally-provided `malloc`/`makeSlice`/... routines
/// this compiler treats as an opaque calling-convention contract.
///
/// ```
/// package runtime
///
/// func identity(x int) int {
///     return x
/// }
/// ```
fn demo_runtime_unit() -> Program {
    let mut gen = NodeIdGen::new();
    let mut program = Program::new("runtime");

    let body = vec![Stmt {
        id: gen.fresh(),
        kind: StmtKind::Return(vec![Expr::ident(gen.fresh(), "x")]),
    }];

    program.funcs.push(FuncDecl::new(
        gen.fresh(),
        "identity".to_string(),
        vec![sgc_ast::decl::Param {
            id: gen.fresh(),
            name: "x".to_string(),
            ty: Ty::Int,
        }],
        Some(Ty::Int),
        body,
    ));
    program
}

/// Stand-in for the program unit: a package whose `main` returns the value
/// stored in a local.
///
/// ```
/// package main
///
/// func main() int {
///     var _0 int = 5
///     return _0
/// }
/// ```
fn demo_program_unit() -> Program {
    let mut gen = NodeIdGen::new();
    let mut program = Program::new("main");

    let body = vec![
        Stmt {
            id: gen.fresh(),
            kind: StmtKind::Decl {
                name: "_0".to_string(),
                ty: Ty::Int,
                init: Some(Expr {
                    id: gen.fresh(),
                    kind: sgc_ast::expr::ExprKind::BasicLit(Lit::Int(5)),
                }),
            },
        },
        Stmt {
            id: gen.fresh(),
            kind: StmtKind::Return(vec![Expr::ident(gen.fresh(), "_0")]),
        },
    ];

    program.funcs.push(FuncDecl::new(
        gen.fresh(),
        "main".to_string(),
        Vec::new(),
        Some(Ty::Int),
        body,
    ));
    program
}

fn init_sgc_logger(log_filter_override: Option<&str>) {
    let mut cfg = sgc_log::LoggerConfig::from_env("SGC").unwrap_or(sgc_log::LoggerConfig {
        log_writer: sgc_log::LogWriter::Stderr,
        filter: Err(std::env::VarError::NotPresent),
        color: Err(std::env::VarError::NotPresent),
        line_numbers: Err(std::env::VarError::NotPresent),
    });

    if let Some(filter) = log_filter_override {
        cfg.filter = Ok(filter.to_string());
    }

    if let Err(err) = sgc_log::Logger::init_logger(cfg) {
        eprintln!("sgc: error initializing logger: {err}");
        std::process::exit(1);
    }
}
