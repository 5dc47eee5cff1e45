use std::{env, process::ExitCode, time::Instant};

use lfortran_asr::ast::{ProgramDecl, TranslationUnitAst, TypeSpec, VarDecl};
use lfortran_asr::config::CompileOptions;
use lfortran_asr::location::Span;
use lfortran_asr::observer::RecordingPassObserver;

/// Builds a fixed fixture in lieu of a real parser (§6.1 is an external
/// collaborator this crate does not implement): `program main; integer :: x;
/// end program`.
fn fixture() -> TranslationUnitAst {
    let mut ast = TranslationUnitAst::default();
    ast.program = Some(ProgramDecl {
        name: "main".to_owned(),
        declarations: vec![VarDecl {
            name: "x".to_owned(),
            type_spec: TypeSpec { name: "integer".to_owned(), kind_expr: None, span: Span::new(0, 1) },
            dims: Vec::new(),
            intent: None,
            is_parameter: false,
            is_save: false,
            initializer: None,
            span: Span::new(0, 1),
        }],
        uses: Vec::new(),
        derived_types: Vec::new(),
        interfaces: Vec::new(),
        subprograms: Vec::new(),
        body: Vec::new(),
        span: Span::new(0, 1),
    });
    ast
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let verbose = env::args().any(|a| a == "--verbose");
    let ast = fixture();
    let options = CompileOptions::default();
    let mut observer = RecordingPassObserver::default();

    let start = Instant::now();
    let unit = match lfortran_asr::compile(&ast, &options, &mut observer) {
        Ok(unit) => unit,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let elapsed = start.elapsed();

    println!("compiled {} symbol(s) in {elapsed:?}", unit.arena.symbols.iter().count());
    if verbose {
        for event in &observer.events {
            println!("  {event}");
        }
    }
    ExitCode::SUCCESS
}
