//! Sequences the fixed pipeline order (§5): AST -> ASR, verify, the pass
//! framework (which itself verifies after lowering and, if asked, after
//! every pass), leaving a `TranslationUnit` ready to hand to an [`Emitter`].
//!
//! Grounded on the teacher's `Runner`: one entry point a CLI or embedder
//! drives end to end, taking its tunables and its tracer explicitly rather
//! than reaching for global state.

use crate::asr::TranslationUnit;
use crate::ast::TranslationUnitAst;
use crate::config::CompileOptions;
use crate::error::CoreError;
use crate::lowering;
use crate::observer::PassObserver;
use crate::passes;

/// Lowers `ast` to ASR and runs it through the full pass pipeline, returning
/// a translation unit that has passed the verifier and is ready for an
/// emitter. `options` and `observer` are threaded straight through to
/// [`passes::run_pipeline`]; neither is read from global or environment
/// state (§6.4 keeps environment variables to the CLI collaborator).
///
/// # Errors
/// Propagates a semantic error from lowering or a verify/pass failure from
/// the pipeline, whichever comes first.
pub fn compile(
    ast: &TranslationUnitAst,
    options: &CompileOptions,
    observer: &mut dyn PassObserver,
) -> Result<TranslationUnit, CoreError> {
    let _span = tracing::debug_span!("compile").entered();
    let mut unit = lowering::lower(ast)?;
    tracing::debug!("lowering finished, entering the pass pipeline");
    passes::run_pipeline(&mut unit, options, observer)?;
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopPassObserver;

    #[test]
    fn an_empty_program_compiles_through_the_whole_pipeline() {
        let mut ast = TranslationUnitAst::default();
        ast.program = Some(crate::ast::ProgramDecl {
            name: "main".to_owned(),
            declarations: Vec::new(),
            uses: Vec::new(),
            derived_types: Vec::new(),
            interfaces: Vec::new(),
            subprograms: Vec::new(),
            body: Vec::new(),
            span: crate::location::Span::new(0, 1),
        });

        let options = CompileOptions::default();
        let mut observer = NoopPassObserver;
        let unit = compile(&ast, &options, &mut observer).expect("empty program compiles cleanly");
        let main_id = unit.arena.tables.get(unit.global_table).get_local("main");
        assert!(main_id.is_some());
    }
}
