//! AST -> ASR lowering (§4.2): a two-phase pass, symbol table then body.
pub mod body_pass;
pub mod casts;
pub mod generics;
pub mod intrinsics;
pub mod symtab_pass;

use crate::asr::TranslationUnit;
use crate::ast::TranslationUnitAst;
use crate::error::SemanticError;

/// Lowers a complete translation unit: Phase 1 builds every symbol table and
/// declaration shell, Phase 2 fills in statement bodies against the scopes
/// Phase 1 built.
pub fn lower(ast: &TranslationUnitAst) -> Result<TranslationUnit, SemanticError> {
    let (mut unit, lowered) = symtab_pass::build(ast)?;
    body_pass::fill_bodies(&mut unit, ast, &lowered)?;
    Ok(unit)
}
