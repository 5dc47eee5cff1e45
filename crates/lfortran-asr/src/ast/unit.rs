//! Declaration-bearing nodes: the AST schema the symbol-table pass walks
//! (§4.2 Phase 1, §6.1).
use super::{Expr, Stmt};
use crate::location::Span;

/// The declared base type name plus an optional `kind=` expression, as
/// written in source (`integer(kind=8)`).
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub kind_expr: Option<Expr>,
    pub span: Span,
}

/// One `dimension(...)` entry. `upper == None` means assumed-shape in that
/// dimension.
#[derive(Debug, Clone)]
pub struct DimSpec {
    pub lower: Option<Expr>,
    pub upper: Option<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentSpec {
    In,
    Out,
    InOut,
}

#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub type_spec: TypeSpec,
    pub dims: Vec<DimSpec>,
    pub intent: Option<IntentSpec>,
    pub is_parameter: bool,
    pub is_save: bool,
    pub initializer: Option<Expr>,
    pub span: Span,
}

/// A `use module_name, only: local => original, ...` statement. An empty
/// `only` list is rejected by the symbol-table pass -- this layer requires
/// an explicit import list rather than modeling whole-module re-export.
#[derive(Debug, Clone)]
pub struct UseStmt {
    pub module: String,
    pub only: Vec<(String, String)>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubprogramKind {
    Subroutine,
    Function,
}

#[derive(Debug, Clone)]
pub struct SubprogramDecl {
    pub name: String,
    pub kind: SubprogramKind,
    pub args: Vec<String>,
    /// `Function` only; defaults to the subprogram's own name if absent.
    pub return_name: Option<String>,
    pub bind_name: Option<String>,
    pub declarations: Vec<VarDecl>,
    pub uses: Vec<UseStmt>,
    pub body: Vec<Stmt>,
    pub span: Span,
    /// Marks a top-level statement-function declared interactively (the
    /// REPL flow, §4.2 Phase 1): redefining a name bound to a prior
    /// prototype shadows it instead of raising "already defined".
    pub is_interactive_prototype: bool,
}

#[derive(Debug, Clone)]
pub struct DerivedTypeDecl {
    pub name: String,
    pub members: Vec<VarDecl>,
    pub span: Span,
}

/// An `interface` block naming the candidate procedures of one generic name
/// (§4.2 Phase 1 (e)).
#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub procedures: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ModuleDecl {
    pub name: String,
    pub declarations: Vec<VarDecl>,
    pub derived_types: Vec<DerivedTypeDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub subprograms: Vec<SubprogramDecl>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ProgramDecl {
    pub name: String,
    pub declarations: Vec<VarDecl>,
    pub uses: Vec<UseStmt>,
    pub derived_types: Vec<DerivedTypeDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    /// Internal (`contains`) subprograms.
    pub subprograms: Vec<SubprogramDecl>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// Root of the parser's output (§6.1): zero or more modules, at most one
/// program, and -- for the interactive-evaluator flow -- orphan top-level
/// statements wrapped later by `wrap_global_statements` (§4.3.6).
#[derive(Debug, Clone, Default)]
pub struct TranslationUnitAst {
    pub modules: Vec<ModuleDecl>,
    pub program: Option<ProgramDecl>,
    pub top_level_subprograms: Vec<SubprogramDecl>,
    pub orphan_statements: Vec<Stmt>,
}
