//! The untyped AST (§6.1): the interface the parser collaborator must
//! produce and the symbol-table pass (§4.2 Phase 1) consumes.
mod expr;
mod stmt;
mod unit;

pub use expr::{BinOpKind, BoolOpKind, CmpOpKind, Expr, ExprKind, UnaryOpKind};
pub use stmt::{SelectArm, SelectPattern, Stmt, StmtKind};
pub use unit::{
    DerivedTypeDecl, DimSpec, InterfaceDecl, IntentSpec, ModuleDecl, ProgramDecl, SubprogramDecl, SubprogramKind,
    TranslationUnitAst, TypeSpec, UseStmt, VarDecl,
};
