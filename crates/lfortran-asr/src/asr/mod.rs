//! The Abstract Semantic Representation: a closed, symbol-table-rooted typed
//! IR (§3).
mod expr;
mod stmt;
mod symbol;
mod translation_unit;

pub use expr::{BinOpKind, BoolOpKind, BoundKind, CastKind, CmpOpKind, Expr, ExprKind, StrOpKind, UnaryOpKind};
pub use stmt::{DoLoopHead, SelectArm, SelectPattern, Stmt, StmtKind};
pub use symbol::{
    Abi, Access, DerivedTypeSym, ExternalDescriptor, ExternalSymbolSym, FunctionSym, GenericProcedureSym, Intent,
    ProgramSym, Storage, Symbol, SymbolKind, SubroutineSym, Variable,
};
pub use translation_unit::{Arena, SymbolId, TranslationUnit};
