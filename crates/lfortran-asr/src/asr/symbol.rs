//! The `Symbol` sum type (§3.1).
use super::{Stmt, SymbolId};
use crate::symbol_table::SymbolTableId;
use crate::types::Type;

/// Declared dataflow direction of a procedure argument, or the special
/// roles `Local` and `ReturnVar`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Local,
    In,
    Out,
    InOut,
    Unspecified,
    ReturnVar,
}

impl Intent {
    /// Whether this intent is legal on a `Function`/`Subroutine` argument
    /// (invariant 5).
    #[must_use]
    pub fn is_valid_argument_intent(self) -> bool {
        matches!(self, Intent::In | Intent::Out | Intent::InOut | Intent::Unspecified)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Default,
    Save,
    Parameter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abi {
    Source,
    BindC,
}

/// A variable declaration: a local, an argument, a module variable, or a
/// derived-type member, depending on `intent` and where its `SymbolTable`
/// binding lives.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub parent_table: SymbolTableId,
    pub intent: Intent,
    pub storage: Storage,
    pub ty: Type,
    pub initializer: Option<super::Expr>,
    pub abi: Abi,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct ProgramSym {
    pub name: String,
    pub table: SymbolTableId,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct ModuleSym {
    pub name: String,
    pub table: SymbolTableId,
}

/// One hop of indirection naming the module-level symbol a `use`-imported
/// shell stands in for.
#[derive(Debug, Clone)]
pub struct ExternalDescriptor {
    pub module_name: String,
    pub original_name: String,
}

#[derive(Debug, Clone)]
pub struct SubroutineSym {
    pub name: String,
    pub table: SymbolTableId,
    pub args: Vec<SymbolId>,
    pub body: Vec<Stmt>,
    pub bind_name: Option<String>,
    pub external: Option<ExternalDescriptor>,
    pub abi: Abi,
}

#[derive(Debug, Clone)]
pub struct FunctionSym {
    pub name: String,
    pub table: SymbolTableId,
    pub args: Vec<SymbolId>,
    /// Resolves to a `Variable` with intent `ReturnVar` in `table`
    /// (invariant 6).
    pub return_var: SymbolId,
    pub body: Vec<Stmt>,
    pub bind_name: Option<String>,
    pub external: Option<ExternalDescriptor>,
    pub abi: Abi,
}

#[derive(Debug, Clone)]
pub struct GenericProcedureSym {
    pub name: String,
    pub parent_table: SymbolTableId,
    /// Candidate procedures, in declaration order (invariant 8: each entry
    /// is a `Subroutine`/`Function`, or an `ExternalSymbol` pointing at one).
    pub procs: Vec<SymbolId>,
}

#[derive(Debug, Clone)]
pub struct DerivedTypeSym {
    pub name: String,
    pub table: SymbolTableId,
}

/// Represents an entity imported from another module (§3.1). `external` is
/// `None` until resolved by `use`-processing (lowering) or by the
/// deserializer's fix-external-symbols walk (§4.5).
#[derive(Debug, Clone)]
pub struct ExternalSymbolSym {
    pub name: String,
    pub parent_table: SymbolTableId,
    pub module_name: String,
    pub original_name: String,
    pub external: Option<SymbolId>,
}

/// Tag identifying a `Symbol` variant, used by serialization for symbol
/// *references* (`(symtab_id, variant_tag, name)`) and for declaring the
/// variant of a not-yet-loaded forward-reference shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::FromRepr)]
#[repr(u8)]
pub enum SymbolKind {
    Program = 0,
    Module = 1,
    Subroutine = 2,
    Function = 3,
    GenericProcedure = 4,
    DerivedType = 5,
    Variable = 6,
    ExternalSymbol = 7,
}

/// The closed sum type of ASR symbols (§3.1).
#[derive(Debug, Clone)]
pub enum Symbol {
    Program(ProgramSym),
    Module(ModuleSym),
    Subroutine(SubroutineSym),
    Function(FunctionSym),
    GenericProcedure(GenericProcedureSym),
    DerivedType(DerivedTypeSym),
    Variable(Variable),
    ExternalSymbol(ExternalSymbolSym),
    /// A placeholder allocated by the deserializer for a forward reference
    /// seen before its definition (§4.5). Never observed outside
    /// deserialization: every `Shell` is overwritten via `Store::replace`
    /// before `TranslationUnit::load` returns.
    Shell { kind: SymbolKind, name: String },
}

impl Symbol {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Symbol::Program(s) => &s.name,
            Symbol::Module(s) => &s.name,
            Symbol::Subroutine(s) => &s.name,
            Symbol::Function(s) => &s.name,
            Symbol::GenericProcedure(s) => &s.name,
            Symbol::DerivedType(s) => &s.name,
            Symbol::Variable(s) => &s.name,
            Symbol::ExternalSymbol(s) => &s.name,
            Symbol::Shell { name, .. } => name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Program(_) => SymbolKind::Program,
            Symbol::Module(_) => SymbolKind::Module,
            Symbol::Subroutine(_) => SymbolKind::Subroutine,
            Symbol::Function(_) => SymbolKind::Function,
            Symbol::GenericProcedure(_) => SymbolKind::GenericProcedure,
            Symbol::DerivedType(_) => SymbolKind::DerivedType,
            Symbol::Variable(_) => SymbolKind::Variable,
            Symbol::ExternalSymbol(_) => SymbolKind::ExternalSymbol,
            Symbol::Shell { kind, .. } => *kind,
        }
    }

    /// The symbol table this symbol owns, for the variants that own one.
    #[must_use]
    pub fn own_table(&self) -> Option<SymbolTableId> {
        match self {
            Symbol::Program(s) => Some(s.table),
            Symbol::Module(s) => Some(s.table),
            Symbol::Subroutine(s) => Some(s.table),
            Symbol::Function(s) => Some(s.table),
            Symbol::DerivedType(s) => Some(s.table),
            Symbol::GenericProcedure(_) | Symbol::Variable(_) | Symbol::ExternalSymbol(_) | Symbol::Shell { .. } => {
                None
            }
        }
    }

    #[must_use]
    pub fn is_procedure(&self) -> bool {
        matches!(self, Symbol::Subroutine(_) | Symbol::Function(_))
    }
}
