//! The `Expr` sum type (§3.1). Every node carries its resolved `Type`.
use super::SymbolId;
use crate::location::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOpKind {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOpKind {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOpKind {
    Concat,
}

/// Which bound `ArrayBound` asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
}

/// The coercion applied by an `ImplicitCast`/`ExplicitCast` node (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    IntegerToReal,
    RealToInteger,
    RealToComplex,
    IntegerToComplex,
    RealToReal,
    IntegerToInteger,
    ComplexToComplex,
    LogicalToInteger,
}

/// The closed sum type of ASR expressions (§3.1).
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// A reference to a symbol, resolved (possibly through one
    /// `ExternalSymbol` hop) to a `Variable` (invariant 4).
    Var(SymbolId),
    FunctionCall { callee: SymbolId, args: Vec<Expr> },
    BinOp(BinOpKind, Box<Expr>, Box<Expr>),
    UnaryOp(UnaryOpKind, Box<Expr>),
    Compare(CmpOpKind, Box<Expr>, Box<Expr>),
    BoolOp(BoolOpKind, Vec<Expr>),
    ArrayRef { base: Box<Expr>, indices: Vec<Expr> },
    ArrayInitializer(Vec<Expr>),
    ArraySize { array: Box<Expr>, dim: Option<Box<Expr>> },
    ArrayBound { array: Box<Expr>, dim: Box<Expr>, bound: BoundKind },
    ArrayReshape { array: Box<Expr>, shape: Box<Expr> },
    DerivedRef { base: Box<Expr>, member: SymbolId },
    ImpliedDoLoop {
        element: Box<Expr>,
        var: SymbolId,
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
    },
    ImplicitCast { operand: Box<Expr>, cast_kind: CastKind },
    ExplicitCast { operand: Box<Expr>, cast_kind: CastKind },
    StrOp(StrOpKind, Box<Expr>, Box<Expr>),
    /// `a * b + c` recognized and folded into one rounding step (§4.3.4).
    FusedMultiplyAdd(Box<Expr>, Box<Expr>, Box<Expr>),
    Str(String),
    ConstantInteger(i64),
    ConstantReal(f64),
    ConstantLogical(bool),
    ConstantComplex(f64, f64),
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: Type,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, ty: Type, span: Span) -> Self {
        Self { kind, ty, span }
    }
}
