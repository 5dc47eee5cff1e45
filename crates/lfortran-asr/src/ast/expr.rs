//! Untyped expression nodes as delivered by the parser (§6.1).
use crate::location::Span;

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

#[derive(Debug, Clone)]
pub enum ExprKind {
    Name(String),
    Int(i64),
    Real(f64),
    Logical(bool),
    Str(String),
    Complex(f64, f64),
    BinOp(BinOpKind, Box<Expr>, Box<Expr>),
    UnaryOp(UnaryOpKind, Box<Expr>),
    Compare(CmpOpKind, Box<Expr>, Box<Expr>),
    BoolOp(BoolOpKind, Vec<Expr>),
    /// Covers both function calls and array/derived-type subscript syntax --
    /// Fortran's `name(...)` is ambiguous between the two until the
    /// symbol-table pass resolves `name`.
    Call { callee: String, args: Vec<Expr> },
    ArrayInitializer(Vec<Expr>),
    ImpliedDoLoop {
        element: Box<Expr>,
        var: String,
        start: Box<Expr>,
        end: Box<Expr>,
        step: Option<Box<Expr>>,
    },
    DerivedRef { base: Box<Expr>, field: String },
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[must_use]
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}
