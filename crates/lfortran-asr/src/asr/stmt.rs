//! The `Stmt` sum type (§3.1).
use super::{Expr, SymbolId};
use crate::location::Span;

#[derive(Debug, Clone)]
pub struct DoLoopHead {
    pub var: SymbolId,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum SelectPattern {
    Value(Expr),
    Range(Expr, Expr),
}

#[derive(Debug, Clone)]
pub struct SelectArm {
    /// Comma-separated patterns in one `case` arm; matches if any is true.
    pub patterns: Vec<SelectPattern>,
    pub body: Vec<Stmt>,
}

/// The closed sum type of ASR statements (§3.1).
#[derive(Debug, Clone)]
pub enum StmtKind {
    Assignment { target: Expr, value: Expr },
    If { cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt> },
    WhileLoop { cond: Expr, body: Vec<Stmt> },
    DoLoop { head: DoLoopHead, body: Vec<Stmt> },
    DoConcurrentLoop { head: DoLoopHead, body: Vec<Stmt> },
    Select { test: Expr, arms: Vec<SelectArm>, default: Vec<Stmt> },
    SubroutineCall { callee: SymbolId, args: Vec<Expr> },
    Print { args: Vec<Expr> },
    Return,
    Stop { code: Option<Expr> },
    ErrorStop { code: Option<Expr> },
    Exit,
    Cycle,
    GoTo(u32),
    GoToTarget(u32),
    Assert { cond: Expr, message: Option<Expr> },
    Allocate(Vec<Expr>),
    Deallocate(Vec<Expr>),
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    #[must_use]
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}
