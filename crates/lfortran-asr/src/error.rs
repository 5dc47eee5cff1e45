//! Layered error types for every fallible stage of the core.
//!
//! Grounded on the teacher's `ReplError`: small enums implementing
//! `std::error::Error` and `Display` by hand, composed with manual `From`
//! impls rather than a derive-macro crate, so each stage's failure mode stays
//! distinct instead of collapsing into one stringly-typed error.
use std::fmt;

use crate::location::Span;

/// A semantic error raised while lowering an AST into ASR (§4.2).
#[derive(Debug, Clone)]
pub struct SemanticError {
    pub message: String,
    pub span: Span,
    pub secondary: Option<Span>,
}

impl SemanticError {
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            secondary: None,
        }
    }

    #[must_use]
    pub fn with_secondary(mut self, span: Span) -> Self {
        self.secondary = Some(span);
        self
    }
}

impl fmt::Display for SemanticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "semantic error: {}", self.message)
    }
}
impl std::error::Error for SemanticError {}

/// The verifier found a violated structural invariant (§4.4). Always a
/// compiler bug, never a user-facing mistake.
#[derive(Debug, Clone)]
pub struct VerifyError {
    pub reason: String,
}

impl VerifyError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ASR verify failed: {}", self.reason)
    }
}
impl std::error::Error for VerifyError {}

/// Failure while reading or writing the module-file byte format (§4.5).
#[derive(Debug, Clone)]
pub enum SerializeError {
    /// The header's magic bytes didn't match.
    BadMagic,
    /// The payload was produced by a newer/incompatible producer version.
    VersionMismatch { found: u32, supported: u32 },
    /// The byte stream ended before a node's fields were fully read.
    UnexpectedEof,
    /// A variant tag byte didn't correspond to any known node kind.
    UnknownTag(u8),
    /// `fix-external-symbols` could not resolve a name after load.
    UnresolvedExternal { module: String, name: String },
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadMagic => write!(f, "module file has an invalid header magic"),
            Self::VersionMismatch { found, supported } => {
                write!(f, "module file producer version {found} is incompatible with supported version {supported}")
            }
            Self::UnexpectedEof => write!(f, "module file ended unexpectedly"),
            Self::UnknownTag(tag) => write!(f, "unknown node tag {tag}"),
            Self::UnresolvedExternal { module, name } => {
                write!(f, "could not resolve external symbol `{name}` in module `{module}`")
            }
        }
    }
}
impl std::error::Error for SerializeError {}

/// Unhandled AST or ASR variant reached a place that should be exhaustive.
/// Always a compiler bug (§7).
#[derive(Debug, Clone)]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error (not implemented): {}", self.message)
    }
}
impl std::error::Error for InternalError {}

/// Top-level error aggregating every stage the core can fail at.
#[derive(Debug, Clone)]
pub enum CoreError {
    Semantic(SemanticError),
    Verify(VerifyError),
    Serialize(SerializeError),
    Internal(InternalError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic(e) => write!(f, "{e}"),
            Self::Verify(e) => write!(f, "{e}"),
            Self::Serialize(e) => write!(f, "{e}"),
            Self::Internal(e) => write!(f, "{e}"),
        }
    }
}
impl std::error::Error for CoreError {}

impl From<SemanticError> for CoreError {
    fn from(error: SemanticError) -> Self {
        Self::Semantic(error)
    }
}
impl From<VerifyError> for CoreError {
    fn from(error: VerifyError) -> Self {
        Self::Verify(error)
    }
}
impl From<SerializeError> for CoreError {
    fn from(error: SerializeError) -> Self {
        Self::Serialize(error)
    }
}
impl From<InternalError> for CoreError {
    fn from(error: InternalError) -> Self {
        Self::Internal(error)
    }
}
