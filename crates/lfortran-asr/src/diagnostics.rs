//! Diagnostic shapes shared by every fallible stage (§7).
use crate::location::Span;

/// Severity of a single diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Warning,
    Note,
    Help,
    Style,
}

/// Compiler stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CPreprocessor,
    Prescanner,
    Tokenizer,
    Parser,
    Semantic,
    AsrPass,
    CodeGen,
}

/// Whether a label points at the primary offending span or adds context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Primary,
    Secondary,
}

/// One annotated span attached to a [`Diagnostic`].
#[derive(Debug, Clone)]
pub struct Label {
    pub kind: LabelKind,
    pub message: Option<String>,
    pub spans: Vec<(String, Span)>,
}

impl Label {
    #[must_use]
    pub fn primary(file: impl Into<String>, span: Span) -> Self {
        Self {
            kind: LabelKind::Primary,
            message: None,
            spans: vec![(file.into(), span)],
        }
    }

    #[must_use]
    pub fn secondary(file: impl Into<String>, span: Span) -> Self {
        Self {
            kind: LabelKind::Secondary,
            message: None,
            spans: vec![(file.into(), span)],
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A single user-visible diagnostic (§7).
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub stage: Stage,
    pub message: String,
    pub labels: Vec<Label>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(level: Level, stage: Stage, message: impl Into<String>) -> Self {
        Self {
            level,
            stage,
            message: message.into(),
            labels: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }
}

/// Accumulates warnings/notes/style diagnostics for one compilation.
///
/// Per §7, accumulation only ever happens for non-fatal diagnostics: the
/// first `Error`-level diagnostic is always returned immediately as a
/// `Result::Err` by the stage that raised it, never pushed here.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        debug_assert!(
            diagnostic.level != Level::Error,
            "fatal diagnostics must be returned as Err, not accumulated"
        );
        self.diagnostics.push(diagnostic);
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
