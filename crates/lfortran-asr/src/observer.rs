//! Pluggable observation of pass execution.
//!
//! Grounded on the teacher's `VmTracer` trait (`NoopTracer`/`RecordingTracer`/
//! `StderrTracer`): a caller opts into observing execution without every
//! caller paying for instrumentation by default.
use crate::asr::SymbolId;

/// Observes the pass pipeline (§4.3) as it runs.
///
/// The default `NoopPassObserver` is zero-cost; a caller that wants
/// structured logging can implement this trait against `tracing` spans, or
/// keep a `RecordingPassObserver`-style list for tests.
pub trait PassObserver {
    /// Called once, before a named pass begins walking the translation unit.
    fn on_pass_start(&mut self, _pass_name: &'static str) {}

    /// Called each time a pass rewrites a statement or expression rooted at
    /// `owner` (the enclosing procedure/program symbol).
    fn on_rewrite(&mut self, _pass_name: &'static str, _owner: SymbolId, _description: &str) {}

    /// Called once, after a named pass has finished walking the translation
    /// unit (and, if `verify_every_pass` is set, after it has verified).
    fn on_pass_end(&mut self, _pass_name: &'static str) {}
}

/// The default, zero-cost observer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPassObserver;

impl PassObserver for NoopPassObserver {}

/// Records every event for use in tests and debugging.
#[derive(Debug, Default)]
pub struct RecordingPassObserver {
    pub events: Vec<String>,
}

impl PassObserver for RecordingPassObserver {
    fn on_pass_start(&mut self, pass_name: &'static str) {
        self.events.push(format!("start:{pass_name}"));
    }

    fn on_rewrite(&mut self, pass_name: &'static str, owner: SymbolId, description: &str) {
        self.events.push(format!("rewrite:{pass_name}:{owner:?}:{description}"));
    }

    fn on_pass_end(&mut self, pass_name: &'static str) {
        self.events.push(format!("end:{pass_name}"));
    }
}
