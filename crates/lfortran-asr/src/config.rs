//! Compilation options threaded explicitly through the driver.
//!
//! Grounded on the teacher's `ResourceLimits`: a small plain struct of
//! tunables passed by the caller, never read from global or environment
//! state (§6.4 keeps environment variables to the CLI collaborator).
use crate::serialize::Encoding;

/// Options controlling one compilation pipeline run (§4.4, §4.5).
#[derive(Debug, Clone, Copy)]
pub struct CompileOptions {
    /// Run the verifier after every pass, not just after lowering and before
    /// emission. Defaults to `cfg!(debug_assertions)`.
    pub verify_every_pass: bool,
    /// Encoding used by [`crate::serialize`] when writing a module file.
    pub encoding: Encoding,
    /// Module-name prefix that marks an `ExternalSymbol` as referring to an
    /// intrinsic module, rewritten to its short name before lookup (§4.5).
    pub intrinsic_module_prefix: &'static str,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            verify_every_pass: cfg!(debug_assertions),
            encoding: Encoding::Binary,
            intrinsic_module_prefix: "__intrinsic_",
        }
    }
}
