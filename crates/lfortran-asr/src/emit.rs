//! The emitter interface (§6.2): the seam between this crate and the
//! concrete code generators (LLVM-style IR, C, C++, Python, WebAssembly),
//! which are external collaborators and not implemented here.

use crate::asr::TranslationUnit;
use crate::diagnostics::DiagnosticSink;

/// A code generator consuming a fully-lowered, verified `TranslationUnit`.
///
/// A caller obtains two guarantees before calling [`Emitter::emit`]: the
/// verifier has passed on `unit`, and every lowered-away construct this
/// emitter requires gone (`requires_lowered`) has in fact been rewritten out
/// by the pass pipeline. Neither guarantee is checked here -- `emit` trusts
/// its caller the same way the rest of the core trusts lowering to have
/// already rejected ill-formed input.
pub trait Emitter {
    /// Short, stable name for diagnostics and `--emit` style flags.
    fn name(&self) -> &'static str;

    /// Whether this backend requires array-op, select-case, and do-loop
    /// lowering to already be gone from `unit` (§6.2). Backends that can
    /// themselves lower these constructs (or don't care) answer `false`.
    fn requires_lowered(&self) -> bool {
        true
    }

    /// Renders `unit` as this backend's target text.
    ///
    /// # Errors
    /// Returns the accumulated diagnostics on an unsupported construct for
    /// this backend (§7's codegen-error regime): message, location, fatal.
    fn emit(&self, unit: &TranslationUnit) -> Result<String, DiagnosticSink>;
}
