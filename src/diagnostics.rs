//! Diagnostics sink (external collaborator, spec.md §6).
//!
//! Logging/warnings transport is explicitly out of scope for the kernel
//! itself; it is abstracted as a small sink trait the host supplies.
//! `hookkern` also emits `tracing` events for the same conditions so that
//! hosts who don't wire up a [`Diagnostics`] sink still get observability
//! for free, matching the teacher's `tracing::{info, warn}` convention in
//! `aisopod_plugin::registry`.

use std::sync::Arc;

use serde_json::Value;

/// The two diagnostic kinds the core emits (spec.md §6/§7). Not errors:
/// dispatch proceeds regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// An async spec received a synchronous impl and `warn_sync_impl_on_async`
    /// is enabled on the spec.
    SyncImplOnAsyncSpec,
    /// `SINGLE`/`TRY_SINGLE` ran without a routing key and fell back to the
    /// last eligible impl.
    SingleWithoutTarget,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::SyncImplOnAsyncSpec => "sync-impl-on-async-spec",
            DiagnosticKind::SingleWithoutTarget => "single-without-target",
        }
    }
}

/// Pluggable sink for non-fatal diagnostics.
pub trait Diagnostics: Send + Sync {
    fn emit(&self, kind: DiagnosticKind, message: &str, context: &Value);
}

/// Default sink: forwards to `tracing::warn!` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&self, kind: DiagnosticKind, message: &str, context: &Value) {
        tracing::warn!(kind = kind.as_str(), %context, "{message}");
    }
}

/// A sink that discards every diagnostic. Useful for tests that want to
/// assert on dispatch results without the noise.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn emit(&self, _kind: DiagnosticKind, _message: &str, _context: &Value) {}
}

pub type DiagnosticsHandle = Arc<dyn Diagnostics>;
