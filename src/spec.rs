//! Hook spec declarations (spec component C5).

use crate::impl_wrapper::Mode;
use crate::signature::Signature;
use crate::strategy::Strategy;

/// A hook spec: the host-declared contract that every impl of a given name
/// must satisfy, plus the policy for collecting their results.
///
/// Registered exactly once per [`crate::kernel::Kernel`]; a second
/// registration under the same name fails with
/// [`crate::error::SpecError::DuplicateSpec`].
pub struct HookSpec {
    pub name: String,
    pub signature: Signature,
    pub mode: Mode,
    /// If true and no enabled plugin carries an impl at dispatch time,
    /// dispatch fails with `HookRequired` regardless of strategy.
    pub required: bool,
    /// If true, the first time an async spec is called with a synchronous
    /// impl it emits a `sync-impl-on-async-spec` diagnostic.
    pub warn_sync_impl_on_async: bool,
    pub strategy: Strategy,
}

impl HookSpec {
    pub fn new(name: impl Into<String>, signature: Signature, mode: Mode, strategy: Strategy) -> Self {
        Self {
            name: name.into(),
            signature,
            mode,
            required: false,
            warn_sync_impl_on_async: false,
            strategy,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn warn_sync_impl_on_async(mut self, warn: bool) -> Self {
        self.warn_sync_impl_on_async = warn;
        self
    }
}

impl std::fmt::Debug for HookSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookSpec")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("mode", &self.mode)
            .field("required", &self.required)
            .field("warn_sync_impl_on_async", &self.warn_sync_impl_on_async)
            .finish_non_exhaustive()
    }
}
