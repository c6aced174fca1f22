//! Error taxonomy for the hook kernel.
//!
//! One enum per the error kinds named in the specification's external
//! interface. Every variant carries enough context to identify the
//! offending hook/plugin without the caller needing to re-derive it.

use thiserror::Error;

use crate::signature::Signature;

/// Errors raised while mutating or querying a [`crate::registry::PluginRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// `enable`/`disable`/`get` referenced a name that was never registered.
    #[error("no such plugin: {0}")]
    NoSuchPlugin(String),

    /// A *different* object attempted to register under a name already in use.
    #[error("duplicate plugin name: {0}")]
    DuplicatePluginName(String),

    /// A scoped spec mixed bare names with `+`/`-` prefixed names.
    #[error("scoped() spec mixes bare and prefixed plugin names")]
    MixedScopedSpec,
}

/// Errors raised while declaring hook specs or binding impls to them.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A second spec was registered under a name already claimed.
    #[error("duplicate hook spec: {0}")]
    DuplicateSpec(String),

    /// An impl's parameter names disagree with the spec it is bound to.
    #[error(
        "signature mismatch for hook '{hook_name}' impl from plugin '{plugin_name}': expected {expected:?}, got {got:?}"
    )]
    SignatureMismatch {
        hook_name: String,
        plugin_name: String,
        expected: Vec<String>,
        got: Vec<String>,
    },
}

impl SpecError {
    pub(crate) fn mismatch(
        hook_name: &str,
        plugin_name: &str,
        expected: &Signature,
        got: &Signature,
    ) -> Self {
        SpecError::SignatureMismatch {
            hook_name: hook_name.to_string(),
            plugin_name: plugin_name.to_string(),
            expected: expected.effective_params().to_vec(),
            got: got.effective_params().to_vec(),
        }
    }
}

/// Errors raised during a single hook dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No [`crate::spec::HookSpec`] is registered under this name.
    #[error("no such hook spec: {0}")]
    NoSuchHookSpec(String),

    /// `required = true` and no enabled plugin carries an impl of this hook.
    #[error("hook '{0}' is required but no enabled plugin implements it")]
    HookRequired(String),

    /// The strategy's emptiness policy triggered and `TRY_` was not set.
    #[error("no result available for hook '{0}'")]
    ResultUnavailable(String),

    /// An impl raised while executing; dispatch aborted immediately.
    #[error("impl of hook '{hook_name}' from plugin '{plugin_name}' failed: {cause}")]
    ImplFailure {
        plugin_name: String,
        hook_name: String,
        #[source]
        cause: BoxError,
    },

    /// A declaration-time error surfaced at dispatch because the impl
    /// predates its spec (deferred signature validation, spec.md §4.1/§7).
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// The registry could not be read consistently (see [`RegistryError`]).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// A type-erased, thread-safe error cause, used for wrapping arbitrary
/// impl/reducer failures the way `anyhow::Error` does for ad hoc call sites.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl DispatchError {
    pub(crate) fn impl_failure(
        plugin_name: impl Into<String>,
        hook_name: impl Into<String>,
        cause: BoxError,
    ) -> Self {
        DispatchError::ImplFailure {
            plugin_name: plugin_name.into(),
            hook_name: hook_name.into(),
            cause,
        }
    }
}
