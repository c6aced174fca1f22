//! Impl packaging (spec component C2).
//!
//! Attachment is passive: constructing an [`ImplWrapper`] marks a callable
//! with its declared hook name and sync/async flag but does not bind it to
//! any plugin. Binding happens when the plugin record carrying it is handed
//! to [`crate::registry::PluginRegistry::register`].

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::args::Args;
use crate::error::BoxError;
use crate::signature::Signature;

/// Whether a spec or impl is synchronous or returns an awaitable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Sync,
    Async,
}

/// The callable half of an impl, either a plain function or one returning a
/// boxed future. Boxed in an `Arc` rather than `Box` because a single impl
/// may be invoked from several dispatches sharing one [`crate::plugin::PluginRecord`].
#[derive(Clone)]
pub enum ImplFn {
    Sync(Arc<dyn Fn(&Args) -> Result<Value, BoxError> + Send + Sync>),
    Async(Arc<dyn Fn(Args) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync>),
}

impl ImplFn {
    pub fn mode(&self) -> Mode {
        match self {
            ImplFn::Sync(_) => Mode::Sync,
            ImplFn::Async(_) => Mode::Async,
        }
    }
}

impl fmt::Debug for ImplFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImplFn::Sync(_) => "ImplFn::Sync(..)",
            ImplFn::Async(_) => "ImplFn::Async(..)",
        })
    }
}

/// A realization of a hook, bound to the plugin that carries it once the
/// plugin is registered.
#[derive(Debug, Clone)]
pub struct ImplWrapper {
    pub hook_name: String,
    pub signature: Signature,
    pub callable: ImplFn,
    pub origin_plugin_name: String,
}

impl ImplWrapper {
    pub(crate) fn new(hook_name: impl Into<String>, signature: Signature, callable: ImplFn) -> Self {
        Self {
            hook_name: hook_name.into(),
            signature,
            // Filled in by the registry once the owning plugin's name is
            // resolved; impl declaration happens before that's known.
            origin_plugin_name: String::new(),
            callable,
        }
    }

    pub fn mode(&self) -> Mode {
        self.callable.mode()
    }
}
