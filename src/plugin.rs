//! Plugin records and name resolution (spec component C3).
//!
//! A host never hands the kernel an arbitrary introspectable object; it
//! builds a [`PluginRecord`] describing one. The kernel turns that record
//! into an internal [`PluginWrapper`] once it has resolved a name and
//! assigned a priority key. This mirrors the design note in spec.md §9:
//! "the kernel need not mutate user objects; it can maintain its own
//! `host_object -> impl_set` association."

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::args::Args;
use crate::error::BoxError;
use crate::impl_wrapper::{ImplFn, ImplWrapper};
use crate::signature::Signature;

/// The ordered sources a name can be resolved from, cheapest-wins-first
/// (spec.md §4.3). This is the "small typed NameResolver interface" the
/// design notes ask for in place of dynamic attribute probing.
#[derive(Debug, Clone, Default)]
pub struct NameSources {
    /// `_name`: set by [`crate::registry::PluginRegistry::register_from`]
    /// when pulling entries from a [`crate::registry::PluginSource`].
    /// Always dominates, per spec.md §4.4.
    pub injected: Option<String>,
    /// `name`: the host's own declared name.
    pub declared: Option<String>,
    /// `__name__`, lowercased: a function/closure-style name.
    pub type_name: Option<String>,
    /// `__class__.__name__`, lowercased: the plugin's concrete type name.
    pub class_name: Option<String>,
}

impl NameSources {
    pub fn declared(name: impl Into<String>) -> Self {
        Self {
            declared: Some(name.into()),
            ..Default::default()
        }
    }

    /// Fallback name derived from a Rust type, standing in for
    /// `__class__.__name__` where the host has no better name to offer.
    pub fn from_type<T>() -> Self {
        Self {
            class_name: Some(std::any::type_name::<T>().to_string()),
            ..Default::default()
        }
    }
}

/// Resolve a name from its sources following spec.md §4.3's priority:
/// injected > declared > type_name > class_name (the latter two lowercased).
pub fn resolve_name(sources: &NameSources) -> Option<String> {
    sources
        .injected
        .clone()
        .or_else(|| sources.declared.clone())
        .or_else(|| sources.type_name.clone().map(|s| s.to_lowercase()))
        .or_else(|| sources.class_name.clone().map(|s| s.to_lowercase()))
}

/// A plugin as the host describes it, before the registry resolves a name
/// and assigns a priority key.
#[derive(Default)]
pub struct PluginRecord {
    pub(crate) name_sources: NameSources,
    pub(crate) priority: Option<i64>,
    pub(crate) version: Option<String>,
    pub(crate) impls: Vec<ImplWrapper>,
}

/// Fluent constructor for a [`PluginRecord`].
pub struct PluginBuilder {
    record: PluginRecord,
}

impl PluginBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: PluginRecord {
                name_sources: NameSources::declared(name),
                ..Default::default()
            },
        }
    }

    /// Build a plugin whose name falls back to a type name, the way a
    /// class registered with no `name`/`__name__` attribute would resolve
    /// to `__class__.__name__` (spec.md §4.3, priority 4).
    pub fn from_type<T>() -> Self {
        Self {
            record: PluginRecord {
                name_sources: NameSources::from_type::<T>(),
                ..Default::default()
            },
        }
    }

    /// Declared priority (`priority_key`'s first component). Negative values
    /// run before the defaults (spec.md §4.5).
    pub fn priority(mut self, priority: i64) -> Self {
        self.record.priority = Some(priority);
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.record.version = Some(version.into());
        self
    }

    pub fn impl_sync<F>(mut self, hook_name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(&Args) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.record.impls.push(ImplWrapper::new(
            hook_name,
            signature,
            ImplFn::Sync(Arc::new(f)),
        ));
        self
    }

    pub fn impl_async<F>(mut self, hook_name: impl Into<String>, signature: Signature, f: F) -> Self
    where
        F: Fn(Args) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync + 'static,
    {
        self.record.impls.push(ImplWrapper::new(
            hook_name,
            signature,
            ImplFn::Async(Arc::new(f)),
        ));
        self
    }

    pub fn build(self) -> PluginRecord {
        self.record
    }
}

/// The sortable pair (plus intra-batch tie-breaker) that determines
/// canonical execution order (spec.md §3/§4.5). Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PriorityKey {
    pub declared_priority: i64,
    pub batch_index: u64,
    pub sub_index: u64,
}

/// The kernel's internal record of a registered plugin.
#[derive(Debug)]
pub struct PluginWrapper {
    pub name: String,
    pub(crate) enabled: AtomicBool,
    pub priority_key: PriorityKey,
    pub version: Option<String>,
    pub(crate) impls: HashMap<String, ImplWrapper>,
    /// Retained so `register()` can detect same-object re-registration and
    /// treat it as a no-op (spec.md §3 invariants) rather than a collision.
    pub(crate) identity: usize,
}

impl PluginWrapper {
    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn impl_for(&self, hook_name: &str) -> Option<&ImplWrapper> {
        self.impls.get(hook_name)
    }
}

/// A read-only view of a registered plugin, returned from
/// [`crate::registry::PluginRegistry::list_all`] and friends instead of the
/// internal [`PluginWrapper`] — the same public/private split the
/// `signia-plugins` registry draws between `RegisteredPlugin` (private
/// storage) and `ResolvedPlugin` (public view).
#[derive(Debug, Clone)]
pub struct PluginSummary {
    pub name: String,
    pub enabled: bool,
    pub priority_key: PriorityKey,
    pub version: Option<String>,
    pub hook_names: Vec<String>,
}

impl From<&PluginWrapper> for PluginSummary {
    fn from(w: &PluginWrapper) -> Self {
        let mut hook_names: Vec<String> = w.impls.keys().cloned().collect();
        hook_names.sort();
        Self {
            name: w.name.clone(),
            enabled: w.enabled(),
            priority_key: w.priority_key,
            version: w.version.clone(),
            hook_names,
        }
    }
}
