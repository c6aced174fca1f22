//! Plugin registry (spec component C4).
//!
//! Stores resolved [`PluginWrapper`]s keyed by name, in insertion order, the
//! same `HashMap` + `Vec<String>` load-order pairing the teacher's
//! `aisopod_plugin::registry::PluginRegistry` uses, plus the batch/priority
//! bookkeeping spec.md §3/§4.5 require on top of it.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::error::RegistryError;
use crate::plugin::{resolve_name, PluginRecord, PluginSummary, PluginWrapper, PriorityKey};

/// Package-ecosystem discovery, abstracted away (spec.md §1/§6). Yields
/// `(entry_name, record)` pairs for a given discovery group; the loader
/// itself (entrypoints, `.so` scanning, …) is an external collaborator.
pub trait PluginSource: Send + Sync {
    fn entries(&self, group: &str) -> Vec<(String, Arc<PluginRecord>)>;
}

/// How `scoped()` should mutate the enabled set for its duration
/// (spec.md §4.4).
#[derive(Debug, Clone)]
pub enum ScopedSpec {
    /// No change.
    Unchanged,
    /// Only these names are enabled; everything else is disabled.
    OnlyThese(Vec<String>),
    /// Start from the current enabled state and apply `+name`/`-name`
    /// adds and removes.
    Patch(Vec<PatchEntry>),
}

#[derive(Debug, Clone)]
pub enum PatchEntry {
    Enable(String),
    Disable(String),
}

impl ScopedSpec {
    /// Parse a slice of bare or `+`/`-` prefixed names. Mixing bare and
    /// prefixed items in the same sequence is rejected (spec.md §4.4).
    pub fn parse(items: &[&str]) -> Result<ScopedSpec, RegistryError> {
        if items.is_empty() {
            return Ok(ScopedSpec::Unchanged);
        }
        let prefixed = items.iter().any(|s| s.starts_with('+') || s.starts_with('-'));
        let bare = items.iter().any(|s| !s.starts_with('+') && !s.starts_with('-'));
        if prefixed && bare {
            return Err(RegistryError::MixedScopedSpec);
        }
        if bare {
            return Ok(ScopedSpec::OnlyThese(items.iter().map(|s| s.to_string()).collect()));
        }
        let patch = items
            .iter()
            .map(|s| {
                if let Some(name) = s.strip_prefix('+') {
                    PatchEntry::Enable(name.to_string())
                } else {
                    PatchEntry::Disable(s.strip_prefix('-').unwrap_or(s).to_string())
                }
            })
            .collect();
        Ok(ScopedSpec::Patch(patch))
    }
}

struct Inner {
    plugins: HashMap<String, PluginWrapper>,
    order: Vec<String>,
    batch_counter: u64,
}

/// An insertion-ordered collection of registered plugins.
pub struct PluginRegistry {
    inner: RwLock<Inner>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                plugins: HashMap::new(),
                order: Vec::new(),
                batch_counter: 0,
            }),
        }
    }

    /// Register a batch of plugins. All records in one call share a single
    /// `batch_index`; their registration order within the call is preserved
    /// via a `sub_index` that only matters when two plugins end up with the
    /// same declared priority (spec.md §3/§4.5).
    pub fn register(&self, records: Vec<Arc<PluginRecord>>) -> Result<(), RegistryError> {
        self.register_impl(records.into_iter().map(|r| (None, r)).collect())
    }

    /// Register a batch sourced from a [`PluginSource`]: each entry's
    /// discovered name dominates every other name source (spec.md §4.4).
    pub fn register_from(
        &self,
        source: &dyn PluginSource,
        group: &str,
        only: Option<&[&str]>,
    ) -> Result<(), RegistryError> {
        let entries = source.entries(group);
        let filtered: Vec<(Option<String>, Arc<PluginRecord>)> = entries
            .into_iter()
            .filter(|(name, _)| only.map_or(true, |allow| allow.contains(&name.as_str())))
            .map(|(name, record)| (Some(name), record))
            .collect();
        self.register_impl(filtered)
    }

    fn register_impl(&self, records: Vec<(Option<String>, Arc<PluginRecord>)>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write().expect("registry lock poisoned");
        let batch_index = inner.batch_counter;
        inner.batch_counter += 1;

        for (sub_index, (name_override, record)) in records.into_iter().enumerate() {
            let identity = Arc::as_ptr(&record) as usize;
            let name = name_override
                .or_else(|| resolve_name(&record.name_sources))
                .unwrap_or_else(|| format!("plugin-{batch_index}-{sub_index}"));

            if let Some(existing) = inner.plugins.get(&name) {
                if existing.identity == identity {
                    debug!(plugin = %name, "re-registering identical plugin object, no-op");
                    continue;
                }
                return Err(RegistryError::DuplicatePluginName(name));
            }

            let declared_priority = record.priority.unwrap_or(batch_index as i64);
            let wrapper = PluginWrapper {
                name: name.clone(),
                enabled: AtomicBool::new(true),
                priority_key: PriorityKey {
                    declared_priority,
                    batch_index,
                    sub_index: sub_index as u64,
                },
                version: record.version.clone(),
                impls: record
                    .impls
                    .iter()
                    .cloned()
                    .map(|mut imp| {
                        imp.origin_plugin_name = name.clone();
                        (imp.hook_name.clone(), imp)
                    })
                    .collect(),
                identity,
            };

            info!(plugin = %name, priority = declared_priority, batch = batch_index, "plugin registered");
            inner.order.push(name.clone());
            inner.plugins.insert(name, wrapper);
        }

        Ok(())
    }

    pub fn enable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, true)
    }

    pub fn disable(&self, name: &str) -> Result<(), RegistryError> {
        self.set_enabled(name, false)
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<(), RegistryError> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let wrapper = inner
            .plugins
            .get(name)
            .ok_or_else(|| RegistryError::NoSuchPlugin(name.to_string()))?;
        wrapper.set_enabled(enabled);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<PluginSummary> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner.plugins.get(name).map(PluginSummary::from)
    }

    /// All registered plugins, sorted by canonical priority order
    /// (spec.md §4.5), regardless of enabled state.
    pub fn list_all(&self) -> Vec<PluginSummary> {
        self.list_filtered(|_| true)
    }

    /// Only the enabled plugins, in canonical priority order.
    pub fn list_enabled(&self) -> Vec<PluginSummary> {
        self.list_filtered(|w| w.enabled())
    }

    fn list_filtered(&self, pred: impl Fn(&PluginWrapper) -> bool) -> Vec<PluginSummary> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut summaries: Vec<PluginSummary> = inner
            .order
            .iter()
            .filter_map(|name| inner.plugins.get(name))
            .filter(|w| pred(w))
            .map(PluginSummary::from)
            .collect();
        summaries.sort_by_key(|s| s.priority_key);
        summaries
    }

    /// The canonical execution order for a hook (spec.md §4.5): enabled
    /// plugins carrying an impl of `hook_name`, ascending by priority key.
    pub(crate) fn ordered_impls_for(&self, hook_name: &str) -> Vec<(String, crate::impl_wrapper::ImplWrapper, PriorityKey)> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut found: Vec<(String, crate::impl_wrapper::ImplWrapper, PriorityKey)> = inner
            .order
            .iter()
            .filter_map(|name| inner.plugins.get(name))
            .filter(|w| w.enabled())
            .filter_map(|w| w.impl_for(hook_name).map(|imp| (w.name.clone(), imp.clone(), w.priority_key)))
            .collect();
        found.sort_by_key(|(_, _, key)| *key);
        found
    }

    fn enabled_names(&self) -> Vec<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        inner
            .order
            .iter()
            .filter_map(|name| inner.plugins.get(name))
            .filter(|w| w.enabled())
            .map(|w| w.name.clone())
            .collect()
    }

    /// Enter a scope that mutates enabled-state per `spec`, restoring the
    /// previous state when the returned guard drops — including on an
    /// unwind through the scope (spec.md §4.4/§5).
    pub fn scoped(&self, spec: ScopedSpec) -> Result<ScopedGuard<'_>, RegistryError> {
        let previous: std::collections::HashSet<String> = self.enabled_names().into_iter().collect();

        if let Err(err) = self.apply_scoped(&spec) {
            // Entering the scope itself failed partway through; there is no
            // guard yet to restore on drop, so undo whatever we already
            // applied before surfacing the error (spec.md §4.4 scenario S5).
            self.restore(&previous);
            return Err(err);
        }

        Ok(ScopedGuard {
            registry: self,
            previous,
        })
    }

    fn apply_scoped(&self, spec: &ScopedSpec) -> Result<(), RegistryError> {
        match spec {
            ScopedSpec::Unchanged => Ok(()),
            ScopedSpec::OnlyThese(names) => {
                let all: Vec<String> = {
                    let inner = self.inner.read().expect("registry lock poisoned");
                    inner.order.clone()
                };
                for name in &all {
                    self.set_enabled(name, names.contains(name))?;
                }
                Ok(())
            }
            ScopedSpec::Patch(entries) => {
                for entry in entries {
                    match entry {
                        PatchEntry::Enable(name) => self.enable(name)?,
                        PatchEntry::Disable(name) => self.disable(name)?,
                    }
                }
                Ok(())
            }
        }
    }

    fn restore(&self, previous: &std::collections::HashSet<String>) {
        let inner = self.inner.read().expect("registry lock poisoned");
        for name in &inner.order {
            if let Some(wrapper) = inner.plugins.get(name) {
                wrapper.set_enabled(previous.contains(name));
            }
        }
    }
}

/// RAII guard returned by [`PluginRegistry::scoped`]. Restores the
/// enabled/disabled set it captured on entry when dropped.
pub struct ScopedGuard<'a> {
    registry: &'a PluginRegistry,
    previous: std::collections::HashSet<String>,
}

impl Drop for ScopedGuard<'_> {
    fn drop(&mut self) {
        self.registry.restore(&self.previous);
    }
}
