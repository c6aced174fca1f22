//! The kernel façade (spec component C8) and its process-wide identity map.
//!
//! A `Kernel` binds a [`PluginRegistry`], the hook spec table owned by its
//! [`Dispatcher`], a [`Diagnostics`] sink, and a [`KernelConfig`] into one
//! embeddable handle. Two calls to [`kernel`] with the same name return the
//! same `Arc`, mirroring the teacher's process-wide provider registries
//! (`aisopod_plugin::registry` is itself a single `OnceLock`-backed table)
//! but keyed by name instead of being a singleton.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde_json::Value;

use crate::args::Args;
use crate::config::KernelConfig;
use crate::diagnostics::{DiagnosticsHandle, TracingDiagnostics};
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;
use crate::plugin::{resolve_name, PluginRecord, PluginSummary};
use crate::registry::{PluginRegistry, PluginSource, ScopedGuard, ScopedSpec};
use crate::spec::HookSpec;

/// An embeddable hook dispatch kernel: one spec table, one plugin registry,
/// one dispatcher, scoped by name.
pub struct Kernel {
    name: String,
    registry: Arc<PluginRegistry>,
    dispatcher: Dispatcher,
    #[allow(dead_code)]
    config: KernelConfig,
}

impl Kernel {
    fn new(name: String, config: KernelConfig, diagnostics: DiagnosticsHandle) -> Self {
        let registry = Arc::new(PluginRegistry::new());
        let dispatcher = Dispatcher::with_diagnostics(
            registry.clone(),
            diagnostics,
            config.warn_on_missing_target,
        );
        Self {
            name,
            registry,
            dispatcher,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a hook's contract. A second call under the same name fails
    /// (spec.md §4.6); impls attached before this call have their
    /// signatures checked here instead of at attach time.
    pub fn register_spec(&self, spec: HookSpec) -> Result<(), DispatchError> {
        self.dispatcher.register_spec(spec)?;
        Ok(())
    }

    pub fn has_spec(&self, name: &str) -> bool {
        self.dispatcher.has_spec(name)
    }

    /// Register a batch of plugins. Each impl is checked against any
    /// already-declared spec before anything is written to the registry,
    /// so a signature mismatch never leaves a partially registered batch
    /// (spec.md §4.1/§7's "as early as possible").
    pub fn register_plugins(&self, records: Vec<Arc<PluginRecord>>) -> Result<(), DispatchError> {
        self.check_signatures(&records)?;
        self.registry.register(records)?;
        Ok(())
    }

    /// Register a batch discovered through a [`PluginSource`].
    pub fn register_from(
        &self,
        source: &dyn PluginSource,
        group: &str,
        only: Option<&[&str]>,
    ) -> Result<(), DispatchError> {
        let entries = source.entries(group);
        let records: Vec<Arc<PluginRecord>> = entries
            .into_iter()
            .filter(|(name, _)| only.map_or(true, |allow| allow.contains(&name.as_str())))
            .map(|(_, record)| record)
            .collect();
        self.check_signatures(&records)?;
        self.registry.register_from(source, group, only)?;
        Ok(())
    }

    fn check_signatures(&self, records: &[Arc<PluginRecord>]) -> Result<(), DispatchError> {
        for record in records {
            let plugin_name = resolve_name(&record.name_sources).unwrap_or_else(|| "<unresolved>".to_string());
            for imp in &record.impls {
                self.dispatcher
                    .validate_impl_if_spec_known(&imp.hook_name, &plugin_name, &imp.signature)?;
            }
        }
        Ok(())
    }

    pub fn enable(&self, name: &str) -> Result<(), DispatchError> {
        self.registry.enable(name)?;
        Ok(())
    }

    pub fn disable(&self, name: &str) -> Result<(), DispatchError> {
        self.registry.disable(name)?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<PluginSummary> {
        self.registry.get(name)
    }

    pub fn list_all(&self) -> Vec<PluginSummary> {
        self.registry.list_all()
    }

    pub fn list_enabled(&self) -> Vec<PluginSummary> {
        self.registry.list_enabled()
    }

    pub fn scoped(&self, spec: ScopedSpec) -> Result<ScopedGuard<'_>, DispatchError> {
        Ok(self.registry.scoped(spec)?)
    }

    /// Dispatch a hook declared with [`crate::impl_wrapper::Mode::Sync`].
    /// Async impls bound to it are bridged through a kernel-owned runtime.
    pub fn call_sync(&self, hook_name: &str, args: Args) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch_sync(hook_name, args)
    }

    /// Dispatch a hook declared with [`crate::impl_wrapper::Mode::Async`].
    pub async fn call_async(&self, hook_name: &str, args: Args) -> Result<Value, DispatchError> {
        self.dispatcher.dispatch_async(hook_name, args).await
    }
}

fn kernel_table() -> &'static Mutex<HashMap<String, Arc<Kernel>>> {
    static TABLE: OnceLock<Mutex<HashMap<String, Arc<Kernel>>>> = OnceLock::new();
    TABLE.get_or_init(|| Mutex::new(HashMap::new()))
}

fn anonymous_counter() -> &'static AtomicU64 {
    static COUNTER: OnceLock<AtomicU64> = OnceLock::new();
    COUNTER.get_or_init(|| AtomicU64::new(0))
}

/// The process-wide identity map: `kernel("x")` always returns the same
/// `Arc<Kernel>` for the life of the process, constructing it with default
/// config and a [`TracingDiagnostics`] sink on first use (spec.md §6).
pub fn kernel(name: impl Into<String>) -> Arc<Kernel> {
    kernel_with(name, KernelConfig::default(), Arc::new(TracingDiagnostics))
}

/// Same identity guarantee as [`kernel`], but lets the host supply its own
/// config and diagnostics sink on first construction. Later calls with the
/// same name ignore these arguments and return the kernel already on file.
pub fn kernel_with(
    name: impl Into<String>,
    config: KernelConfig,
    diagnostics: DiagnosticsHandle,
) -> Arc<Kernel> {
    let name = name.into();
    let mut table = kernel_table().lock().expect("kernel identity map poisoned");
    table
        .entry(name.clone())
        .or_insert_with(|| Arc::new(Kernel::new(name, config, diagnostics)))
        .clone()
}

/// Mint a fresh kernel under an auto-generated `project-N` name, guaranteed
/// unused (spec.md §4.6's "auto-instantiate a kernel with a generated name
/// when the host doesn't care to name one").
pub fn anonymous_kernel() -> Arc<Kernel> {
    let n = anonymous_counter().fetch_add(1, Ordering::SeqCst);
    kernel(format!("project-{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_returns_the_same_kernel() {
        let a = kernel("identity-test-a");
        let b = kernel("identity-test-a");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_names_return_distinct_kernels() {
        let a = kernel("identity-test-b");
        let b = kernel("identity-test-c");
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn anonymous_kernels_never_collide() {
        let a = anonymous_kernel();
        let b = anonymous_kernel();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.name(), b.name());
    }
}
