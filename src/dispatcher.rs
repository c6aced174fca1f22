//! The dispatch engine (spec component C6).
//!
//! `Dispatcher` is the single entry point that resolves a hook spec, builds
//! the canonical call list, executes it per the hook's strategy, and bridges
//! sync/async impls against the spec's own sync/async mode (spec.md §4.7).

use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock, RwLock};

use serde_json::Value;
use tracing::debug;

use crate::args::Args;
use crate::diagnostics::{DiagnosticKind, DiagnosticsHandle, NoopDiagnostics};
use crate::error::{DispatchError, SpecError};
use crate::impl_wrapper::{ImplFn, Mode};
use crate::plugin::PriorityKey;
use crate::registry::PluginRegistry;
use crate::spec::HookSpec;
use crate::strategy::{Emptiness, PendingCall, Reduce, Scope, Strategy};

/// A single (plugin, impl) pair selected from the registry for one hook,
/// still bearing its priority key purely for debuggability.
struct Candidate {
    plugin_name: String,
    signature: crate::signature::Signature,
    callable: ImplFn,
    #[allow(dead_code)]
    priority_key: PriorityKey,
}

pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    specs: RwLock<std::collections::HashMap<String, Arc<SpecEntry>>>,
    diagnostics: DiagnosticsHandle,
    warn_on_missing_target: bool,
    /// A kernel-owned single-threaded runtime used only to bridge a
    /// synchronous caller against an async impl (spec.md §4.7/§9: "a fresh,
    /// kernel-owned cooperative runtime"). Built lazily and reused rather
    /// than spun up per call.
    bridge_runtime: OnceLock<tokio::runtime::Runtime>,
}

struct SpecEntry {
    spec: HookSpec,
    warn_emitted: std::sync::atomic::AtomicBool,
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self::with_diagnostics(registry, Arc::new(NoopDiagnostics), true)
    }

    pub fn with_diagnostics(
        registry: Arc<PluginRegistry>,
        diagnostics: DiagnosticsHandle,
        warn_on_missing_target: bool,
    ) -> Self {
        Self {
            registry,
            specs: RwLock::new(std::collections::HashMap::new()),
            diagnostics,
            warn_on_missing_target,
            bridge_runtime: OnceLock::new(),
        }
    }

    /// Register a spec exactly once; a second call under the same name
    /// fails with `DuplicateSpec` (spec.md §4.6).
    pub fn register_spec(&self, spec: HookSpec) -> Result<(), SpecError> {
        let mut specs = self.specs.write().expect("spec table lock poisoned");
        if specs.contains_key(&spec.name) {
            return Err(SpecError::DuplicateSpec(spec.name));
        }
        specs.insert(
            spec.name.clone(),
            Arc::new(SpecEntry {
                spec,
                warn_emitted: std::sync::atomic::AtomicBool::new(false),
            }),
        );
        Ok(())
    }

    pub fn has_spec(&self, name: &str) -> bool {
        self.specs.read().expect("spec table lock poisoned").contains_key(name)
    }

    /// Validate an impl's signature against an already-registered spec, if
    /// one exists. Called at plugin-registration time so mismatches surface
    /// as early as possible (spec.md §4.1/§7); returns `Ok(())` when the
    /// spec isn't known yet, deferring the check to first dispatch.
    pub(crate) fn validate_impl_if_spec_known(
        &self,
        hook_name: &str,
        plugin_name: &str,
        impl_signature: &crate::signature::Signature,
    ) -> Result<(), SpecError> {
        let specs = self.specs.read().expect("spec table lock poisoned");
        if let Some(entry) = specs.get(hook_name) {
            if !entry.spec.signature.matches(impl_signature) {
                return Err(SpecError::mismatch(
                    hook_name,
                    plugin_name,
                    &entry.spec.signature,
                    impl_signature,
                ));
            }
        }
        Ok(())
    }

    fn spec_entry(&self, hook_name: &str) -> Result<Arc<SpecEntry>, DispatchError> {
        self.specs
            .read()
            .expect("spec table lock poisoned")
            .get(hook_name)
            .cloned()
            .ok_or_else(|| DispatchError::NoSuchHookSpec(hook_name.to_string()))
    }

    fn candidates(&self, entry: &SpecEntry, mut args: Args) -> Result<(Vec<Candidate>, Option<String>, Args), DispatchError> {
        let target_plugin = args.take_routing_key();
        if entry.spec.signature.has_receiver() {
            args = args.with_erased_receiver();
        }

        let mut candidates = Vec::new();
        for (plugin_name, imp, priority_key) in self.registry.ordered_impls_for(&entry.spec.name) {
            if !entry.spec.signature.matches(&imp.signature) {
                return Err(DispatchError::Spec(SpecError::mismatch(
                    &entry.spec.name,
                    &plugin_name,
                    &entry.spec.signature,
                    &imp.signature,
                )));
            }
            if entry.spec.mode == Mode::Async
                && imp.mode() == Mode::Sync
                && entry.spec.warn_sync_impl_on_async
                && !entry.warn_emitted.swap(true, Ordering::SeqCst)
            {
                self.diagnostics.emit(
                    DiagnosticKind::SyncImplOnAsyncSpec,
                    &format!(
                        "plugin '{plugin_name}' provides a synchronous impl of async hook '{}'",
                        entry.spec.name
                    ),
                    &Value::String(plugin_name.clone()),
                );
                debug!(hook = %entry.spec.name, plugin = %plugin_name, "sync impl bound to async spec");
            }
            candidates.push(Candidate {
                plugin_name,
                signature: imp.signature.clone(),
                callable: imp.callable,
                priority_key,
            });
        }

        if entry.spec.required && candidates.is_empty() {
            return Err(DispatchError::HookRequired(entry.spec.name.clone()));
        }

        Ok((candidates, target_plugin, args))
    }

    fn select_for_scope(
        &self,
        scope: Scope,
        candidates: &[Candidate],
        target_plugin: Option<&str>,
        hook_name: &str,
    ) -> Vec<usize> {
        match scope {
            Scope::All | Scope::FirstAvail | Scope::LastAvail => {
                (0..candidates.len()).collect()
            }
            Scope::First => candidates.first().map(|_| vec![0]).unwrap_or_default(),
            Scope::Last => {
                if candidates.is_empty() {
                    Vec::new()
                } else {
                    vec![candidates.len() - 1]
                }
            }
            Scope::Single => {
                if let Some(target) = target_plugin {
                    candidates
                        .iter()
                        .position(|c| c.plugin_name == target)
                        .map(|i| vec![i])
                        .unwrap_or_default()
                } else {
                    if !candidates.is_empty() && self.warn_on_missing_target {
                        self.diagnostics.emit(
                            DiagnosticKind::SingleWithoutTarget,
                            &format!("hook '{hook_name}' dispatched with SINGLE and no routing key"),
                            &Value::Null,
                        );
                    }
                    if candidates.is_empty() {
                        Vec::new()
                    } else {
                        vec![candidates.len() - 1]
                    }
                }
            }
        }
    }

    // ---- synchronous entry point -----------------------------------

    pub fn dispatch_sync(&self, hook_name: &str, args: Args) -> Result<Value, DispatchError> {
        let entry = self.spec_entry(hook_name)?;
        let (candidates, target_plugin, args) = self.candidates(&entry, args)?;

        let named = match entry.spec.strategy.clone() {
            Strategy::Named(n) => n,
            Strategy::UserSync(reducer) => {
                let pending = self.build_pending(&candidates, &args);
                return reducer_for_sync(&reducer, pending);
            }
            Strategy::UserAsync(reducer) => {
                let pending = self.build_pending(&candidates, &args);
                let fut = reducer(pending);
                return self.block_on(fut);
            }
        };
        let (scope, reduce, emptiness) = named.axes();
        let indices = self.select_for_scope(scope, &candidates, target_plugin.as_deref(), hook_name);

        let outcomes = match scope {
            Scope::FirstAvail => self.run_until_avail_sync(hook_name, &candidates, &indices, &args, true)?,
            Scope::LastAvail => self.run_until_avail_sync(hook_name, &candidates, &indices, &args, false)?,
            _ => self.run_all_sync(hook_name, &candidates, &indices, &args)?,
        };

        reduce_outcomes(hook_name, outcomes, reduce, emptiness)
    }

    fn run_all_sync(
        &self,
        hook_name: &str,
        candidates: &[Candidate],
        indices: &[usize],
        args: &Args,
    ) -> Result<Vec<(String, Value)>, DispatchError> {
        let mut outcomes = Vec::with_capacity(indices.len());
        for &i in indices {
            let c = &candidates[i];
            let value = self.invoke_sync(hook_name, c, args)?;
            outcomes.push((c.plugin_name.clone(), value));
        }
        Ok(outcomes)
    }

    fn run_until_avail_sync(
        &self,
        hook_name: &str,
        candidates: &[Candidate],
        indices: &[usize],
        args: &Args,
        front_to_back: bool,
    ) -> Result<Vec<(String, Value)>, DispatchError> {
        let mut order: Vec<usize> = indices.to_vec();
        if !front_to_back {
            order.reverse();
        }
        let mut outcomes = Vec::new();
        for i in order {
            let c = &candidates[i];
            let value = self.invoke_sync(hook_name, c, args)?;
            let is_avail = !value.is_null();
            outcomes.push((c.plugin_name.clone(), value));
            if is_avail {
                break;
            }
        }
        Ok(outcomes)
    }

    fn invoke_sync(&self, hook_name: &str, c: &Candidate, args: &Args) -> Result<Value, DispatchError> {
        match &c.callable {
            ImplFn::Sync(f) => {
                f(args).map_err(|e| DispatchError::impl_failure(&c.plugin_name, hook_name, e))
            }
            ImplFn::Async(f) => {
                let fut = f(args.clone());
                self.block_on(fut)
                    .map_err(|e| DispatchError::impl_failure(&c.plugin_name, hook_name, e))
            }
        }
    }

    fn block_on<T>(&self, fut: impl std::future::Future<Output = T>) -> T {
        let runtime = self.bridge_runtime.get_or_init(|| {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .expect("failed to build kernel-owned bridge runtime")
        });
        runtime.block_on(fut)
    }

    fn build_pending(&self, candidates: &[Candidate], args: &Args) -> Vec<PendingCall> {
        candidates
            .iter()
            .map(|c| PendingCall {
                plugin_name: c.plugin_name.clone(),
                signature: c.signature.clone(),
                callable: c.callable.clone(),
                args: args.clone(),
            })
            .collect()
    }

    // ---- asynchronous entry point ------------------------------------

    pub async fn dispatch_async(&self, hook_name: &str, args: Args) -> Result<Value, DispatchError> {
        let entry = self.spec_entry(hook_name)?;
        let (candidates, target_plugin, args) = self.candidates(&entry, args)?;

        let named = match &entry.spec.strategy {
            Strategy::Named(n) => *n,
            Strategy::UserAsync(reducer) => {
                let pending = self.build_pending(&candidates, &args);
                return reducer(pending).await;
            }
            Strategy::UserSync(reducer) => {
                let pending = self.build_pending(&candidates, &args);
                return reducer(pending);
            }
        };
        let (scope, reduce, emptiness) = named.axes();
        let indices = self.select_for_scope(scope, &candidates, target_plugin.as_deref(), hook_name);

        let outcomes = match scope {
            Scope::FirstAvail => {
                self.run_until_avail_async(hook_name, &candidates, &indices, &args, true).await?
            }
            Scope::LastAvail => {
                self.run_until_avail_async(hook_name, &candidates, &indices, &args, false).await?
            }
            _ => self.run_all_async(hook_name, &candidates, &indices, &args).await?,
        };

        reduce_outcomes(hook_name, outcomes, reduce, emptiness)
    }

    async fn run_all_async(
        &self,
        hook_name: &str,
        candidates: &[Candidate],
        indices: &[usize],
        args: &Args,
    ) -> Result<Vec<(String, Value)>, DispatchError> {
        let mut outcomes = Vec::with_capacity(indices.len());
        for &i in indices {
            let c = &candidates[i];
            let value = self.invoke_async(hook_name, c, args).await?;
            outcomes.push((c.plugin_name.clone(), value));
        }
        Ok(outcomes)
    }

    async fn run_until_avail_async(
        &self,
        hook_name: &str,
        candidates: &[Candidate],
        indices: &[usize],
        args: &Args,
        front_to_back: bool,
    ) -> Result<Vec<(String, Value)>, DispatchError> {
        let mut order: Vec<usize> = indices.to_vec();
        if !front_to_back {
            order.reverse();
        }
        let mut outcomes = Vec::new();
        for i in order {
            let c = &candidates[i];
            let value = self.invoke_async(hook_name, c, args).await?;
            let is_avail = !value.is_null();
            outcomes.push((c.plugin_name.clone(), value));
            if is_avail {
                break;
            }
        }
        Ok(outcomes)
    }

    async fn invoke_async(&self, hook_name: &str, c: &Candidate, args: &Args) -> Result<Value, DispatchError> {
        let result = match &c.callable {
            ImplFn::Sync(f) => f(args),
            ImplFn::Async(f) => f(args.clone()).await,
        };
        result.map_err(|e| DispatchError::impl_failure(&c.plugin_name, hook_name, e))
    }
}

fn reducer_for_sync(
    reducer: &Arc<dyn Fn(Vec<PendingCall>) -> Result<Value, DispatchError> + Send + Sync>,
    pending: Vec<PendingCall>,
) -> Result<Value, DispatchError> {
    reducer(pending)
}

fn reduce_outcomes(
    hook_name: &str,
    outcomes: Vec<(String, Value)>,
    reduce: Reduce,
    emptiness: Emptiness,
) -> Result<Value, DispatchError> {
    let candidate: Option<Value> = match reduce {
        Reduce::List => {
            return Ok(Value::Array(outcomes.into_iter().map(|(_, v)| v).collect()));
        }
        Reduce::AvailsList => {
            return Ok(Value::Array(
                outcomes.into_iter().map(|(_, v)| v).filter(|v| !v.is_null()).collect(),
            ));
        }
        Reduce::Identity => outcomes.into_iter().next().map(|(_, v)| v),
        Reduce::FirstOf => outcomes.into_iter().next().map(|(_, v)| v),
        Reduce::LastOf => outcomes.into_iter().last().map(|(_, v)| v),
        Reduce::FirstAvailOf => outcomes.into_iter().map(|(_, v)| v).find(|v| !v.is_null()),
        Reduce::LastAvailOf => outcomes.into_iter().map(|(_, v)| v).rev().find(|v| !v.is_null()),
    };

    match (candidate, emptiness) {
        (Some(v), _) => Ok(v),
        (None, Emptiness::Try) => Ok(Value::Null),
        (None, Emptiness::Base) => Err(DispatchError::ResultUnavailable(hook_name.to_string())),
    }
}
