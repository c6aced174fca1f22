//! Cross-module scenarios from the kernel's testable-properties list:
//! ordering, priority, short-circuiting, required hooks, scoped restore,
//! async/sync bridging, and SINGLE routing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hookkern::{
    kernel_with, Args, Diagnostics, DiagnosticKind, HookSpec, KernelConfig, Mode, NamedStrategy,
    PluginBuilder, ScopedSpec, Signature, Strategy, ROUTING_KEY,
};
use serde_json::{json, Value};

#[derive(Default)]
struct RecordingDiagnostics {
    kinds: std::sync::Mutex<Vec<DiagnosticKind>>,
}

impl Diagnostics for RecordingDiagnostics {
    fn emit(&self, kind: DiagnosticKind, _message: &str, _context: &Value) {
        self.kinds.lock().unwrap().push(kind);
    }
}

fn fresh_kernel(name: &str) -> (Arc<hookkern::Kernel>, Arc<RecordingDiagnostics>) {
    let diagnostics = Arc::new(RecordingDiagnostics::default());
    let kernel = kernel_with(name, KernelConfig::default(), diagnostics.clone());
    (kernel, diagnostics)
}

fn empty_sig() -> Signature {
    Signature::new(Vec::<String>::new())
}

// S1 — order preservation: A then B, default priority, ALL.
#[test]
fn s1_order_preservation() {
    let (kernel, _diag) = fresh_kernel("s1-order-preservation");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::All),
        ))
        .unwrap();

    let a = PluginBuilder::new("A")
        .impl_sync("h", empty_sig(), |_| Ok(json!("A_result")))
        .build();
    let b = PluginBuilder::new("B")
        .impl_sync("h", empty_sig(), |_| Ok(json!("B_result")))
        .build();
    kernel.register_plugins(vec![Arc::new(a), Arc::new(b)]).unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, json!(["A_result", "B_result"]));
}

// S2 — negative priority overrides the default-priority plugin.
#[test]
fn s2_negative_priority_overrides() {
    let (kernel, _diag) = fresh_kernel("s2-negative-priority");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::All),
        ))
        .unwrap();

    let default_p = PluginBuilder::new("DefaultP")
        .priority(0)
        .impl_sync("h", empty_sig(), |_| Ok(json!("Default")))
        .build();
    let override_p = PluginBuilder::new("OverrideP")
        .priority(-1)
        .impl_sync("h", empty_sig(), |_| Ok(json!("Override")))
        .build();
    kernel
        .register_plugins(vec![Arc::new(default_p), Arc::new(override_p)])
        .unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, json!(["Override", "Default"]));
}

// S3 — FIRST_AVAIL stops at the first non-null result.
#[test]
fn s3_first_avail_short_circuits() {
    let (kernel, _diag) = fresh_kernel("s3-first-avail");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::FirstAvail),
        ))
        .unwrap();

    let third_ran = Arc::new(AtomicUsize::new(0));
    let third_ran_clone = third_ran.clone();

    let p1 = PluginBuilder::new("p1")
        .impl_sync("h", empty_sig(), |_| Ok(Value::Null))
        .build();
    let p2 = PluginBuilder::new("p2")
        .impl_sync("h", empty_sig(), |_| Ok(json!("ok")))
        .build();
    let p3 = PluginBuilder::new("p3")
        .impl_sync("h", empty_sig(), move |_| {
            third_ran_clone.fetch_add(1, Ordering::SeqCst);
            Ok(json!("shouldntrun"))
        })
        .build();
    kernel
        .register_plugins(vec![Arc::new(p1), Arc::new(p2), Arc::new(p3)])
        .unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, json!("ok"));
    assert_eq!(third_ran.load(Ordering::SeqCst), 0);
}

// S3b — FIRST_AVAIL with every impl returning null has no available
// result: it must error, not resolve to the null it walked past.
#[test]
fn s3b_first_avail_errors_when_nothing_is_available() {
    let (kernel, _diag) = fresh_kernel("s3b-first-avail-all-null");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::FirstAvail),
        ))
        .unwrap();

    let p1 = PluginBuilder::new("p1")
        .impl_sync("h", empty_sig(), |_| Ok(Value::Null))
        .build();
    kernel.register_plugins(vec![Arc::new(p1)]).unwrap();

    let err = kernel.call_sync("h", Args::new()).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::ResultUnavailable(_)));
}

// S3c — TRY_FIRST_AVAIL softens the same all-null case to `null`.
#[test]
fn s3c_try_first_avail_softens_all_null_to_null() {
    let (kernel, _diag) = fresh_kernel("s3c-try-first-avail-all-null");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::TryFirstAvail),
        ))
        .unwrap();

    let p1 = PluginBuilder::new("p1")
        .impl_sync("h", empty_sig(), |_| Ok(Value::Null))
        .build();
    kernel.register_plugins(vec![Arc::new(p1)]).unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, Value::Null);
}

// S3d — LAST_AVAIL with every impl returning null also errors rather than
// resolving to the last-visited null.
#[test]
fn s3d_last_avail_errors_when_nothing_is_available() {
    let (kernel, _diag) = fresh_kernel("s3d-last-avail-all-null");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::LastAvail),
        ))
        .unwrap();

    let p1 = PluginBuilder::new("p1")
        .impl_sync("h", empty_sig(), |_| Ok(Value::Null))
        .build();
    let p2 = PluginBuilder::new("p2")
        .impl_sync("h", empty_sig(), |_| Ok(Value::Null))
        .build();
    kernel.register_plugins(vec![Arc::new(p1), Arc::new(p2)]).unwrap();

    let err = kernel.call_sync("h", Args::new()).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::ResultUnavailable(_)));
}

// S4 — a required hook with no impls fails every dispatch.
#[test]
fn s4_required_hook_fails_without_impls() {
    let (kernel, _diag) = fresh_kernel("s4-required-hook");
    kernel
        .register_spec(
            HookSpec::new(
                "h",
                empty_sig(),
                Mode::Sync,
                Strategy::named(NamedStrategy::All),
            )
            .required(true),
        )
        .unwrap();

    let err = kernel.call_sync("h", Args::new()).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::HookRequired(_)));
}

// S5 — a scoped context restores enabled state even when entering it fails.
#[test]
fn s5_scoped_context_restores_on_failure() {
    let (kernel, _diag) = fresh_kernel("s5-scoped-restore");
    for name in ["A", "B", "C"] {
        kernel
            .register_plugins(vec![Arc::new(PluginBuilder::new(name).build())])
            .unwrap();
    }

    let before: std::collections::HashSet<String> =
        kernel.list_enabled().into_iter().map(|s| s.name).collect();

    let spec = ScopedSpec::parse(&["-A", "+never"]).unwrap();
    let guard = kernel.scoped(spec);
    assert!(guard.is_err());

    let after: std::collections::HashSet<String> =
        kernel.list_enabled().into_iter().map(|s| s.name).collect();
    assert_eq!(before, after);
}

// S6 — an async spec dispatching one async and one sync impl, with a
// diagnostic emitted exactly once for the sync impl.
#[tokio::test]
async fn s6_async_over_sync() {
    let (kernel, diagnostics) = fresh_kernel("s6-async-over-sync");
    kernel
        .register_spec(
            HookSpec::new(
                "h",
                empty_sig(),
                Mode::Async,
                Strategy::named(NamedStrategy::All),
            )
            .warn_sync_impl_on_async(true),
        )
        .unwrap();

    let async_plugin = PluginBuilder::new("async-one")
        .impl_async("h", empty_sig(), |_| {
            Box::pin(async { Ok(json!(1)) })
        })
        .build();
    let sync_plugin = PluginBuilder::new("sync-two")
        .impl_sync("h", empty_sig(), |_| Ok(json!(2)));
    kernel
        .register_plugins(vec![Arc::new(async_plugin), Arc::new(sync_plugin.build())])
        .unwrap();

    let result = kernel.call_async("h", Args::new()).await.unwrap();
    assert_eq!(result, json!([1, 2]));
    assert_eq!(
        diagnostics.kinds.lock().unwrap().iter().filter(|k| **k == DiagnosticKind::SyncImplOnAsyncSpec).count(),
        1
    );
}

// S7 — SINGLE routes to the named plugin, or falls back to the last impl
// with a diagnostic when no routing key is supplied.
#[test]
fn s7_single_routing() {
    let (kernel, diagnostics) = fresh_kernel("s7-single-routing");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::Single),
        ))
        .unwrap();

    for name in ["A", "B", "C"] {
        let builder = PluginBuilder::new(name).impl_sync(
            "h",
            empty_sig(),
            move |_| Ok(json!(name)),
        );
        kernel.register_plugins(vec![Arc::new(builder.build())]).unwrap();
    }

    let targeted = kernel
        .call_sync("h", Args::new().with_keyword(ROUTING_KEY, "B"))
        .unwrap();
    assert_eq!(targeted, json!("B"));

    let fallback = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(fallback, json!("C"));
    assert_eq!(
        diagnostics
            .kinds
            .lock()
            .unwrap()
            .iter()
            .filter(|k| **k == DiagnosticKind::SingleWithoutTarget)
            .count(),
        1
    );
}

// Invariant 3: kernel identity is stable per name.
#[test]
fn kernel_identity_is_stable_per_name() {
    let a = hookkern::kernel("integration-identity-test");
    let b = hookkern::kernel("integration-identity-test");
    assert!(Arc::ptr_eq(&a, &b));
}

// Invariant 5: an impl declared before its spec is inert until the spec
// is registered.
#[test]
fn impl_is_inert_without_a_spec() {
    let (kernel, _diag) = fresh_kernel("impl-inert-without-spec");
    let plugin = PluginBuilder::new("early")
        .impl_sync("h", empty_sig(), |_| Ok(json!("late")))
        .build();
    kernel.register_plugins(vec![Arc::new(plugin)]).unwrap();

    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::All),
        ))
        .unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, json!(["late"]));
}

// Law: TRY_S on an empty outcome is null; S on the same dispatch errors.
#[test]
fn try_prefix_softens_empty_outcome() {
    let (kernel, _diag) = fresh_kernel("try-prefix-softens-empty");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::TryFirst),
        ))
        .unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, Value::Null);
}

#[test]
fn base_strategy_errors_on_empty_outcome() {
    let (kernel, _diag) = fresh_kernel("base-strategy-errors-on-empty");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::First),
        ))
        .unwrap();

    let err = kernel.call_sync("h", Args::new()).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::ResultUnavailable(_)));
}

// Receiver erasure: a spec declaring a receiver delivers null in that slot
// regardless of whether the impl spells the receiver out.
#[test]
fn receiver_is_erased_for_every_impl_form() {
    let (kernel, _diag) = fresh_kernel("receiver-erasure");
    kernel
        .register_spec(HookSpec::new(
            "h",
            Signature::with_receiver(["self"]),
            Mode::Sync,
            Strategy::named(NamedStrategy::All),
        ))
        .unwrap();

    let with_receiver = PluginBuilder::new("with-receiver")
        .impl_sync("h", Signature::with_receiver(["plugin"]), |args| {
            Ok(json!(args.positional.first().cloned().unwrap_or(Value::Null).is_null()))
        })
        .build();
    let without_receiver = PluginBuilder::new("without-receiver")
        .impl_sync("h", empty_sig(), |args| {
            Ok(json!(args.positional.first().cloned().unwrap_or(Value::Null).is_null()))
        })
        .build();
    kernel
        .register_plugins(vec![Arc::new(with_receiver), Arc::new(without_receiver)])
        .unwrap();

    let result = kernel.call_sync("h", Args::new()).unwrap();
    assert_eq!(result, json!([true, true]));
}

// A signature mismatch between a spec and an impl aborts dispatch.
#[test]
fn signature_mismatch_is_fatal_at_dispatch() {
    let (kernel, _diag) = fresh_kernel("signature-mismatch-fatal");
    kernel
        .register_spec(HookSpec::new(
            "h",
            Signature::new(["a", "b"]),
            Mode::Sync,
            Strategy::named(NamedStrategy::All),
        ))
        .unwrap();

    let mismatched = PluginBuilder::new("mismatched")
        .impl_sync("h", Signature::new(["a", "c"]), |_| Ok(Value::Null))
        .build();
    // The spec is already known, so the mismatch is caught at attach time.
    let err = kernel.register_plugins(vec![Arc::new(mismatched)]).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::Spec(_)));
}

// An impl failure aborts the dispatch immediately and is never softened by
// a TRY_ strategy.
#[test]
fn impl_failure_is_never_absorbed_by_try_strategies() {
    let (kernel, _diag) = fresh_kernel("impl-failure-not-absorbed");
    kernel
        .register_spec(HookSpec::new(
            "h",
            empty_sig(),
            Mode::Sync,
            Strategy::named(NamedStrategy::TryAllFirst),
        ))
        .unwrap();

    let failing = PluginBuilder::new("failing")
        .impl_sync("h", empty_sig(), |_| {
            Err("boom".into())
        })
        .build();
    kernel.register_plugins(vec![Arc::new(failing)]).unwrap();

    let err = kernel.call_sync("h", Args::new()).unwrap_err();
    assert!(matches!(err, hookkern::DispatchError::ImplFailure { .. }));
}
