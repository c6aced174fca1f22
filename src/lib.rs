//! A host-embedded plugin dispatch kernel: named hook specs, discovered
//! plugin impls, deterministic ordering, and a library of named strategies
//! for collapsing many impls' results into one.
//!
//! A host declares a hook once as a [`spec::HookSpec`], registers any number
//! of [`plugin::PluginRecord`]s that carry [`impl_wrapper::ImplWrapper`]s for
//! it, and dispatches through a [`kernel::Kernel`]. Ordering, signature
//! compatibility, required-hook enforcement, and sync/async bridging are all
//! handled by [`dispatcher::Dispatcher`]; which impls actually run and how
//! their results combine is governed by [`strategy::Strategy`].

pub mod args;
pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod impl_wrapper;
pub mod kernel;
pub mod plugin;
pub mod registry;
pub mod signature;
pub mod spec;
pub mod strategy;

pub use args::{Args, ROUTING_KEY};
pub use config::KernelConfig;
pub use diagnostics::{Diagnostics, DiagnosticKind, DiagnosticsHandle, NoopDiagnostics, TracingDiagnostics};
pub use dispatcher::Dispatcher;
pub use error::{BoxError, DispatchError, RegistryError, SpecError};
pub use impl_wrapper::{ImplFn, ImplWrapper, Mode};
pub use kernel::{anonymous_kernel, kernel, kernel_with, Kernel};
pub use plugin::{NameSources, PluginBuilder, PluginRecord, PluginSummary, PluginWrapper, PriorityKey};
pub use registry::{PatchEntry, PluginRegistry, PluginSource, ScopedGuard, ScopedSpec};
pub use signature::Signature;
pub use spec::HookSpec;
pub use strategy::{Emptiness, NamedStrategy, PendingCall, Reduce, Scope, Strategy};
