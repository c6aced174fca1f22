//! Kernel-wide configuration (ambient component, not named in the core
//! data model but required by any embeddable kernel — the teacher's own
//! `aisopod_plugin::config::PluginConfig` plays the same role).

/// Tunables that affect kernel behavior without being part of any single
/// hook's contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelConfig {
    /// Reserved for hosts that want the kernel to lazily construct plugin
    /// instances from a [`crate::registry::PluginSource`] on first dispatch
    /// rather than eagerly at `register_from` time. `hookkern` itself
    /// always registers eagerly; this flag is surfaced for hosts that layer
    /// their own lazy `PluginSource` on top.
    pub auto_instantiate: bool,
    /// Whether `SINGLE`/`TRY_SINGLE` dispatch without a routing key should
    /// emit a `single-without-target` diagnostic (spec.md §6). Defaults to
    /// on; hosts that route through `SINGLE` without ever tagging a target
    /// plugin on purpose can turn this off.
    pub warn_on_missing_target: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            auto_instantiate: false,
            warn_on_missing_target: true,
        }
    }
}
