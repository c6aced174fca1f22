//! Dynamic call arguments exchanged between the dispatcher and impls.
//!
//! The source system passes hooks `*args, **kwargs`; the closest
//! idiomatic Rust analogue, and the one the teacher corpus already leans
//! on for plugin payloads (`aisopod_plugin::config` and `PluginContext`
//! both move configuration around as `serde_json::Value`), is a small
//! struct pairing positional JSON values with a JSON object of keyword
//! values.

use serde_json::{Map, Value};

/// Reserved keyword that selects a target plugin for `SINGLE`/`TRY_SINGLE`
/// (spec.md §6). Stripped from [`Args::keyword`] before impls observe it.
pub const ROUTING_KEY: &str = "__plugin";

/// The arguments passed into a single hook dispatch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    pub positional: Vec<Value>,
    pub keyword: Map<String, Value>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.positional = values.into_iter().collect();
        self
    }

    pub fn with_keyword(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keyword.insert(key.into(), value.into());
        self
    }

    /// Pulls the routing key out of the keyword map, returning the targeted
    /// plugin name if one was supplied. The key is removed either way so
    /// impls never observe it (spec.md §4.7 step 3).
    pub fn take_routing_key(&mut self) -> Option<String> {
        self.keyword
            .remove(ROUTING_KEY)
            .and_then(|v| v.as_str().map(str::to_string))
    }

    /// Injects `null` into the receiver slot. Callers need not supply the
    /// receiver; if they do, it is discarded and replaced (spec.md §4.7
    /// step 2), so the slot is always overwritten rather than shifting
    /// whatever the caller already put there one position to the right.
    pub fn with_erased_receiver(mut self) -> Self {
        if self.positional.is_empty() {
            self.positional.push(Value::Null);
        } else {
            self.positional[0] = Value::Null;
        }
        self
    }
}
