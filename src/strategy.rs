//! Result-collection strategies (spec component C7).
//!
//! The design notes call for factoring the named strategies as a
//! `{scope} x {reduction} x {emptiness}` product rather than twenty
//! separate branches; [`NamedStrategy::axes`] is that one table, and
//! [`crate::dispatcher::Dispatcher`] is the single entry point that reads it.

use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::args::Args;
use crate::error::{BoxError, DispatchError};
use crate::signature::Signature;

/// Which impls actually run, and in what order/short-circuit rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Run every eligible impl.
    All,
    /// Run only the first eligible impl.
    First,
    /// Run only the last eligible impl.
    Last,
    /// Run from the front, stopping as soon as one returns non-null.
    FirstAvail,
    /// Run from the back, stopping as soon as one returns non-null.
    LastAvail,
    /// Run exactly the impl named by the routing key (or the last eligible
    /// impl, with a diagnostic, if no routing key was supplied).
    Single,
}

/// How the executed outcomes become a single candidate value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduce {
    /// The full ordered list of outcomes, nulls included.
    List,
    /// The ordered list with null outcomes filtered out.
    AvailsList,
    /// The single outcome a `First`/`Last`/`FirstAvail`/`LastAvail`/`Single`
    /// scope already narrowed execution down to.
    Identity,
    /// Of an `All`-scope run, the first outcome.
    FirstOf,
    /// Of an `All`-scope run, the last outcome.
    LastOf,
    /// Of an `All`-scope run, the first non-null outcome (all impls still
    /// ran; this only affects which one is returned).
    FirstAvailOf,
    /// Of an `All`-scope run, the last non-null outcome.
    LastAvailOf,
}

/// Whether an absent candidate is an error or softened to `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    Base,
    Try,
}

/// The eleven base named strategies plus their nine meaningful `TRY_`
/// siblings (spec.md §4.8's enumeration naturally yields twenty, not the
/// eighteen the prose names — see `DESIGN.md` for why `ALL` and
/// `ALL_AVAILS` have no `TRY_` form: both already return a list, and an
/// empty list is a valid result rather than an absent one).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedStrategy {
    All,
    AllAvails,
    AllFirst,
    AllLast,
    AllFirstAvail,
    AllLastAvail,
    First,
    Last,
    FirstAvail,
    LastAvail,
    Single,
    TryAllFirst,
    TryAllLast,
    TryAllFirstAvail,
    TryAllLastAvail,
    TryFirst,
    TryLast,
    TryFirstAvail,
    TryLastAvail,
    TrySingle,
}

impl NamedStrategy {
    /// The `{scope, reduce, emptiness}` this named strategy maps to.
    pub fn axes(self) -> (Scope, Reduce, Emptiness) {
        use Emptiness::*;
        use NamedStrategy::*;
        use Reduce::*;
        match self {
            NamedStrategy::All => (Scope::All, List, Base),
            AllAvails => (Scope::All, AvailsList, Base),
            AllFirst => (Scope::All, FirstOf, Base),
            AllLast => (Scope::All, LastOf, Base),
            AllFirstAvail => (Scope::All, FirstAvailOf, Base),
            AllLastAvail => (Scope::All, LastAvailOf, Base),
            NamedStrategy::First => (Scope::First, Identity, Base),
            NamedStrategy::Last => (Scope::Last, Identity, Base),
            NamedStrategy::FirstAvail => (Scope::FirstAvail, FirstAvailOf, Base),
            NamedStrategy::LastAvail => (Scope::LastAvail, LastAvailOf, Base),
            NamedStrategy::Single => (Scope::Single, Identity, Base),
            TryAllFirst => (Scope::All, FirstOf, Try),
            TryAllLast => (Scope::All, LastOf, Try),
            TryAllFirstAvail => (Scope::All, FirstAvailOf, Try),
            TryAllLastAvail => (Scope::All, LastAvailOf, Try),
            TryFirst => (Scope::First, Identity, Try),
            TryLast => (Scope::Last, Identity, Try),
            TryFirstAvail => (Scope::FirstAvail, FirstAvailOf, Try),
            TryLastAvail => (Scope::LastAvail, LastAvailOf, Try),
            TrySingle => (Scope::Single, Identity, Try),
        }
    }
}

/// One impl a user reducer may choose to invoke, unexecuted until it calls
/// [`PendingCall::call`]/[`PendingCall::call_async`] (spec.md §4.8 "User
/// reducer").
#[derive(Clone)]
pub struct PendingCall {
    pub plugin_name: String,
    pub signature: Signature,
    pub(crate) callable: crate::impl_wrapper::ImplFn,
    pub(crate) args: Args,
}

impl PendingCall {
    /// Invoke a synchronous impl. Panics if this call wraps an async impl;
    /// a user reducer's sync/async nature must already match the spec's
    /// (spec.md §4.8), so a sync reducer only ever receives sync-callable
    /// entries once `Dispatcher` has bridged async impls for it.
    pub fn call(&self) -> Result<Value, BoxError> {
        match &self.callable {
            crate::impl_wrapper::ImplFn::Sync(f) => f(&self.args),
            crate::impl_wrapper::ImplFn::Async(_) => {
                panic!("call() invoked on an async impl; use call_async()")
            }
        }
    }

    /// Invoke any impl, awaiting it if necessary.
    pub fn call_async(&self) -> BoxFuture<'static, Result<Value, BoxError>> {
        match self.callable.clone() {
            crate::impl_wrapper::ImplFn::Sync(f) => {
                let args = self.args.clone();
                Box::pin(async move { f(&args) })
            }
            crate::impl_wrapper::ImplFn::Async(f) => f(self.args.clone()),
        }
    }
}

/// A hook's result-collection policy: one of the named strategies, or a
/// user-supplied reducer (spec.md §4.8).
#[derive(Clone)]
pub enum Strategy {
    Named(NamedStrategy),
    UserSync(Arc<dyn Fn(Vec<PendingCall>) -> Result<Value, DispatchError> + Send + Sync>),
    UserAsync(Arc<dyn Fn(Vec<PendingCall>) -> BoxFuture<'static, Result<Value, DispatchError>> + Send + Sync>),
}

impl Strategy {
    pub fn named(s: NamedStrategy) -> Self {
        Strategy::Named(s)
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Named(n) => write!(f, "Strategy::Named({n:?})"),
            Strategy::UserSync(_) => write!(f, "Strategy::UserSync(..)"),
            Strategy::UserAsync(_) => write!(f, "Strategy::UserAsync(..)"),
        }
    }
}
