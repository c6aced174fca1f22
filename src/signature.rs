//! Signature extraction and comparison (spec component C1).
//!
//! The host language has no runtime introspection of parameter names, so a
//! [`Signature`] is supplied explicitly by the host at spec/impl declaration
//! time rather than recovered from a callable. This is the "explicit
//! attach-time metadata record" the design notes call for in place of
//! decorator-driven reflection.

/// The ordered parameter-name list of a spec or an impl, plus whether the
/// first entry is a receiver that gets erased before comparison.
///
/// Equality between a spec's signature and an impl's signature is ordered
/// list equality over names *after* receiver erasure; types, defaults, and
/// positional/keyword kind are never part of the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    params: Vec<String>,
    has_receiver: bool,
}

impl Signature {
    /// A signature with no receiver.
    pub fn new(params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            has_receiver: false,
        }
    }

    /// A signature whose first parameter is a receiver, erased at dispatch.
    pub fn with_receiver(params: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let params: Vec<String> = params.into_iter().map(Into::into).collect();
        debug_assert!(
            !params.is_empty(),
            "a receiver signature must name the receiver as its first parameter"
        );
        Self {
            params,
            has_receiver: true,
        }
    }

    /// Whether this signature declares a leading receiver parameter.
    pub fn has_receiver(&self) -> bool {
        self.has_receiver
    }

    /// The full declared parameter list, receiver included if present.
    pub fn raw_params(&self) -> &[String] {
        &self.params
    }

    /// The parameter names that participate in dispatch: the receiver, if
    /// declared, is stripped from the front.
    pub fn effective_params(&self) -> &[String] {
        if self.has_receiver {
            &self.params[1.min(self.params.len())..]
        } else {
            &self.params
        }
    }

    /// Spec/impl signature compatibility (spec.md §4.1).
    ///
    /// Erasure is driven entirely by each signature's own `has_receiver`
    /// flag: an impl may omit the receiver entirely or spell it out, and
    /// either form matches a receiver-bearing spec as long as the remaining
    /// names line up (invariant 6, spec.md §8).
    pub fn matches(&self, other: &Signature) -> bool {
        self.effective_params() == other.effective_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_signature_keeps_all_params() {
        let sig = Signature::new(["a", "b"]);
        assert_eq!(sig.effective_params(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn receiver_signature_erases_first_param() {
        let sig = Signature::with_receiver(["self", "a", "b"]);
        assert_eq!(sig.effective_params(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn impl_may_omit_or_include_receiver() {
        let spec_sig = Signature::with_receiver(["self", "a", "b"]);
        let impl_without = Signature::new(["a", "b"]);
        let impl_with = Signature::with_receiver(["plugin", "a", "b"]);
        assert!(spec_sig.matches(&impl_without));
        assert!(spec_sig.matches(&impl_with));
    }

    #[test]
    fn mismatched_names_do_not_match() {
        let spec_sig = Signature::new(["a", "b"]);
        let impl_sig = Signature::new(["a", "c"]);
        assert!(!spec_sig.matches(&impl_sig));
    }

    #[test]
    fn types_and_defaults_are_not_part_of_signature() {
        // Signature is name-only by construction: there is nowhere to plug
        // in a type or default, so two signatures built from the same names
        // are always equal regardless of what the host's callable expects.
        let a = Signature::new(["x", "y"]);
        let b = Signature::new(["x", "y"]);
        assert_eq!(a, b);
    }
}
