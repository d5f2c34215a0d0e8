//! # Idempotency policies.
//!
//! An [`IdempotencyPolicy`] decides, per request, whether an operation may be
//! sent more than once. Non-idempotent operations get a single attempt no
//! matter what the retry policy would allow, since a lost response leaves the
//! outcome ambiguous.
//!
//! - [`ConstantIdempotencyPolicy`] fixed for a whole call-site (reads, deletes by name).
//! - [`PreconditionIdempotencyPolicy`] derived from conditional-mutation preconditions.

/// Decides whether a request is safe to execute more than once.
pub trait IdempotencyPolicy<R: ?Sized>: Send + Sync {
    fn is_idempotent(&self, request: &R) -> bool;
}

/// Same answer for every request.
///
/// # Example
/// ```
/// use cloudretry::{ConstantIdempotencyPolicy, IdempotencyPolicy};
///
/// let p = ConstantIdempotencyPolicy::new(true);
/// assert!(p.is_idempotent(&"GetTable"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstantIdempotencyPolicy(bool);

impl ConstantIdempotencyPolicy {
    pub fn new(idempotent: bool) -> Self {
        Self(idempotent)
    }
}

impl<R: ?Sized> IdempotencyPolicy<R> for ConstantIdempotencyPolicy {
    fn is_idempotent(&self, _request: &R) -> bool {
        self.0
    }
}

/// A mutation that may carry generation preconditions.
///
/// A request with a generation or metageneration match condition can only be
/// applied once: a replay after success fails the precondition instead of
/// mutating twice.
pub trait ConditionalRequest {
    fn if_generation_match(&self) -> Option<i64>;

    fn if_metageneration_match(&self) -> Option<i64> {
        None
    }
}

/// Idempotent exactly when the request carries a match precondition.
#[derive(Clone, Copy, Debug, Default)]
pub struct PreconditionIdempotencyPolicy;

impl<R: ConditionalRequest + ?Sized> IdempotencyPolicy<R> for PreconditionIdempotencyPolicy {
    fn is_idempotent(&self, request: &R) -> bool {
        request.if_generation_match().is_some() || request.if_metageneration_match().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upload {
        generation: Option<i64>,
        metageneration: Option<i64>,
    }

    impl ConditionalRequest for Upload {
        fn if_generation_match(&self) -> Option<i64> {
            self.generation
        }
        fn if_metageneration_match(&self) -> Option<i64> {
            self.metageneration
        }
    }

    #[test]
    fn constant_ignores_request() {
        assert!(!ConstantIdempotencyPolicy::new(false).is_idempotent(&42));
        assert!(ConstantIdempotencyPolicy::new(true).is_idempotent("anything"));
    }

    #[test]
    fn preconditions_make_mutation_idempotent() {
        let p = PreconditionIdempotencyPolicy;
        let plain = Upload { generation: None, metageneration: None };
        let by_gen = Upload { generation: Some(0), metageneration: None };
        let by_meta = Upload { generation: None, metageneration: Some(7) };
        assert!(!p.is_idempotent(&plain));
        assert!(p.is_idempotent(&by_gen));
        assert!(p.is_idempotent(&by_meta));
    }
}
