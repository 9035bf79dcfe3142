//! Core types for the fuzzing-platform control-panel client.
//!
//! Defines the platform identifiers, pool resources, the resource limit
//! validator for revision forms, and the normalized outcome every API call
//! resolves to. Nothing in this crate performs I/O.

#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod id;
pub mod limits;
pub mod outcome;

pub use error::CoreError;
pub use id::{FuzzerId, ImageId, PoolId, ProjectId, RevisionId, UserContext, UserId};
pub use limits::{
    effective_limit, LimitRange, LimitValidator, PoolResources, ResourceLimits, ResourceSelection,
    SliderBounds,
};
pub use outcome::{ErrorSlot, FormField, RequestOutcome, INTERNAL_SERVER_ERROR};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_inner_string() {
        let id = FuzzerId::new("6523f1c0a1");
        assert_eq!(id.to_string(), "6523f1c0a1");
        assert_eq!(id.as_str(), "6523f1c0a1");
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = RevisionId::from("rev-1");
        let json = match serde_json::to_string(&id) {
            Ok(s) => s,
            Err(e) => panic!("serialization failed: {e}"),
        };
        assert_eq!(json, "\"rev-1\"");
    }

    #[test]
    fn user_context_new_accepts_str() {
        let ctx = UserContext::new("u1", "p1");
        assert_eq!(ctx.user_id, UserId::new("u1"));
        assert_eq!(ctx.project_id, ProjectId::new("p1"));
    }

    #[test]
    fn validator_default_is_unloaded() {
        let v = LimitValidator::default();
        assert!(!v.is_loaded());
        assert!(v.check(&ResourceSelection::default()).is_ok());
    }
}
