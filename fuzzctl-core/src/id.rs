use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a string-backed identifier issued by the platform API.
macro_rules! api_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Creates the identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

api_id!(
    /// Identifies a platform user.
    UserId
);
api_id!(
    /// Identifies a project owned by a user.
    ProjectId
);
api_id!(
    /// Identifies a resource pool a project is bound to.
    PoolId
);
api_id!(
    /// Identifies a fuzzer within a project.
    FuzzerId
);
api_id!(
    /// Identifies a revision of a fuzzer.
    RevisionId
);
api_id!(
    /// Identifies a project image a revision runs on.
    ImageId
);

/// The user and project every scoped API call is made on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// The logged-in user.
    pub user_id: UserId,
    /// The project currently selected by the user.
    pub project_id: ProjectId,
}

impl UserContext {
    /// Creates a context for `user_id` working in `project_id`.
    pub fn new(user_id: impl Into<UserId>, project_id: impl Into<ProjectId>) -> Self {
        Self { user_id: user_id.into(), project_id: project_id.into() }
    }
}
