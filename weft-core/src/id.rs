//! Typed ID wrappers for every entity in the data model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed ID wrappers prevent mixing up org IDs, run IDs, node IDs, etc.
/// These are just strings underneath — no UUID enforcement, no format
/// requirement. Callers are free to use ULIDs, UUIDs, or anything else.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(OrgId, "Unique identifier for a tenant organization.");
typed_id!(UserId, "Unique identifier for a user account.");
typed_id!(SecretId, "Unique identifier for a stored secret.");
typed_id!(WorkflowId, "Unique identifier for a workflow definition.");
typed_id!(RunId, "Unique identifier for a workflow run.");
typed_id!(NodeId, "Identifier for a node within a workflow graph.");
typed_id!(SessionId, "Unique identifier for an agent session.");
typed_id!(ExecutorId, "Unique identifier for a registered executor.");
typed_id!(
    RequestId,
    "Unique identifier for a gateway dispatch request."
);
typed_id!(
    SubscriptionId,
    "Unique identifier for a trigger subscription."
);
