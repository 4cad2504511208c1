//! Domain identifier types with validation
//!
//! LIMS records are keyed by positive integers. Each record kind gets its own newtype
//! so a sample id can never be passed where a work unit id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "i64", into = "i64")]
        pub struct $name(i64);

        impl $name {
            /// Creates a new identifier, rejecting zero and negative values
            pub fn new(id: i64) -> Result<Self, String> {
                if id <= 0 {
                    return Err(format!("{} must be a positive integer, got {}", $label, id));
                }
                Ok(Self(id))
            }

            /// Returns the raw integer value
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl TryFrom<i64> for $name {
            type Error = String;

            fn try_from(value: i64) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: i64 = s
                    .trim()
                    .parse()
                    .map_err(|_| format!("{} must be an integer, got '{}'", $label, s))?;
                Self::new(value)
            }
        }
    };
}

define_id!(
    /// Identifier of a laboratory sample
    SampleId,
    "Sample ID"
);
define_id!(
    /// Identifier of a sample type
    SampleTypeId,
    "Sample type ID"
);
define_id!(
    /// Identifier of an equivalency group
    EquivalencyId,
    "Equivalency ID"
);
define_id!(
    /// Identifier of a work unit (aggregate)
    WorkUnitId,
    "Work unit ID"
);
define_id!(
    /// Identifier of a workflow step
    WorkflowStepId,
    "Workflow step ID"
);
define_id!(
    /// Master classification shared by work units of one kind
    WorkMasterId,
    "Work master ID"
);
define_id!(
    /// Identifier of a mailing list
    MailingListId,
    "Mailing list ID"
);
define_id!(
    /// Message category
    MessageTypeId,
    "Message type ID"
);
define_id!(
    /// Identifier of a user account
    AccountId,
    "Account ID"
);
define_id!(
    /// Identifier of a persisted message
    MessageId,
    "Message ID"
);
define_id!(
    /// Identifier of a stored file
    FileId,
    "File ID"
);
define_id!(
    /// Identifier of an analysis group in the external catalog
    AnalysisGroupId,
    "Analysis group ID"
);

impl AnalysisGroupId {
    /// Parses the external id stored on an equivalency mapping.
    ///
    /// Returns `None` for blank, non-numeric or non-positive values; those mappings
    /// are skipped rather than treated as errors.
    pub fn parse_external(external_id: Option<&str>) -> Option<Self> {
        external_id
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok())
    }
}
