//! Enumerations stored as TEXT columns
//!
//! Every variant maps to the exact string held in the database, which is also
//! the JSON representation. The table CHECK constraints list the same values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Value that does not name a variant of the target enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident (default $default:ident) {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Global user role
    Role (default Developer) {
        Admin => "Admin",
        Qa => "QA",
        Developer => "Developer",
    }
}

text_enum! {
    /// Account status; only active users can log in
    UserStatus (default Active) {
        Active => "Active",
        Inactive => "Inactive",
    }
}

text_enum! {
    ProjectStatus (default Active) {
        Active => "Active",
        OnHold => "On Hold",
        Completed => "Completed",
        Archived => "Archived",
    }
}

text_enum! {
    IssueKind (default Bug) {
        Bug => "Bug",
        Feature => "Feature",
        Improvement => "Improvement",
        Task => "Task",
    }
}

text_enum! {
    Severity (default Medium) {
        Critical => "Critical",
        High => "High",
        Medium => "Medium",
        Low => "Low",
    }
}

text_enum! {
    /// Issue workflow status
    IssueStatus (default Open) {
        Open => "Open",
        InProgress => "In Progress",
        Fixed => "Fixed",
        Closed => "Closed",
        Reopen => "Reopen",
    }
}

text_enum! {
    Priority (default P3) {
        P1 => "P1",
        P2 => "P2",
        P3 => "P3",
        P4 => "P4",
    }
}

text_enum! {
    SprintStatus (default Planning) {
        Planning => "Planning",
        Active => "Active",
        Completed => "Completed",
    }
}

text_enum! {
    EpicStatus (default Open) {
        Open => "Open",
        InProgress => "In Progress",
        Done => "Done",
        Cancelled => "Cancelled",
    }
}

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl IssueStatus {
    /// Statuses counted as completed work in progress figures
    pub const COMPLETED: [IssueStatus; 2] = [IssueStatus::Fixed, IssueStatus::Closed];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trips_through_string() {
        assert_eq!("QA".parse::<Role>().unwrap(), Role::Qa);
        assert_eq!(Role::Qa.as_str(), "QA");
        assert_eq!(Role::default(), Role::Developer);
    }

    #[test]
    fn test_multi_word_variants_serialize_with_spaces() {
        assert_eq!(
            serde_json::to_string(&IssueStatus::InProgress).unwrap(),
            "\"In Progress\""
        );
        assert_eq!(
            serde_json::from_str::<ProjectStatus>("\"On Hold\"").unwrap(),
            ProjectStatus::OnHold
        );
    }

    #[test]
    fn test_unlisted_issue_statuses_are_rejected() {
        assert!("Testing".parse::<IssueStatus>().is_err());
        assert!(serde_json::from_str::<IssueStatus>("\"Resolved\"").is_err());
    }

    #[test]
    fn test_unknown_variant_message() {
        let err = "Guest".parse::<Role>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown Role 'Guest'");
    }
}
