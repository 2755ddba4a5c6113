//! Enum types for the beads system.
//!
//! Each enum serializes as its snake_case (or kebab-case) string and
//! deserializes any unknown value into a `Custom(String)` fallback so that
//! journals written by newer versions still import.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Macro: defines an enum with known string variants + a Custom(String) fallback.
// ---------------------------------------------------------------------------
macro_rules! define_enum {
    (
        $(#[$meta:meta])*
        $name:ident, default = $default:ident,
        variants: [
            $( ($variant:ident, $str:expr) ),+ $(,)?
        ]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $variant, )+
            Custom(String),
        }

        impl $name {
            /// Returns the string representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $str, )+
                    Self::Custom(s) => s.as_str(),
                }
            }

            /// Returns `true` if this is the default variant.
            pub fn is_default(&self) -> bool {
                *self == Self::$default
            }

            /// Returns `true` if this is a built-in (non-custom) variant.
            pub fn is_builtin(&self) -> bool {
                !matches!(self, Self::Custom(_))
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

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Ok(Self::from(s))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                match s {
                    $( $str => Self::$variant, )+
                    other => Self::Custom(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                // Check known variants first to avoid moving the String.
                match s.as_str() {
                    $( $str => Self::$variant, )+
                    _ => Self::Custom(s),
                }
            }
        }
    };
}

// ===========================================================================
// Status
// ===========================================================================

define_enum! {
    /// Current state of an issue.
    Status, default = Open,
    variants: [
        (Open, "open"),
        (InProgress, "in_progress"),
        (Blocked, "blocked"),
        (Deferred, "deferred"),
        (Closed, "closed"),
    ]
}

impl Status {
    /// Statuses that make an issue an *active* blocker of its dependents.
    ///
    /// Closed and deferred issues never block anything.
    pub fn is_active_blocker(&self) -> bool {
        matches!(self, Self::Open | Self::InProgress | Self::Blocked)
    }
}

// ===========================================================================
// IssueType
// ===========================================================================

define_enum! {
    /// Categorises the kind of work.
    IssueType, default = Task,
    variants: [
        (Bug, "bug"),
        (Feature, "feature"),
        (Task, "task"),
        (Epic, "epic"),
        (Chore, "chore"),
        (Message, "message"),
    ]
}

impl IssueType {
    /// Normalises aliases to their canonical form.
    pub fn normalize(&self) -> Self {
        match self.as_str() {
            "enhancement" | "feat" => Self::Feature,
            _ => self.clone(),
        }
    }
}

// ===========================================================================
// DependencyType
// ===========================================================================

define_enum! {
    /// Relationship type between issues.
    DependencyType, default = Blocks,
    variants: [
        (Blocks, "blocks"),
        (ParentChild, "parent-child"),
        (ConditionalBlocks, "conditional-blocks"),
        (WaitsFor, "waits-for"),
        (Related, "related"),
        (DiscoveredFrom, "discovered-from"),
        (RepliesTo, "replies-to"),
    ]
}

impl DependencyType {
    /// Returns `true` if this dependency type can block work (feeds the
    /// blocked cache and therefore the ready calculation).
    pub fn affects_ready_work(&self) -> bool {
        matches!(
            self,
            Self::Blocks | Self::ParentChild | Self::ConditionalBlocks | Self::WaitsFor
        )
    }
}

// ===========================================================================
// SortPolicy
// ===========================================================================

define_enum! {
    /// Determines how ready work is ordered.
    SortPolicy, default = Hybrid,
    variants: [
        (Hybrid, "hybrid"),
        (Priority, "priority"),
        (Oldest, "oldest"),
    ]
}

// ===========================================================================
// EventType
// ===========================================================================

define_enum! {
    /// Categorises audit trail events.
    ///
    /// The sync-produced kinds (`resurrected`, `clock_skew_warning`,
    /// `merge_cycle_resolved`) are emitted by the merge engine rather than
    /// by direct user operations.
    EventType, default = Created,
    variants: [
        (Created, "created"),
        (Updated, "updated"),
        (StatusChanged, "status_changed"),
        (Commented, "commented"),
        (Closed, "closed"),
        (Reopened, "reopened"),
        (Deleted, "deleted"),
        (Renamed, "renamed"),
        (DependencyAdded, "dependency_added"),
        (DependencyRemoved, "dependency_removed"),
        (LabelAdded, "label_added"),
        (LabelRemoved, "label_removed"),
        (Resurrected, "resurrected"),
        (ClockSkewWarning, "clock_skew_warning"),
        (MergeCycleResolved, "merge_cycle_resolved"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_default_is_open() {
        assert_eq!(Status::default(), Status::Open);
        assert!(Status::Open.is_default());
        assert!(!Status::Closed.is_default());
    }

    #[test]
    fn status_roundtrip_serde() {
        let s = Status::InProgress;
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, r#""in_progress""#);
        let back: Status = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn status_custom_roundtrip() {
        let json = r#""triaged""#;
        let s: Status = serde_json::from_str(json).unwrap();
        assert_eq!(s, Status::Custom("triaged".into()));
        assert_eq!(serde_json::to_string(&s).unwrap(), json);
    }

    #[test]
    fn status_active_blocker() {
        assert!(Status::Open.is_active_blocker());
        assert!(Status::InProgress.is_active_blocker());
        assert!(Status::Blocked.is_active_blocker());
        assert!(!Status::Closed.is_active_blocker());
        assert!(!Status::Deferred.is_active_blocker());
    }

    #[test]
    fn dependency_type_as_str() {
        assert_eq!(DependencyType::ParentChild.as_str(), "parent-child");
        assert_eq!(
            DependencyType::ConditionalBlocks.as_str(),
            "conditional-blocks"
        );
    }

    #[test]
    fn dependency_type_affects_ready_work() {
        assert!(DependencyType::Blocks.affects_ready_work());
        assert!(DependencyType::ParentChild.affects_ready_work());
        assert!(DependencyType::WaitsFor.affects_ready_work());
        assert!(!DependencyType::Related.affects_ready_work());
        assert!(!DependencyType::DiscoveredFrom.affects_ready_work());
        assert!(!DependencyType::RepliesTo.affects_ready_work());
    }

    #[test]
    fn issue_type_normalize() {
        assert_eq!(
            IssueType::Custom("enhancement".into()).normalize(),
            IssueType::Feature
        );
        assert_eq!(IssueType::Bug.normalize(), IssueType::Bug);
    }

    #[test]
    fn event_type_sync_kinds() {
        assert_eq!(EventType::Resurrected.as_str(), "resurrected");
        let e: EventType = serde_json::from_str(r#""merge_cycle_resolved""#).unwrap();
        assert_eq!(e, EventType::MergeCycleResolved);
    }

    #[test]
    fn sort_policy_default() {
        assert_eq!(SortPolicy::default(), SortPolicy::Hybrid);
    }
}
