//! Shared data types for the PostgreSQL backend

mod enums;
mod transactional;

pub use enums::{
    EpicStatus, IssueKind, IssueStatus, Priority, ProjectStatus, Role, Severity, SprintStatus,
    UnknownVariant, UserStatus,
};

pub use transactional::{
    ActivityRow, CommentRow, EpicRow, IssueRow, IssueTypeRow, LabelRow, MemberWithUser,
    ProjectRow, SprintRow, UserRow, WatcherRow, new_id, progress_percent,
};
