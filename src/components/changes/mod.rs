pub mod diff;
pub mod messages;

pub use diff::{
    diff_snapshot_files, diff_snapshots, Notification, NotificationKind, RemovalRule,
    DEFAULT_REMOVAL_RULE,
};
pub use messages::{compose, EmailMessage};
