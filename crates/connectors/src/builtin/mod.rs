//! Connectors that ship with the engine and need no third-party account.

pub mod folder;
pub mod log;
pub mod schedule;

pub use folder::FolderTrigger;
pub use log::LogAction;
pub use schedule::IntervalTrigger;

/// Connector ID of [`IntervalTrigger`].
pub const SCHEDULE_INTERVAL: &str = "schedule.interval";
/// Connector ID of [`FolderTrigger`].
pub const FOLDER_NEW_FILE: &str = "folder.new_file";
/// Connector ID of [`LogAction`].
pub const UTIL_LOG: &str = "util.log";
