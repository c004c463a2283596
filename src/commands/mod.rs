// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports the backup and paste commands

pub mod backup;
pub mod paste;

pub use backup::{backup, BackupArgs};
pub use paste::{paste, PasteArgs};
