// ABOUTME: Backup formats, conversion modes and the schema plumbing shared by both formats
// ABOUTME: Exports the reader/mapper/merge/writer pipeline behind process_backup

pub mod libretube;
pub mod mapper;
pub mod merge;
pub mod newpipe;
pub mod pipeline;

pub use mapper::{libretube_to_newpipe, newpipe_to_libretube, Entity, MappingReport};
pub use merge::{plan_merge, MergePlan, MergeStats, RecordSet};
pub use pipeline::{process_backup, BackupOutput, BackupRequest};

use crate::config::BackupConfig;
use crate::error::{ConversionError, Result};
use rusqlite::Connection;
use std::collections::HashSet;
use std::fmt;

/// The two backup formats this tool understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupFormat {
    NewPipe,
    LibreTube,
}

impl BackupFormat {
    /// Short lowercase name used in file names
    pub fn slug(&self) -> &'static str {
        match self {
            BackupFormat::NewPipe => "newpipe",
            BackupFormat::LibreTube => "libretube",
        }
    }
}

impl fmt::Display for BackupFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupFormat::NewPipe => write!(f, "NewPipe"),
            BackupFormat::LibreTube => write!(f, "LibreTube"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Mode {
    /// Combine the source backup into an existing target backup
    Merge,
    /// Build a fresh target backup from the source backup alone
    Convert,
}

impl Mode {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Mode::Merge => "merged",
            Mode::Convert => "converted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Direction {
    /// Produce a NewPipe backup from a LibreTube one
    ToNewpipe,
    /// Produce a LibreTube backup from a NewPipe one
    ToLibretube,
}

impl Direction {
    pub fn source(&self) -> BackupFormat {
        match self {
            Direction::ToNewpipe => BackupFormat::LibreTube,
            Direction::ToLibretube => BackupFormat::NewPipe,
        }
    }

    pub fn target(&self) -> BackupFormat {
        match self {
            Direction::ToNewpipe => BackupFormat::NewPipe,
            Direction::ToLibretube => BackupFormat::LibreTube,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source(), self.target())
    }
}

/// Read and write access to one backup format
///
/// Implemented by the zero-sized markers `newpipe::NewPipe` and
/// `libretube::LibreTube` so the pipeline can build either target the same
/// way.
pub trait BackupSchema {
    type Records: RecordSet + Default;

    const FORMAT: BackupFormat;

    /// Create every table the consuming app expects in an empty image
    fn create_schema(conn: &Connection, config: &BackupConfig) -> Result<()>;

    /// Read all known records; fails with `MalformedImage` on schema mismatch
    fn read_records(conn: &Connection) -> Result<Self::Records>;

    /// Insert the planned records inside one transaction
    ///
    /// Returns the plan's stats adjusted for anything the writer had to skip.
    fn apply_plan(conn: &Connection, plan: &MergePlan<Self::Records>) -> Result<MergeStats>;
}

/// Identify the format of an opened image by its tables
pub fn detect_format(conn: &Connection) -> Result<BackupFormat> {
    let tables = list_tables(conn)?;
    let has = |name: &str| tables.contains(name);

    if has("subscriptions") && has("streams") && has("playlists") {
        Ok(BackupFormat::NewPipe)
    } else if has("localSubscription") && has("localPlaylist") {
        Ok(BackupFormat::LibreTube)
    } else {
        Err(ConversionError::malformed(
            "image is neither a NewPipe nor a LibreTube database",
        ))
    }
}

/// Fail unless the image is in the expected format
///
/// A readable image of the other format means the file was given for the
/// wrong side of the conversion, which is a direction problem rather than a
/// malformed image.
pub fn expect_format(conn: &Connection, expected: BackupFormat) -> Result<()> {
    let detected = detect_format(conn)?;
    if detected != expected {
        return Err(ConversionError::UnsupportedDirection(format!(
            "expected a {} backup but the file is a {} backup",
            expected, detected
        )));
    }
    Ok(())
}

pub(crate) fn list_tables(conn: &Connection) -> Result<HashSet<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table'")
        .map_err(|e| ConversionError::from_read("sqlite_master", e))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<HashSet<String>>>())
        .map_err(|e| ConversionError::from_read("sqlite_master", e))?;
    Ok(names)
}

/// Run a read query and collect every mapped row
///
/// Any failure, including NULLs in columns read as non-optional, is a
/// `MalformedImage` naming the table.
pub(crate) fn query_all<T, F>(conn: &Connection, table: &str, sql: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| ConversionError::from_read(table, e))?;
    let rows = stmt
        .query_map([], map)
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<T>>>())
        .map_err(|e| ConversionError::from_read(table, e))?;
    Ok(rows)
}

/// Column names of a table, or `None` if the table does not exist
pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Option<HashSet<String>>> {
    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(|e| ConversionError::from_read(table, e))?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<HashSet<String>>>())
        .map_err(|e| ConversionError::from_read(table, e))?;
    Ok(if columns.is_empty() { None } else { Some(columns) })
}

/// Check that a table exists with at least the given columns
pub(crate) fn require_table(conn: &Connection, table: &str, columns: &[&str]) -> Result<()> {
    let present = table_columns(conn, table)?
        .ok_or_else(|| ConversionError::malformed(format!("missing table '{}'", table)))?;
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|column| !present.contains(*column))
        .collect();
    if !missing.is_empty() {
        return Err(ConversionError::malformed(format!(
            "table '{}' is missing column(s): {}",
            table,
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Like `require_table`, but an absent table is fine and reported as `false`
pub(crate) fn optional_table(conn: &Connection, table: &str, columns: &[&str]) -> Result<bool> {
    if table_columns(conn, table)?.is_none() {
        tracing::debug!("Optional table '{}' not present", table);
        return Ok(false);
    }
    require_table(conn, table, columns)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_formats() {
        let np = Connection::open_in_memory().unwrap();
        newpipe::NewPipe::create_schema(&np, &BackupConfig::default()).unwrap();
        assert_eq!(detect_format(&np).unwrap(), BackupFormat::NewPipe);

        let lt = Connection::open_in_memory().unwrap();
        libretube::LibreTube::create_schema(&lt, &BackupConfig::default()).unwrap();
        assert_eq!(detect_format(&lt).unwrap(), BackupFormat::LibreTube);
    }

    #[test]
    fn test_unknown_database_is_malformed() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE notes (id INTEGER)").unwrap();
        assert!(matches!(
            detect_format(&conn),
            Err(ConversionError::MalformedImage(_))
        ));
    }

    #[test]
    fn test_wrong_slot_is_unsupported_direction() {
        let np = Connection::open_in_memory().unwrap();
        newpipe::NewPipe::create_schema(&np, &BackupConfig::default()).unwrap();
        assert!(matches!(
            expect_format(&np, BackupFormat::LibreTube),
            Err(ConversionError::UnsupportedDirection(_))
        ));
    }

    #[test]
    fn test_require_table_reports_missing_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE streams (uid INTEGER, url TEXT)")
            .unwrap();
        let err = require_table(&conn, "streams", &["uid", "url", "title"]).unwrap_err();
        assert!(err.to_string().contains("title"));
        assert!(require_table(&conn, "playlists", &["uid"]).is_err());
        assert!(!optional_table(&conn, "stream_state", &["stream_id"]).unwrap());
    }

    #[test]
    fn test_direction_sides() {
        assert_eq!(Direction::ToNewpipe.source(), BackupFormat::LibreTube);
        assert_eq!(Direction::ToLibretube.target(), BackupFormat::LibreTube);
        assert_eq!(Direction::ToNewpipe.to_string(), "LibreTube -> NewPipe");
    }
}
