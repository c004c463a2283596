// ABOUTME: SQL engine handle that turns backup bytes into live SQLite databases and back
// ABOUTME: Images are staged in a private temp directory that lives as long as the engine

use crate::error::{ConversionError, Result};
use rusqlite::Connection;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

/// Loaded SQL engine
///
/// Owns a private work directory. Every image opened or created through the
/// engine is a temp file inside it, removed when the image is dropped or
/// exported.
#[derive(Debug)]
pub struct SqlEngine {
    workdir: TempDir,
    sqlite_version: String,
}

impl SqlEngine {
    /// Initialize the engine
    ///
    /// Probes the linked SQLite library with an in-memory database and
    /// creates the work directory.
    ///
    /// # Errors
    ///
    /// Returns `EngineLoadFailure` if SQLite cannot open a database or the
    /// work directory cannot be created.
    pub fn load() -> Result<Self> {
        let probe = Connection::open_in_memory().map_err(|e| {
            ConversionError::EngineLoadFailure(format!("SQLite could not open a database: {}", e))
        })?;
        let sqlite_version: String = probe
            .query_row("SELECT sqlite_version()", [], |row| row.get(0))
            .map_err(|e| {
                ConversionError::EngineLoadFailure(format!("SQLite version probe failed: {}", e))
            })?;

        let workdir = tempfile::Builder::new()
            .prefix("npconv-")
            .tempdir()
            .map_err(|e| {
                ConversionError::EngineLoadFailure(format!(
                    "Failed to create engine work directory: {}",
                    e
                ))
            })?;

        tracing::debug!("Engine work directory: {}", workdir.path().display());
        tracing::info!("✓ SQL engine ready (SQLite {})", sqlite_version);

        Ok(Self {
            workdir,
            sqlite_version,
        })
    }

    pub fn sqlite_version(&self) -> &str {
        &self.sqlite_version
    }

    /// Open a backup image as a queryable and mutable database
    ///
    /// # Errors
    ///
    /// Returns `MalformedImage` if the bytes are not a SQLite database.
    pub fn open_image(&self, bytes: &[u8]) -> Result<Image> {
        let mut file = NamedTempFile::new_in(self.workdir.path())?;
        file.write_all(bytes)?;
        file.flush()?;

        let conn = Connection::open(file.path())
            .map_err(|e| ConversionError::malformed(format!("cannot open image: {}", e)))?;

        // SQLite parses the header lazily, so force a read of the schema
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| ConversionError::malformed(format!("not a SQLite database: {}", e)))?;

        tracing::debug!("Opened image of {} bytes", bytes.len());
        Ok(Image { conn, file })
    }

    /// Create an empty database image
    pub fn create_image(&self) -> Result<Image> {
        let file = NamedTempFile::new_in(self.workdir.path())?;
        let conn = Connection::open(file.path())?;
        Ok(Image { conn, file })
    }
}

/// A database image opened by the engine
#[derive(Debug)]
pub struct Image {
    conn: Connection,
    file: NamedTempFile,
}

impl Image {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Serialize the database back to bytes
    ///
    /// Closes the connection first so everything is flushed to the file.
    /// The staged temp file is removed afterwards.
    pub fn export(self) -> Result<Vec<u8>> {
        let Image { conn, file } = self;
        conn.close().map_err(|(_, e)| ConversionError::Database(e))?;
        let bytes = std::fs::read(file.path())?;
        tracing::debug!("Exported image of {} bytes", bytes.len());
        Ok(bytes)
    }
}
