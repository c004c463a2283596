// ABOUTME: Convert and merge orchestration: validate, read, map, plan, write, export
// ABOUTME: Runs on a blocking thread under the session's operation lock

use super::libretube::LibreTube;
use super::mapper::{libretube_to_newpipe, newpipe_to_libretube, MappingReport};
use super::merge::{plan_merge, MergeStats};
use super::newpipe::NewPipe;
use super::{expect_format, BackupFormat, BackupSchema, Direction, Mode};
use crate::config::BackupConfig;
use crate::engine::SqlEngine;
use crate::error::{ConversionError, Result};
use crate::session::Session;
use chrono::{DateTime, Local};

/// One convert or merge request
///
/// Each slot holds the raw bytes of a backup in that format, if provided.
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub mode: Mode,
    pub direction: Direction,
    pub newpipe: Option<Vec<u8>>,
    pub libretube: Option<Vec<u8>>,
}

impl BackupRequest {
    fn slot(&self, format: BackupFormat) -> Option<&[u8]> {
        match format {
            BackupFormat::NewPipe => self.newpipe.as_deref(),
            BackupFormat::LibreTube => self.libretube.as_deref(),
        }
    }

    /// Check that the files needed by the mode and direction are present
    pub fn validate(&self) -> Result<()> {
        let source = self.direction.source();
        let target = self.direction.target();

        match self.mode {
            Mode::Merge => {
                let missing: Vec<String> = [source, target]
                    .into_iter()
                    .filter(|format| self.slot(*format).is_none())
                    .map(|format| format!("{} backup", format))
                    .collect();
                if !missing.is_empty() {
                    return Err(ConversionError::MissingRequiredFile(format!(
                        "merge needs both backups, missing: {}",
                        missing.join(", ")
                    )));
                }
            }
            Mode::Convert => {
                if self.slot(source).is_none() {
                    if self.slot(target).is_some() {
                        return Err(ConversionError::UnsupportedDirection(format!(
                            "{} needs a {} backup but only a {} backup was given",
                            self.direction, source, target
                        )));
                    }
                    return Err(ConversionError::MissingRequiredFile(format!(
                        "convert {} needs a {} backup",
                        self.direction, source
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Result of a successful conversion or merge
#[derive(Debug, Clone)]
pub struct BackupOutput {
    pub format: BackupFormat,
    /// Suggested file name, e.g. `newpipe-merged-20240115_093000.db`
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub report: MappingReport,
    pub stats: MergeStats,
}

/// Convert or merge backups
///
/// Waits for any running operation, loads the SQL engine on first use and
/// runs the conversion on a blocking thread. Nothing is returned unless the
/// whole operation succeeds.
///
/// # Errors
///
/// - `MissingRequiredFile` if the mode needs a file that is absent
/// - `UnsupportedDirection` if the files cannot serve the direction, or a
///   file is in the other format than its slot
/// - `MalformedImage` if a file is not a readable backup
/// - `EngineLoadFailure` if SQLite cannot be initialized
pub async fn process_backup(session: &Session, request: BackupRequest) -> Result<BackupOutput> {
    request.validate()?;

    let _operation = session.begin_operation().await;
    let engine = session.engine().await?;
    let config = session.config().backup.clone();
    let started = Local::now();

    tracing::info!(
        "Starting {} ({})",
        match request.mode {
            Mode::Merge => "merge",
            Mode::Convert => "conversion",
        },
        request.direction
    );

    let output = tokio::task::spawn_blocking(move || run(&engine, &config, &request, started))
        .await
        .map_err(|e| ConversionError::Io(std::io::Error::other(e)))??;

    output.report.log_summary();
    tracing::info!(
        "✓ {} backup {} ({} bytes)",
        output.format,
        output.file_name,
        output.bytes.len()
    );
    Ok(output)
}

/// Output file name for a target format, mode and start time
pub fn output_file_name(format: BackupFormat, mode: Mode, started: DateTime<Local>) -> String {
    format!(
        "{}-{}-{}.db",
        format.slug(),
        mode.past_tense(),
        started.format("%Y%m%d_%H%M%S")
    )
}

fn run(
    engine: &SqlEngine,
    config: &BackupConfig,
    request: &BackupRequest,
    started: DateTime<Local>,
) -> Result<BackupOutput> {
    let direction = request.direction;
    let source_bytes = request.slot(direction.source()).ok_or_else(|| {
        ConversionError::MissingRequiredFile(format!("{} backup", direction.source()))
    })?;
    let target_bytes = match request.mode {
        Mode::Merge => request.slot(direction.target()),
        Mode::Convert => {
            if request.slot(direction.target()).is_some() {
                tracing::warn!(
                    "Ignoring the {} backup, convert builds a fresh image",
                    direction.target()
                );
            }
            None
        }
    };

    let source = engine.open_image(source_bytes)?;
    expect_format(source.connection(), direction.source())?;

    let (bytes, mut report, stats) = match direction {
        Direction::ToNewpipe => {
            let records = LibreTube::read_records(source.connection())?;
            let (mapped, report) = libretube_to_newpipe(&records, started.timestamp_millis());
            let (bytes, stats) = build_target::<NewPipe>(engine, config, target_bytes, &mapped)?;
            (bytes, report, stats)
        }
        Direction::ToLibretube => {
            let records = NewPipe::read_records(source.connection())?;
            let (mapped, report) = newpipe_to_libretube(&records);
            let (bytes, stats) = build_target::<LibreTube>(engine, config, target_bytes, &mapped)?;
            (bytes, report, stats)
        }
    };

    if stats.group_members_skipped > 0 {
        report.skip(format!(
            "{} group member(s) without a subscription in the {} backup",
            stats.group_members_skipped,
            direction.target()
        ));
    }

    Ok(BackupOutput {
        format: direction.target(),
        file_name: output_file_name(direction.target(), request.mode, started),
        bytes,
        report,
        stats,
    })
}

/// Merge mapped records into the target image, or into a fresh one
fn build_target<F: BackupSchema>(
    engine: &SqlEngine,
    config: &BackupConfig,
    target_bytes: Option<&[u8]>,
    incoming: &F::Records,
) -> Result<(Vec<u8>, MergeStats)> {
    let (image, existing) = match target_bytes {
        Some(bytes) => {
            let image = engine.open_image(bytes)?;
            expect_format(image.connection(), F::FORMAT)?;
            let existing = F::read_records(image.connection())?;
            (image, existing)
        }
        None => {
            let image = engine.create_image()?;
            F::create_schema(image.connection(), config)?;
            (image, F::Records::default())
        }
    };

    let plan = plan_merge(&existing, incoming);
    if plan.is_empty() {
        tracing::info!("Nothing new to add to the {} backup", F::FORMAT);
    }
    let stats = F::apply_plan(image.connection(), &plan)?;

    let bytes = image.export()?;
    Ok((bytes, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::TimeZone;

    fn request(mode: Mode, direction: Direction, np: bool, lt: bool) -> BackupRequest {
        BackupRequest {
            mode,
            direction,
            newpipe: np.then(Vec::new),
            libretube: lt.then(Vec::new),
        }
    }

    #[test]
    fn test_merge_needs_both_files() {
        for (np, lt) in [(true, false), (false, true), (false, false)] {
            let err = request(Mode::Merge, Direction::ToNewpipe, np, lt)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ConversionError::MissingRequiredFile(_)));
        }
        assert!(request(Mode::Merge, Direction::ToNewpipe, true, true)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_convert_needs_source_for_direction() {
        assert!(matches!(
            request(Mode::Convert, Direction::ToNewpipe, true, false).validate(),
            Err(ConversionError::UnsupportedDirection(_))
        ));
        assert!(matches!(
            request(Mode::Convert, Direction::ToLibretube, false, true).validate(),
            Err(ConversionError::UnsupportedDirection(_))
        ));
        assert!(matches!(
            request(Mode::Convert, Direction::ToLibretube, false, false).validate(),
            Err(ConversionError::MissingRequiredFile(_))
        ));
        assert!(request(Mode::Convert, Direction::ToLibretube, true, false)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_output_file_name() {
        let started = Local.with_ymd_and_hms(2024, 1, 15, 9, 30, 5).unwrap();
        assert_eq!(
            output_file_name(BackupFormat::NewPipe, Mode::Merge, started),
            "newpipe-merged-20240115_093005.db"
        );
        assert_eq!(
            output_file_name(BackupFormat::LibreTube, Mode::Convert, started),
            "libretube-converted-20240115_093005.db"
        );
    }

    #[tokio::test]
    async fn test_garbage_source_is_malformed() {
        let session = Session::new(Config::default());
        let request = BackupRequest {
            mode: Mode::Convert,
            direction: Direction::ToLibretube,
            newpipe: Some(vec![0x42; 512]),
            libretube: None,
        };
        assert!(matches!(
            process_backup(&session, request).await,
            Err(ConversionError::MalformedImage(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_fails_before_engine_loads() {
        let session = Session::new(Config::default());
        let request = request(Mode::Merge, Direction::ToLibretube, true, false);
        assert!(process_backup(&session, request).await.is_err());
        assert_eq!(session.engine_loads(), 0);
    }
}
