// ABOUTME: Filesystem helpers for writing outputs and sanitizing user text for logs
// ABOUTME: Outputs are written atomically so a failed run never leaves a partial file

use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sanitize user-provided text (labels, playlist names) for display
///
/// Removes control characters and limits length so pasted or imported
/// text cannot break log lines.
///
/// # Arguments
///
/// * `text` - The text to sanitize
///
/// # Returns
///
/// Sanitized string with control characters removed and length limited to 100 chars.
///
/// # Examples
///
/// ```
/// # use npconv::utils::sanitize_for_display;
/// assert_eq!(sanitize_for_display("image1"), "image1");
/// assert_eq!(sanitize_for_display("image\n1"), "image1");
///
/// let long_label = "a".repeat(200);
/// assert_eq!(sanitize_for_display(&long_label).len(), 100);
/// ```
pub fn sanitize_for_display(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).take(100).collect()
}

/// Pick a path in `dir` for `file_name` that does not exist yet
///
/// Appends `-1`, `-2`, ... to the file stem until the name is free.
///
/// # Examples
///
/// ```
/// # use npconv::utils::unique_path;
/// let dir = tempfile::tempdir().unwrap();
/// let first = unique_path(dir.path(), "image1.png");
/// assert!(first.ends_with("image1.png"));
/// std::fs::write(&first, b"x").unwrap();
/// assert!(unique_path(dir.path(), "image1.png").ends_with("image1-1.png"));
/// ```
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let name = Path::new(file_name);
    let stem = name
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = name.extension().map(|e| e.to_string_lossy().into_owned());

    (1..)
        .map(|n| match &extension {
            Some(ext) => dir.join(format!("{}-{}.{}", stem, n, ext)),
            None => dir.join(format!("{}-{}", stem, n)),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Write bytes to `dir/file_name` atomically
///
/// The bytes go to a temp file in the same directory which is then renamed
/// into place, so readers never see a partial file. The directory is
/// created if needed.
///
/// # Arguments
///
/// * `dir` - Destination directory
/// * `file_name` - Name of the file inside `dir`; must not contain a path separator
/// * `bytes` - File contents
///
/// # Returns
///
/// The path of the written file.
///
/// # Errors
///
/// Returns an error if the name is not a plain file name, or if the
/// directory or file cannot be written.
pub fn write_atomically(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name == ".." {
        bail!("Invalid output file name: {}", sanitize_for_display(file_name));
    }

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let target = dir.join(file_name);
    let mut staged = tempfile::Builder::new()
        .prefix(".npconv-")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to stage output in {}", dir.display()))?;
    staged
        .write_all(bytes)
        .context("Failed to write output")?;
    staged.flush().context("Failed to flush output")?;
    staged
        .persist(&target)
        .with_context(|| format!("Failed to move output into place at {}", target.display()))?;

    tracing::debug!("Wrote {} bytes to {}", bytes.len(), target.display());
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_display() {
        assert_eq!(sanitize_for_display("Favorites"), "Favorites");
        assert_eq!(sanitize_for_display("Fav\x00orites"), "Favorites");
        assert_eq!(sanitize_for_display("a\r\nb"), "ab");

        let long_name = "a".repeat(200);
        assert_eq!(sanitize_for_display(&long_name).len(), 100);
    }

    #[test]
    fn test_write_atomically_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let path = write_atomically(&out, "newpipe-merged.db", b"data").unwrap();
        assert_eq!(path, out.join("newpipe-merged.db"));
        assert_eq!(std::fs::read(&path).unwrap(), b"data");

        // No staging files left behind
        let entries: Vec<_> = std::fs::read_dir(&out).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomically_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        write_atomically(dir.path(), "a.db", b"old").unwrap();
        let path = write_atomically(dir.path(), "a.db", b"new").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[test]
    fn test_write_atomically_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_atomically(dir.path(), "../escape.db", b"x").is_err());
        assert!(write_atomically(dir.path(), "", b"x").is_err());
    }

    #[test]
    fn test_unique_path_without_extension() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes"), b"x").unwrap();
        assert_eq!(unique_path(dir.path(), "notes"), dir.path().join("notes-1"));
    }
}
