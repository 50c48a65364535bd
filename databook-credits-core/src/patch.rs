//! Document patcher: replaces the lines between two marker lines.
//!
//! Marker lines are kept as they are. Every byte outside the region,
//! including line endings and a missing final newline, is preserved. Files are
//! rewritten whole through a temporary file in the same directory, so a
//! failed write never leaves a half-written document behind.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::Result;

/// What [`patch_file`] did to the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    /// Markers found but the region already held the replacement.
    Unchanged,
    /// One or both markers absent. The file was not touched.
    MissingPlaceholder,
}

/// Line indices of the start and end marker lines.
pub fn locate_region(lines: &[&str], start_marker: &str, end_marker: &str) -> Option<(usize, usize)> {
    if start_marker.is_empty() || end_marker.is_empty() {
        return None;
    }
    let start = lines.iter().position(|line| line.contains(start_marker))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.contains(end_marker))?;
    Some((start, start + 1 + end))
}

/// Replaces the lines strictly between the markers with a single line holding
/// `replacement`. Returns the document unchanged when either marker is missing.
pub fn patch(document: &str, start_marker: &str, end_marker: &str, replacement: &str) -> String {
    let lines: Vec<&str> = document.split_inclusive('\n').collect();
    let Some((start, end)) = locate_region(&lines, start_marker, end_marker) else {
        return document.to_string();
    };

    // The start line always has a terminator because the end line follows it.
    let newline = if lines[start].ends_with("\r\n") { "\r\n" } else { "\n" };
    let replacement = replacement.trim_end_matches(['\r', '\n']);

    let mut out = String::with_capacity(document.len() + replacement.len());
    lines[..=start].iter().for_each(|line| out.push_str(line));
    out.push_str(replacement);
    out.push_str(newline);
    lines[end..].iter().for_each(|line| out.push_str(line));
    out
}

/// Reads `path`, patches the marker region and writes the whole file back.
pub fn patch_file(
    path: &Path,
    start_marker: &str,
    end_marker: &str,
    replacement: &str,
) -> Result<PatchOutcome> {
    let original = fs::read_to_string(path)?;
    let lines: Vec<&str> = original.split_inclusive('\n').collect();
    if locate_region(&lines, start_marker, end_marker).is_none() {
        warn!(
            path = %path.display(),
            start_marker,
            end_marker,
            "Placeholder markers not found, leaving document untouched"
        );
        return Ok(PatchOutcome::MissingPlaceholder);
    }

    let patched = patch(&original, start_marker, end_marker, replacement);
    if patched == original {
        debug!(path = %path.display(), "Placeholder region already up to date");
        return Ok(PatchOutcome::Unchanged);
    }
    write_atomic(path, &patched)?;
    info!(path = %path.display(), "Patched placeholder region");
    Ok(PatchOutcome::Patched)
}

/// Writes `contents` to a sibling temporary file and renames it over `path`.
/// An existing target keeps its permissions.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    match fs::metadata(path) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "<!-- authors start -->";
    const END: &str = "<!-- authors end -->";

    #[test]
    fn no_markers_is_a_no_op() {
        assert_eq!(patch("no markers here", "<!--s-->", "<!--e-->", "X"), "no markers here");
    }

    #[test]
    fn missing_end_marker_is_a_no_op() {
        let doc = format!("# Title\n{START}\nold\n");
        assert_eq!(patch(&doc, START, END, "new"), doc);
    }

    #[test]
    fn end_marker_before_start_is_not_a_region() {
        let doc = format!("{END}\n{START}\nold\n");
        assert_eq!(patch(&doc, START, END, "new"), doc);
    }

    #[test]
    fn replaces_everything_between_markers_with_one_line() {
        let doc = format!("# Title\n{START}\nold 1\nold 2\n{END}\ntail");
        let patched = patch(&doc, START, END, "*Amy, Bob*");
        assert_eq!(patched, format!("# Title\n{START}\n*Amy, Bob*\n{END}\ntail"));
    }

    #[test]
    fn adjacent_markers_gain_a_line() {
        let doc = format!("{START}\n{END}\n");
        assert_eq!(patch(&doc, START, END, "X"), format!("{START}\nX\n{END}\n"));
    }

    #[test]
    fn crlf_documents_keep_their_endings() {
        let doc = format!("a\r\n{START}\r\nold\r\n{END}\r\nb\r\n");
        assert_eq!(
            patch(&doc, START, END, "X"),
            format!("a\r\n{START}\r\nX\r\n{END}\r\nb\r\n")
        );
    }

    #[test]
    fn repatching_only_changes_the_region() {
        let doc = format!("head\n\n{START}\n{END}\n\nfooter without newline");
        let once = patch(&doc, START, END, "X");
        let twice = patch(&once, START, END, "Y");
        assert_eq!(twice, format!("head\n\n{START}\nY\n{END}\n\nfooter without newline"));
        assert_eq!(patch(&twice, START, END, ""), format!("head\n\n{START}\n\n{END}\n\nfooter without newline"));
    }

    #[test]
    fn patch_file_rewrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intro.md");
        fs::write(&path, format!("# Intro\n{START}\nstale\n{END}\n")).unwrap();

        let outcome = patch_file(&path, START, END, "*Amy*").unwrap();
        assert_eq!(outcome, PatchOutcome::Patched);
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            format!("# Intro\n{START}\n*Amy*\n{END}\n")
        );

        let again = patch_file(&path, START, END, "*Amy*").unwrap();
        assert_eq!(again, PatchOutcome::Unchanged);
    }

    #[cfg(unix)]
    #[test]
    fn patch_file_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intro.md");
        fs::write(&path, format!("# Intro\n{START}\n{END}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(patch_file(&path, START, END, "*Amy*").unwrap(), PatchOutcome::Patched);
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[test]
    fn write_atomic_creates_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rendered.md");
        write_atomic(&path, "*Amy*\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "*Amy*\n");
    }

    #[test]
    fn patch_file_without_markers_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intro.md");
        fs::write(&path, "# Intro\n").unwrap();
        let outcome = patch_file(&path, START, END, "*Amy*").unwrap();
        assert_eq!(outcome, PatchOutcome::MissingPlaceholder);
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Intro\n");
    }
}
