//! Persists settings into `postgresql.auto-config` style managed blocks.
//!
//! The block is delimited by [`BLOCK_BEGIN`] and [`BLOCK_END`]; everything outside of it
//! is left untouched, so the writer can run on every container start.

use crate::error::{AutoConfigError, AutoConfigErrorExt};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

pub const BLOCK_BEGIN: &str = "# BEGIN PGPACK AUTO-CONFIG";
pub const BLOCK_END: &str = "# END PGPACK AUTO-CONFIG";

/// Ordered `postgresql.conf` settings.
pub type Settings = Vec<(String, String)>;

/// Renders the managed block, delimiters included, with a trailing newline.
#[must_use]
pub fn render_block(settings: &[(String, String)]) -> String {
    let mut out = String::with_capacity(64 + settings.len() * 40);
    out.push_str(BLOCK_BEGIN);
    out.push('\n');
    for (key, value) in settings {
        out.push_str(key);
        out.push_str(" = '");
        out.push_str(&value.replace('\'', "''"));
        out.push_str("'\n");
    }
    out.push_str(BLOCK_END);
    out.push('\n');
    out
}

/// Renders settings as server arguments: `-c key=value` pairs.
#[must_use]
pub fn render_args(settings: &[(String, String)]) -> Vec<String> {
    settings.iter().flat_map(|(k, v)| ["-c".to_owned(), format!("{k}={v}")]).collect()
}

/// Replaces the managed block of `content`, or appends one when absent.
#[must_use]
pub fn splice_block(content: &str, settings: &[(String, String)]) -> String {
    let block = render_block(settings);

    let Some((before, after)) = split_block(content) else {
        let mut out = content.to_owned();
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&block);
        return out;
    };

    let mut out = String::with_capacity(before.len() + block.len() + after.len());
    out.push_str(before);
    out.push_str(&block);
    out.push_str(after);
    out
}

/// Writes `settings` into the managed block of `path`, creating the file if needed.
///
/// The new content goes to a sibling temp file first and is renamed over `path`.
///
/// # Errors
/// Returns [`AutoConfigError::Io`] when the file cannot be read or replaced.
pub fn write_block(path: &Path, settings: &[(String, String)]) -> Result<(), AutoConfigError> {
    let current = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e).context(format!("reading {}", path.display())),
    };

    let updated = splice_block(&current, settings);
    if updated == current {
        debug!(path = %path.display(), "Managed block already up to date");
        return Ok(());
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AutoConfigError::from(format!("not a file path: {}", path.display())))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(".pgpack-tmp");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, &updated).context(format!("writing {}", tmp.display()))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e).context(format!("replacing {}", path.display()));
    }

    debug!(path = %path.display(), settings = settings.len(), "Managed block written");
    Ok(())
}

/// Reads the managed block of `path` back as ordered pairs.
///
/// A missing file or a file without a block yields `Ok(None)`.
///
/// # Errors
/// Returns [`AutoConfigError::Io`] when the file exists but cannot be read.
pub fn read_block(path: &Path) -> Result<Option<Settings>, AutoConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context(format!("reading {}", path.display())),
    };
    Ok(parse_block(&content))
}

/// Parses the managed block out of file content.
#[must_use]
pub fn parse_block(content: &str) -> Option<Settings> {
    let (before, _) = split_block(content)?;
    let body = &content[before.len()..];

    let settings = body
        .lines()
        .skip(1)
        .take_while(|line| line.trim_end() != BLOCK_END)
        .filter_map(parse_line)
        .collect();
    Some(settings)
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let value = value.trim();
    let value = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .map_or_else(|| value.to_owned(), |v| v.replace("''", "'"));
    Some((key.trim().to_owned(), value))
}

/// Splits `content` around an existing block: `(text before, text after)`.
fn split_block(content: &str) -> Option<(&str, &str)> {
    let start = find_line(content, BLOCK_BEGIN, 0)?;
    let end_line = find_line(content, BLOCK_END, start)?;
    let after = content[end_line..].find('\n').map_or(content.len(), |i| end_line + i + 1);
    Some((&content[..start], &content[after..]))
}

/// Byte offset of the first line starting at or after `from` equal to `marker`.
fn find_line(content: &str, marker: &str, from: usize) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        if offset >= from && line.trim_end() == marker {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}
