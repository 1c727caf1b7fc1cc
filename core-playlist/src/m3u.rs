//! Lenient M3U/M3U8 parsing and serialization
//!
//! Playlist files in the wild are messy: mixed separators, stray whitespace,
//! unknown charsets, comment lines, and paths that no longer exist. Both
//! directions here degrade instead of failing: a malformed base path or an
//! undecodable byte never aborts an import or export.

use crate::matcher::{MatchSettings, PathIndex};
use crate::models::{Playlist, RealizedPlaylist};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Settings for playlist file import/export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoSettings {
    /// Match library paths case-insensitively
    #[serde(default = "default_true")]
    pub ignore_case: bool,
    /// Match library paths by file name only
    #[serde(default = "default_true")]
    pub ignore_location: bool,
    /// Drop lines/entries that resolve to no library track
    #[serde(default = "default_true")]
    pub remove_invalid: bool,
    /// Rewrite exported paths relative to `relative_base`
    #[serde(default)]
    pub export_relative: bool,
    /// Base for resolving relative lines and relativizing exports
    #[serde(default)]
    pub relative_base: String,
}

impl Default for IoSettings {
    fn default() -> Self {
        Self {
            ignore_case: true,
            ignore_location: true,
            remove_invalid: true,
            export_relative: false,
            relative_base: String::new(),
        }
    }
}

impl IoSettings {
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            ignore_case: self.ignore_case,
            ignore_location: self.ignore_location,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Accepts a leading `/` or a `scheme:/`-style prefix. Windows drive paths
/// arrive here as `C:/...` after separator normalization and match the
/// scheme form.
fn absolute_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new("^(/|[^/]*:/)").expect("absolute path pattern is valid"))
}

pub fn is_absolute_path(line: &str) -> bool {
    absolute_path_regex().is_match(line)
}

/// Decode playlist bytes using a declared charset name.
///
/// UTF-8 decoding is lossy rather than fatal; `latin1`-family names are
/// decoded bytewise (Windows-1252 is close enough to Latin-1 for path data);
/// unknown names fall back to UTF-8. A leading BOM is stripped.
pub fn decode_with_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let name = charset
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
        .replace(['-', '_'], "");

    let text: String = match name.as_str() {
        "latin1" | "iso88591" | "windows1252" | "cp1252" => {
            bytes.iter().map(|&b| b as char).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    };

    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Parse playlist file bytes into a new [`Playlist`].
///
/// Non-blank, non-`#` lines are treated as one path each; extended M3U
/// directives are not interpreted. Relative lines are resolved against
/// `settings.relative_base`, then every line is reconciled with the library
/// through a [`PathIndex`]. Unmatched lines are kept literally unless
/// `settings.remove_invalid`.
pub fn parse_m3u(
    name: &str,
    bytes: &[u8],
    library_paths: &HashSet<String>,
    settings: &IoSettings,
    charset: Option<&str>,
    last_modified: i64,
) -> Playlist {
    let text = decode_with_charset(bytes, charset);
    let base = to_unix_separators(settings.relative_base.trim());
    let index = PathIndex::build(
        library_paths.iter().map(String::as_str),
        settings.match_settings(),
    );

    let mut paths = Vec::new();
    for raw_line in text.lines() {
        let line = to_unix_separators(raw_line.trim());
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let resolved = if is_absolute_path(&line) {
            line
        } else {
            match concat_paths(&base, &line) {
                Some(joined) => joined,
                None => line,
            }
        };

        match index.best_match(&resolved) {
            Some(hit) => paths.push(hit.to_string()),
            None if !settings.remove_invalid => paths.push(resolved),
            None => {}
        }
    }

    Playlist::new(name)
        .with_last_modified(last_modified)
        .add_paths(paths)
}

/// Serialize a realized playlist to M3U text.
///
/// Entries without a resolved track are dropped when
/// `settings.remove_invalid`. With `export_relative` and a usable base,
/// paths are rewritten relative to it; paths outside the base fall back to
/// their stored form. No directive lines are emitted.
pub fn to_m3u(playlist: &RealizedPlaylist, settings: &IoSettings) -> String {
    let base = if settings.export_relative {
        let base = to_unix_separators(settings.relative_base.trim());
        let base = base.trim_end_matches('/').to_string();
        if base.is_empty() {
            None
        } else {
            Some(base)
        }
    } else {
        None
    };

    playlist
        .entries
        .iter()
        .filter(|entry| !settings.remove_invalid || entry.track.is_some())
        .map(|entry| {
            let path = entry.entry.path.as_str();
            match &base {
                Some(base) => relativize(path, base).unwrap_or_else(|| path.to_string()),
                None => path.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_unix_separators(s: &str) -> String {
    s.replace('\\', "/")
}

/// Concatenate a relative path onto a base, collapsing `.` and `..`
/// segments. `None` when the base is empty or the path escapes it; callers
/// keep the original line in that case.
fn concat_paths(base: &str, relative: &str) -> Option<String> {
    if base.is_empty() {
        return None;
    }

    let absolute = base.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    Some(if absolute {
        format!("/{}", joined)
    } else {
        joined
    })
}

fn relativize(path: &str, base: &str) -> Option<String> {
    let rest = path.strip_prefix(base)?;
    let rest = rest.strip_prefix('/')?;
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}
