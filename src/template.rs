//! Template resolution and composition.
//!
//! The resolver maps a page into the template tree ([`crate::path::rehome`])
//! and walks only the directories on the page's lineage, scoring each
//! template file it sees: an exact extension-stripped path match beats the
//! reserved `_` fallback, which beats nothing. Composition then splices
//! `[[name]]` inclusion directives, a naïve recursive include resolved
//! against the template root, before the template text is handed to the
//! engine.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::path;

/// The extension-less file name of the global fallback template (`_.html`
/// for an `html` template extension).
pub const FALLBACK_STEM: &str = "_";

const INCLUDE_OPEN: &str = "[[";
const INCLUDE_CLOSE: &str = "]]";

/// Inclusion directives deeper than this are assumed to be a cycle.
const MAX_INCLUDE_DEPTH: usize = 32;

/// Finds the single best-matching template file for a page.
pub struct Resolver<'a> {
    source_dir: &'a Path,
    template_dir: &'a Path,
    template_extension: &'a str,
}

impl<'a> Resolver<'a> {
    pub fn new(
        source_dir: &'a Path,
        template_dir: &'a Path,
        template_extension: &'a str,
    ) -> Resolver<'a> {
        Resolver {
            source_dir,
            template_dir,
            template_extension,
        }
    }

    /// Resolves the template for `page` (a path under the source root).
    ///
    /// The walk visits only directories that are ancestors of the rehomed
    /// page, in a stable lexicographic order, and folds the candidates down
    /// to the highest-scoring one, first seen winning ties. No candidate
    /// scoring above zero is the recoverable "no matching template" error;
    /// the caller skips that page, not the run.
    pub fn resolve(&self, page: &Path) -> Result<PathBuf> {
        let rehomed = path::rehome(page, self.source_dir, self.template_dir);
        let best = WalkDir::new(self.template_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || path::should_descend(entry.path(), &rehomed)
            })
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    (!entry.file_type().is_dir()).then(|| entry.into_path())
                }
                Err(err) => {
                    log::warn!("walking {}: {}", self.template_dir.display(), err);
                    None
                }
            })
            .fold(None::<(PathBuf, u8)>, |best, candidate| {
                let score = self.validity(&candidate, &rehomed);
                let top = best.as_ref().map_or(0, |(_, top)| *top);
                // Strictly greater, so the first candidate at a given score
                // wins and zero never places.
                if score > top {
                    Some((candidate, score))
                } else {
                    best
                }
            });
        match best {
            Some((template, _)) => Ok(template),
            None => Err(Error::NoTemplate(page.to_path_buf())),
        }
    }

    /// Scores one candidate file against the rehomed page: 2 for an exact
    /// extension-stripped path match, 1 for the `_` fallback, 0 otherwise.
    /// Files without the template extension always score 0.
    fn validity(&self, file: &Path, rehomed: &Path) -> u8 {
        if path::extension(file).as_deref() != Some(self.template_extension) {
            return 0;
        }
        if path::strip_extension(file) == path::strip_extension(rehomed) {
            return 2;
        }
        if file.file_stem() == Some(std::ffi::OsStr::new(FALLBACK_STEM)) {
            return 1;
        }
        0
    }
}

/// Reads `file` (relative to `template_dir`) and recursively splices every
/// `[[name]]` directive in-place with the composed contents of `name`.
///
/// ```text
/// a.html: "hello {{.name}}"
/// b.html: "<p>[[a.html]]</p>"
/// c.html: "<body>[[b.html]]</body>"
/// ```
///
/// Composing `c.html` yields `<body><p>hello {{.name}}</p></body>`.
pub fn compose(template_dir: &Path, file: &str) -> Result<String> {
    compose_at_depth(template_dir, file, 0)
}

fn compose_at_depth(template_dir: &Path, file: &str, depth: usize) -> Result<String> {
    if depth >= MAX_INCLUDE_DEPTH {
        return Err(Error::IncludeDepth(file.to_owned()));
    }
    let full = template_dir.join(file);
    let text = fs::read_to_string(&full).map_err(|err| Error::Open {
        path: full,
        err,
    })?;

    let mut out = String::with_capacity(text.len());
    let mut rest = text.as_str();
    loop {
        let start = match rest.find(INCLUDE_OPEN) {
            None => {
                out.push_str(rest);
                break;
            }
            Some(start) => start,
        };
        out.push_str(&rest[..start]);

        let after = &rest[start + INCLUDE_OPEN.len()..];
        let end = after
            .find(INCLUDE_CLOSE)
            .ok_or_else(|| Error::UnclosedInclude(file.to_owned()))?;
        let name = &after[..end];
        if name.contains('\n') || name.contains('\r') {
            // A directive spanning lines is almost certainly unclosed.
            return Err(Error::UnclosedInclude(file.to_owned()));
        }

        out.push_str(&compose_at_depth(template_dir, name, depth + 1)?);
        rest = &after[end + INCLUDE_CLOSE.len()..];
    }
    Ok(out)
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a template resolution or composition error. All variants are
/// per-file-recoverable.
#[derive(Debug)]
pub enum Error {
    /// Returned when no candidate in the template tree scores above zero
    /// for a page.
    NoTemplate(PathBuf),

    /// Returned when a template file can't be read.
    Open { path: PathBuf, err: io::Error },

    /// Returned for a `[[` directive with no closing `]]` on the same line.
    UnclosedInclude(String),

    /// Returned when inclusion recursion exceeds the depth cap, which in
    /// practice means a template includes itself.
    IncludeDepth(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NoTemplate(page) => {
                write!(f, "{}: no matching template found", page.display())
            }
            Error::Open { path, err } => {
                write!(f, "opening template '{}': {}", path.display(), err)
            }
            Error::UnclosedInclude(file) => {
                write!(f, "{}: unclosed {}", file, INCLUDE_OPEN)
            }
            Error::IncludeDepth(file) => {
                write!(f, "{}: inclusion depth exceeded; template cycle?", file)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
            _ => None,
        }
    }
}
