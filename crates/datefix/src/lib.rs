//! Rewrites `YYYY/M/D` dates to `YYYY-M-D` in data files.
//!
//! Only the separators change. Month and day keep whatever padding they had.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FixError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid date pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("rewrite task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FixError>;

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> FixError + '_ {
    move |source| FixError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Outcome of one `fix_tree` pass. A file that fails does not stop the others.
#[derive(Debug, Default)]
pub struct FixSummary {
    pub scanned: usize,
    pub rewritten: usize,
    pub failures: Vec<FixError>,
}

#[derive(Debug, Clone)]
pub struct DateFixer {
    pattern: Regex,
}

impl DateFixer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(r"(\d{4})/(\d{1,2})/(\d{1,2})")?,
        })
    }

    /// Borrowed when nothing matched.
    pub fn fix_text<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, "${1}-${2}-${3}")
    }

    /// Rewrite one file in place. Returns whether the content changed; an
    /// unchanged file is never written.
    pub async fn fix_file(&self, path: &Path) -> Result<bool> {
        let content = tokio::fs::read_to_string(path).await.map_err(io_err(path))?;
        let fixed = match self.fix_text(&content) {
            Cow::Borrowed(_) => return Ok(false),
            Cow::Owned(fixed) => fixed,
        };
        tokio::fs::write(path, fixed).await.map_err(io_err(path))?;
        debug!(path = %path.display(), "Rewrote dates");
        Ok(true)
    }
}

/// Walk `root` recursively and fix every file whose extension is `extension`,
/// one task per file. Only an unreadable `root` is an error; anything failing
/// below it lands in `FixSummary::failures`.
pub async fn fix_tree(root: &Path, extension: &str) -> Result<FixSummary> {
    let extension = extension.trim_start_matches('.');
    let fixer = Arc::new(DateFixer::new()?);
    let mut tasks = JoinSet::new();
    let mut summary = FixSummary::default();

    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if dir.as_path() == root => return Err(io_err(root)(e)),
            Err(e) => {
                summary.failures.push(io_err(&dir)(e));
                continue;
            }
        };
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    summary.failures.push(io_err(&dir)(e));
                    break;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(file_type) => file_type,
                Err(e) => {
                    summary.failures.push(io_err(&path)(e));
                    continue;
                }
            };
            if file_type.is_dir() {
                dirs.push(path);
            } else if file_type.is_file() && path.extension().is_some_and(|e| e == extension) {
                summary.scanned += 1;
                let fixer = Arc::clone(&fixer);
                tasks.spawn(async move { fixer.fix_file(&path).await });
            }
        }
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(true)) => summary.rewritten += 1,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => summary.failures.push(e),
            Err(e) => summary.failures.push(FixError::Join(e)),
        }
    }

    for failure in &summary.failures {
        warn!(error = %failure, "Date fix failed");
    }
    info!(
        root = %root.display(),
        scanned = summary.scanned,
        rewritten = summary.rewritten,
        failed = summary.failures.len(),
        "Date fix complete"
    );
    Ok(summary)
}
