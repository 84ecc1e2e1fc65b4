//! Plain text message templates stored as `<name>.md`.
//!
//! An optional first line `Subject: ...` sets the subject.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Subject used when a template does not declare one.
pub const DEFAULT_SUBJECT: &str = "Mailgate";

const TEMPLATE_EXT: &str = "md";
const SUBJECT_PREFIX: &str = "subject:";

/// A loaded template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Declared or default subject.
    pub subject: String,
    /// Body text with the subject header removed.
    pub body: String,
}

impl Template {
    /// Splits template text into subject and body.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
        let first = first.trim_end_matches('\r');

        let declared = first
            .get(..SUBJECT_PREFIX.len())
            .filter(|p| p.eq_ignore_ascii_case(SUBJECT_PREFIX))
            .map(|_| first[SUBJECT_PREFIX.len()..].trim());

        match declared {
            Some(subject) => {
                let body = match rest.split_once('\n') {
                    Some((blank, tail)) if blank.trim().is_empty() => tail,
                    _ if rest.trim().is_empty() => "",
                    _ => rest,
                };
                Self {
                    subject: subject.to_string(),
                    body: body.to_string(),
                }
            }
            None => Self {
                subject: DEFAULT_SUBJECT.to_string(),
                body: text.to_string(),
            },
        }
    }
}

/// Directory of templates.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// Creates a store over `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Template names, sorted. A missing directory has none.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|e| e == TEMPLATE_EXT))
            .filter_map(|path| path.file_stem().and_then(|s| s.to_str()).map(String::from))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Loads `<name>.md`.
    ///
    /// # Errors
    ///
    /// `TemplateNotFound` if the file does not exist; `Io` if it cannot be
    /// read.
    pub fn load(&self, name: &str) -> Result<Template> {
        let path = self.dir.join(format!("{name}.{TEMPLATE_EXT}"));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::TemplateNotFound(path));
            }
            Err(e) => return Err(e.into()),
        };
        debug!(template = name, "Template loaded");
        Ok(Template::parse(&text))
    }
}
