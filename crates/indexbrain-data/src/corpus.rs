//! On-disk corpus layout.
//!
//! ```text
//! <root>/
//!   US United States/
//!     UsN.txt   names
//!     UsP.txt   places
//!     UsO.txt   other
//!   CA Canada/
//!     CaN.txt
//! ```
//!
//! Folder names are `"<ABBR> <Name>"`; file names are the title-cased
//! abbreviation followed by the entry type code.
use std::{
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::{debug, warn};

use crate::error::{DataError, Result};

/// Folder that sync tooling drops into the corpus root; never a location.
const IGNORED_FOLDERS: &[&str] = &[".stfolder"];

/// A location discovered from a corpus folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLocation {
    pub abbr: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusLayout {
    root: PathBuf,
}

impl CorpusLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_path(&self, abbr: &str, name: &str) -> PathBuf {
        self.root.join(folder_name(abbr, name))
    }

    pub fn file_path(&self, abbr: &str, name: &str, code: char) -> PathBuf {
        self.folder_path(abbr, name)
            .join(corpus_file_name(abbr, code))
    }

    /// Glob, relative to the root, matching every location's file for `code`.
    pub fn glob_for(code: char) -> String {
        format!("*/*{code}.txt")
    }

    /// List the location folders under the root.
    ///
    /// Unparsable folder names are skipped with a warning; a missing root is
    /// an error since nothing can be served without it.
    pub fn scan_folders(&self) -> Result<Vec<FolderLocation>> {
        if !self.root.is_dir() {
            return Err(DataError::CorpusRootMissing(self.root.clone()));
        }

        let mut found = Vec::new();
        let entries = fs::read_dir(&self.root)?
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .sorted_by_key(fs::DirEntry::file_name);

        for entry in entries {
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let dir_name = entry.file_name();
            let dir_name = dir_name.to_string_lossy();
            if IGNORED_FOLDERS.contains(&dir_name.as_ref()) {
                continue;
            }
            match parse_folder_name(&dir_name) {
                Some((abbr, name)) => found.push(FolderLocation {
                    abbr: abbr.to_string(),
                    name: name.to_string(),
                }),
                None => warn!(folder = %dir_name, "folder name is not '<ABBR> <Name>', ignoring"),
            }
        }

        debug!(count = found.len(), root = ?self.root, "scanned corpus folders");
        Ok(found)
    }
}

pub fn folder_name(abbr: &str, name: &str) -> String {
    format!("{abbr} {name}")
}

/// Split a folder name into abbreviation and display name at the first space.
pub fn parse_folder_name(dir: &str) -> Option<(&str, &str)> {
    let (abbr, name) = dir.split_once(' ')?;
    if abbr.is_empty() || name.is_empty() {
        return None;
    }
    Some((abbr, name))
}

/// `"US"` + `'N'` becomes `"UsN.txt"`.
pub fn corpus_file_name(abbr: &str, code: char) -> String {
    format!("{}{code}.txt", title_case(&abbr.to_lowercase()))
}

/// Upper-case every letter that starts a word; a word starts after anything
/// that is not alphanumeric or an underscore.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}

/// Abbreviation of the location that owns the corpus file at `path`, taken
/// from its parent folder name.
pub fn abbr_from_match_path(path: &Path) -> Option<&str> {
    let folder = path.parent()?.file_name()?.to_str()?;
    let abbr = folder.split(' ').next()?;
    (!abbr.is_empty()).then_some(abbr)
}

/// Size of a corpus file in bytes; a missing file counts as empty.
pub fn file_len(path: &Path) -> u64 {
    match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => {
            warn!(error = %e, path = ?path, "could not stat corpus file");
            0
        }
    }
}
