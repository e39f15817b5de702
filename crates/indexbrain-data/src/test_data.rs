//! Throwaway corpora for tests.
//!
//! Builds a corpus directory inside a [`TempDir`] together with a
//! [`MemoryStore`] holding the matching location rows.
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use tracing::info;

use crate::{
    corpus::CorpusLayout,
    error::{DataError, Result},
    records::{LocationId, LocationRecord},
    store::{LocationStore, MemoryStore},
};

#[derive(Debug, Clone)]
struct TestLocation {
    abbr: String,
    name: String,
    on_disk: bool,
    persisted: bool,
    files: Vec<(char, String)>,
}

/// Describes a test corpus; see [`TestCorpus::builder`].
#[derive(Debug, Clone, Default)]
pub struct TestCorpusBuilder {
    locations: Vec<TestLocation>,
    related: Vec<(String, Vec<String>)>,
    replacements: Vec<(String, String)>,
    related_terms: Vec<(String, String)>,
    message: Option<String>,
}

impl TestCorpusBuilder {
    /// A location with a folder on disk and a row in the store.
    pub fn location(self, abbr: &str, name: &str) -> Self {
        self.push_location(abbr, name, true, true)
    }

    /// A folder on disk the store does not know about yet.
    pub fn folder_only(self, abbr: &str, name: &str) -> Self {
        self.push_location(abbr, name, true, false)
    }

    /// A store row without a folder on disk.
    pub fn store_only(self, abbr: &str, name: &str) -> Self {
        self.push_location(abbr, name, false, true)
    }

    fn push_location(mut self, abbr: &str, name: &str, on_disk: bool, persisted: bool) -> Self {
        self.locations.push(TestLocation {
            abbr: abbr.to_string(),
            name: name.to_string(),
            on_disk,
            persisted,
            files: Vec::new(),
        });
        self
    }

    /// Write `lines` (newline terminated) as the `code` file of `abbr`.
    pub fn file(self, abbr: &str, code: char, lines: &[&str]) -> Self {
        let mut contents = lines.join("\n");
        if !lines.is_empty() {
            contents.push('\n');
        }
        self.raw_file(abbr, code, &contents)
    }

    /// Write `contents` verbatim as the `code` file of `abbr`.
    pub fn raw_file(mut self, abbr: &str, code: char, contents: &str) -> Self {
        if let Some(location) = self.locations.iter_mut().find(|l| l.abbr == abbr) {
            location.files.push((code, contents.to_string()));
        }
        self
    }

    /// Fallback chain of `abbr`, in order.
    pub fn related(mut self, abbr: &str, chain: &[&str]) -> Self {
        self.related.push((
            abbr.to_string(),
            chain.iter().map(ToString::to_string).collect(),
        ));
        self
    }

    pub fn replacement(mut self, key: &str, val: &str) -> Self {
        self.replacements.push((key.to_string(), val.to_string()));
        self
    }

    pub fn related_term(mut self, key: &str, val: &str) -> Self {
        self.related_terms.push((key.to_string(), val.to_string()));
        self
    }

    pub fn message(mut self, message: &str) -> Self {
        self.message = Some(message.to_string());
        self
    }

    pub fn build(self) -> Result<TestCorpus> {
        let dir = TempDir::new()?;
        let layout = CorpusLayout::new(dir.path());
        let store = Arc::new(MemoryStore::new());

        for location in &self.locations {
            if location.on_disk {
                let folder = layout.folder_path(&location.abbr, &location.name);
                fs::create_dir_all(&folder)?;
                for (code, contents) in &location.files {
                    let path = layout.file_path(&location.abbr, &location.name, *code);
                    fs::write(path, contents)?;
                }
            }
            if location.persisted {
                store.insert_location(&location.abbr, &location.name, false)?;
            }
        }

        let persisted = store.locations()?;
        for (abbr, chain) in &self.related {
            let location_id = id_of(&persisted, abbr)?;
            for (sort, related_abbr) in chain.iter().enumerate() {
                store.add_related(location_id, id_of(&persisted, related_abbr)?, sort as i64);
            }
        }
        for (key, val) in self.replacements {
            store.add_replacement(key, val);
        }
        for (key, val) in self.related_terms {
            store.add_related_term(key, val);
        }
        if let Some(message) = self.message {
            store.set_message(message);
        }

        info!(root = ?dir.path(), locations = self.locations.len(), "created test corpus");
        Ok(TestCorpus { dir, store })
    }
}

fn id_of(persisted: &[LocationRecord], abbr: &str) -> Result<LocationId> {
    persisted
        .iter()
        .find(|l| l.abbr == abbr)
        .map(|l| l.id)
        .ok_or_else(|| DataError::Store(format!("related location {abbr} is not persisted")))
}

/// A corpus on disk plus its store. The directory is removed on drop.
#[derive(Debug)]
pub struct TestCorpus {
    dir: TempDir,
    store: Arc<MemoryStore>,
}

impl TestCorpus {
    pub fn builder() -> TestCorpusBuilder {
        TestCorpusBuilder::default()
    }

    /// `US` falling back to `CA` then `MX`, plus an unrelated `GB`, with a few
    /// names each and a couple of US places.
    pub fn sample() -> Result<Self> {
        Self::builder()
            .location("US", "United States")
            .location("CA", "Canada")
            .location("MX", "Mexico")
            .location("GB", "United Kingdom")
            .file("US", 'N', &["Smith", "Smithson", "Jones"])
            .file("CA", 'N', &["Smithers", "Tremblay", "Smythe"])
            .file("MX", 'N', &["Smithez", "Garcia"])
            .file("GB", 'N', &["Smith-Jones", "Taylor"])
            .file("US", 'P', &["Springfield", "Portland"])
            .related("US", &["CA", "MX"])
            .build()
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn root_path_buf(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn layout(&self) -> CorpusLayout {
        CorpusLayout::new(self.dir.path())
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.store)
    }

    /// Identifier the store assigned to `abbr`.
    pub fn id_of(&self, abbr: &str) -> Option<LocationId> {
        self.store
            .locations()
            .ok()?
            .into_iter()
            .find(|l| l.abbr == abbr)
            .map(|l| l.id)
    }
}
