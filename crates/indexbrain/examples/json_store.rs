//! Loading locations from a JSON snapshot
//!
//! This example builds a corpus on disk by hand, loads the location tables
//! from JSON into a `MemoryStore`, and shows how folders missing from the
//! snapshot are picked up when the caches are built.

use std::{fs, sync::Arc};

use indexbrain::{IndexBrain, LocationStore, MemoryStore, SearchRequest, data::CorpusLayout};

const SNAPSHOT: &str = r#"{
    "locations": [
        { "id": 1, "abbr": "SE", "name": "Sweden", "is_language": false },
        { "id": 2, "abbr": "NO", "name": "Norway", "is_language": false }
    ],
    "related": [
        { "location_id": 1, "related_id": 2, "sort": 0 }
    ],
    "replacements": [
        { "key": "o", "val": "(o|ø|ö)" }
    ],
    "related_terms": [
        { "key": "son", "val": "sen" }
    ],
    "message": "Nordic corpus, trial data"
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::TempDir::new()?;
    let layout = CorpusLayout::new(dir.path());
    for (abbr, name, lines) in [
        ("SE", "Sweden", "Andersson\nJönsson\n"),
        ("NO", "Norway", "Jonsen\nJønsson\n"),
        // Not in the snapshot: added to the store on first build.
        ("DK", "Denmark", "Jonsson\n"),
    ] {
        fs::create_dir_all(layout.folder_path(abbr, name))?;
        fs::write(layout.file_path(abbr, name, 'N'), lines)?;
    }

    let store = Arc::new(MemoryStore::from_json_reader(SNAPSHOT.as_bytes())?);
    let brain = IndexBrain::builder()
        .corpus_root(dir.path())
        .store(Arc::clone(&store))
        .build()?;

    println!("Message: {}", brain.message());
    println!("Stored locations after build: {}", store.locations()?.len());

    let report = brain.search(&SearchRequest::new("Jonsson", "SE", "name", "fallback"))?;
    println!(
        "Fallback for '{}' searched as '{}':",
        report.query_raw, report.query_processed
    );
    for entry in &report.entries {
        println!("  {} ({})", entry.name, entry.location.abbr);
    }

    let report = brain.search(&SearchRequest::new("Jonsson", "SE", "name", "extended"))?;
    println!("Extended:");
    for entry in &report.entries {
        println!("  {} ({})", entry.name, entry.location.abbr);
    }

    for term in brain.related_terms("Jonsson") {
        println!("Could be: {} -> {}", term.key, term.val);
    }

    Ok(())
}
