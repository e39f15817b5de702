//! Basic tiered lookup
//!
//! This example demonstrates the three search tiers over a small sample
//! corpus:
//! - Specific: the requested location only
//! - Fallback: the requested location, then its related locations
//! - Extended: everything else of the same entry type

use indexbrain::{IndexBrain, SearchConfigBuilder, SearchReport, SearchRequest, data::TestCorpus};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // US falls back to CA, then MX; GB is unrelated.
    let corpus = TestCorpus::sample()?;
    let brain = IndexBrain::builder()
        .corpus_root(corpus.root())
        .store(corpus.store())
        .build()?;

    for tier in ["specific", "fallback", "extended"] {
        println!("Searching 'Smith' in US ({tier}):");
        let report = brain.search(&SearchRequest::new("Smith", "US", "name", tier))?;
        print_report(&report, 5);
    }

    // Ask for fewer results than the chain could provide
    println!("\nFallback limited to 3:");
    let report = brain.search(&SearchRequest::new("Smith", "US", "name", "fallback").limit("3"))?;
    print_report(&report, 5);

    // Case-sensitive configuration
    println!("\nCase-sensitive search for 'smith':");
    let config = SearchConfigBuilder::new().case_sensitive(true).build();
    let strict = IndexBrain::builder()
        .corpus_root(corpus.root())
        .store(corpus.store())
        .config(config)
        .build()?;
    let report = strict.search(&SearchRequest::new("smith", "US", "name", "fallback"))?;
    print_report(&report, 5);

    let counts = brain.counts("US", "name")?;
    println!(
        "\nCorpus bytes for US names: specific {}, fallback {}, extended {}",
        counts.specific, counts.fallback, counts.extended
    );

    Ok(())
}

fn print_report(report: &SearchReport, limit: usize) {
    for (i, entry) in report.entries.iter().take(limit).enumerate() {
        println!("  {}. {} ({})", i + 1, entry.name, entry.location.abbr);
    }
    if report.entries.is_empty() {
        println!("  no results");
    } else if report.entries.len() > limit {
        println!("  ... and {} more results", report.entries.len() - limit);
    }
    println!("  took {:?}", report.elapsed);
}
