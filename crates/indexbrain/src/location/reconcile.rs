use ahash::AHashSet as HashSet;
use indexbrain_data::{CorpusLayout, LocationStore, Result};
use tracing::{info, instrument, warn};

use super::{Location, LocationGraph};

/// Build the location graph from the store and the corpus folders.
///
/// Every persisted location is kept. A folder whose abbreviation the store
/// does not know is inserted so it gets a stable identifier; a failed insert
/// is logged and the folder left out of this generation. Related rows are
/// appended to their location's chain in `(location_id, sort)` order.
#[instrument(name = "Reconcile locations", level = "info", skip_all, fields(root = ?layout.root()))]
pub fn reconcile(layout: &CorpusLayout, store: &dyn LocationStore) -> Result<LocationGraph> {
    let folders = layout.scan_folders()?;
    let mut locations: Vec<Location> = store
        .locations()?
        .into_iter()
        .map(Location::from)
        .collect();

    let known: HashSet<String> = locations.iter().map(|l| l.abbr.clone()).collect();
    let mut num_updated = 0usize;
    for folder in folders.into_iter().filter(|f| !known.contains(&f.abbr)) {
        match store.insert_location(&folder.abbr, &folder.name, false) {
            Ok(id) => {
                info!(abbr = %folder.abbr, name = %folder.name, %id, "added location from corpus folder");
                locations.push(Location::new(id, folder.abbr, folder.name));
                num_updated += 1;
            }
            Err(e) => {
                warn!(abbr = %folder.abbr, error = %e, "could not persist location, skipping");
            }
        }
    }

    for row in store.related()? {
        match locations.iter_mut().find(|l| l.id == row.location_id) {
            Some(location) => location.related_ids.push(row.related_id),
            None => {
                warn!(location_id = %row.location_id, related_id = %row.related_id, "related row for unknown location, ignoring");
            }
        }
    }

    let graph = LocationGraph::from_locations(locations);
    info!(num_updated, num_locations = graph.len(), "locations reconciled");
    Ok(graph)
}
