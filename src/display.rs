//! Static map page served next to the final dataset.

use std::path::Path;

use tracing::info;

use crate::artifact;
use crate::error::PipelineError;

/// Leaflet page that fetches `restaurants.json` from its own directory.
const MAP_PAGE: &str = include_str!("../assets/restaurant_map.html");

pub fn write_map_page(path: &Path) -> Result<(), PipelineError> {
    artifact::write_text(path, MAP_PAGE)?;
    info!("✓ Generated interactive map: {}", path.display());
    Ok(())
}
