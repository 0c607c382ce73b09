use std::path::Path;

use anyhow::{Context, Result};
use geotile_database::{DatabasePager, Options, TileDatabase, TileDatabaseSettings};
use geotile_scene::visitors::{CountNodes, LodSelector};
use geotile_scene::{BoundingSphere, Node};

/// Loads the tile database described by `settings` and pages in `depth`
/// levels below the root, as a viewer looking at every tile would.
pub fn expand(settings: &Path, depth: u32) -> Result<()> {
    let settings = TileDatabaseSettings::read_json(settings)
        .with_context(|| format!("could not read {}", settings.display()))?;

    let mut database = TileDatabase::new(settings);
    database
        .read_database(&Options::default())
        .context("could not load the tile database")?;
    let mut pager = DatabasePager::new(database.options().clone());

    for pass in 0..depth {
        let mut selector = LodSelector::new(|_: &BoundingSphere| 1.0);
        database.accept(&mut selector);
        let started = pager.request(selector.take_requests());
        if started == 0 {
            break;
        }
        let installed = pager.wait();
        bevy::log::info!(
            "pass {}: requested {} tiles, installed {}",
            pass + 1,
            started,
            installed
        );
    }

    let counts = CountNodes::of(&database);
    println!(
        "groups {}, paged lods {}, tiles {}",
        counts.groups, counts.paged_lods, counts.tiles
    );
    if let Some(stats) = database.statistics() {
        println!("num tiles read {}", stats.num_tiles_read);
        println!("total time reading tiles {:?}", stats.total_time_reading_tiles);
        if let Some(average) = stats.average_time_per_tile() {
            println!("average time per tile {:?}", average);
        }
    }
    Ok(())
}
