use std::path::Path;

use geotile_database::{
    DatabasePager, Options, TileDatabase, TileDatabaseSettings, TileError,
};
use geotile_scene::visitors::{CountNodes, LodSelector};
use geotile_scene::{BoundingSphere, Node};
use image::{ImageBuffer, Rgb};

/// Writes `{dir}/{z}/{x}/{y}.png` for every tile down to `max_level`.
fn write_tiles(dir: &Path, no_x: u32, no_y: u32, max_level: u32) {
    for level in 0..=max_level {
        for x in 0..no_x << level {
            for y in 0..no_y << level {
                let folder = dir.join(level.to_string()).join(x.to_string());
                std::fs::create_dir_all(&folder).unwrap();
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_fn(4, 4, |_, _| Rgb([level as u8 * 60, x as u8, y as u8]));
                buffer.save(folder.join(format!("{}.png", y))).unwrap();
            }
        }
    }
}

fn settings(dir: &Path, max_level: u32) -> TileDatabaseSettings {
    TileDatabaseSettings {
        no_x: 2,
        no_y: 1,
        max_level,
        ellipsoid_model: None,
        image_layer: format!("{}/{{z}}/{{x}}/{{y}}.png", dir.display()),
        ..Default::default()
    }
}

fn expand_everything(database: &TileDatabase, pager: &mut DatabasePager) -> (usize, usize) {
    let mut selector = LodSelector::new(|_: &BoundingSphere| 1.0);
    database.accept(&mut selector);
    let requests = selector.take_requests();
    let started = pager.request(requests);
    (started, pager.wait())
}

#[test]
fn root_is_built_from_level_zero() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 0);

    let mut database = TileDatabase::new(settings(dir.path(), 2));
    database.read_database(&Options::default()).unwrap();

    let counts = CountNodes::of(&database);
    assert_eq!(counts.paged_lods, 2);
    assert_eq!(counts.tiles, 2);
    assert_eq!(database.statistics().unwrap().num_tiles_read, 2);
}

#[test]
fn pager_expands_down_to_the_leaves() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 2);

    let mut database = TileDatabase::new(settings(dir.path(), 2));
    database.read_database(&Options::default()).unwrap();
    let mut pager = DatabasePager::new(database.options().clone());

    assert_eq!(expand_everything(&database, &mut pager), (2, 2));
    assert_eq!(expand_everything(&database, &mut pager), (8, 8));
    assert_eq!(expand_everything(&database, &mut pager), (0, 0));
    assert_eq!(pager.in_flight(), 0);

    let mut selector = LodSelector::new(|_: &BoundingSphere| 1.0);
    database.accept(&mut selector);
    assert_eq!(selector.drawn.len(), 32);
    assert!(selector.requests.is_empty());

    let settings = database.settings.clone();
    let mut area = 0.0;
    for extents in &selector.drawn {
        area += extents.width() * extents.height();
    }
    assert!((area - settings.extents.width() * settings.extents.height()).abs() < 1e-6);

    assert_eq!(database.statistics().unwrap().num_tiles_read, 2 + 8 + 32);
}

#[test]
fn small_tiles_stay_coarse() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 1);

    let mut database = TileDatabase::new(settings(dir.path(), 1));
    database.read_database(&Options::default()).unwrap();

    let mut selector = LodSelector::new(|_: &BoundingSphere| 0.1);
    database.accept(&mut selector);
    assert_eq!(selector.drawn.len(), 2);
    assert!(selector.take_requests().is_empty());
}

#[test]
fn missing_tiles_leave_gaps() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 1);
    std::fs::remove_file(dir.path().join("1").join("0").join("0.png")).unwrap();

    let mut database = TileDatabase::new(settings(dir.path(), 1));
    database.read_database(&Options::default()).unwrap();
    let mut pager = DatabasePager::new(database.options().clone());
    assert_eq!(expand_everything(&database, &mut pager), (2, 2));

    let mut selector = LodSelector::new(|_: &BoundingSphere| 1.0);
    database.accept(&mut selector);
    assert_eq!(selector.drawn.len(), 7);
}

#[test]
fn missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let mut database = TileDatabase::new(settings(dir.path(), 1));
    assert!(matches!(
        database.read_database(&Options::default()),
        Err(TileError::RootLoad(_))
    ));
    assert!(database.child.is_none());
}

#[test]
fn settings_file_drives_an_ellipsoid_database() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 0);
    let mut settings = settings(dir.path(), 0);
    settings.ellipsoid_model = Some(Default::default());
    let path = dir.path().join("settings.json");
    settings.write_json(&path).unwrap();

    let mut database = TileDatabase::new(TileDatabaseSettings::read_json(&path).unwrap());
    let options = Options {
        ecef_resolution: 4,
        ..Options::default()
    };
    database.read_database(&options).unwrap();

    // max level 0: the root tiles are leaves
    let counts = CountNodes::of(&database);
    assert_eq!(counts.paged_lods, 0);
    assert_eq!(counts.tiles, 2);

    let bound = geotile_scene::visitors::ComputeBounds::of(&database);
    assert!(bound.radius > 6.0e6);
}

#[test]
fn tiles_without_children_are_requested_once() {
    let dir = tempfile::tempdir().unwrap();
    write_tiles(dir.path(), 2, 1, 0);

    let mut database = TileDatabase::new(settings(dir.path(), 3));
    database.read_database(&Options::default()).unwrap();
    let mut pager = DatabasePager::new(database.options().clone());

    assert_eq!(expand_everything(&database, &mut pager), (2, 0));
    for _ in 0..4 {
        assert_eq!(expand_everything(&database, &mut pager), (0, 0));
    }

    let mut selector = LodSelector::new(|_: &BoundingSphere| 1.0);
    database.accept(&mut selector);
    assert_eq!(selector.drawn.len(), 2);
    assert!(selector.requests.is_empty());
}
