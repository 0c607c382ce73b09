//! Tiles fetched over HTTP.

use std::sync::Arc;

use crate::reader_writer::{Options, ReadObject, ReaderWriter};
use crate::TileError;

/// Downloads `http://` and `https://` paths and decodes them with the
/// raster drivers. A 404 reads as nothing.
#[derive(Debug, Default)]
pub struct RemoteReaderWriter;

impl RemoteReaderWriter {
    fn fetch(url: &str) -> Result<Option<Vec<u8>>, TileError> {
        let fetch = async {
            let response = reqwest::get(url).await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let bytes = response.error_for_status()?.bytes().await?;
            Ok::<_, TileError>(Some(bytes.to_vec()))
        };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(fetch)
    }
}

impl ReaderWriter for RemoteReaderWriter {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn extensions(&self) -> &[&'static str] {
        &[]
    }

    fn handles(&self, path: &str) -> bool {
        path.starts_with("http://") || path.starts_with("https://")
    }

    fn read(&self, path: &str, _options: &Options) -> Result<Option<ReadObject>, TileError> {
        let Some(bytes) = Self::fetch(path)? else {
            bevy::log::debug!("{} not found", path);
            return Ok(None);
        };
        let dataset = geotile_raster::open_dataset_from_bytes(path, bytes)?;
        let image = geotile_raster::merge_datasets(&[dataset])?;
        Ok(Some(ReadObject::Image(Arc::new(image))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_urls_only() {
        let remote = RemoteReaderWriter;
        assert!(remote.handles("http://a.tile.openstreetmap.org/0/0/0.png"));
        assert!(remote.handles("https://example.org/tiles/1/2/3.jpeg"));
        assert!(!remote.handles("tiles/0/0/0.png"));
        assert!(!remote.handles("0 0 1.tile"));
    }

    #[test]
    fn urls_go_to_the_remote_reader() {
        let options = Options::default();
        let reader = options
            .registry
            .find("http://readymap.org/readymap/tiles/1.0.0/7/0/0/0.jpeg")
            .unwrap();
        assert_eq!(reader.name(), "remote");
    }
}
