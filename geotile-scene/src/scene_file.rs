//! Plain serde_json dump of serializable scene objects, wrapped in a small
//! envelope so readers can reject foreign files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const FORMAT: &str = "geotile";
pub const VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum SceneFileError {
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("not a geotile scene file (format {format:?}, version {version})")]
    Format { format: String, version: u32 },
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format: &'a str,
    version: u32,
    object: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    format: String,
    version: u32,
    object: T,
}

pub fn write_object<T: Serialize>(path: impl AsRef<Path>, object: &T) -> Result<(), SceneFileError> {
    let mut writer = BufWriter::new(File::create(path)?);
    let envelope = EnvelopeRef {
        format: FORMAT,
        version: VERSION,
        object,
    };
    serde_json::to_writer(&mut writer, &envelope)?;
    writer.flush()?;
    Ok(())
}

pub fn read_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, SceneFileError> {
    let reader = BufReader::new(File::open(path)?);
    let envelope: Envelope<T> = serde_json::from_reader(reader)?;
    if envelope.format != FORMAT || envelope.version != VERSION {
        return Err(SceneFileError::Format {
            format: envelope.format,
            version: envelope.version,
        });
    }
    Ok(envelope.object)
}
