use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{IoError, IoResult};

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

/// Serialize `value` as JSON to `path`.
///
/// The bytes go to a hidden sibling file first and are renamed over `path`
/// once flushed, so readers see either the old file or the new one.
pub fn save_json<V: Serialize + ?Sized>(value: &V, path: impl AsRef<Path>) -> IoResult<()> {
    let path = path.as_ref();
    let tmp = temp_sibling(path);

    let file = File::create(&tmp).map_err(|e| IoError::io(&tmp, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush().map_err(|e| IoError::io(&tmp, e))?;
    writer
        .get_ref()
        .sync_all()
        .map_err(|e| IoError::io(&tmp, e))?;
    drop(writer);

    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        IoError::io(path, e)
    })
}

/// Load a value previously written by [`save_json`].
pub fn load_json<V: DeserializeOwned>(path: impl AsRef<Path>) -> IoResult<V> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| IoError::io(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
