//! Snapshot file format for persisted graph stores.
//!
//! ```text
//! [8 bytes: magic "STRNDSN1"]
//! repeated:
//!   [4 bytes: payload length (little-endian u32)]
//!   [4 bytes: CRC32 of payload (little-endian u32)]
//!   [N bytes: payload (bincode-serialized Object)]
//! ```
//!
//! Snapshots are written to a sibling temp file and renamed into place.
//! On read, entries failing the CRC check are skipped and a truncated tail
//! ends the scan.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use strand_object::Object;
use tracing::warn;

use crate::error::{StoreError, StoreResult};

const MAGIC: &[u8; 8] = b"STRNDSN1";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Write `objects` to `path`, replacing any previous snapshot.
pub fn write_snapshot<'a>(
    path: &Path,
    objects: impl IntoIterator<Item = &'a Object>,
) -> StoreResult<usize> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp)?);
    writer.write_all(MAGIC)?;

    let mut count = 0;
    for object in objects {
        let payload =
            bincode::serialize(object).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let length = u32::try_from(payload.len())
            .map_err(|_| StoreError::Serialization("object too large for snapshot".into()))?;
        writer.write_all(&length.to_le_bytes())?;
        writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
        writer.write_all(&payload)?;
        count += 1;
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    fs::rename(&tmp, path)?;
    Ok(count)
}

/// Read every intact object from the snapshot at `path`.
pub fn read_snapshot(path: &Path) -> StoreResult<Vec<Object>> {
    let mut data = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut data)?;

    let body = data
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| StoreError::Corrupt {
            path: path.to_path_buf(),
            reason: "missing snapshot header".into(),
        })?;

    let mut objects = Vec::new();
    let mut offset = 0usize;
    while offset + HEADER_SIZE <= body.len() {
        let header = &body[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        if length == 0 || start + length > body.len() {
            warn!(offset, length, "truncated snapshot entry; stopping");
            break;
        }
        let payload = &body[start..start + length];
        offset = start + length;

        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping entry"
            );
            continue;
        }
        match bincode::deserialize::<Object>(payload) {
            Ok(object) => objects.push(object),
            Err(e) => warn!(offset, error = %e, "undecodable snapshot entry; skipping"),
        }
    }
    Ok(objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::{Seek, SeekFrom};
    use strand_types::{Map, Value};

    fn object(n: i64) -> Object {
        Object::new("test/entry").with_data(
            Map::new()
                .with("n", n)
                .with("f", 0.5)
                .with("raw", Value::Bytes(vec![1, 2, 3])),
        )
    }

    #[test]
    fn write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.snapshot");
        let objects = vec![object(1), object(2), object(3)];
        assert_eq!(write_snapshot(&path, &objects).unwrap(), 3);
        assert_eq!(read_snapshot(&path).unwrap(), objects);
    }

    #[test]
    fn crc_detects_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.snapshot");
        write_snapshot(&path, &[object(1), object(2)]).unwrap();

        // Flip the first payload byte of the first entry.
        let first_payload = (MAGIC.len() + HEADER_SIZE) as u64;
        let mut file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(first_payload)).unwrap();
        let mut buf = [0u8; 1];
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(first_payload)).unwrap();
        file.write_all(&buf).unwrap();
        file.sync_all().unwrap();

        assert_eq!(read_snapshot(&path).unwrap(), vec![object(2)]);
    }

    #[test]
    fn truncated_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tail.snapshot");
        write_snapshot(&path, &[object(1), object(2)]).unwrap();
        let len = fs::metadata(&path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&path)
            .unwrap()
            .set_len(len - 4)
            .unwrap();

        assert_eq!(read_snapshot(&path).unwrap(), vec![object(1)]);
    }

    #[test]
    fn foreign_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other");
        fs::write(&path, b"not a snapshot").unwrap();
        assert!(matches!(read_snapshot(&path), Err(StoreError::Corrupt { .. })));
    }
}
