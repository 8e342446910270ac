//! Single-file persistence for [`InMemoryStore`].
//!
//! An image is the whole arena, bincode-encoded and framed with a small
//! header:
//!
//! ```text
//! [4 bytes: magic "GRVE"]
//! [4 bytes: format version (little-endian u32)]
//! [8 bytes: body length (little-endian u64)]
//! [4 bytes: CRC32 of body (little-endian u32)]
//! [N bytes: body (bincode-serialized arena)]
//! ```
//!
//! Images are written to a temporary sibling file and renamed into place,
//! so a crash mid-save leaves the previous image intact.

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::memory::{Arena, InMemoryStore};

/// Image file magic.
pub const MAGIC: [u8; 4] = *b"GRVE";

/// Current image format version. Always positive.
pub const FORMAT_VERSION: u32 = 1;

/// Header size: magic + version + length + CRC.
const HEADER_SIZE: usize = 4 + 4 + 8 + 4;

struct Header {
    version: u32,
    body_len: u64,
    crc: u32,
}

fn parse_header(bytes: &[u8]) -> Option<Header> {
    if bytes.len() < HEADER_SIZE || bytes[..4] != MAGIC {
        return None;
    }
    let version = u32::from_le_bytes(bytes[4..8].try_into().ok()?);
    let body_len = u64::from_le_bytes(bytes[8..16].try_into().ok()?);
    let crc = u32::from_le_bytes(bytes[16..20].try_into().ok()?);
    Some(Header {
        version,
        body_len,
        crc,
    })
}

/// Encode a store into image bytes.
pub fn encode(store: &InMemoryStore) -> StoreResult<Vec<u8>> {
    let arena = store.snapshot()?;
    let body =
        bincode::serialize(&arena).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(body.len() as u64).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode image bytes into a store.
pub fn decode(bytes: &[u8]) -> StoreResult<InMemoryStore> {
    let header =
        parse_header(bytes).ok_or_else(|| StoreError::Format("missing image header".into()))?;
    if header.version == 0 || header.version > FORMAT_VERSION {
        return Err(StoreError::Format(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    let body = &bytes[HEADER_SIZE..];
    if body.len() as u64 != header.body_len {
        return Err(StoreError::Format(format!(
            "truncated image: header announces {} bytes, found {}",
            header.body_len,
            body.len()
        )));
    }
    let computed = crc32fast::hash(body);
    if computed != header.crc {
        return Err(StoreError::ChecksumMismatch {
            expected: header.crc,
            computed,
        });
    }
    let arena: Arena =
        bincode::deserialize(body).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(InMemoryStore::from_arena(arena))
}

/// Load an image file.
///
/// A missing or unreadable file is reported as [`StoreError::Io`]; a file
/// in another format as [`StoreError::Format`].
pub fn load(path: &Path) -> StoreResult<InMemoryStore> {
    let mut bytes = Vec::new();
    BufReader::new(File::open(path)?).read_to_end(&mut bytes)?;
    let store = decode(&bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "loaded store image");
    Ok(store)
}

/// Save a store as an image file, replacing any previous image atomically.
pub fn save(store: &InMemoryStore, path: &Path) -> StoreResult<()> {
    let bytes = encode(store)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent)?;
            parent
        }
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved store image");
    Ok(())
}

/// Identify an image file.
///
/// Returns the format version (always positive) for a valid image and `0`
/// for a file that exists but is not one. A missing or unreadable file is
/// an I/O error, never `0`.
pub fn probe_format(path: &Path) -> io::Result<u32> {
    let mut bytes = Vec::new();
    File::open(path)?.read_to_end(&mut bytes)?;
    let Some(header) = parse_header(&bytes) else {
        return Ok(0);
    };
    let body = &bytes[HEADER_SIZE..];
    if header.version == 0
        || body.len() as u64 != header.body_len
        || crc32fast::hash(body) != header.crc
    {
        return Ok(0);
    }
    Ok(header.version)
}
