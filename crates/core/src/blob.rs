//! Content-addressed blob storage with compression

use crate::error::{CoreError, Result};
use crate::hash::{hash_bytes, hash_path, ContentHash};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Blob header format (version 1)
#[derive(Debug, Clone)]
pub struct BlobHeaderV1 {
    /// Magic bytes: "MRB1"
    pub magic: [u8; 4],
    /// Flags: bit0=compressed, bit1-7=reserved
    pub flags: u8,
    /// Original size (before compression)
    pub orig_len: u64,
    /// Stored size (after compression, if compressed)
    pub stored_len: u64,
}

impl BlobHeaderV1 {
    const MAGIC: [u8; 4] = *b"MRB1";
    const FLAG_COMPRESSED: u8 = 0b0000_0001;
    const LEN: usize = 21;

    /// Create a new blob header
    pub fn new(orig_len: u64, stored_len: u64, compressed: bool) -> Self {
        let flags = if compressed { Self::FLAG_COMPRESSED } else { 0 };
        Self {
            magic: Self::MAGIC,
            flags,
            orig_len,
            stored_len,
        }
    }

    /// Check if blob is compressed
    pub fn is_compressed(&self) -> bool {
        (self.flags & Self::FLAG_COMPRESSED) != 0
    }

    /// Serialize header to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.magic);
        bytes.push(self.flags);
        bytes.extend_from_slice(&self.orig_len.to_le_bytes());
        bytes.extend_from_slice(&self.stored_len.to_le_bytes());
        bytes
    }

    /// Deserialize header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::LEN {
            return Err(CoreError::Corrupt(format!(
                "invalid blob header length: expected at least {} bytes, got {}",
                Self::LEN,
                bytes.len()
            )));
        }

        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != Self::MAGIC {
            return Err(CoreError::Corrupt(format!(
                "invalid blob magic: expected {:?}, got {:?}",
                Self::MAGIC,
                magic
            )));
        }

        let flags = bytes[4];
        let orig_len = u64::from_le_bytes(bytes[5..13].try_into().unwrap());
        let stored_len = u64::from_le_bytes(bytes[13..21].try_into().unwrap());

        Ok(Self {
            magic,
            flags,
            orig_len,
            stored_len,
        })
    }
}

/// Metadata for a stored blob
#[derive(Debug, Clone)]
pub struct BlobMeta {
    /// Original size
    pub size: u64,
    /// Whether this blob is stored compressed
    pub compressed: bool,
}

/// Encode data into header + payload, compressing above the threshold
fn encode_blob(data: &[u8], compression_threshold: u64) -> (BlobMeta, Vec<u8>) {
    let orig_len = data.len() as u64;
    let should_compress = orig_len > compression_threshold;

    let (stored_data, stored_len, compressed) = if should_compress {
        match zstd::encode_all(data, 3) {
            // Only keep compression if it actually reduces size
            Ok(compressed_data) if compressed_data.len() < data.len() => {
                let len = compressed_data.len() as u64;
                (compressed_data, len, true)
            }
            _ => (data.to_vec(), orig_len, false),
        }
    } else {
        (data.to_vec(), orig_len, false)
    };

    let header = BlobHeaderV1::new(orig_len, stored_len, compressed);
    let mut serialized = header.to_bytes();
    serialized.extend_from_slice(&stored_data);

    (
        BlobMeta {
            size: orig_len,
            compressed,
        },
        serialized,
    )
}

/// Decode header + payload back into the original bytes
fn decode_blob(serialized: &[u8]) -> Result<Vec<u8>> {
    let header = BlobHeaderV1::from_bytes(serialized)?;

    let data_start = BlobHeaderV1::LEN;
    let data_end = data_start + header.stored_len as usize;

    if serialized.len() < data_end {
        return Err(CoreError::Corrupt(format!(
            "truncated blob: expected at least {} bytes, got {}",
            data_end,
            serialized.len()
        )));
    }

    let stored_data = &serialized[data_start..data_end];

    if header.is_compressed() {
        let decompressed = zstd::decode_all(stored_data)
            .map_err(|e| CoreError::Corrupt(format!("blob decompression failed: {e}")))?;
        if decompressed.len() != header.orig_len as usize {
            return Err(CoreError::Corrupt(format!(
                "decompressed size mismatch: expected {} bytes, got {}",
                header.orig_len,
                decompressed.len()
            )));
        }
        Ok(decompressed)
    } else {
        Ok(stored_data.to_vec())
    }
}

/// Content-addressed blob storage
///
/// Blobs are keyed by content hash, never by path, so any number of anchors
/// can reference the same content without duplication. Writes are
/// temp-file-then-rename; reads re-hash and verify.
pub struct BlobStore {
    /// Store directory (the `.moor` dir)
    root: PathBuf,
    /// In-memory cache: hash -> blob metadata
    cache: DashMap<ContentHash, Arc<BlobMeta>>,
    /// Contents above this size are zstd-compressed
    compression_threshold: u64,
}

impl BlobStore {
    /// Create a blob store rooted at the given `.moor` directory
    pub fn new(root: PathBuf, compression_threshold: u64) -> Self {
        Self {
            root,
            cache: DashMap::new(),
            compression_threshold,
        }
    }

    /// Write bytes as a blob, returning the content hash
    ///
    /// Idempotent for identical content. If a blob already exists under the
    /// hash but records a different original length, that is a hash collision
    /// and the write aborts with `DataIntegrity` instead of overwriting.
    pub fn write(&self, data: &[u8]) -> Result<ContentHash> {
        let hash = hash_bytes(data);

        let blob_path = self.blob_path(hash);
        if blob_path.exists() {
            self.check_collision(hash, &blob_path, data.len() as u64)?;
            return Ok(hash);
        }

        let (meta, serialized) = encode_blob(data, self.compression_threshold);
        self.persist(hash, &blob_path, &serialized)?;
        self.cache.insert(hash, Arc::new(meta));

        Ok(hash)
    }

    /// Write a file's content as a blob, returning the content hash
    ///
    /// The hash is computed in bounded-size chunks before the content is
    /// staged, so hashing memory stays independent of file size.
    pub fn write_file(&self, path: &Path) -> Result<ContentHash> {
        let hash = hash_path(path)?;

        let blob_path = self.blob_path(hash);
        let len = std::fs::metadata(path)
            .map_err(|e| CoreError::io(path, e))?
            .len();

        if blob_path.exists() {
            self.check_collision(hash, &blob_path, len)?;
            return Ok(hash);
        }

        let data = std::fs::read(path).map_err(|e| CoreError::io(path, e))?;
        let (meta, serialized) = encode_blob(&data, self.compression_threshold);
        self.persist(hash, &blob_path, &serialized)?;
        self.cache.insert(hash, Arc::new(meta));

        Ok(hash)
    }

    /// Read a blob back, verifying its content hash
    pub fn read(&self, hash: ContentHash) -> Result<Vec<u8>> {
        let blob_path = self.blob_path(hash);
        if !blob_path.exists() {
            return Err(CoreError::Corrupt(format!("blob not found: {hash}")));
        }

        let serialized = std::fs::read(&blob_path).map_err(|e| CoreError::io(&blob_path, e))?;
        let data = decode_blob(&serialized)?;

        let actual = hash_bytes(&data);
        if actual != hash {
            return Err(CoreError::DataIntegrity(format!(
                "stored blob hash mismatch: expected {hash}, got {actual}"
            )));
        }

        Ok(data)
    }

    /// Check if a blob exists
    pub fn has(&self, hash: ContentHash) -> bool {
        self.cache.contains_key(&hash) || self.blob_path(hash).exists()
    }

    /// Verify an existing blob's recorded length against new content
    fn check_collision(&self, hash: ContentHash, blob_path: &Path, new_len: u64) -> Result<()> {
        let serialized = std::fs::read(blob_path).map_err(|e| CoreError::io(blob_path, e))?;
        let header = BlobHeaderV1::from_bytes(&serialized)?;
        if header.orig_len != new_len {
            return Err(CoreError::DataIntegrity(format!(
                "hash collision on {hash}: stored {} bytes, new content is {} bytes",
                header.orig_len, new_len
            )));
        }
        Ok(())
    }

    /// Atomic write pattern: temp file, fsync, rename
    fn persist(&self, hash: ContentHash, blob_path: &Path, serialized: &[u8]) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = blob_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }

        let tmp_dir = self.root.join("tmp").join("ingest");
        std::fs::create_dir_all(&tmp_dir).map_err(|e| CoreError::io(&tmp_dir, e))?;

        let temp_path = tmp_dir.join(format!("{}-{}", uuid::Uuid::new_v4(), hash.to_hex()));

        let mut temp_file =
            std::fs::File::create(&temp_path).map_err(|e| CoreError::io(&temp_path, e))?;
        temp_file
            .write_all(serialized)
            .map_err(|e| CoreError::io(&temp_path, e))?;
        temp_file
            .sync_all()
            .map_err(|e| CoreError::io(&temp_path, e))?;
        drop(temp_file);

        std::fs::rename(&temp_path, blob_path).map_err(|e| CoreError::io(blob_path, e))?;

        // Fsync parent directory for durability; best effort
        if let Some(parent) = blob_path.parent() {
            if let Ok(dir) = std::fs::File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        Ok(())
    }

    /// Fan-out path for a blob: objects/blobs/<hh>/<rest>
    fn blob_path(&self, hash: ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        let prefix = &hex[0..2];
        let rest = &hex[2..];
        self.root
            .join("objects")
            .join("blobs")
            .join(prefix)
            .join(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, BlobStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf(), 4096);
        (dir, store)
    }

    #[test]
    fn test_header_roundtrip() {
        let header = BlobHeaderV1::new(1000, 500, true);
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), BlobHeaderV1::LEN);

        let parsed = BlobHeaderV1::from_bytes(&bytes).unwrap();
        assert_eq!(header.orig_len, parsed.orig_len);
        assert_eq!(header.stored_len, parsed.stored_len);
        assert_eq!(header.is_compressed(), parsed.is_compressed());
    }

    #[test]
    fn test_header_magic_validation() {
        let mut bytes = BlobHeaderV1::new(10, 10, false).to_bytes();
        bytes[0..4].copy_from_slice(b"BADM");
        assert!(BlobHeaderV1::from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_header_truncated() {
        assert!(BlobHeaderV1::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, store) = test_store();

        let data = b"test data for blob store";
        let hash = store.write(data).unwrap();

        assert_eq!(store.read(hash).unwrap(), data);
    }

    #[test]
    fn test_small_blob_uncompressed() {
        let (dir, store) = test_store();

        let data = b"hello world";
        let hash = store.write(data).unwrap();

        let hex = hash.to_hex();
        let on_disk = dir
            .path()
            .join("objects/blobs")
            .join(&hex[0..2])
            .join(&hex[2..]);
        let serialized = std::fs::read(on_disk).unwrap();
        let header = BlobHeaderV1::from_bytes(&serialized).unwrap();
        assert!(!header.is_compressed());
        assert_eq!(header.orig_len, data.len() as u64);
    }

    #[test]
    fn test_large_blob_compressed() {
        let (_dir, store) = test_store();

        // Highly compressible, above the 4KB threshold
        let data = b"hello world ".repeat(1000);
        let hash = store.write(&data).unwrap();

        assert_eq!(store.read(hash).unwrap(), data);
    }

    #[test]
    fn test_idempotent_writes() {
        let (_dir, store) = test_store();

        let data = b"idempotent";
        let hash1 = store.write(data).unwrap();
        let hash2 = store.write(data).unwrap();
        let hash3 = store.write(data).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash2, hash3);
        assert_eq!(store.read(hash1).unwrap(), data);
    }

    #[test]
    fn test_dedup_identical_content() {
        let (_dir, store) = test_store();

        let hash1 = store.write(b"shared content").unwrap();
        let hash2 = store.write(b"shared content").unwrap();

        // Content addressing: identical bytes, identical hash, one blob
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_has_blob() {
        let (_dir, store) = test_store();

        let hash = hash_bytes(b"present");
        assert!(!store.has(hash));

        store.write(b"present").unwrap();
        assert!(store.has(hash));
    }

    #[test]
    fn test_read_nonexistent() {
        let (_dir, store) = test_store();
        let fake = ContentHash::from_bytes([0xFF; 32]);
        assert!(store.read(fake).is_err());
    }

    #[test]
    fn test_write_file_matches_write() {
        let (dir, store) = test_store();

        let file = dir.path().join("input.txt");
        std::fs::write(&file, b"file content").unwrap();

        let from_file = store.write_file(&file).unwrap();
        let from_bytes = hash_bytes(b"file content");
        assert_eq!(from_file, from_bytes);
        assert_eq!(store.read(from_file).unwrap(), b"file content");
    }

    #[test]
    fn test_corrupted_blob_detected() {
        let (dir, store) = test_store();

        let hash = store.write(b"original content here").unwrap();

        // Flip a payload byte on disk
        let hex = hash.to_hex();
        let on_disk = dir
            .path()
            .join("objects/blobs")
            .join(&hex[0..2])
            .join(&hex[2..]);
        let mut bytes = std::fs::read(&on_disk).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&on_disk, bytes).unwrap();

        let err = store.read(hash).unwrap_err();
        assert!(matches!(err, CoreError::DataIntegrity(_)));
    }

    #[test]
    fn test_empty_blob() {
        let (_dir, store) = test_store();
        let hash = store.write(b"").unwrap();
        assert_eq!(store.read(hash).unwrap(), b"");
    }
}
