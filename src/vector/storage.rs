//! On-disk persistence for a populated [`VectorIndex`].
//!
//! An index is saved as an artifact pair inside one directory:
//! - `vectors.vec`: binary vector blob
//! - `records.json`: the record list, in the same order as the vectors
//!
//! # Storage Format
//!
//! `vectors.vec` uses a simple binary format optimized for sequential reads:
//! - Header (16 bytes): magic, version, dimension, vector count
//! - Vectors: contiguous f32 arrays in little-endian format
//!
//! Loading memory-maps the blob and validates the header, the blob length
//! and the vector/record counts before any index is handed back.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::MmapOptions;
use tracing::info;

use crate::corpus::CorpusRecord;
use crate::vector::{VectorDimension, VectorError, VectorIndex};

/// Current storage format version.
const STORAGE_VERSION: u32 = 1;

/// Size of the storage header in bytes.
const HEADER_SIZE: usize = 16;

/// Magic bytes to identify vector storage files.
const MAGIC_BYTES: &[u8; 4] = b"MVEC";

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

const VECTORS_FILE: &str = "vectors.vec";
const RECORDS_FILE: &str = "records.json";

/// Saves and loads index state under a base directory.
#[derive(Debug, Clone)]
pub struct IndexStorage {
    base_path: PathBuf,
}

impl IndexStorage {
    /// Creates a storage handle rooted at `base_path`. Nothing is touched on
    /// disk until [`save`](Self::save) or [`load`](Self::load).
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Path of the binary vector blob.
    #[must_use]
    pub fn vectors_path(&self) -> PathBuf {
        self.base_path.join(VECTORS_FILE)
    }

    /// Path of the record list.
    #[must_use]
    pub fn records_path(&self) -> PathBuf {
        self.base_path.join(RECORDS_FILE)
    }

    /// True when both artifacts are present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.vectors_path().exists() && self.records_path().exists()
    }

    /// Writes the full (vectors, records, dimension) triple.
    ///
    /// Both artifacts are written to temporary siblings and renamed into
    /// place, so a crash mid-save never leaves a half-written blob behind.
    pub fn save(&self, index: &VectorIndex) -> Result<(), VectorError> {
        std::fs::create_dir_all(&self.base_path)?;

        let vectors_tmp = self.base_path.join(format!("{VECTORS_FILE}.tmp"));
        {
            let mut writer = BufWriter::new(File::create(&vectors_tmp)?);
            write_header(&mut writer, index.dimension(), index.len())?;
            for vector in index.vectors() {
                for &value in vector {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }
            writer.flush()?;
        }

        let records_tmp = self.base_path.join(format!("{RECORDS_FILE}.tmp"));
        let json = serde_json::to_string_pretty(index.records())
            .map_err(|e| VectorError::Serialization(e.to_string()))?;
        std::fs::write(&records_tmp, json)?;

        std::fs::rename(&vectors_tmp, self.vectors_path())?;
        std::fs::rename(&records_tmp, self.records_path())?;

        info!(
            "Saved index to {} and records to {}",
            self.vectors_path().display(),
            self.records_path().display()
        );
        Ok(())
    }

    /// Loads a previously saved index.
    ///
    /// # Errors
    /// - [`VectorError::NotFound`] if either artifact is absent
    /// - [`VectorError::VersionMismatch`] for blobs from another format version
    /// - [`VectorError::CorruptState`] for a damaged blob, unreadable records,
    ///   or a vector count that disagrees with the record count
    pub fn load(&self) -> Result<VectorIndex, VectorError> {
        let vectors_path = self.vectors_path();
        let records_path = self.records_path();

        for path in [&vectors_path, &records_path] {
            if !path.exists() {
                return Err(VectorError::NotFound { path: path.clone() });
            }
        }

        let (dimension, vectors) = read_vectors(&vectors_path)?;

        let json = std::fs::read_to_string(&records_path)?;
        let records: Vec<CorpusRecord> =
            serde_json::from_str(&json).map_err(|e| VectorError::CorruptState {
                reason: format!("{RECORDS_FILE} could not be parsed: {e}"),
            })?;

        if records.len() != vectors.len() {
            return Err(VectorError::CorruptState {
                reason: format!(
                    "{} vectors but {} records",
                    vectors.len(),
                    records.len()
                ),
            });
        }

        let index = VectorIndex::from_parts(dimension, vectors, records)?;
        info!("Loaded index with {} vectors", index.len());
        Ok(index)
    }
}

fn write_header(
    writer: &mut impl Write,
    dimension: VectorDimension,
    count: usize,
) -> Result<(), std::io::Error> {
    writer.write_all(MAGIC_BYTES)?;
    writer.write_all(&STORAGE_VERSION.to_le_bytes())?;
    writer.write_all(&(dimension.get() as u32).to_le_bytes())?;
    writer.write_all(&(count as u32).to_le_bytes())?;
    Ok(())
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_vectors(path: &Path) -> Result<(VectorDimension, Vec<Vec<f32>>), VectorError> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len() as usize;
    if file_len < HEADER_SIZE {
        return Err(VectorError::CorruptState {
            reason: "File too small to contain header".to_string(),
        });
    }

    let mmap = unsafe { MmapOptions::new().map(&file)? };

    if &mmap[0..4] != MAGIC_BYTES {
        return Err(VectorError::CorruptState {
            reason: "Invalid magic bytes".to_string(),
        });
    }

    let version = read_u32(&mmap, 4);
    if version != STORAGE_VERSION {
        return Err(VectorError::VersionMismatch {
            expected: STORAGE_VERSION,
            actual: version,
        });
    }

    let dimension = VectorDimension::new(read_u32(&mmap, 8) as usize).map_err(|e| {
        VectorError::CorruptState {
            reason: format!("Invalid dimension in header: {e}"),
        }
    })?;
    let count = read_u32(&mmap, 12) as usize;

    let sizes = dimension.get().checked_mul(BYTES_PER_F32).and_then(|vector_size| {
        count
            .checked_mul(vector_size)
            .and_then(|body| body.checked_add(HEADER_SIZE))
            .map(|expected_len| (vector_size, expected_len))
    });
    let Some((vector_size, expected_len)) = sizes else {
        return Err(VectorError::CorruptState {
            reason: format!(
                "Header declares {count} vectors of dimension {dimension}, which overflows"
            ),
        });
    };
    if mmap.len() != expected_len {
        return Err(VectorError::CorruptState {
            reason: format!(
                "Header declares {count} vectors ({expected_len} bytes) but file has {} bytes",
                mmap.len()
            ),
        });
    }

    let vectors = mmap[HEADER_SIZE..]
        .chunks_exact(vector_size)
        .map(|chunk| {
            chunk
                .chunks_exact(BYTES_PER_F32)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        })
        .collect();

    Ok((dimension, vectors))
}
