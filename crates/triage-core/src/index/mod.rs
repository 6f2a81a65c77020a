//! Flat (brute-force) squared-L2 vector index.
//!
//! Append-only: rows are never deleted or updated in place; removing one
//! means rebuilding the index from the surviving records. No normalization
//! is applied internally - callers wanting cosine similarity must normalize
//! before insertion.

/// Index error types.
pub mod error;


pub use error::{IndexError, IndexResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rkyv::rancor::Error as RkyvError;
use rkyv::{from_bytes, to_bytes, Archive, Deserialize, Serialize};

const TEMP_EXTENSION: &str = "idx.tmp";

/// On-disk snapshot: dimension + row-major vector data.
///
/// Stored as `rkyv` bytes so values round-trip bit-for-bit.
#[derive(Archive, Deserialize, Serialize, Debug, PartialEq)]
struct IndexSnapshot {
    dimension: u32,
    data: Vec<f32>,
}

/// Brute-force nearest-neighbor index over fixed-dimension vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Creates an empty index; `dimension` is fixed for its lifetime.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Vector dimension fixed at construction.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    /// Returns `true` if no rows are stored.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Appends `vectors` and returns the row index of the first one.
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> IndexResult<usize> {
        for vector in vectors {
            if vector.len() != self.dimension {
                return Err(IndexError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        let starting_row = self.row_count();
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(starting_row)
    }

    /// Returns up to `k` rows nearest to `query`, ordered by ascending
    /// squared-L2 distance; ties broken by insertion order (lower row first).
    pub fn search(&self, query: &[f32], k: usize) -> IndexResult<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(row, vector)| (row, squared_l2(query, vector)))
            .collect();

        scored.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    /// Drops rows from the tail until `rows` remain.
    ///
    /// Only used to roll back a failed add; the index stays append-only from
    /// the caller's perspective.
    pub(crate) fn truncate_rows(&mut self, rows: usize) {
        self.data.truncate(rows * self.dimension);
    }

    /// Writes the snapshot bytes to exactly `path`, fsynced, without a
    /// rename.
    ///
    /// Callers staging a multi-file update write to a temp path and rename
    /// only once every file in the set is durable.
    pub(crate) fn write_snapshot(&self, path: &Path) -> IndexResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let snapshot = IndexSnapshot {
            dimension: self.dimension as u32,
            data: self.data.clone(),
        };
        let bytes = to_bytes::<RkyvError>(&snapshot).map_err(|e| IndexError::Corrupt {
            path: path.to_path_buf(),
            reason: format!("serialization failed: {e:?}"),
        })?;

        let mut file = File::create(path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        Ok(())
    }

    /// Writes a snapshot to `path` (temp file + `sync_all` + atomic rename),
    /// so a failed save never corrupts the previous snapshot.
    pub fn save(&self, path: &Path) -> IndexResult<()> {
        let temp_path = temp_path_for(path);
        self.write_snapshot(&temp_path)?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Loads a snapshot, verifying it matches `expected_dimension`.
    ///
    /// A dimension mismatch is a fatal construction error: the snapshot was
    /// written for a different embedding configuration.
    pub fn load(path: &Path, expected_dimension: usize) -> IndexResult<Self> {
        let bytes = fs::read(path)?;

        let snapshot: IndexSnapshot =
            from_bytes::<IndexSnapshot, RkyvError>(&bytes).map_err(|e| IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("{e:?}"),
            })?;

        let dimension = snapshot.dimension as usize;
        if dimension != expected_dimension {
            return Err(IndexError::DimensionMismatch {
                expected: expected_dimension,
                actual: dimension,
            });
        }
        if dimension == 0 || snapshot.data.len() % dimension != 0 {
            return Err(IndexError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "data length {} is not a multiple of dimension {}",
                    snapshot.data.len(),
                    dimension
                ),
            });
        }

        Ok(Self {
            dimension,
            data: snapshot.data,
        })
    }
}

#[inline]
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

fn temp_path_for(path: &Path) -> PathBuf {
    path.with_extension(TEMP_EXTENSION)
}
