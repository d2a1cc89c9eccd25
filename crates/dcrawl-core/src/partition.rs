//! Job partitioner: ordered rows → fixed-size, non-overlapping chunks.

use serde::{Deserialize, Serialize};

use crate::rows::Row;

/// A contiguous slice of a batch assigned to one worker process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Sequential id within the batch (0-based).
    pub id: usize,
    pub rows: Vec<Row>,
}

/// Splits `rows` into chunks of at most `chunk_size` rows (a size of 0 is treated as 1).
/// Row order is preserved and every row keeps its batch index, so progress keys
/// stay stable even when already-finished rows were filtered out beforehand.
pub fn partition(rows: Vec<Row>, chunk_size: usize) -> Vec<Chunk> {
    let chunk_size = chunk_size.max(1);
    let mut chunks: Vec<Chunk> = Vec::with_capacity(rows.len().div_ceil(chunk_size));
    for row in rows {
        match chunks.last_mut() {
            Some(chunk) if chunk.rows.len() < chunk_size => chunk.rows.push(row),
            _ => {
                let id = chunks.len();
                let mut rows = Vec::with_capacity(chunk_size);
                rows.push(row);
                chunks.push(Chunk { id, rows });
            }
        }
    }
    chunks
}
