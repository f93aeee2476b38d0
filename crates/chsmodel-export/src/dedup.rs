//! Vertex deduplication and index buffer construction

use std::collections::HashMap;

use crate::source::Corner;

/// Deduplication key: geometric vertex plus uv, when uvs are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexKey {
    pub vertex: u32,
    /// `None` when the mesh does not compare uvs
    pub uv: Option<u32>,
}

impl VertexKey {
    /// Key for a corner. Without usable uvs the uv slot collapses to `None`.
    ///
    /// Uvs count only when texcoord0 is emitted. Without a bound texture,
    /// corners sharing a position vertex but not a uv merge into one vertex,
    /// so uv seams are lost.
    pub fn from_corner(corner: &Corner, compare_uv: bool) -> Self {
        Self {
            vertex: corner.vertex,
            uv: if compare_uv { corner.uv } else { None },
        }
    }
}

/// Output of deduplication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deduplicated {
    /// One index per input corner
    pub indices: Vec<u32>,
    /// `unique[i]` is the key that produced index `i`
    pub unique: Vec<VertexKey>,
}

impl Deduplicated {
    pub fn unique_vertex_count(&self) -> usize {
        self.unique.len()
    }

    /// Largest index emitted, if any
    pub fn max_index(&self) -> Option<u32> {
        self.unique.len().checked_sub(1).map(|n| n as u32)
    }
}

/// Incremental deduplicator assigning indices in first-seen order
#[derive(Debug, Default)]
pub struct VertexDeduplicator {
    compare_uv: bool,
    lookup: HashMap<VertexKey, u32>,
    result: Deduplicated,
}

impl VertexDeduplicator {
    /// Empty deduplicator; `compare_uv` keeps uv seams apart
    pub fn new(compare_uv: bool) -> Self {
        Self {
            compare_uv,
            ..Default::default()
        }
    }

    /// Pre-size for a known corner count
    pub fn with_capacity(compare_uv: bool, corners: usize) -> Self {
        Self {
            compare_uv,
            lookup: HashMap::with_capacity(corners),
            result: Deduplicated {
                indices: Vec::with_capacity(corners),
                unique: Vec::new(),
            },
        }
    }

    /// Add one corner and return the index it maps to
    pub fn push(&mut self, corner: &Corner) -> u32 {
        let key = VertexKey::from_corner(corner, self.compare_uv);
        let next = self.result.unique.len() as u32;
        let index = *self.lookup.entry(key).or_insert_with(|| {
            self.result.unique.push(key);
            next
        });
        self.result.indices.push(index);
        index
    }

    /// Indices and unique keys collected so far
    pub fn finish(self) -> Deduplicated {
        self.result
    }
}

/// Deduplicate a full corner sequence
pub fn deduplicate(corners: &[Corner], compare_uv: bool) -> Deduplicated {
    let mut dedup = VertexDeduplicator::with_capacity(compare_uv, corners.len());
    for corner in corners {
        dedup.push(corner);
    }
    dedup.finish()
}
