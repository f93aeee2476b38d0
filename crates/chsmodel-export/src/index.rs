//! Index width selection and index buffer storage

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Exclusive upper bound for the narrow-width test
///
/// `polygon_count * 3` must stay below this, so 21845 polygons is still narrow.
pub const NARROW_INDEX_LIMIT: usize = 65536;

/// Width of one index entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexWidth {
    /// 16-bit indices
    Narrow,
    /// 32-bit indices
    Wide,
}

impl IndexWidth {
    pub fn bytes_per_index(self) -> usize {
        match self {
            IndexWidth::Narrow => 2,
            IndexWidth::Wide => 4,
        }
    }

    /// Value of the `isShort` metadata attribute
    pub fn is_short(self) -> bool {
        self == IndexWidth::Narrow
    }

    pub fn from_is_short(is_short: bool) -> Self {
        if is_short {
            IndexWidth::Narrow
        } else {
            IndexWidth::Wide
        }
    }
}

/// How the index width of a mesh is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndexWidthPolicy {
    /// Narrow iff `polygon_count * 3 < 65536`, the test used by existing files
    #[default]
    TriangleEstimate,
    /// Narrow iff every deduplicated vertex is addressable with 16 bits
    UniqueVertexCount,
}

impl IndexWidthPolicy {
    pub fn select(self, polygon_count: usize, unique_vertex_count: usize) -> IndexWidth {
        let narrow = match self {
            IndexWidthPolicy::TriangleEstimate => {
                polygon_count.saturating_mul(3) < NARROW_INDEX_LIMIT
            }
            IndexWidthPolicy::UniqueVertexCount => unique_vertex_count <= NARROW_INDEX_LIMIT,
        };
        if narrow {
            IndexWidth::Narrow
        } else {
            IndexWidth::Wide
        }
    }
}

impl std::str::FromStr for IndexWidthPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triangle-estimate" | "legacy" => Ok(IndexWidthPolicy::TriangleEstimate),
            "unique-vertex-count" | "unique" => Ok(IndexWidthPolicy::UniqueVertexCount),
            _ => Err(format!("Unknown index width policy: {}", s)),
        }
    }
}

/// Index buffer stored at its declared width
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    Narrow(Vec<u16>),
    Wide(Vec<u32>),
}

impl IndexBuffer {
    /// Store indices at the requested width.
    ///
    /// A narrow request whose indices do not fit in 16 bits is stored wide, so
    /// the buffer never silently wraps.
    pub fn from_indices(indices: Vec<u32>, width: IndexWidth) -> Self {
        match width {
            IndexWidth::Wide => IndexBuffer::Wide(indices),
            IndexWidth::Narrow => {
                let narrow: Result<Vec<u16>, _> =
                    indices.iter().map(|&i| u16::try_from(i)).collect();
                match narrow {
                    Ok(narrow) => IndexBuffer::Narrow(narrow),
                    Err(_) => {
                        warn!(
                            count = indices.len(),
                            "Indices exceed 16 bits, storing index buffer as 32-bit"
                        );
                        IndexBuffer::Wide(indices)
                    }
                }
            }
        }
    }

    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::Narrow(_) => IndexWidth::Narrow,
            IndexBuffer::Wide(_) => IndexWidth::Wide,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::Narrow(v) => v.len(),
            IndexBuffer::Wide(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes in host byte order
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            IndexBuffer::Narrow(v) => bytemuck::cast_slice(v),
            IndexBuffer::Wide(v) => bytemuck::cast_slice(v),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.width().bytes_per_index()
    }

    /// Widen every entry to u32
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            IndexBuffer::Narrow(v) => v.iter().map(|&i| u32::from(i)).collect(),
            IndexBuffer::Wide(v) => v.clone(),
        }
    }

    /// Decode raw host-order bytes at the given width
    pub fn from_bytes(bytes: &[u8], width: IndexWidth) -> Option<Self> {
        if bytes.len() % width.bytes_per_index() != 0 {
            return None;
        }
        Some(match width {
            IndexWidth::Narrow => IndexBuffer::Narrow(
                bytes
                    .chunks_exact(2)
                    .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                    .collect(),
            ),
            IndexWidth::Wide => IndexBuffer::Wide(
                bytes
                    .chunks_exact(4)
                    .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_estimate_boundary() {
        let policy = IndexWidthPolicy::TriangleEstimate;
        // 21845 * 3 = 65535 < 65536
        assert_eq!(policy.select(21845, 0), IndexWidth::Narrow);
        // 21846 * 3 = 65538
        assert_eq!(policy.select(21846, 0), IndexWidth::Wide);
    }

    #[test]
    fn test_triangle_estimate_ignores_unique_count() {
        assert_eq!(
            IndexWidthPolicy::TriangleEstimate.select(10, 1_000_000),
            IndexWidth::Narrow
        );
    }

    #[test]
    fn test_unique_vertex_count_boundary() {
        let policy = IndexWidthPolicy::UniqueVertexCount;
        assert_eq!(policy.select(1_000_000, 65536), IndexWidth::Narrow);
        assert_eq!(policy.select(0, 65537), IndexWidth::Wide);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("legacy".parse(), Ok(IndexWidthPolicy::TriangleEstimate));
        assert_eq!("unique-vertex-count".parse(), Ok(IndexWidthPolicy::UniqueVertexCount));
        assert!("fast".parse::<IndexWidthPolicy>().is_err());
    }

    #[test]
    fn test_narrow_buffer_bytes() {
        let buffer = IndexBuffer::from_indices(vec![0, 1, 2, 0], IndexWidth::Narrow);
        assert_eq!(buffer.width(), IndexWidth::Narrow);
        assert_eq!(buffer.byte_len(), 8);
        assert_eq!(buffer.as_bytes().len(), 8);
        assert_eq!(IndexBuffer::from_bytes(buffer.as_bytes(), IndexWidth::Narrow), Some(buffer));
    }

    #[test]
    fn test_narrow_overflow_promotes_to_wide() {
        let buffer = IndexBuffer::from_indices(vec![0, 70_000], IndexWidth::Narrow);
        assert_eq!(buffer.width(), IndexWidth::Wide);
        assert_eq!(buffer.to_u32_vec(), vec![0, 70_000]);
    }

    #[test]
    fn test_from_bytes_rejects_partial_entries() {
        assert!(IndexBuffer::from_bytes(&[0, 0, 0], IndexWidth::Narrow).is_none());
        assert!(IndexBuffer::from_bytes(&[0, 0, 0, 0, 0, 0], IndexWidth::Wide).is_none());
    }
}
