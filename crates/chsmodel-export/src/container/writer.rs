//! Container serialization

use std::io::Write;

use byteorder::{NativeEndian, WriteBytesExt};
use chsmodel_core::{Error, Result};
use tracing::{debug, trace};

use super::{build_metadata, ContainerFormat, ALIGNMENT, MAGIC};
use crate::document::Document;

/// Round `len` up to the container alignment
pub fn aligned_len(len: usize) -> usize {
    (len + ALIGNMENT - 1) & !(ALIGNMENT - 1)
}

/// Progress of a [`ContainerWriter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Empty,
    MetadataBuilt,
    /// Hybrid header written, payload still to come
    BinaryPending,
    Written,
}

/// Writes one document as a ChsModel container.
///
/// Steps run in order: build metadata, write header, write payload. Calling a
/// step out of order is an internal error and leaves the writer unchanged.
pub struct ContainerWriter<'d> {
    document: &'d Document,
    format: ContainerFormat,
    state: WriterState,
    metadata: Vec<u8>,
    bytes_written: usize,
}

impl<'d> ContainerWriter<'d> {
    pub fn new(document: &'d Document, format: ContainerFormat) -> Self {
        Self {
            document,
            format,
            state: WriterState::Empty,
            metadata: Vec::new(),
            bytes_written: 0,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn format(&self) -> ContainerFormat {
        self.format
    }

    /// Metadata document, empty before [`build_metadata`](Self::build_metadata)
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn build_metadata(&mut self) -> Result<()> {
        self.expect_state(WriterState::Empty, "build_metadata")?;
        self.metadata = build_metadata(self.document, self.format)?;
        self.state = WriterState::MetadataBuilt;
        debug!(bytes = self.metadata.len(), "Metadata built");
        Ok(())
    }

    /// Hybrid: magic, padded length, metadata, zero padding. Text: metadata only.
    pub fn write_header<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.expect_state(WriterState::MetadataBuilt, "write_header")?;

        match self.format {
            ContainerFormat::Text => {
                sink.write_all(&self.metadata)?;
                self.bytes_written += self.metadata.len();
                self.state = WriterState::Written;
            }
            ContainerFormat::Hybrid => {
                let padded = aligned_len(self.metadata.len());
                let length = u32::try_from(padded).map_err(|_| {
                    Error::internal(format!("metadata of {} bytes exceeds u32 length", padded))
                })?;

                sink.write_all(MAGIC)?;
                sink.write_u32::<NativeEndian>(length)?;
                sink.write_all(&self.metadata)?;
                sink.write_all(&[0u8; ALIGNMENT][..padded - self.metadata.len()])?;

                self.bytes_written += MAGIC.len() + 4 + padded;
                self.state = WriterState::BinaryPending;
            }
        }
        trace!(bytes = self.bytes_written, "Header written");
        Ok(())
    }

    /// Per mesh: vertex byte size, vertices, index byte size, indices
    pub fn write_payload<W: Write>(&mut self, sink: &mut W) -> Result<()> {
        self.expect_state(WriterState::BinaryPending, "write_payload")?;

        for mesh in self.document.meshes() {
            let vertices = mesh.vertex_bytes();
            let indices = mesh.index_buffer.as_bytes();

            sink.write_u32::<NativeEndian>(byte_size(vertices.len(), &mesh.id)?)?;
            sink.write_all(vertices)?;
            sink.write_u32::<NativeEndian>(byte_size(indices.len(), &mesh.id)?)?;
            sink.write_all(indices)?;

            self.bytes_written += 8 + vertices.len() + indices.len();
        }

        self.state = WriterState::Written;
        Ok(())
    }

    /// Run every remaining step against `sink`; returns total bytes written
    pub fn write_to<W: Write>(mut self, sink: &mut W) -> Result<usize> {
        if self.state == WriterState::Empty {
            self.build_metadata()?;
        }
        if self.state == WriterState::MetadataBuilt {
            self.write_header(sink)?;
        }
        if self.state == WriterState::BinaryPending {
            self.write_payload(sink)?;
        }
        Ok(self.bytes_written)
    }

    fn expect_state(&self, expected: WriterState, step: &str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::internal(format!(
                "{} called in state {:?}, expected {:?}",
                step, self.state, expected
            )))
        }
    }
}

fn byte_size(len: usize, mesh: &str) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| Error::internal(format!("buffer of mesh '{}' exceeds u32 length", mesh)))
}

/// Serialize `document` into a complete in-memory container
pub fn encode_document(document: &Document, format: ContainerFormat) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ContainerWriter::new(document, format).write_to(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MeshRecord;
    use crate::index::{IndexBuffer, IndexWidth};
    use crate::material::MaterialRecord;
    use crate::schema::{AttributeSchema, MeshFlags};
    use chsmodel_core::Mat4x4;

    fn document(indices: Vec<u32>, width: IndexWidth) -> Document {
        let flags = MeshFlags::default();
        let mut document = Document::new("box");
        document.push(MeshRecord {
            id: "pCube1".into(),
            transform: Mat4x4::IDENTITY,
            flags,
            schema: AttributeSchema::from_flags(&flags),
            vertex_buffer: vec![1.0; 18],
            index_buffer: IndexBuffer::from_indices(indices, width),
            material: MaterialRecord::default(),
            animation: None,
        });
        document
    }

    fn read_u32(bytes: &[u8], at: usize) -> u32 {
        u32::from_ne_bytes(bytes[at..at + 4].try_into().unwrap())
    }

    #[test]
    fn test_aligned_len() {
        assert_eq!(aligned_len(0), 0);
        assert_eq!(aligned_len(37), 40);
        assert_eq!(aligned_len(40), 40);
        assert_eq!(aligned_len(41), 44);
    }

    #[test]
    fn test_hybrid_layout() {
        let doc = document(vec![0, 1, 2], IndexWidth::Narrow);
        let bytes = encode_document(&doc, ContainerFormat::Hybrid).unwrap();

        assert_eq!(&bytes[..4], b"chmo");
        let meta_len = read_u32(&bytes, 4) as usize;
        assert_eq!(meta_len % 4, 0);

        let payload = 8 + meta_len;
        assert_eq!(read_u32(&bytes, payload), 18 * 4);
        let index_at = payload + 4 + 72;
        assert_eq!(read_u32(&bytes, index_at), 6);
        assert_eq!(bytes.len(), index_at + 4 + 6);
    }

    #[test]
    fn test_metadata_padding_is_zero() {
        let doc = document(vec![0, 1, 2], IndexWidth::Wide);
        let mut writer = ContainerWriter::new(&doc, ContainerFormat::Hybrid);
        writer.build_metadata().unwrap();
        let raw_len = writer.metadata().len();

        let mut bytes = Vec::new();
        writer.write_header(&mut bytes).unwrap();
        assert_eq!(bytes.len(), 8 + aligned_len(raw_len));
        assert!(bytes[8 + raw_len..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_text_mode_has_no_magic_or_payload() {
        let doc = document(vec![0, 1, 2], IndexWidth::Narrow);
        let bytes = encode_document(&doc, ContainerFormat::Text).unwrap();
        assert!(bytes.starts_with(b"<ChsModel"));
        assert!(!bytes.windows(4).any(|w| w == b"chmo"));
    }

    #[test]
    fn test_bytes_written_matches_output() {
        let doc = document(vec![0, 1, 2, 2, 1, 0], IndexWidth::Wide);
        let mut bytes = Vec::new();
        let written = ContainerWriter::new(&doc, ContainerFormat::Hybrid)
            .write_to(&mut bytes)
            .unwrap();
        assert_eq!(written, bytes.len());
    }

    #[test]
    fn test_out_of_order_steps_are_rejected() {
        let doc = document(vec![0, 1, 2], IndexWidth::Narrow);
        let mut writer = ContainerWriter::new(&doc, ContainerFormat::Hybrid);
        let mut sink = Vec::new();

        assert!(matches!(writer.write_header(&mut sink), Err(Error::Internal { .. })));
        assert!(matches!(writer.write_payload(&mut sink), Err(Error::Internal { .. })));
        assert_eq!(writer.state(), WriterState::Empty);
        assert!(sink.is_empty());

        writer.build_metadata().unwrap();
        assert!(writer.build_metadata().is_err());
        writer.write_header(&mut sink).unwrap();
        assert_eq!(writer.state(), WriterState::BinaryPending);
        writer.write_payload(&mut sink).unwrap();
        assert_eq!(writer.state(), WriterState::Written);
        assert!(writer.write_payload(&mut sink).is_err());
    }

    #[test]
    fn test_text_header_completes_writer() {
        let doc = document(vec![0, 1, 2], IndexWidth::Narrow);
        let mut writer = ContainerWriter::new(&doc, ContainerFormat::Text);
        writer.build_metadata().unwrap();
        writer.write_header(&mut Vec::new()).unwrap();
        assert_eq!(writer.state(), WriterState::Written);
    }
}
