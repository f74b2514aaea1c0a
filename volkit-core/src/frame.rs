//! Per-frame record serialization and layout resolution.
//!
//! A frame record is a 9-byte header followed by the body sub-arrays in
//! canonical order: vertices, normals, indices, uvs, texture. Every
//! sub-array is preceded by its `u32` byte count. The header's
//! `mesh_data_sz` counts only the raw sub-array bytes for v10/11; from v12
//! it also counts 4 bytes per size prefix, and the body is followed by a
//! repeated `mesh_data_sz` for stream resync.

use crate::header::VolsHeader;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Keyframe marker. Indices and uvs are stored only on keyframes and are
/// valid for all frames up to the next keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Keyframe {
    Inter = 0,
    Key = 1,
    /// Keyframe marking a sequence terminus.
    EndKey = 2,
}

impl Keyframe {
    pub fn from_u8(b: u8, frame: u32) -> Result<Self> {
        match b {
            0 => Ok(Self::Inter),
            1 => Ok(Self::Key),
            2 => Ok(Self::EndKey),
            _ => Err(Error::CorruptFrame { frame }),
        }
    }

    /// True for both plain and end keyframes.
    pub fn is_key(self) -> bool {
        self != Self::Inter
    }
}

/// Fixed 9-byte frame header preceding each body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_number: u32,
    /// Body byte count; see the module-level accounting rules.
    pub mesh_data_sz: u32,
    pub keyframe: Keyframe,
}

impl FrameHeader {
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let frame_number = reader.read_u32::<LittleEndian>()?;
        let mesh_data_sz = reader.read_u32::<LittleEndian>()?;
        let keyframe = Keyframe::from_u8(reader.read_u8()?, frame_number)?;
        Ok(Self {
            frame_number,
            mesh_data_sz,
            keyframe,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<LittleEndian>(self.frame_number)?;
        writer.write_u32::<LittleEndian>(self.mesh_data_sz)?;
        // One byte on disk, never widened.
        writer.write_u8(self.keyframe as u8)?;
        Ok(())
    }
}

/// Offset + length of a sub-array within a body buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

/// Resolved sub-array locations within one frame body.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameLayout {
    pub vertices: Span,
    pub normals: Option<Span>,
    pub indices: Option<Span>,
    pub uvs: Option<Span>,
    pub texture: Option<Span>,
}

/// Borrowed view of a loaded frame body. Spans index into the backing
/// buffer owned by the frame store; the view is invalidated when that
/// buffer is reloaded.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub header: FrameHeader,
    data: &'a [u8],
    layout: FrameLayout,
}

impl<'a> FrameView<'a> {
    pub(crate) fn new(header: FrameHeader, data: &'a [u8], layout: FrameLayout) -> Self {
        Self {
            header,
            data,
            layout,
        }
    }

    fn slice(&self, span: Span) -> &'a [u8] {
        &self.data[span.offset..span.offset + span.len]
    }

    pub fn vertices(&self) -> &'a [u8] {
        self.slice(self.layout.vertices)
    }

    pub fn normals(&self) -> Option<&'a [u8]> {
        self.layout.normals.map(|s| self.slice(s))
    }

    pub fn indices(&self) -> Option<&'a [u8]> {
        self.layout.indices.map(|s| self.slice(s))
    }

    pub fn uvs(&self) -> Option<&'a [u8]> {
        self.layout.uvs.map(|s| self.slice(s))
    }

    pub fn texture(&self) -> Option<&'a [u8]> {
        self.layout.texture.map(|s| self.slice(s))
    }

    /// Number of float3 positions.
    pub fn vertex_count(&self) -> usize {
        self.layout.vertices.len / 12
    }
}

/// Number of size prefixes present in a body given the header flags and
/// keyframe-ness.
pub fn size_prefix_count(has_normals: bool, is_keyframe: bool, has_texture: bool) -> u32 {
    1 + u32::from(has_normals) + if is_keyframe { 2 } else { 0 } + u32::from(has_texture)
}

/// On-disk byte length of a frame body (size prefixes included, trailing
/// repeated size excluded).
pub fn body_disk_len(header: &VolsHeader, frame: &FrameHeader) -> u64 {
    let prefixes = size_prefix_count(
        header.has_normals(),
        frame.keyframe.is_key(),
        header.has_frame_textures(),
    );
    if header.version >= 12 {
        // mesh_data_sz already counts the prefixes.
        u64::from(frame.mesh_data_sz)
    } else {
        u64::from(frame.mesh_data_sz) + u64::from(prefixes) * 4
    }
}

/// Resolves sub-array offsets within a body buffer and checks the sizing
/// invariant. `body` holds the on-disk body bytes (without the trailing
/// repeated size).
pub fn parse_layout(header: &VolsHeader, frame: &FrameHeader, body: &[u8]) -> Result<FrameLayout> {
    let frame_number = frame.frame_number;
    let mut cursor = 0usize;

    let mut next_span = |body: &[u8]| -> Result<Span> {
        if cursor + 4 > body.len() {
            return Err(Error::CorruptFrame {
                frame: frame_number,
            });
        }
        let len = u32::from_le_bytes([
            body[cursor],
            body[cursor + 1],
            body[cursor + 2],
            body[cursor + 3],
        ]) as usize;
        cursor += 4;
        if cursor + len > body.len() {
            return Err(Error::CorruptFrame {
                frame: frame_number,
            });
        }
        let span = Span {
            offset: cursor,
            len,
        };
        cursor += len;
        Ok(span)
    };

    let mut layout = FrameLayout {
        vertices: next_span(body)?,
        ..FrameLayout::default()
    };
    if header.has_normals() {
        layout.normals = Some(next_span(body)?);
    }
    if frame.keyframe.is_key() {
        layout.indices = Some(next_span(body)?);
        layout.uvs = Some(next_span(body)?);
    }
    if header.has_frame_textures() {
        layout.texture = Some(next_span(body)?);
    }

    if cursor != body.len() {
        return Err(Error::CorruptFrame {
            frame: frame_number,
        });
    }

    Ok(layout)
}

/// The sub-arrays to emit for one output frame, in canonical order.
/// Presence of a field decides both what is written and what the size
/// accounting counts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameArrays<'a> {
    pub vertices: &'a [u8],
    pub normals: Option<&'a [u8]>,
    pub indices: Option<&'a [u8]>,
    pub uvs: Option<&'a [u8]>,
    pub texture: Option<&'a [u8]>,
}

impl<'a> FrameArrays<'a> {
    fn present(&self) -> impl Iterator<Item = &'a [u8]> {
        [
            Some(self.vertices),
            self.normals,
            self.indices,
            self.uvs,
            self.texture,
        ]
        .into_iter()
        .flatten()
    }

    /// `mesh_data_sz` for these arrays under the given version's rules.
    pub fn mesh_data_size(&self, version: u32) -> u32 {
        let mut sz = 0u32;
        let mut prefixes = 0u32;
        for arr in self.present() {
            sz += arr.len() as u32;
            prefixes += 1;
        }
        if version >= 12 {
            sz += prefixes * 4;
        }
        sz
    }
}

/// Writes one complete frame record: header with recomputed
/// `mesh_data_sz`, the body in canonical order, and (v12+) the repeated
/// trailing size. The body is staged in one scratch buffer so it hits the
/// writer in a single pass. Returns the emitted `mesh_data_sz`.
pub fn write_frame<W: Write>(
    writer: &mut W,
    version: u32,
    frame_number: u32,
    keyframe: Keyframe,
    arrays: &FrameArrays,
) -> Result<u32> {
    let mesh_data_sz = arrays.mesh_data_size(version);
    let header = FrameHeader {
        frame_number,
        mesh_data_sz,
        keyframe,
    };
    header.write(writer)?;

    let mut body: Vec<u8> = Vec::with_capacity(mesh_data_sz as usize + 24);
    for arr in arrays.present() {
        body.extend_from_slice(&(arr.len() as u32).to_le_bytes());
        body.extend_from_slice(arr);
    }
    writer.write_all(&body)?;

    if version >= 12 {
        writer.write_u32::<LittleEndian>(mesh_data_sz)?;
    }

    Ok(mesh_data_sz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FormatTag;
    use std::io::Cursor;

    fn header(version: u32, normals: bool, textured: bool) -> VolsHeader {
        VolsHeader {
            format: if version >= 13 {
                FormatTag::Iff
            } else {
                FormatTag::Prefixed
            },
            version,
            normals,
            textured,
            ..VolsHeader::default()
        }
    }

    fn arrays<'a>(
        vertices: &'a [u8],
        normals: Option<&'a [u8]>,
        indices: Option<&'a [u8]>,
        uvs: Option<&'a [u8]>,
        texture: Option<&'a [u8]>,
    ) -> FrameArrays<'a> {
        FrameArrays {
            vertices,
            normals,
            indices,
            uvs,
            texture,
        }
    }

    #[test]
    fn test_keyframe_roundtrip_v13() {
        let hdr = header(13, true, true);
        let vertices = vec![1u8; 36];
        let normals = vec![2u8; 36];
        let indices = vec![3u8; 12];
        let uvs = vec![4u8; 24];
        let texture = vec![5u8; 100];

        let mut buffer = Vec::new();
        let arrays = arrays(
            &vertices,
            Some(&normals),
            Some(&indices),
            Some(&uvs),
            Some(&texture),
        );
        let sz = write_frame(&mut buffer, 13, 7, Keyframe::Key, &arrays).unwrap();
        // Five sub-arrays, five prefixes.
        assert_eq!(sz, 36 + 36 + 12 + 24 + 100 + 5 * 4);

        let mut cursor = Cursor::new(&buffer);
        let frame_hdr = FrameHeader::read(&mut cursor).unwrap();
        assert_eq!(frame_hdr.frame_number, 7);
        assert_eq!(frame_hdr.keyframe, Keyframe::Key);
        assert_eq!(frame_hdr.mesh_data_sz, sz);

        let body_len = body_disk_len(&hdr, &frame_hdr) as usize;
        let body = &buffer[9..9 + body_len];
        let layout = parse_layout(&hdr, &frame_hdr, body).unwrap();
        let view = FrameView::new(frame_hdr, body, layout);
        assert_eq!(view.vertices(), &vertices[..]);
        assert_eq!(view.normals().unwrap(), &normals[..]);
        assert_eq!(view.indices().unwrap(), &indices[..]);
        assert_eq!(view.uvs().unwrap(), &uvs[..]);
        assert_eq!(view.texture().unwrap(), &texture[..]);

        // Trailing repeated size matches.
        let trailing =
            u32::from_le_bytes(buffer[9 + body_len..9 + body_len + 4].try_into().unwrap());
        assert_eq!(trailing, sz);
    }

    #[test]
    fn test_inter_frame_v11_excludes_prefixes_from_size() {
        let hdr = header(11, true, false);
        let vertices = vec![1u8; 24];
        let normals = vec![2u8; 24];

        let mut buffer = Vec::new();
        let arrays = arrays(&vertices, Some(&normals), None, None, None);
        let sz = write_frame(&mut buffer, 11, 3, Keyframe::Inter, &arrays).unwrap();
        // v10/11 accounting: raw bytes only.
        assert_eq!(sz, 48);
        // No trailing repeated size below v12.
        assert_eq!(buffer.len(), 9 + 4 + 24 + 4 + 24);

        let mut cursor = Cursor::new(&buffer);
        let frame_hdr = FrameHeader::read(&mut cursor).unwrap();
        let body_len = body_disk_len(&hdr, &frame_hdr) as usize;
        assert_eq!(body_len, 48 + 8);
        let layout = parse_layout(&hdr, &frame_hdr, &buffer[9..9 + body_len]).unwrap();
        assert!(layout.indices.is_none());
        assert!(layout.uvs.is_none());
        assert!(layout.texture.is_none());
    }

    #[test]
    fn test_v10_keyframe_roundtrip() {
        let hdr = header(10, false, false);
        let vertices = vec![9u8; 12];
        let indices = vec![1u8; 6];
        let uvs = vec![2u8; 16];
        let mut buffer = Vec::new();
        let arrays = arrays(&vertices, None, Some(&indices), Some(&uvs), None);
        let sz = write_frame(&mut buffer, 10, 0, Keyframe::Key, &arrays).unwrap();
        // Raw bytes only, no prefix accounting.
        assert_eq!(sz, 12 + 6 + 16);

        let mut cursor = Cursor::new(&buffer);
        let frame_hdr = FrameHeader::read(&mut cursor).unwrap();
        let body_len = body_disk_len(&hdr, &frame_hdr) as usize;
        assert_eq!(body_len, (12 + 6 + 16) + 3 * 4);
        let layout = parse_layout(&hdr, &frame_hdr, &buffer[9..9 + body_len]).unwrap();
        let view = FrameView::new(frame_hdr, &buffer[9..9 + body_len], layout);
        assert_eq!(view.indices().unwrap(), &indices[..]);
        assert_eq!(view.uvs().unwrap(), &uvs[..]);
        assert!(view.normals().is_none());
    }

    #[test]
    fn test_prefix_past_body_is_corrupt() {
        let hdr = header(12, false, false);
        let frame_hdr = FrameHeader {
            frame_number: 4,
            mesh_data_sz: 8,
            keyframe: Keyframe::Inter,
        };
        // Vertices prefix claims 100 bytes but only 4 follow.
        let mut body = Vec::new();
        body.extend_from_slice(&100u32.to_le_bytes());
        body.extend_from_slice(&[0u8; 4]);
        match parse_layout(&hdr, &frame_hdr, &body) {
            Err(Error::CorruptFrame { frame: 4 }) => {}
            other => panic!("expected CorruptFrame, got {:?}", other),
        }
    }

    #[test]
    fn test_undersized_body_is_corrupt() {
        let hdr = header(12, true, false);
        let frame_hdr = FrameHeader {
            frame_number: 2,
            mesh_data_sz: 12,
            keyframe: Keyframe::Inter,
        };
        // Vertices fit, but the declared normals prefix is missing.
        let mut body = Vec::new();
        body.extend_from_slice(&4u32.to_le_bytes());
        body.extend_from_slice(&[0u8; 4]);
        match parse_layout(&hdr, &frame_hdr, &body) {
            Err(Error::CorruptFrame { frame: 2 }) => {}
            other => panic!("expected CorruptFrame, got {:?}", other),
        }
    }
}
