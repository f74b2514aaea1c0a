//! Vologram container header serialization and deserialization.
//!
//! Five header profiles share one materialized struct: v10 (bare legacy),
//! v11 (adds normals/textured flags and 16-bit texture dims), v12 (adds the
//! placement transform), v13 (single-file layout with IFF magic, texture
//! codec info, fps, and audio/frame offsets).

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Magic bytes identifying a vologram container: "VOLS"
pub const MAGIC: [u8; 4] = *b"VOLS";

/// Lowest supported container version
pub const MIN_VERSION: u32 = 10;
/// Highest supported container version
pub const MAX_VERSION: u32 = 13;

/// How the format tag is encoded on disk.
///
/// v13 files open with the bare 4-byte IFF magic; older Unity-era files
/// carry a length-prefixed string that still spells "VOLS".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// Bare 4-byte magic, no length prefix.
    Iff,
    /// `u8` length followed by the string bytes.
    Prefixed,
}

/// Texture payload compression scheme (v13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextureCompression {
    Raw = 0,
    Etc1s = 1,
    Uastc = 2,
}

impl TextureCompression {
    fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Etc1s),
            2 => Ok(Self::Uastc),
            other => Err(Error::BadTextureFormat(other)),
        }
    }
}

/// Texture payload container format (v13).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextureContainer {
    Raw = 0,
    Basis = 1,
    Ktx2 = 2,
}

impl TextureContainer {
    fn from_u8(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Raw),
            1 => Ok(Self::Basis),
            2 => Ok(Self::Ktx2),
            other => Err(Error::BadTextureFormat(other)),
        }
    }
}

/// Materialized vologram header holding the superset of all version
/// profiles. The serializer consults `version` to decide which fields
/// exist on disk; fields outside the profile are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct VolsHeader {
    pub format: FormatTag,
    pub version: u32,
    pub compression: u32,
    /// v < 13 only.
    pub mesh_name: String,
    /// v < 13 only.
    pub material: String,
    /// v < 13 only.
    pub shader: String,
    /// v < 13 only.
    pub topology: u32,
    pub frame_count: u32,
    /// v >= 11. v10 bodies never carry normals.
    pub normals: bool,
    /// v >= 11. v10 bodies never carry textures.
    pub textured: bool,
    /// v >= 13.
    pub texture_compression: TextureCompression,
    /// v >= 13.
    pub texture_container_format: TextureContainer,
    pub texture_width: u32,
    pub texture_height: u32,
    /// 11 <= v < 13 only.
    pub texture_format: u16,
    /// v >= 13.
    pub fps: f32,
    /// v >= 13.
    pub audio: bool,
    /// v >= 13: byte offset of the audio size field in the file.
    pub audio_start: u32,
    /// v >= 13: byte offset of the first frame record in the file.
    pub frame_body_start: u32,
    /// 12 <= v < 13 only.
    pub translation: [f32; 3],
    /// 12 <= v < 13 only.
    pub rotation: [f32; 4],
    /// 12 <= v < 13 only.
    pub scale: f32,
}

impl Default for VolsHeader {
    fn default() -> Self {
        Self {
            format: FormatTag::Iff,
            version: MAX_VERSION,
            compression: 0,
            mesh_name: String::new(),
            material: String::new(),
            shader: String::new(),
            topology: 0,
            frame_count: 0,
            normals: false,
            textured: false,
            texture_compression: TextureCompression::Raw,
            texture_container_format: TextureContainer::Raw,
            texture_width: 0,
            texture_height: 0,
            texture_format: 0,
            fps: 30.0,
            audio: false,
            audio_start: 0,
            frame_body_start: 0,
            translation: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: 1.0,
        }
    }
}

impl VolsHeader {
    /// Reads a header from a reader, detecting the format-tag encoding
    /// from the first byte.
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Self::read_inner(reader).map_err(|e| match e {
            Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::TruncatedHeader
            }
            other => other,
        })
    }

    fn read_inner<R: Read>(reader: &mut R) -> Result<Self> {
        let mut hdr = Self::default();

        // First byte disambiguates: 'V' opens the bare IFF magic, anything
        // else is the length of a prefixed string that must spell "VOLS".
        let first = reader.read_u8()?;
        if first == b'V' {
            let mut rest = [0u8; 3];
            reader.read_exact(&mut rest)?;
            if rest != [b'O', b'L', b'S'] {
                return Err(Error::BadMagic);
            }
            hdr.format = FormatTag::Iff;
        } else {
            let mut tag = vec![0u8; first as usize];
            reader.read_exact(&mut tag)?;
            if tag != MAGIC {
                return Err(Error::BadMagic);
            }
            hdr.format = FormatTag::Prefixed;
        }

        hdr.version = reader.read_u32::<LittleEndian>()?;
        if !(MIN_VERSION..=MAX_VERSION).contains(&hdr.version) {
            return Err(Error::UnsupportedVersion(hdr.version));
        }
        hdr.compression = reader.read_u32::<LittleEndian>()?;

        if hdr.version < 13 {
            hdr.mesh_name = read_short_string(reader)?;
            hdr.material = read_short_string(reader)?;
            hdr.shader = read_short_string(reader)?;
            hdr.topology = reader.read_u32::<LittleEndian>()?;
        }

        hdr.frame_count = reader.read_u32::<LittleEndian>()?;

        if hdr.version >= 11 {
            hdr.normals = reader.read_u8()? != 0;
            hdr.textured = reader.read_u8()? != 0;
        }

        if hdr.version >= 13 {
            hdr.texture_compression = TextureCompression::from_u8(reader.read_u8()?)?;
            hdr.texture_container_format = TextureContainer::from_u8(reader.read_u8()?)?;
            hdr.texture_width = reader.read_u32::<LittleEndian>()?;
            hdr.texture_height = reader.read_u32::<LittleEndian>()?;
            hdr.fps = reader.read_f32::<LittleEndian>()?;
            hdr.audio = reader.read_u32::<LittleEndian>()? != 0;
            hdr.audio_start = reader.read_u32::<LittleEndian>()?;
            hdr.frame_body_start = reader.read_u32::<LittleEndian>()?;
        } else if hdr.version >= 11 {
            hdr.texture_width = u32::from(reader.read_u16::<LittleEndian>()?);
            hdr.texture_height = u32::from(reader.read_u16::<LittleEndian>()?);
            hdr.texture_format = reader.read_u16::<LittleEndian>()?;
        }

        if hdr.version == 12 {
            for t in hdr.translation.iter_mut() {
                *t = reader.read_f32::<LittleEndian>()?;
            }
            for r in hdr.rotation.iter_mut() {
                *r = reader.read_f32::<LittleEndian>()?;
            }
            hdr.scale = reader.read_f32::<LittleEndian>()?;
        }

        Ok(hdr)
    }

    /// Writes the header to a writer. Emits exactly the byte sequence
    /// `read` accepts for this version, no padding or reordering.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        match self.format {
            FormatTag::Iff => writer.write_all(&MAGIC)?,
            FormatTag::Prefixed => {
                writer.write_u8(MAGIC.len() as u8)?;
                writer.write_all(&MAGIC)?;
            }
        }

        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.compression)?;

        if self.version < 13 {
            write_short_string(writer, &self.mesh_name)?;
            write_short_string(writer, &self.material)?;
            write_short_string(writer, &self.shader)?;
            writer.write_u32::<LittleEndian>(self.topology)?;
        }

        writer.write_u32::<LittleEndian>(self.frame_count)?;

        if self.version >= 11 {
            writer.write_u8(self.normals as u8)?;
            writer.write_u8(self.textured as u8)?;
        }

        if self.version >= 13 {
            writer.write_u8(self.texture_compression as u8)?;
            writer.write_u8(self.texture_container_format as u8)?;
            writer.write_u32::<LittleEndian>(self.texture_width)?;
            writer.write_u32::<LittleEndian>(self.texture_height)?;
            writer.write_f32::<LittleEndian>(self.fps)?;
            writer.write_u32::<LittleEndian>(self.audio as u32)?;
            writer.write_u32::<LittleEndian>(self.audio_start)?;
            writer.write_u32::<LittleEndian>(self.frame_body_start)?;
        } else if self.version >= 11 {
            writer.write_u16::<LittleEndian>(self.texture_width as u16)?;
            writer.write_u16::<LittleEndian>(self.texture_height as u16)?;
            writer.write_u16::<LittleEndian>(self.texture_format)?;
        }

        if self.version == 12 {
            for t in &self.translation {
                writer.write_f32::<LittleEndian>(*t)?;
            }
            for r in &self.rotation {
                writer.write_f32::<LittleEndian>(*r)?;
            }
            writer.write_f32::<LittleEndian>(self.scale)?;
        }

        Ok(())
    }

    /// Serialized byte length of this header, computed from the field
    /// widths of its version profile. v13 audio/frame offsets are derived
    /// from this, never from stream position.
    pub fn serialized_size(&self) -> u32 {
        let mut sz = match self.format {
            FormatTag::Iff => 4u32,
            FormatTag::Prefixed => 1 + 4,
        };
        sz += 4 + 4; // version, compression
        if self.version < 13 {
            sz += 1 + self.mesh_name.len() as u32;
            sz += 1 + self.material.len() as u32;
            sz += 1 + self.shader.len() as u32;
            sz += 4; // topology
        }
        sz += 4; // frame_count
        if self.version >= 11 {
            sz += 2; // normals, textured
        }
        if self.version >= 13 {
            sz += 1 + 1 + 4 + 4 + 4 + 4 + 4 + 4;
        } else if self.version >= 11 {
            sz += 2 + 2 + 2;
        }
        if self.version == 12 {
            sz += (3 + 4 + 1) * 4;
        }
        sz
    }

    /// True when frame bodies carry a normals sub-array.
    pub fn has_normals(&self) -> bool {
        self.version >= 11 && self.normals
    }

    /// True when frame bodies carry a texture sub-array.
    pub fn has_frame_textures(&self) -> bool {
        self.version >= 11 && self.textured
    }
}

fn read_short_string<R: Read>(reader: &mut R) -> Result<String> {
    let len = reader.read_u8()? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn write_short_string<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer.write_u8(s.len() as u8)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn v13_header() -> VolsHeader {
        VolsHeader {
            format: FormatTag::Iff,
            version: 13,
            frame_count: 30,
            normals: true,
            textured: true,
            texture_compression: TextureCompression::Uastc,
            texture_container_format: TextureContainer::Basis,
            texture_width: 1024,
            texture_height: 1024,
            fps: 30.0,
            audio: true,
            audio_start: 44,
            frame_body_start: 44 + 4 + 128,
            ..VolsHeader::default()
        }
    }

    #[test]
    fn test_v13_roundtrip() {
        let header = v13_header();

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u32, header.serialized_size());
        assert_eq!(header.serialized_size(), 44);

        let read_back = VolsHeader::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(header, read_back);
    }

    #[test]
    fn test_v12_roundtrip() {
        let header = VolsHeader {
            format: FormatTag::Prefixed,
            version: 12,
            mesh_name: "mesh".to_string(),
            material: "mat".to_string(),
            shader: "standard".to_string(),
            topology: 4,
            frame_count: 50,
            normals: true,
            textured: false,
            texture_width: 2048,
            texture_height: 2048,
            texture_format: 1,
            translation: [0.5, 1.0, -2.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: 0.9,
            ..VolsHeader::default()
        };

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u32, header.serialized_size());

        let read_back = VolsHeader::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(header, read_back);
    }

    #[test]
    fn test_v11_roundtrip() {
        let header = VolsHeader {
            format: FormatTag::Prefixed,
            version: 11,
            frame_count: 3,
            normals: false,
            textured: true,
            texture_width: 1024,
            texture_height: 512,
            texture_format: 0,
            ..VolsHeader::default()
        };

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u32, header.serialized_size());

        let read_back = VolsHeader::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(header, read_back);
    }

    #[test]
    fn test_v10_roundtrip() {
        let header = VolsHeader {
            format: FormatTag::Prefixed,
            version: 10,
            mesh_name: "legacy".to_string(),
            frame_count: 7,
            ..VolsHeader::default()
        };

        let mut buffer = Vec::new();
        header.write(&mut buffer).unwrap();
        assert_eq!(buffer.len() as u32, header.serialized_size());

        let read_back = VolsHeader::read(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(read_back.version, 10);
        assert_eq!(read_back.mesh_name, "legacy");
        assert!(!read_back.has_normals());
        assert!(!read_back.has_frame_textures());
    }

    #[test]
    fn test_bad_magic_rejected() {
        // Eight zero bytes: read as a zero-length prefixed tag, which
        // cannot spell VOLS.
        let bytes = [0u8; 8];
        match VolsHeader::read(&mut Cursor::new(bytes)) {
            Err(Error::BadMagic) => {}
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_iff_magic_mismatch_rejected() {
        let bytes = *b"VOLT\x0d\x00\x00\x00";
        match VolsHeader::read(&mut Cursor::new(bytes)) {
            Err(Error::BadMagic) => {}
            other => panic!("expected BadMagic, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&9u32.to_le_bytes());
        buffer.extend_from_slice(&0u32.to_le_bytes());
        match VolsHeader::read(&mut Cursor::new(buffer)) {
            Err(Error::UnsupportedVersion(9)) => {}
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_truncated_header() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&MAGIC);
        buffer.extend_from_slice(&13u32.to_le_bytes());
        // Cut off mid-field.
        buffer.extend_from_slice(&[0u8; 2]);
        match VolsHeader::read(&mut Cursor::new(buffer)) {
            Err(Error::TruncatedHeader) => {}
            other => panic!("expected TruncatedHeader, got {:?}", other),
        }
    }
}
