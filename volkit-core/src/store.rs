//! Read-on-demand frame access with a one-slot keyframe cache.
//!
//! The store scans the sequence once at open time to build a dense index
//! of frame offsets and keyframe flags, and to find the largest frame
//! body. Two buffers of that size are kept: the "current" slot, reloaded
//! on every `read_frame`, and the "keyframe" slot, reloaded only when a
//! different keyframe is needed, so indices/uvs stay addressable while an
//! inter-frame body is also resident.

use crate::frame::{self, FrameHeader, FrameLayout, FrameView};
use crate::header::VolsHeader;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

#[derive(Debug, Clone, Copy)]
struct FrameRecord {
    body_offset: u64,
    body_len: u32,
    header: FrameHeader,
}

/// Frame store over an opened container source, single-file or split
/// header + sequence pair. Single-owner; the input is opened read-only.
pub struct FrameStore {
    file: File,
    header: VolsHeader,
    audio: Option<Vec<u8>>,
    records: Vec<FrameRecord>,
    biggest_body: usize,
    current: Vec<u8>,
    current_layout: FrameLayout,
    current_idx: Option<u32>,
    key_buf: Vec<u8>,
    key_layout: FrameLayout,
    key_idx: Option<u32>,
}

impl FrameStore {
    /// Opens a single-file vologram (v13 layout, or an older combined
    /// file whose frames follow the header directly).
    pub fn open_single(path: &Path) -> Result<Self> {
        let mut file = File::open(path)?;
        let header = VolsHeader::read(&mut file)?;

        let mut audio = None;
        let first_frame_offset = if header.version >= 13 {
            if header.audio {
                file.seek(SeekFrom::Start(u64::from(header.audio_start)))?;
                let sz = file.read_u32::<LittleEndian>()?;
                let mut bytes = vec![0u8; sz as usize];
                file.read_exact(&mut bytes)?;
                audio = Some(bytes);
            }
            u64::from(header.frame_body_start)
        } else {
            file.stream_position()?
        };

        Self::from_parts(file, header, audio, first_frame_offset)
    }

    /// Opens a legacy split-file vologram: header file plus sequence file.
    pub fn open_split(header_path: &Path, sequence_path: &Path) -> Result<Self> {
        let mut header_file = File::open(header_path)?;
        let header = VolsHeader::read(&mut header_file)?;
        let file = File::open(sequence_path)?;
        Self::from_parts(file, header, None, 0)
    }

    fn from_parts(
        mut file: File,
        header: VolsHeader,
        audio: Option<Vec<u8>>,
        first_frame_offset: u64,
    ) -> Result<Self> {
        let mut records = Vec::with_capacity(header.frame_count as usize);
        let mut biggest_body = 0usize;

        let mut offset = first_frame_offset;
        file.seek(SeekFrom::Start(offset))?;
        for i in 0..header.frame_count {
            let frame_hdr = FrameHeader::read(&mut file).map_err(|e| truncated(e, i))?;
            let body_len = frame::body_disk_len(&header, &frame_hdr);
            let body_offset = offset + 9;
            file.seek(SeekFrom::Start(body_offset + body_len))?;

            offset = body_offset + body_len;
            if header.version >= 12 {
                let trailing = file
                    .read_u32::<LittleEndian>()
                    .map_err(|e| truncated(Error::Io(e), i))?;
                if trailing != frame_hdr.mesh_data_sz {
                    return Err(Error::IndexMismatch {
                        frame: i,
                        header: frame_hdr.mesh_data_sz,
                        trailing,
                    });
                }
                offset += 4;
            }

            biggest_body = biggest_body.max(body_len as usize);
            records.push(FrameRecord {
                body_offset,
                body_len: body_len as u32,
                header: frame_hdr,
            });
        }

        Ok(Self {
            file,
            header,
            audio,
            records,
            biggest_body,
            current: Vec::with_capacity(biggest_body),
            current_layout: FrameLayout::default(),
            current_idx: None,
            key_buf: Vec::with_capacity(biggest_body),
            key_layout: FrameLayout::default(),
            key_idx: None,
        })
    }

    pub fn header(&self) -> &VolsHeader {
        &self.header
    }

    pub fn frame_count(&self) -> u32 {
        self.header.frame_count
    }

    /// Muxed audio bytes loaded at open time (v13 only).
    pub fn audio_data(&self) -> Option<&[u8]> {
        self.audio.as_deref()
    }

    /// Largest frame body observed in the container.
    pub fn biggest_frame_body(&self) -> usize {
        self.biggest_body
    }

    fn record(&self, index: u32) -> Result<&FrameRecord> {
        self.records
            .get(index as usize)
            .ok_or(Error::FrameOutOfRange {
                index,
                count: self.header.frame_count,
            })
    }

    pub fn frame_header(&self, index: u32) -> Result<FrameHeader> {
        Ok(self.record(index)?.header)
    }

    pub fn is_keyframe(&self, index: u32) -> Result<bool> {
        Ok(self.record(index)?.header.keyframe.is_key())
    }

    /// Largest keyframe index `k <= index`. A container whose first frame
    /// is not a keyframe has no valid answer for early frames.
    pub fn previous_keyframe_index(&self, index: u32) -> Result<u32> {
        self.record(index)?;
        for k in (0..=index).rev() {
            if self.records[k as usize].header.keyframe.is_key() {
                return Ok(k);
            }
        }
        Err(Error::NoKeyframeBefore(index))
    }

    fn load_body(file: &mut File, rec: &FrameRecord, buf: &mut Vec<u8>) -> Result<()> {
        buf.resize(rec.body_len as usize, 0);
        file.seek(SeekFrom::Start(rec.body_offset))?;
        file.read_exact(buf)
            .map_err(|e| truncated(Error::Io(e), rec.header.frame_number))?;
        Ok(())
    }

    /// Loads frame `index` into the current slot. If it is itself a
    /// keyframe the body is mirrored into the keyframe slot as well.
    pub fn read_frame(&mut self, index: u32) -> Result<()> {
        let rec = *self.record(index)?;
        Self::load_body(&mut self.file, &rec, &mut self.current)?;
        self.current_layout = frame::parse_layout(&self.header, &rec.header, &self.current)?;
        self.current_idx = Some(index);

        if rec.header.keyframe.is_key() {
            self.key_buf.clear();
            self.key_buf.extend_from_slice(&self.current);
            self.key_layout = self.current_layout;
            self.key_idx = Some(index);
        }
        Ok(())
    }

    /// Loads frame `index` into the keyframe slot only. No-op when that
    /// keyframe is already cached.
    pub fn load_keyframe(&mut self, index: u32) -> Result<()> {
        if self.key_idx == Some(index) {
            return Ok(());
        }
        let rec = *self.record(index)?;
        Self::load_body(&mut self.file, &rec, &mut self.key_buf)?;
        self.key_layout = frame::parse_layout(&self.header, &rec.header, &self.key_buf)?;
        self.key_idx = Some(index);
        Ok(())
    }

    /// View of the most recently read frame. Invalidated by the next
    /// `read_frame`.
    pub fn current_view(&self) -> Option<FrameView<'_>> {
        let idx = self.current_idx?;
        let header = self.records[idx as usize].header;
        Some(FrameView::new(header, &self.current, self.current_layout))
    }

    /// View of the cached keyframe. Invalidated only when a different
    /// keyframe is loaded.
    pub fn keyframe_view(&self) -> Option<FrameView<'_>> {
        let idx = self.key_idx?;
        let header = self.records[idx as usize].header;
        Some(FrameView::new(header, &self.key_buf, self.key_layout))
    }

    pub fn cached_keyframe(&self) -> Option<u32> {
        self.key_idx
    }
}

fn truncated(e: Error, frame: u32) -> Error {
    match e {
        Error::Io(io) if io.kind() == std::io::ErrorKind::UnexpectedEof => {
            Error::CorruptFrame { frame }
        }
        other => other,
    }
}
