/// H17D file writer

use crate::error::{H17Error, Result};
use crate::format::constants::*;
use crate::format::{BlockType, FormatVersion};
use crate::image::{Block, DiskImage, RawSector, RawTrack, Sector, Track};
use std::fs::File;
use std::io::{BufWriter, Cursor, Seek, SeekFrom, Write};
use std::path::Path;

/// Width of a length field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthWidth {
    /// 16-bit big-endian
    U16,
    /// 32-bit big-endian
    U32,
}

impl LengthWidth {
    fn name(self) -> &'static str {
        match self {
            LengthWidth::U16 => "16-bit",
            LengthWidth::U32 => "32-bit",
        }
    }

    fn max(self) -> u64 {
        match self {
            LengthWidth::U16 => u16::MAX as u64,
            LengthWidth::U32 => u32::MAX as u64,
        }
    }
}

/// A length field written as a placeholder, to be patched once the content
/// that follows it is complete
#[derive(Debug)]
#[must_use = "the placeholder stays zero unless the pending length is finished"]
pub struct PendingLength {
    field_offset: u64,
    content_start: u64,
    width: LengthWidth,
}

impl PendingLength {
    /// File offset of the placeholder
    pub fn field_offset(&self) -> u64 {
        self.field_offset
    }

    /// Width of the placeholder
    pub fn width(&self) -> LengthWidth {
        self.width
    }
}

/// Incremental H17D writer over any seekable sink
///
/// Blocks are written in the order they are given. Data, track and raw
/// framing is written with a placeholder length that is patched when the
/// nested content is finished.
#[derive(Debug)]
pub struct ImageWriter<W: Write + Seek> {
    inner: W,
}

impl<W: Write + Seek> ImageWriter<W> {
    /// Start a file at the current format version
    pub fn new(inner: W) -> Result<Self> {
        Self::with_version(inner, FormatVersion::current())
    }

    /// Start a file with an explicit version in its header
    pub fn with_version(mut inner: W, version: FormatVersion) -> Result<Self> {
        inner.write_all(H17D_SIGNATURE)?;
        inner.write_all(&[version.major, version.minor, version.point])?;
        Ok(Self { inner })
    }

    /// Current write position
    pub fn position(&mut self) -> Result<u64> {
        Ok(self.inner.stream_position()?)
    }

    /// Write a zero placeholder for a length field
    pub fn begin_length(&mut self, width: LengthWidth) -> Result<PendingLength> {
        let field_offset = self.position()?;
        match width {
            LengthWidth::U16 => self.inner.write_all(&0u16.to_be_bytes())?,
            LengthWidth::U32 => self.inner.write_all(&0u32.to_be_bytes())?,
        }
        Ok(PendingLength {
            field_offset,
            content_start: field_offset + width_bytes(width),
            width,
        })
    }

    /// Patch a placeholder with the length of everything written since it
    ///
    /// Returns the patched length and leaves the write position at the end.
    pub fn finish_length(&mut self, pending: PendingLength) -> Result<u64> {
        let end = self.position()?;
        let length = end - pending.content_start;
        if length > pending.width.max() {
            return Err(H17Error::LengthOverflow {
                field: pending.width.name(),
                length,
            });
        }

        self.inner.seek(SeekFrom::Start(pending.field_offset))?;
        match pending.width {
            LengthWidth::U16 => self.inner.write_all(&(length as u16).to_be_bytes())?,
            LengthWidth::U32 => self.inner.write_all(&(length as u32).to_be_bytes())?,
        }
        self.inner.seek(SeekFrom::Start(end))?;
        Ok(length)
    }

    /// Write a top-level block header whose length is not yet known
    pub fn begin_block(&mut self, block_type: BlockType) -> Result<PendingLength> {
        self.inner.write_all(&[block_type.id(), mandatory_flag(block_type)])?;
        self.begin_length(LengthWidth::U32)
    }

    /// Close a top-level block opened with [`begin_block`](Self::begin_block)
    pub fn end_block(&mut self, pending: PendingLength) -> Result<u32> {
        let length = self.finish_length(pending)?;
        log::debug!("Block closed at {} bytes", length);
        Ok(length as u32)
    }

    /// Write a complete top-level block
    pub fn write_block(&mut self, block: &Block) -> Result<()> {
        let block_type = block.block_type();
        match block {
            Block::Data(data) => {
                let pending = self.begin_block(block_type)?;
                for track in data.tracks() {
                    self.write_track(track)?;
                }
                self.end_block(pending)?;
            }
            Block::RawData(raw) => {
                let pending = self.begin_block(block_type)?;
                for track in raw.tracks() {
                    self.write_raw_track(track)?;
                }
                self.end_block(pending)?;
            }
            _ => {
                let payload = fixed_payload(block);
                self.write_fixed_block(block_type, &payload)?;
            }
        }
        Ok(())
    }

    fn write_fixed_block(&mut self, block_type: BlockType, payload: &[u8]) -> Result<()> {
        let length = u32::try_from(payload.len()).map_err(|_| H17Error::LengthOverflow {
            field: LengthWidth::U32.name(),
            length: payload.len() as u64,
        })?;
        self.inner.write_all(&[block_type.id(), mandatory_flag(block_type)])?;
        self.inner.write_all(&length.to_be_bytes())?;
        self.inner.write_all(payload)?;
        log::debug!("Wrote {} ({} bytes)", block_type, length);
        Ok(())
    }

    /// Write a Track sub-block inside an open Data block
    pub fn write_track(&mut self, track: &Track) -> Result<()> {
        self.inner
            .write_all(&[TRACK_SUB_BLOCK, track.side, track.track])?;
        let pending = self.begin_length(LengthWidth::U16)?;
        for sector in track.sectors() {
            self.write_sector(sector)?;
        }
        self.finish_length(pending)?;
        Ok(())
    }

    fn write_sector(&mut self, sector: &Sector) -> Result<()> {
        let length = u16::try_from(sector.size()).map_err(|_| H17Error::LengthOverflow {
            field: LengthWidth::U16.name(),
            length: sector.size() as u64,
        })?;
        self.inner
            .write_all(&[SECTOR_SUB_BLOCK, sector.number, u8::from(sector.error)])?;
        self.inner.write_all(&length.to_be_bytes())?;
        self.inner.write_all(sector.data())?;
        Ok(())
    }

    /// Write a RawTrack sub-block inside an open RawData block
    pub fn write_raw_track(&mut self, track: &RawTrack) -> Result<()> {
        self.inner
            .write_all(&[RAW_TRACK_SUB_BLOCK, track.side, track.track])?;
        let pending = self.begin_length(LengthWidth::U32)?;
        for sector in track.sectors() {
            self.write_raw_sector(sector)?;
        }
        self.finish_length(pending)?;
        Ok(())
    }

    fn write_raw_sector(&mut self, sector: &RawSector) -> Result<()> {
        let length = u16::try_from(sector.size()).map_err(|_| H17Error::LengthOverflow {
            field: LengthWidth::U16.name(),
            length: sector.size() as u64,
        })?;
        self.inner.write_all(&[RAW_SECTOR_SUB_BLOCK, sector.number])?;
        self.inner.write_all(&length.to_be_bytes())?;
        self.inner.write_all(sector.data())?;
        Ok(())
    }

    /// Flush buffered output
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Flush and hand back the sink
    pub fn into_inner(mut self) -> Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

fn width_bytes(width: LengthWidth) -> u64 {
    match width {
        LengthWidth::U16 => 2,
        LengthWidth::U32 => 4,
    }
}

fn mandatory_flag(block_type: BlockType) -> u8 {
    if block_type.is_mandatory() {
        MANDATORY_FLAG
    } else {
        0
    }
}

/// Payload of a block whose length is known up front
fn fixed_payload(block: &Block) -> Vec<u8> {
    match block {
        Block::DiskFormat(format) => vec![format.sides, format.tracks],
        Block::Flags(flags) => vec![
            flags.write_protect as u8,
            u8::from(flags.distribution),
            u8::from(flags.track_source),
        ],
        Block::Data(_) | Block::RawData(_) => Vec::new(),
        text => text.as_text().unwrap_or_default().as_bytes().to_vec(),
    }
}

/// Write an image to a seekable sink, returning the sink
pub fn write_h17<W: Write + Seek>(image: &DiskImage, sink: W) -> Result<W> {
    let version = if image.version.is_supported() {
        image.version
    } else {
        FormatVersion::current()
    };
    let mut writer = ImageWriter::with_version(sink, version)?;
    for block in image.blocks() {
        writer.write_block(block)?;
    }
    writer.into_inner()
}

/// Serialize an image into memory
pub fn write_h17_bytes(image: &DiskImage) -> Result<Vec<u8>> {
    Ok(write_h17(image, Cursor::new(Vec::new()))?.into_inner())
}

/// Write an image to a file
pub fn write_h17_file<P: AsRef<Path>>(image: &DiskImage, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    let mut file = write_h17(image, file)?;
    file.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::DataBlock;
    use crate::status::SectorError;

    fn be16(bytes: &[u8], at: usize) -> usize {
        u16::from_be_bytes([bytes[at], bytes[at + 1]]) as usize
    }

    fn be32(bytes: &[u8], at: usize) -> usize {
        u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]) as usize
    }

    #[test]
    fn test_empty_image() {
        let bytes = write_h17_bytes(&DiskImage::new()).unwrap();
        assert_eq!(bytes, b"H17D\x01\x00\x00");
    }

    #[test]
    fn test_fixed_blocks() {
        let mut image = DiskImage::new();
        image.set_disk_format(2, 80);
        image.set_label("ABC");

        let bytes = write_h17_bytes(&image).unwrap();
        assert_eq!(bytes.len(), FILE_HEADER_SIZE + 2 * BLOCK_HEADER_SIZE + 2 + 3);
        assert_eq!(
            &bytes[7..],
            &[
                0x00, 0x80, 0, 0, 0, 2, 2, 80, // disk format
                0x02, 0x00, 0, 0, 0, 3, b'A', b'B', b'C', // label
            ]
        );
    }

    #[test]
    fn test_pending_length_patch() {
        let mut writer = ImageWriter::new(Cursor::new(Vec::new())).unwrap();
        let pending = writer.begin_length(LengthWidth::U16).unwrap();
        assert_eq!(pending.field_offset(), 7);
        writer.inner.write_all(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(writer.finish_length(pending).unwrap(), 5);
        assert_eq!(writer.position().unwrap(), 14);

        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(&bytes[7..], &[0, 5, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_nested_backpatch() {
        let mut track_a = Track::new(0, 0);
        track_a.add_sector(Sector::with_data(0, vec![1; 320]));
        track_a.add_sector(Sector::empty(1, SectorError::HardwareReadFailure));
        let mut track_b = Track::new(0, 1);
        track_b.add_sector(Sector::with_data(0, vec![2; 17]));

        let mut data = DataBlock::new();
        data.add_track(track_a);
        data.add_track(track_b);
        let mut image = DiskImage::new();
        image.set_data(data);

        let bytes = write_h17_bytes(&image).unwrap();
        let data_len = be32(&bytes, 9);
        assert_eq!(data_len, bytes.len() - 13);

        let first_track = be16(&bytes, 16);
        assert_eq!(first_track, 5 + 320 + 5);
        let second = 13 + 5 + first_track;
        assert_eq!(bytes[second], TRACK_SUB_BLOCK);
        assert_eq!(be16(&bytes, second + 3), 5 + 17);
        assert_eq!(data_len, (5 + first_track) + (5 + 22));
    }

    #[test]
    fn test_track_length_overflow() {
        let mut track = Track::new(0, 0);
        for n in 0..3 {
            track.add_sector(Sector::with_data(n, vec![0; 30_000]));
        }
        let mut writer = ImageWriter::new(Cursor::new(Vec::new())).unwrap();
        let pending = writer.begin_block(BlockType::Data).unwrap();
        assert!(matches!(
            writer.write_track(&track),
            Err(H17Error::LengthOverflow {
                field: "16-bit",
                length: 90_015
            })
        ));
        let _ = writer.end_block(pending);
    }

    #[test]
    fn test_raw_track_framing() {
        let mut raw = RawTrack::new(1, 4);
        raw.add_sector(RawSector::new(0, vec![0xAA; 700]));
        let mut writer = ImageWriter::new(Cursor::new(Vec::new())).unwrap();
        let pending = writer.begin_block(BlockType::RawData).unwrap();
        writer.write_raw_track(&raw).unwrap();
        assert_eq!(writer.end_block(pending).unwrap(), 7 + 704);

        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(&bytes[7..9], &[0x30, 0x00]);
        assert_eq!(&bytes[13..16], &[RAW_TRACK_SUB_BLOCK, 1, 4]);
        assert_eq!(be32(&bytes, 16), 704);
        assert_eq!(&bytes[20..24], &[RAW_SECTOR_SUB_BLOCK, 0, 0x02, 0xBC]);
    }
}
