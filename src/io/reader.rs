/// H17D file reader

use crate::error::{H17Error, Result};
use crate::format::constants::*;
use crate::format::{detect_format, BlockType, DistributionStatus, TrackSource};
use crate::image::{
    Block, DataBlock, DiskFormat, DiskImage, Flags, RawDataBlock, RawSector, RawTrack, Sector,
    Track,
};
use crate::status::SectorError;
use std::path::Path;

/// Read an H17D file from disk
pub fn read_h17<P: AsRef<Path>>(path: P) -> Result<DiskImage> {
    let bytes = std::fs::read(&path)?;
    let mut image = read_h17_bytes(&bytes)?;
    image.filename = Some(path.as_ref().display().to_string());
    Ok(image)
}

/// Parse an H17D image from memory
pub fn read_h17_bytes(bytes: &[u8]) -> Result<DiskImage> {
    if bytes.len() < FILE_HEADER_SIZE {
        return Err(H17Error::invalid_format(format!(
            "File too short for header: {} bytes",
            bytes.len()
        )));
    }
    if !bytes.starts_with(H17D_SIGNATURE) {
        return Err(H17Error::invalid_format("Missing H17D signature"));
    }
    let version = detect_format(bytes)
        .ok_or_else(|| H17Error::invalid_format("Unreadable file header"))?;
    if !version.is_supported() {
        return Err(H17Error::invalid_format(format!(
            "Unsupported format version {}",
            version
        )));
    }

    let mut image = DiskImage::new();
    image.version = version;

    let mut reader = ByteReader::new(&bytes[FILE_HEADER_SIZE..], FILE_HEADER_SIZE);
    while !reader.is_empty() {
        let header_offset = reader.offset();
        let type_id = reader.u8()?;
        let flag = reader.u8()?;
        let length = reader.u32()? as usize;
        let payload = reader.take(length)?;

        let mandatory = flag & MANDATORY_FLAG != 0;
        let Some(block_type) = BlockType::from_id(type_id) else {
            if mandatory {
                return Err(H17Error::UnknownMandatoryBlock {
                    block_type: type_id,
                });
            }
            log::warn!(
                "Skipping unknown block type 0x{:02X} ({} bytes) at offset {}",
                type_id,
                length,
                header_offset
            );
            continue;
        };

        if mandatory != block_type.is_mandatory() {
            log::debug!(
                "{} at offset {} has mandatory flag 0x{:02X}",
                block_type,
                header_offset,
                flag
            );
        }

        let block = parse_block(block_type, payload)?;
        log::debug!("Read {}", block.describe(Default::default()));
        if image.blocks.insert(block_type, block).is_some() {
            log::warn!("Duplicate {} at offset {} replaces earlier one", block_type, header_offset);
        }
    }

    for issue in image.consistency_issues() {
        log::warn!("{}", issue);
    }

    image.mark_unchanged();
    Ok(image)
}

/// Decode one top-level block payload
fn parse_block(block_type: BlockType, mut payload: ByteReader<'_>) -> Result<Block> {
    let block = match block_type {
        BlockType::DiskFormat => {
            let sides = payload.u8()?;
            let tracks = payload.u8()?;
            Block::DiskFormat(DiskFormat::new(sides, tracks))
        }
        BlockType::Flags => Block::Flags(Flags {
            write_protect: payload.u8()? != 0,
            distribution: DistributionStatus::from(payload.u8()?),
            track_source: TrackSource::from(payload.u8()?),
        }),
        BlockType::Data => Block::Data(parse_data(payload)?),
        BlockType::RawData => Block::RawData(parse_raw_data(payload)?),
        text_type => {
            let text = String::from_utf8_lossy(payload.rest());
            let text = text.trim_end_matches('\0').to_string();
            Block::text(text_type, text)
                .ok_or_else(|| H17Error::parse(payload.offset(), "Unexpected block type"))?
        }
    };
    Ok(block)
}

/// Decode the Track sub-blocks of a Data block
fn parse_data(mut payload: ByteReader<'_>) -> Result<DataBlock> {
    let mut data = DataBlock::new();

    while !payload.is_empty() {
        payload.expect_tag(TRACK_SUB_BLOCK, "track")?;
        let side = payload.u8()?;
        let track_num = payload.u8()?;
        let length = payload.u16()? as usize;
        let mut sectors = payload.take(length)?;

        let mut track = Track::new(side, track_num);
        while !sectors.is_empty() {
            sectors.expect_tag(SECTOR_SUB_BLOCK, "sector")?;
            let number = sectors.u8()?;
            let error = SectorError::from(sectors.u8()?);
            let length = sectors.u16()? as usize;
            let bytes = sectors.take(length)?;
            track.add_sector(Sector::new(number, error, bytes.rest().to_vec()));
        }

        data.push_track(track);
    }

    Ok(data)
}

/// Decode the RawTrack sub-blocks of a RawData block
fn parse_raw_data(mut payload: ByteReader<'_>) -> Result<RawDataBlock> {
    let mut raw = RawDataBlock::new();

    while !payload.is_empty() {
        payload.expect_tag(RAW_TRACK_SUB_BLOCK, "raw track")?;
        let side = payload.u8()?;
        let track_num = payload.u8()?;
        let length = payload.u32()? as usize;
        let mut sectors = payload.take(length)?;

        let mut track = RawTrack::new(side, track_num);
        while !sectors.is_empty() {
            sectors.expect_tag(RAW_SECTOR_SUB_BLOCK, "raw sector")?;
            let number = sectors.u8()?;
            let length = sectors.u16()? as usize;
            let bytes = sectors.take(length)?;
            track.add_sector(RawSector::new(number, bytes.rest().to_vec()));
        }

        raw.push_track(track);
    }

    Ok(raw)
}

/// Bounds-checked big-endian cursor over a byte slice
///
/// Offsets are reported relative to the start of the file.
struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    fn offset(&self) -> usize {
        self.base + self.pos
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Split off the next `len` bytes as their own reader
    fn take(&mut self, len: usize) -> Result<ByteReader<'a>> {
        if len > self.remaining() {
            return Err(H17Error::SizeMismatch {
                offset: self.offset(),
                declared: len,
                available: self.remaining(),
            });
        }
        let sub = ByteReader::new(&self.data[self.pos..self.pos + len], self.offset());
        self.pos += len;
        Ok(sub)
    }

    /// Everything not yet consumed
    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?.data[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2)?.data;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?.data;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn expect_tag(&mut self, tag: u8, what: &str) -> Result<()> {
        let offset = self.offset();
        let found = self.u8()?;
        if found != tag {
            return Err(H17Error::parse(
                offset,
                format!("Expected {} sub-block 0x{:02X}, found 0x{:02X}", what, tag, found),
            ));
        }
        Ok(())
    }
}
