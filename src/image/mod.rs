/// H17D image data structures

/// Top-level blocks
pub mod block;
/// Image builder for creating H17D images
pub mod builder;
/// Sector definition and status
pub mod sector;
/// Track definition
pub mod track;

pub use block::{Block, DataBlock, DetailLevel, DiskFormat, Flags, RawDataBlock};
pub use builder::DiskImageBuilder;
pub use sector::{RawSector, Sector, SectorStatus};
pub use track::{RawTrack, Track};

use crate::error::{H17Error, Result};
use crate::format::{BlockType, FormatVersion};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Main H17D image container
///
/// Holds at most one block of each type. Blocks iterate in type-id order,
/// which is also the order they are written to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskImage {
    /// Format version read from, or to be written to, the file header
    pub(crate) version: FormatVersion,
    /// Blocks keyed by type
    pub(crate) blocks: BTreeMap<BlockType, Block>,
    /// Has the image been modified?
    changed: bool,
    /// Original filename if loaded from disk
    pub(crate) filename: Option<String>,
}

impl Default for DiskImage {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskImage {
    /// Create an empty image at the current format version
    pub fn new() -> Self {
        Self {
            version: FormatVersion::current(),
            blocks: BTreeMap::new(),
            changed: false,
            filename: None,
        }
    }

    /// Create a new builder for constructing images
    pub fn builder() -> DiskImageBuilder {
        DiskImageBuilder::new()
    }

    /// Open an H17D file from disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        crate::io::reader::read_h17(path)
    }

    /// Save the image to a file
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        crate::io::writer::write_h17_file(self, path)?;
        self.mark_unchanged();
        Ok(())
    }

    /// Get the format version
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    /// Get the original filename if loaded from disk
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Check if the image has been modified
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Mark the image as unchanged
    pub fn mark_unchanged(&mut self) {
        self.changed = false;
    }

    /// Iterate over the blocks in file order
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// Get the number of blocks present
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Get a block by type
    pub fn get_block(&self, block_type: BlockType) -> Option<&Block> {
        self.blocks.get(&block_type)
    }

    /// Check if a block of the given type is present
    pub fn has_block(&self, block_type: BlockType) -> bool {
        self.blocks.contains_key(&block_type)
    }

    /// Insert a block, returning any block of the same type it replaced
    pub fn set_block(&mut self, block: Block) -> Option<Block> {
        self.changed = true;
        self.blocks.insert(block.block_type(), block)
    }

    /// Remove a block by type
    pub fn remove_block(&mut self, block_type: BlockType) -> Option<Block> {
        let removed = self.blocks.remove(&block_type);
        if removed.is_some() {
            self.changed = true;
        }
        removed
    }

    /// Get the disk geometry
    pub fn disk_format(&self) -> Option<DiskFormat> {
        match self.blocks.get(&BlockType::DiskFormat) {
            Some(Block::DiskFormat(format)) => Some(*format),
            _ => None,
        }
    }

    /// Set the disk geometry
    pub fn set_disk_format(&mut self, sides: u8, tracks: u8) {
        self.set_block(Block::DiskFormat(DiskFormat::new(sides, tracks)));
    }

    /// Number of sides, 1 if no format block is present
    pub fn sides(&self) -> u8 {
        self.disk_format().map_or(1, |f| f.sides.max(1))
    }

    /// Number of tracks per side, 0 if no format block is present
    pub fn tracks(&self) -> u8 {
        self.disk_format().map_or(0, |f| f.tracks)
    }

    /// Get the flags
    pub fn flags(&self) -> Option<Flags> {
        match self.blocks.get(&BlockType::Flags) {
            Some(Block::Flags(flags)) => Some(*flags),
            _ => None,
        }
    }

    /// Set the flags
    pub fn set_flags(&mut self, flags: Flags) {
        self.set_block(Block::Flags(flags));
    }

    /// Get the text of a free-text block
    pub fn text(&self, block_type: BlockType) -> Option<&str> {
        self.blocks.get(&block_type).and_then(Block::as_text)
    }

    /// Set the text of a free-text block
    pub fn set_text(&mut self, block_type: BlockType, text: impl Into<String>) -> Result<()> {
        let block = Block::text(block_type, text).ok_or_else(|| {
            H17Error::invalid_format(format!("{} is not a text block", block_type))
        })?;
        self.set_block(block);
        Ok(())
    }

    /// Get the disk label
    pub fn label(&self) -> Option<&str> {
        self.text(BlockType::Label)
    }

    /// Set the disk label
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.set_block(Block::Label(label.into()));
    }

    /// Get the comment
    pub fn comment(&self) -> Option<&str> {
        self.text(BlockType::Comment)
    }

    /// Set the comment
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.set_block(Block::Comment(comment.into()));
    }

    /// Get the validated sector data
    pub fn data(&self) -> Option<&DataBlock> {
        match self.blocks.get(&BlockType::Data) {
            Some(Block::Data(data)) => Some(data),
            _ => None,
        }
    }

    /// Replace the validated sector data
    pub fn set_data(&mut self, data: DataBlock) {
        self.set_block(Block::Data(data));
    }

    /// Get the raw flux captures
    pub fn raw_data(&self) -> Option<&RawDataBlock> {
        match self.blocks.get(&BlockType::RawData) {
            Some(Block::RawData(raw)) => Some(raw),
            _ => None,
        }
    }

    /// Replace the raw flux captures
    pub fn set_raw_data(&mut self, raw: RawDataBlock) {
        self.set_block(Block::RawData(raw));
    }

    /// Get a track by side and number
    pub fn get_track(&self, side: u8, track: u8) -> Result<&Track> {
        self.data()
            .ok_or_else(|| H17Error::missing_block(BlockType::Data.name()))?
            .get_track(side, track)
            .ok_or(H17Error::InvalidTrack { side, track })
    }

    /// Get a sector by side, track and sector number
    pub fn get_sector(&self, side: u8, track: u8, sector: u8) -> Result<&Sector> {
        self.get_track(side, track)?
            .get_sector(sector)
            .ok_or(H17Error::InvalidSector {
                side,
                track,
                sector,
            })
    }

    /// Mandatory block types that are absent
    pub fn missing_mandatory_blocks(&self) -> Vec<BlockType> {
        BlockType::ALL
            .into_iter()
            .filter(|&t| t.is_mandatory() && !self.has_block(t))
            .collect()
    }

    /// Check that every mandatory block is present
    pub fn is_usable(&self) -> bool {
        self.missing_mandatory_blocks().is_empty()
    }

    /// Sectors with a read error across the Data block
    pub fn error_count(&self) -> usize {
        self.data().map_or(0, DataBlock::error_count)
    }

    /// Consistency findings, one line each
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues: Vec<String> = self
            .missing_mandatory_blocks()
            .into_iter()
            .map(|t| format!("Missing mandatory block {}", t))
            .collect();

        if let (Some(format), Some(data)) = (self.disk_format(), self.data()) {
            let expected = format.sides as usize * format.tracks as usize;
            if data.track_count() != expected {
                issues.push(format!(
                    "Data block has {} tracks, disk format declares {}",
                    data.track_count(),
                    expected
                ));
            }
        }

        if let Some(data) = self.data() {
            for track in data.tracks() {
                if !track.is_complete() {
                    issues.push(format!(
                        "Side {} track {} is incomplete, missing sectors {:?}",
                        track.side,
                        track.track,
                        track.missing_sectors()
                    ));
                }
                let duplicates = track.duplicate_sectors();
                if !duplicates.is_empty() {
                    issues.push(format!(
                        "Side {} track {} has duplicate sectors {:?}",
                        track.side, track.track, duplicates
                    ));
                }
            }
        }

        issues
    }

    /// Describe the image for listings
    pub fn report(&self, level: DetailLevel) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "H17D version {}", self.version);
        if let Some(name) = &self.filename {
            let _ = writeln!(out, "File: {}", name);
        }
        for block in self.blocks() {
            let _ = writeln!(out, "{}", block.describe(level));
        }

        let issues = self.consistency_issues();
        match level {
            DetailLevel::Summary if !issues.is_empty() => {
                let _ = writeln!(out, "{} consistency issue(s)", issues.len());
            }
            DetailLevel::Detailed => {
                for issue in &issues {
                    let _ = writeln!(out, "Warning: {}", issue);
                }
            }
            _ => {}
        }

        out
    }

    /// Rebuild the Data block by decoding the raw captures again
    ///
    /// Returns the number of sectors that now have errors.
    pub fn reprocess_raw(&mut self) -> Result<usize> {
        let raw = self
            .raw_data()
            .ok_or_else(|| H17Error::missing_block(BlockType::RawData.name()))?;
        let data = crate::capture::reprocess(raw, self.sides());
        let errors = data.error_count();
        self.set_data(data);
        Ok(errors)
    }
}
