/// Top-level container blocks

use crate::format::{BlockType, DistributionStatus, TrackSource};
use crate::format::constants::SECTORS_PER_TRACK;
use crate::image::sector::Sector;
use crate::image::track::{RawTrack, Track};
use std::fmt::Write;

/// How much an inspection should say
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DetailLevel {
    /// One line per block
    #[default]
    Summary,
    /// Per-track and per-sector listings plus consistency findings
    Detailed,
}

/// Disk geometry block payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskFormat {
    /// Number of sides (1 or 2)
    pub sides: u8,
    /// Tracks per side
    pub tracks: u8,
}

impl DiskFormat {
    /// Create a disk format
    pub fn new(sides: u8, tracks: u8) -> Self {
        Self { sides, tracks }
    }
}

/// Flags block payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    /// Write-protect tab present
    pub write_protect: bool,
    /// Where the disk came from
    pub distribution: DistributionStatus,
    /// How the track data was produced
    pub track_source: TrackSource,
}

/// Validated sector data for every captured track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataBlock {
    tracks: Vec<Track>,
}

impl DataBlock {
    /// Create an empty data block
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a track, replacing any earlier capture of the same side/track
    pub fn add_track(&mut self, track: Track) {
        match self
            .tracks
            .iter_mut()
            .find(|t| t.side == track.side && t.track == track.track)
        {
            Some(existing) => *existing = track,
            None => self.tracks.push(track),
        }
    }

    /// Append a track as read from a file, keeping duplicates
    pub(crate) fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Get a reference to all tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Get a track by side and number
    pub fn get_track(&self, side: u8, track: u8) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.side == side && t.track == track)
    }

    /// Get a sector by side, track and sector number
    pub fn get_sector(&self, side: u8, track: u8, sector: u8) -> Option<&Sector> {
        self.get_track(side, track)?.get_sector(sector)
    }

    /// Get the number of tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Total sectors across all tracks
    pub fn sector_count(&self) -> usize {
        self.tracks.iter().map(|t| t.sector_count()).sum()
    }

    /// Sectors with a read error across all tracks
    pub fn error_count(&self) -> usize {
        self.tracks.iter().map(|t| t.error_count()).sum()
    }

    /// Payload length of the Data block
    pub fn payload_size(&self) -> usize {
        self.tracks.iter().map(|t| t.encoded_size()).sum()
    }
}

/// Raw flux captures for every captured track
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawDataBlock {
    tracks: Vec<RawTrack>,
}

impl RawDataBlock {
    /// Create an empty raw data block
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw track, replacing any earlier capture of the same side/track
    pub fn add_track(&mut self, track: RawTrack) {
        match self
            .tracks
            .iter_mut()
            .find(|t| t.side == track.side && t.track == track.track)
        {
            Some(existing) => *existing = track,
            None => self.tracks.push(track),
        }
    }

    /// Append a raw track as read from a file
    pub(crate) fn push_track(&mut self, track: RawTrack) {
        self.tracks.push(track);
    }

    /// Get a reference to all raw tracks
    pub fn tracks(&self) -> &[RawTrack] {
        &self.tracks
    }

    /// Get a raw track by side and number
    pub fn get_track(&self, side: u8, track: u8) -> Option<&RawTrack> {
        self.tracks
            .iter()
            .find(|t| t.side == side && t.track == track)
    }

    /// Get the number of raw tracks
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Payload length of the RawData block
    pub fn payload_size(&self) -> usize {
        self.tracks.iter().map(|t| t.encoded_size()).sum()
    }
}

/// One top-level block of an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Sides and tracks
    DiskFormat(DiskFormat),
    /// Write protect, distribution and provenance
    Flags(Flags),
    /// Disk label
    Label(String),
    /// Free-form comment
    Comment(String),
    /// Capture date
    Date(String),
    /// Who or what imaged the disk
    Imager(String),
    /// Program that wrote the file
    Program(String),
    /// Validated sectors
    Data(DataBlock),
    /// Raw flux captures
    RawData(RawDataBlock),
}

impl Block {
    /// Build a free-text block of the given type
    ///
    /// Returns `None` for types that do not carry text.
    pub fn text(block_type: BlockType, text: impl Into<String>) -> Option<Block> {
        let text = text.into();
        match block_type {
            BlockType::Label => Some(Block::Label(text)),
            BlockType::Comment => Some(Block::Comment(text)),
            BlockType::Date => Some(Block::Date(text)),
            BlockType::Imager => Some(Block::Imager(text)),
            BlockType::Program => Some(Block::Program(text)),
            _ => None,
        }
    }

    /// Get this block's type
    pub fn block_type(&self) -> BlockType {
        match self {
            Block::DiskFormat(_) => BlockType::DiskFormat,
            Block::Flags(_) => BlockType::Flags,
            Block::Label(_) => BlockType::Label,
            Block::Comment(_) => BlockType::Comment,
            Block::Date(_) => BlockType::Date,
            Block::Imager(_) => BlockType::Imager,
            Block::Program(_) => BlockType::Program,
            Block::Data(_) => BlockType::Data,
            Block::RawData(_) => BlockType::RawData,
        }
    }

    /// Check if the image is unusable without this block
    pub fn is_mandatory(&self) -> bool {
        self.block_type().is_mandatory()
    }

    /// Get the free text of a text block
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Block::Label(s)
            | Block::Comment(s)
            | Block::Date(s)
            | Block::Imager(s)
            | Block::Program(s) => Some(s),
            _ => None,
        }
    }

    /// Payload length written after the block header
    pub fn payload_size(&self) -> usize {
        match self {
            Block::DiskFormat(_) => 2,
            Block::Flags(_) => 3,
            Block::Label(s)
            | Block::Comment(s)
            | Block::Date(s)
            | Block::Imager(s)
            | Block::Program(s) => s.len(),
            Block::Data(data) => data.payload_size(),
            Block::RawData(raw) => raw.payload_size(),
        }
    }

    /// Describe this block for listings
    pub fn describe(&self, level: DetailLevel) -> String {
        let mut out = format!(
            "{}{}: {} bytes",
            self.block_type(),
            if self.is_mandatory() { " [mandatory]" } else { "" },
            self.payload_size()
        );

        // Writing into a String cannot fail
        let _ = match self {
            Block::DiskFormat(format) => write!(
                out,
                " - {} side(s), {} tracks",
                format.sides, format.tracks
            ),
            Block::Flags(flags) => write!(
                out,
                " - write protect: {}, distribution: {}, source: {}",
                if flags.write_protect { "yes" } else { "no" },
                flags.distribution,
                flags.track_source
            ),
            Block::Label(s)
            | Block::Comment(s)
            | Block::Date(s)
            | Block::Imager(s)
            | Block::Program(s) => write!(out, " - \"{}\"", s),
            Block::Data(data) => {
                let _ = write!(
                    out,
                    " - {} tracks, {} sectors, {} errors",
                    data.track_count(),
                    data.sector_count(),
                    data.error_count()
                );
                if level == DetailLevel::Detailed {
                    describe_tracks(&mut out, data)
                } else {
                    Ok(())
                }
            }
            Block::RawData(raw) => {
                let _ = write!(out, " - {} tracks", raw.track_count());
                if level == DetailLevel::Detailed {
                    describe_raw_tracks(&mut out, raw)
                } else {
                    Ok(())
                }
            }
        };

        out
    }
}

fn describe_tracks(out: &mut String, data: &DataBlock) -> std::fmt::Result {
    for track in data.tracks() {
        write!(
            out,
            "\n  Side {} Track {:>2}: {:>2} sectors, {} bytes",
            track.side,
            track.track,
            track.sector_count(),
            track.payload_size()
        )?;
        if !track.is_complete() {
            write!(out, " (incomplete, missing {:?})", track.missing_sectors())?;
        }
        let duplicates = track.duplicate_sectors();
        if !duplicates.is_empty() {
            write!(out, " (duplicate {:?})", duplicates)?;
        }
        for sector in track.sectors().iter().filter(|s| s.has_error()) {
            write!(
                out,
                "\n    Sector {}: {} ({} bytes)",
                sector.number,
                sector.error,
                sector.size()
            )?;
        }
    }
    Ok(())
}

fn describe_raw_tracks(out: &mut String, raw: &RawDataBlock) -> std::fmt::Result {
    for track in raw.tracks() {
        let sizes: Vec<usize> = track.sectors().iter().map(|s| s.size()).collect();
        write!(
            out,
            "\n  Side {} Track {:>2}: {} captures {:?}",
            track.side,
            track.track,
            track.sector_count(),
            sizes
        )?;
        if track.sector_count() < SECTORS_PER_TRACK {
            write!(out, " (incomplete)")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::constants::{SECTOR_HEADER_SIZE, TRACK_HEADER_SIZE};
    use crate::status::SectorError;

    fn data_block() -> DataBlock {
        let mut data = DataBlock::new();
        for track_num in 0..2 {
            let mut track = Track::new(0, track_num);
            for n in 0..10 {
                track.add_sector(Sector::with_data(n, vec![0xE5; 256]));
            }
            data.add_track(track);
        }
        data
    }

    #[test]
    fn test_block_types() {
        assert_eq!(
            Block::DiskFormat(DiskFormat::new(1, 40)).block_type(),
            BlockType::DiskFormat
        );
        assert!(Block::Data(DataBlock::new()).is_mandatory());
        assert!(!Block::Label("x".into()).is_mandatory());
    }

    #[test]
    fn test_text_blocks() {
        let block = Block::text(BlockType::Comment, "hello").unwrap();
        assert_eq!(block.as_text(), Some("hello"));
        assert_eq!(block.payload_size(), 5);
        assert!(Block::text(BlockType::Data, "nope").is_none());
    }

    #[test]
    fn test_data_block_lookup() {
        let data = data_block();
        assert_eq!(data.track_count(), 2);
        assert_eq!(data.sector_count(), 20);
        assert!(data.get_sector(0, 1, 9).is_some());
        assert!(data.get_sector(1, 1, 9).is_none());
        assert_eq!(
            data.payload_size(),
            2 * (5 + 10 * (5 + 256))
        );
        assert_eq!(
            data.payload_size(),
            2 * TRACK_HEADER_SIZE + 20 * (SECTOR_HEADER_SIZE + 256)
        );
    }

    #[test]
    fn test_add_track_replaces() {
        let mut data = data_block();
        let mut retake = Track::new(0, 1);
        retake.add_sector(Sector::empty(0, SectorError::MissingDataSync));
        data.add_track(retake);

        assert_eq!(data.track_count(), 2);
        assert_eq!(data.get_track(0, 1).unwrap().sector_count(), 1);
        assert_eq!(data.error_count(), 1);
    }

    #[test]
    fn test_describe_levels() {
        let mut data = data_block();
        let mut bad = Track::new(0, 2);
        bad.add_sector(Sector::empty(4, SectorError::InvalidDataChecksum));
        data.add_track(bad);
        let block = Block::Data(data);

        let summary = block.describe(DetailLevel::Summary);
        assert!(summary.starts_with("Data (0x10) [mandatory]"));
        assert!(summary.contains("3 tracks, 21 sectors, 1 errors"));
        assert!(!summary.contains('\n'));

        let detailed = block.describe(DetailLevel::Detailed);
        assert!(detailed.contains("Sector 4: Invalid data checksum"));
        assert!(detailed.contains("incomplete"));
    }

    #[test]
    fn test_describe_flags() {
        let block = Block::Flags(Flags {
            write_protect: true,
            distribution: DistributionStatus::Distribution,
            track_source: TrackSource::CapturedOnModernHardware,
        });
        let text = block.describe(DetailLevel::Summary);
        assert!(text.contains("write protect: yes"));
        assert!(text.contains("Captured on modern hardware"));
    }
}
