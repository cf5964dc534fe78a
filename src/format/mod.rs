/// H17D format constants and enumerations

/// Format constants
pub mod constants;

pub use constants::*;

use std::fmt;

/// Version triple stored in the file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FormatVersion {
    /// Major version - readers refuse files with a newer major
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Point version
    pub point: u8,
}

impl FormatVersion {
    /// Create a version triple
    pub const fn new(major: u8, minor: u8, point: u8) -> Self {
        Self {
            major,
            minor,
            point,
        }
    }

    /// The version written by this library
    pub const fn current() -> Self {
        Self::new(
            FORMAT_VERSION_MAJOR,
            FORMAT_VERSION_MINOR,
            FORMAT_VERSION_POINT,
        )
    }

    /// Check if a reader for the current version can parse this one
    pub fn is_supported(&self) -> bool {
        self.major == FORMAT_VERSION_MAJOR
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.point)
    }
}

/// Top-level block type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockType {
    /// Sides and tracks
    DiskFormat,
    /// Write protect, distribution and provenance flags
    Flags,
    /// Disk label text
    Label,
    /// Free-form comment
    Comment,
    /// Capture date
    Date,
    /// Person or tool that imaged the disk
    Imager,
    /// Program that wrote the file
    Program,
    /// Validated sector data
    Data,
    /// Raw flux captures
    RawData,
}

impl BlockType {
    /// All block types in file order
    pub const ALL: [BlockType; 9] = [
        BlockType::DiskFormat,
        BlockType::Flags,
        BlockType::Label,
        BlockType::Comment,
        BlockType::Date,
        BlockType::Imager,
        BlockType::Program,
        BlockType::Data,
        BlockType::RawData,
    ];

    /// Get the type byte written to the file
    pub fn id(&self) -> u8 {
        match self {
            BlockType::DiskFormat => 0x00,
            BlockType::Flags => 0x01,
            BlockType::Label => 0x02,
            BlockType::Comment => 0x03,
            BlockType::Date => 0x04,
            BlockType::Imager => 0x05,
            BlockType::Program => 0x06,
            BlockType::Data => 0x10,
            BlockType::RawData => 0x30,
        }
    }

    /// Look up a block type from its type byte
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    /// Check if an image is unusable without this block
    pub fn is_mandatory(&self) -> bool {
        matches!(
            self,
            BlockType::DiskFormat | BlockType::Flags | BlockType::Data
        )
    }

    /// Check if this block carries free text
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            BlockType::Label
                | BlockType::Comment
                | BlockType::Date
                | BlockType::Imager
                | BlockType::Program
        )
    }

    /// Get a human-readable name for this block type
    pub fn name(&self) -> &'static str {
        match self {
            BlockType::DiskFormat => "Disk Format",
            BlockType::Flags => "Flags",
            BlockType::Label => "Label",
            BlockType::Comment => "Comment",
            BlockType::Date => "Date",
            BlockType::Imager => "Imager",
            BlockType::Program => "Program",
            BlockType::Data => "Data",
            BlockType::RawData => "Raw Data",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.id())
    }
}

/// Where the disk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistributionStatus {
    /// Not recorded
    #[default]
    Unknown,
    /// Original distribution media
    Distribution,
    /// User-created disk
    User,
    /// Copy of a distribution disk
    CopyOfDistribution,
}

impl From<u8> for DistributionStatus {
    fn from(value: u8) -> Self {
        match value {
            1 => DistributionStatus::Distribution,
            2 => DistributionStatus::User,
            3 => DistributionStatus::CopyOfDistribution,
            _ => DistributionStatus::Unknown,
        }
    }
}

impl From<DistributionStatus> for u8 {
    fn from(status: DistributionStatus) -> Self {
        match status {
            DistributionStatus::Unknown => 0,
            DistributionStatus::Distribution => 1,
            DistributionStatus::User => 2,
            DistributionStatus::CopyOfDistribution => 3,
        }
    }
}

impl fmt::Display for DistributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistributionStatus::Unknown => write!(f, "Unknown"),
            DistributionStatus::Distribution => write!(f, "Distribution"),
            DistributionStatus::User => write!(f, "User"),
            DistributionStatus::CopyOfDistribution => write!(f, "Copy of distribution"),
        }
    }
}

/// How the track data in the image was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSource {
    /// Not recorded
    #[default]
    Unknown,
    /// Converted from an H8D or other legacy image
    ConvertedFromLegacyFormat,
    /// Written by an emulator
    CreatedOnEmulator,
    /// Read on original Heath hardware
    CapturedOnTargetHardware,
    /// Read with a modern capture device
    CapturedOnModernHardware,
}

impl From<u8> for TrackSource {
    fn from(value: u8) -> Self {
        match value {
            1 => TrackSource::ConvertedFromLegacyFormat,
            2 => TrackSource::CreatedOnEmulator,
            3 => TrackSource::CapturedOnTargetHardware,
            4 => TrackSource::CapturedOnModernHardware,
            _ => TrackSource::Unknown,
        }
    }
}

impl From<TrackSource> for u8 {
    fn from(source: TrackSource) -> Self {
        match source {
            TrackSource::Unknown => 0,
            TrackSource::ConvertedFromLegacyFormat => 1,
            TrackSource::CreatedOnEmulator => 2,
            TrackSource::CapturedOnTargetHardware => 3,
            TrackSource::CapturedOnModernHardware => 4,
        }
    }
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::Unknown => write!(f, "Unknown"),
            TrackSource::ConvertedFromLegacyFormat => write!(f, "Converted from legacy format"),
            TrackSource::CreatedOnEmulator => write!(f, "Created on emulator"),
            TrackSource::CapturedOnTargetHardware => write!(f, "Captured on target hardware"),
            TrackSource::CapturedOnModernHardware => write!(f, "Captured on modern hardware"),
        }
    }
}

/// Detect an H17D file from its first bytes, returning its version
pub fn detect_format(magic: &[u8]) -> Option<FormatVersion> {
    if magic.len() < FILE_HEADER_SIZE || !magic.starts_with(H17D_SIGNATURE) {
        return None;
    }

    Some(FormatVersion::new(magic[4], magic[5], magic[6]))
}
