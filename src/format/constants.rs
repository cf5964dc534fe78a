/// H17D format magic bytes and constants

/// File signature at offset 0
pub const H17D_SIGNATURE: &[u8] = b"H17D";

/// Size of the file header (signature + major + minor + point)
pub const FILE_HEADER_SIZE: usize = 7;

/// Format version written by this library
pub const FORMAT_VERSION_MAJOR: u8 = 1;
/// Format minor version written by this library
pub const FORMAT_VERSION_MINOR: u8 = 0;
/// Format point version written by this library
pub const FORMAT_VERSION_POINT: u8 = 0;

/// Size of a top-level block header (type, flag, 32-bit length)
pub const BLOCK_HEADER_SIZE: usize = 6;

/// Flag bit marking a block as mandatory
pub const MANDATORY_FLAG: u8 = 0x80;

/// Track sub-block type inside the Data block
pub const TRACK_SUB_BLOCK: u8 = 0x11;
/// Sector sub-block type inside a Track sub-block
pub const SECTOR_SUB_BLOCK: u8 = 0x12;
/// Raw track sub-block type inside the RawData block
pub const RAW_TRACK_SUB_BLOCK: u8 = 0x31;
/// Raw sector sub-block type inside a RawTrack sub-block
pub const RAW_SECTOR_SUB_BLOCK: u8 = 0x32;

/// Track sub-block header: type, side, track, 16-bit length
pub const TRACK_HEADER_SIZE: usize = 5;
/// Sector sub-block header: type, sector, error, 16-bit length
pub const SECTOR_HEADER_SIZE: usize = 5;
/// Raw track sub-block header: type, side, track, 32-bit length
pub const RAW_TRACK_HEADER_SIZE: usize = 7;
/// Raw sector sub-block header: type, sector, 16-bit length
pub const RAW_SECTOR_HEADER_SIZE: usize = 4;

/// Hard sectors per track on H17 media
pub const SECTORS_PER_TRACK: usize = 10;

/// H17 drives have at most two heads
pub const MAX_SIDES: u8 = 2;

/// User data bytes per sector
pub const SECTOR_DATA_SIZE: usize = 256;

/// Sync byte preceding both the header and data fields
pub const SYNC_BYTE: u8 = 0xFD;

/// Header field: sync, volume, track, sector, checksum
pub const HEADER_FIELD_SIZE: usize = 5;

/// Data field: sync, 256 data bytes, checksum
pub const DATA_FIELD_SIZE: usize = SECTOR_DATA_SIZE + 2;

/// Canonical length of an aligned sector buffer stored in the Data block
pub const ALIGNED_SECTOR_SIZE: usize = 320;

/// Typical raw capture length returned by the capture device
pub const RAW_SECTOR_SIZE: usize = 700;

/// Filler used for sectors that could not be read in exports
pub const EXPORT_FILLER_BYTE: u8 = 0x00;
