/// Sector header and data validation
///
/// Works on an aligned buffer as produced by the aligner, where the header
/// field (sync, volume, track, sector, checksum) and data field (sync, 256
/// bytes, checksum) sit at their absolute positions.

use crate::decode::checksum::checksum;
use crate::format::constants::{
    DATA_FIELD_SIZE, HEADER_FIELD_SIZE, SECTORS_PER_TRACK, SECTOR_DATA_SIZE, SYNC_BYTE,
};
use crate::status::SectorError;

/// First position the header sync may occupy
pub const HEADER_SYNC_MIN: usize = 5;

/// Header sync must start before this position
pub const HEADER_SYNC_MAX: usize = 57;

/// Data sync must start within this many bytes after the header field
pub const DATA_SYNC_WINDOW: usize = 64;

/// The sector a read was aimed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorAddress {
    /// Sides on the disk (1 or 2)
    pub sides: u8,
    /// Side being read
    pub side: u8,
    /// Logical track number
    pub track: u8,
    /// Hard sector number
    pub sector: u8,
}

impl SectorAddress {
    /// Create a sector address
    pub fn new(sides: u8, side: u8, track: u8, sector: u8) -> Self {
        Self {
            sides,
            side,
            track,
            sector,
        }
    }

    /// Track byte the header should carry
    ///
    /// Double-sided disks number tracks `2 * track + side`.
    pub fn expected_track_byte(&self) -> u8 {
        if self.sides > 1 {
            self.track.wrapping_mul(2).wrapping_add(self.side & 1)
        } else {
            self.track
        }
    }
}

/// Field positions and header contents found in an aligned buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorFrame {
    /// Position of the header sync byte
    pub header_offset: usize,
    /// Volume number from the header
    pub volume: u8,
    /// Track byte from the header
    pub track: u8,
    /// Sector number from the header
    pub sector: u8,
    /// Header checksum as stored
    pub header_checksum: u8,
    /// Position of the data sync byte, if one was found
    pub data_offset: Option<usize>,
}

impl SectorFrame {
    /// Check the stored header checksum against the header fields
    pub fn header_checksum_valid(&self) -> bool {
        checksum(&[self.volume, self.track, self.sector]) == self.header_checksum
    }
}

/// Locate the header sync in the header search window
pub fn find_header_sync(buf: &[u8]) -> Option<usize> {
    let last = HEADER_SYNC_MAX.min(buf.len().saturating_sub(HEADER_FIELD_SIZE - 1));
    (HEADER_SYNC_MIN..last).find(|&pos| buf[pos] == SYNC_BYTE)
}

/// Locate a data sync with a complete data field after it
pub fn find_data_sync(buf: &[u8], header_offset: usize) -> Option<usize> {
    let start = header_offset + HEADER_FIELD_SIZE;
    let last = (start + DATA_SYNC_WINDOW).min(buf.len().saturating_sub(DATA_FIELD_SIZE - 1));
    (start..last).find(|&pos| buf[pos] == SYNC_BYTE)
}

/// Find the header and data fields of an aligned buffer
pub fn locate_frame(buf: &[u8]) -> Option<SectorFrame> {
    let header_offset = find_header_sync(buf)?;
    Some(SectorFrame {
        header_offset,
        volume: buf[header_offset + 1],
        track: buf[header_offset + 2],
        sector: buf[header_offset + 3],
        header_checksum: buf[header_offset + 4],
        data_offset: find_data_sync(buf, header_offset),
    })
}

/// The 256 user bytes of an aligned buffer, if a data field is present
pub fn frame_data(buf: &[u8]) -> Option<&[u8]> {
    let frame = locate_frame(buf)?;
    let start = frame.data_offset? + 1;
    Some(&buf[start..start + SECTOR_DATA_SIZE])
}

/// Validate an aligned sector buffer
///
/// Each check has its own failure; the first one that fails is returned.
pub fn validate(buf: &[u8], expected: &SectorAddress) -> SectorError {
    let Some(header_offset) = find_header_sync(buf) else {
        return SectorError::MissingHeaderSync;
    };

    let volume = buf[header_offset + 1];
    let track = buf[header_offset + 2];
    let sector = buf[header_offset + 3];
    if checksum(&[volume, track, sector]) != buf[header_offset + 4] {
        return SectorError::InvalidHeaderChecksum;
    }

    if track != expected.expected_track_byte() {
        log::debug!(
            "Header track {} but expected {} ({:?})",
            track,
            expected.expected_track_byte(),
            expected
        );
        return SectorError::WrongTrack;
    }

    if sector as usize >= SECTORS_PER_TRACK {
        return SectorError::InvalidSector;
    }
    if sector != expected.sector {
        log::debug!("Header sector {} read at hole {}", sector, expected.sector);
    }

    let Some(data_offset) = find_data_sync(buf, header_offset) else {
        return SectorError::MissingDataSync;
    };

    let data = &buf[data_offset + 1..data_offset + 1 + SECTOR_DATA_SIZE];
    if checksum(data) != buf[data_offset + 1 + SECTOR_DATA_SIZE] {
        return SectorError::InvalidDataChecksum;
    }

    SectorError::NoError
}

/// Build an aligned sector buffer from its contents
///
/// The header sync is placed at `header_offset` and the data sync
/// `gap` bytes after the header field; the result is `len` bytes long,
/// truncated if the fields do not fit.
pub fn frame_sector(
    volume: u8,
    track: u8,
    sector: u8,
    data: &[u8],
    header_offset: usize,
    gap: usize,
    len: usize,
) -> Vec<u8> {
    let mut field = Vec::with_capacity(header_offset + HEADER_FIELD_SIZE + gap + DATA_FIELD_SIZE);
    field.resize(header_offset, 0);
    field.extend_from_slice(&[
        SYNC_BYTE,
        volume,
        track,
        sector,
        checksum(&[volume, track, sector]),
    ]);
    field.resize(field.len() + gap, 0);

    let mut user = [0u8; SECTOR_DATA_SIZE];
    let n = data.len().min(SECTOR_DATA_SIZE);
    user[..n].copy_from_slice(&data[..n]);
    field.push(SYNC_BYTE);
    field.extend_from_slice(&user);
    field.push(checksum(&user));

    field.resize(len, 0);
    field
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::constants::ALIGNED_SECTOR_SIZE;

    const HEADER_AT: usize = 10;
    const GAP: usize = 8;

    fn valid_buffer() -> Vec<u8> {
        let data: Vec<u8> = (0..256).map(|i| (i * 7) as u8).collect();
        frame_sector(0, 3, 4, &data, HEADER_AT, GAP, ALIGNED_SECTOR_SIZE)
    }

    fn address() -> SectorAddress {
        SectorAddress::new(1, 0, 3, 4)
    }

    #[test]
    fn test_valid_sector() {
        let buf = valid_buffer();
        assert_eq!(buf.len(), ALIGNED_SECTOR_SIZE);
        assert_eq!(validate(&buf, &address()), SectorError::NoError);
    }

    #[test]
    fn test_revalidation_is_stable() {
        let buf = valid_buffer();
        assert_eq!(validate(&buf, &address()), SectorError::NoError);
        assert_eq!(validate(&buf, &address()), SectorError::NoError);
    }

    #[test]
    fn test_missing_header_sync() {
        let buf = vec![0u8; ALIGNED_SECTOR_SIZE];
        assert_eq!(validate(&buf, &address()), SectorError::MissingHeaderSync);
    }

    #[test]
    fn test_header_sync_outside_window() {
        let buf = frame_sector(0, 3, 4, &[0; 256], 2, 60, 400);
        assert_eq!(validate(&buf, &address()), SectorError::MissingHeaderSync);
    }

    #[test]
    fn test_bad_header_checksum() {
        let mut buf = valid_buffer();
        buf[HEADER_AT + 4] ^= 0x01;
        assert_eq!(
            validate(&buf, &address()),
            SectorError::InvalidHeaderChecksum
        );
    }

    #[test]
    fn test_wrong_track() {
        let buf = valid_buffer();
        let other = SectorAddress::new(1, 0, 5, 4);
        assert_eq!(validate(&buf, &other), SectorError::WrongTrack);
    }

    #[test]
    fn test_double_sided_track_numbering() {
        let buf = frame_sector(0, 7, 2, &[0xAA; 256], HEADER_AT, GAP, ALIGNED_SECTOR_SIZE);
        assert_eq!(
            validate(&buf, &SectorAddress::new(2, 1, 3, 2)),
            SectorError::NoError
        );
        assert_eq!(
            validate(&buf, &SectorAddress::new(2, 0, 3, 2)),
            SectorError::WrongTrack
        );
    }

    #[test]
    fn test_invalid_sector_number() {
        let buf = frame_sector(0, 3, 10, &[0; 256], HEADER_AT, GAP, ALIGNED_SECTOR_SIZE);
        assert_eq!(validate(&buf, &address()), SectorError::InvalidSector);
    }

    #[test]
    fn test_missing_data_sync() {
        let mut buf = valid_buffer();
        buf[HEADER_AT + HEADER_FIELD_SIZE + GAP] = 0x00;
        assert_eq!(validate(&buf, &address()), SectorError::MissingDataSync);
    }

    #[test]
    fn test_data_sync_beyond_window() {
        let buf = frame_sector(0, 3, 4, &[0; 256], 5, 70, 400);
        assert_eq!(validate(&buf, &address()), SectorError::MissingDataSync);
    }

    #[test]
    fn test_every_data_byte_flip_is_data_checksum() {
        let buf = valid_buffer();
        let data_start = HEADER_AT + HEADER_FIELD_SIZE + GAP + 1;
        for i in 0..SECTOR_DATA_SIZE {
            let mut bad = buf.clone();
            bad[data_start + i] ^= 0x40;
            assert_eq!(
                validate(&bad, &address()),
                SectorError::InvalidDataChecksum,
                "byte {}",
                i
            );
        }
    }

    #[test]
    fn test_locate_frame() {
        let buf = valid_buffer();
        let frame = locate_frame(&buf).unwrap();
        assert_eq!(frame.header_offset, HEADER_AT);
        assert_eq!(frame.track, 3);
        assert_eq!(frame.sector, 4);
        assert!(frame.header_checksum_valid());
        assert_eq!(frame.data_offset, Some(HEADER_AT + HEADER_FIELD_SIZE + GAP));
    }

    #[test]
    fn test_frame_data() {
        let buf = frame_sector(0, 0, 0, &[0xAA; 256], HEADER_AT, GAP, ALIGNED_SECTOR_SIZE);
        let data = frame_data(&buf).unwrap();
        assert_eq!(data.len(), 256);
        assert!(data.iter().all(|&b| b == 0xAA));
        assert!(frame_data(&[0u8; 40]).is_none());
    }

    #[test]
    fn test_short_buffer() {
        assert_eq!(validate(&[], &address()), SectorError::MissingHeaderSync);
        let buf = valid_buffer();
        assert_eq!(validate(&buf[..200], &address()), SectorError::MissingDataSync);
    }
}
