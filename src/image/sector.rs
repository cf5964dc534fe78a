/// Sector data structures

use crate::decode::validate::frame_data;
use crate::format::constants::{RAW_SECTOR_HEADER_SIZE, SECTOR_DATA_SIZE, SECTOR_HEADER_SIZE};
use crate::status::SectorError;

/// Content classification of a sector's user data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorStatus {
    /// Nothing was preserved
    Empty,
    /// Data present but no 256-byte user field could be found
    Unframed,
    /// User data is a single repeated byte
    Filler,
    /// User data varies
    InUse,
}

impl std::fmt::Display for SectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectorStatus::Empty => write!(f, "Empty"),
            SectorStatus::Unframed => write!(f, "Unframed"),
            SectorStatus::Filler => write!(f, "Filler"),
            SectorStatus::InUse => write!(f, "In Use"),
        }
    }
}

/// A captured sector: its number, why it is good or bad, and its bytes
///
/// The stored bytes are whatever was preserved - normally a 320-byte aligned
/// buffer, sometimes bare user data, and nothing at all for a total read
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    /// Sector number (0-9 on well-formed tracks)
    pub number: u8,
    /// Outcome of the read that produced this sector
    pub error: SectorError,
    data: Vec<u8>,
}

impl Sector {
    /// Create a sector from a read outcome and its bytes
    pub fn new(number: u8, error: SectorError, data: Vec<u8>) -> Self {
        Self {
            number,
            error,
            data,
        }
    }

    /// Create an empty, error-flagged sector
    pub fn empty(number: u8, error: SectorError) -> Self {
        Self::new(number, error, Vec::new())
    }

    /// Create a good sector holding bare user data
    pub fn with_data(number: u8, data: Vec<u8>) -> Self {
        Self::new(number, SectorError::NoError, data)
    }

    /// Get a reference to the stored bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the stored size
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size of this sector's sub-block in the file
    pub fn encoded_size(&self) -> usize {
        SECTOR_HEADER_SIZE + self.data.len()
    }

    /// Check if this sector was not read cleanly
    pub fn has_error(&self) -> bool {
        self.error.has_error()
    }

    /// The 256 user bytes, whether stored bare or inside an aligned buffer
    pub fn user_data(&self) -> Option<&[u8]> {
        if self.data.len() == SECTOR_DATA_SIZE {
            Some(&self.data)
        } else {
            frame_data(&self.data)
        }
    }

    /// Classify the user data
    pub fn status(&self) -> SectorStatus {
        if self.data.is_empty() {
            return SectorStatus::Empty;
        }

        match self.user_data() {
            None => SectorStatus::Unframed,
            Some(user) if user.iter().all(|&b| b == user[0]) => SectorStatus::Filler,
            Some(_) => SectorStatus::InUse,
        }
    }
}

/// A raw flux capture of one hard sector, kept for re-decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSector {
    /// Sector (hole) number the capture was taken at
    pub number: u8,
    data: Vec<u8>,
}

impl RawSector {
    /// Create a raw sector from captured bytes
    pub fn new(number: u8, data: Vec<u8>) -> Self {
        Self { number, data }
    }

    /// Get a reference to the captured bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the capture length
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Size of this raw sector's sub-block in the file
    pub fn encoded_size(&self) -> usize {
        RAW_SECTOR_HEADER_SIZE + self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::frame_sector;
    use crate::format::constants::ALIGNED_SECTOR_SIZE;

    #[test]
    fn test_empty_sector() {
        let sector = Sector::empty(3, SectorError::HardwareReadFailure);
        assert_eq!(sector.size(), 0);
        assert!(sector.has_error());
        assert_eq!(sector.status(), SectorStatus::Empty);
        assert_eq!(sector.encoded_size(), 5);
        assert!(sector.user_data().is_none());
    }

    #[test]
    fn test_bare_user_data() {
        let sector = Sector::with_data(5, vec![0xAA; 256]);
        assert!(!sector.has_error());
        assert_eq!(sector.user_data(), Some(&[0xAA; 256][..]));
        assert_eq!(sector.status(), SectorStatus::Filler);
    }

    #[test]
    fn test_framed_user_data() {
        let mut data = vec![0u8; 256];
        data[17] = 0x42;
        let framed = frame_sector(0, 1, 2, &data, 12, 6, ALIGNED_SECTOR_SIZE);
        let sector = Sector::new(2, SectorError::NoError, framed);

        assert_eq!(sector.size(), ALIGNED_SECTOR_SIZE);
        assert_eq!(sector.user_data(), Some(data.as_slice()));
        assert_eq!(sector.status(), SectorStatus::InUse);
    }

    #[test]
    fn test_unframed_data() {
        let sector = Sector::new(0, SectorError::MissingHeaderSync, vec![0; 320]);
        assert_eq!(sector.status(), SectorStatus::Unframed);
    }

    #[test]
    fn test_raw_sector() {
        let raw = RawSector::new(7, vec![0xAA; 700]);
        assert_eq!(raw.size(), 700);
        assert_eq!(raw.encoded_size(), 704);
        assert_eq!(raw.number, 7);
    }
}
