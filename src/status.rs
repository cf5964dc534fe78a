/// Sector read outcome codes
///
/// Every captured sector carries exactly one of these. A bad sector is never
/// discarded; the code records why it is bad.

use std::fmt;

/// Outcome of one capture/validation pass over a sector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SectorError {
    /// Sector decoded and both checksums matched
    #[default]
    NoError,
    /// The device returned no data at all
    HardwareReadFailure,
    /// Demodulation found clock bits inconsistent with FM encoding
    InvalidClockBits,
    /// No header sync byte in the header search window
    MissingHeaderSync,
    /// Header track number does not match the track being read
    WrongTrack,
    /// Header sector number is out of range
    InvalidSector,
    /// Header checksum mismatch
    InvalidHeaderChecksum,
    /// No data sync byte after the header
    MissingDataSync,
    /// Data checksum mismatch
    InvalidDataChecksum,
    /// A code this library does not know, preserved as read
    Unknown(u8),
}

impl SectorError {
    /// Check if this outcome represents a readable sector
    #[inline]
    pub fn is_ok(&self) -> bool {
        *self == SectorError::NoError
    }

    /// Check if this outcome is any kind of failure
    #[inline]
    pub fn has_error(&self) -> bool {
        !self.is_ok()
    }

    /// Check if the header was read well enough to trust the sector's identity
    pub fn header_valid(&self) -> bool {
        matches!(
            self,
            SectorError::NoError | SectorError::MissingDataSync | SectorError::InvalidDataChecksum
        )
    }

    /// Short mnemonic used by listings and the sector map
    pub fn mnemonic(&self) -> &'static str {
        match self {
            SectorError::NoError => "OK",
            SectorError::HardwareReadFailure => "HW",
            SectorError::InvalidClockBits => "CLK",
            SectorError::MissingHeaderSync => "HSYNC",
            SectorError::WrongTrack => "TRK",
            SectorError::InvalidSector => "SEC",
            SectorError::InvalidHeaderChecksum => "HCHK",
            SectorError::MissingDataSync => "DSYNC",
            SectorError::InvalidDataChecksum => "DCHK",
            SectorError::Unknown(_) => "?",
        }
    }
}

impl From<u8> for SectorError {
    fn from(value: u8) -> Self {
        match value {
            0 => SectorError::NoError,
            1 => SectorError::HardwareReadFailure,
            2 => SectorError::InvalidClockBits,
            3 => SectorError::MissingHeaderSync,
            4 => SectorError::WrongTrack,
            5 => SectorError::InvalidSector,
            6 => SectorError::InvalidHeaderChecksum,
            7 => SectorError::MissingDataSync,
            8 => SectorError::InvalidDataChecksum,
            other => SectorError::Unknown(other),
        }
    }
}

impl From<SectorError> for u8 {
    fn from(error: SectorError) -> Self {
        match error {
            SectorError::NoError => 0,
            SectorError::HardwareReadFailure => 1,
            SectorError::InvalidClockBits => 2,
            SectorError::MissingHeaderSync => 3,
            SectorError::WrongTrack => 4,
            SectorError::InvalidSector => 5,
            SectorError::InvalidHeaderChecksum => 6,
            SectorError::MissingDataSync => 7,
            SectorError::InvalidDataChecksum => 8,
            SectorError::Unknown(code) => code,
        }
    }
}

impl fmt::Display for SectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectorError::NoError => write!(f, "No error"),
            SectorError::HardwareReadFailure => write!(f, "Hardware read failure"),
            SectorError::InvalidClockBits => write!(f, "Invalid clock bits"),
            SectorError::MissingHeaderSync => write!(f, "Missing header sync"),
            SectorError::WrongTrack => write!(f, "Wrong track"),
            SectorError::InvalidSector => write!(f, "Invalid sector"),
            SectorError::InvalidHeaderChecksum => write!(f, "Invalid header checksum"),
            SectorError::MissingDataSync => write!(f, "Missing data sync"),
            SectorError::InvalidDataChecksum => write!(f, "Invalid data checksum"),
            SectorError::Unknown(code) => write!(f, "Unknown error 0x{:02X}", code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_conversion() {
        for code in 0..=8u8 {
            assert_eq!(u8::from(SectorError::from(code)), code);
        }
        assert_eq!(SectorError::from(0x42), SectorError::Unknown(0x42));
        assert_eq!(u8::from(SectorError::Unknown(0x42)), 0x42);
    }

    #[test]
    fn test_no_error() {
        let status = SectorError::default();
        assert!(status.is_ok());
        assert!(!status.has_error());
        assert!(status.header_valid());
    }

    #[test]
    fn test_header_valid() {
        assert!(SectorError::InvalidDataChecksum.header_valid());
        assert!(!SectorError::WrongTrack.header_valid());
        assert!(!SectorError::HardwareReadFailure.header_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(SectorError::MissingDataSync.to_string(), "Missing data sync");
        assert_eq!(SectorError::Unknown(0x1F).to_string(), "Unknown error 0x1F");
        assert_eq!(SectorError::InvalidHeaderChecksum.mnemonic(), "HCHK");
    }
}
