/// Raw capture decoding: demodulation, alignment and validation

/// Sync-driven byte alignment
pub mod align;
/// Field checksum
pub mod checksum;
/// FM bit demodulation
pub mod fm;
/// Sector header and data validation
pub mod validate;

pub use align::{align, extract_byte, find_sync, insert_at_bit, SyncMatch};
pub use checksum::{checksum, update};
pub use fm::{demodulate, demodulate_fm, modulate_fm, DemodStats, RecordingMode};
pub use validate::{frame_data, frame_sector, locate_frame, validate, SectorAddress, SectorFrame};

use crate::format::constants::{ALIGNED_SECTOR_SIZE, SYNC_BYTE};
use crate::status::SectorError;

/// Result of running one raw capture through the decode pipeline
#[derive(Debug, Clone)]
pub struct DecodedSector {
    /// Aligned sector buffer, `ALIGNED_SECTOR_SIZE` bytes
    pub aligned: Vec<u8>,
    /// Demodulator diagnostics
    pub stats: DemodStats,
    /// Outcome
    pub error: SectorError,
}

/// Demodulate, align and validate one raw sector capture
///
/// A validation failure is reported as `InvalidClockBits` when the
/// demodulator saw a clock violation inside the framed region, since the
/// violation is the underlying cause.
pub fn decode_sector(raw: &[u8], expected: &SectorAddress) -> DecodedSector {
    let (demodulated, stats) = demodulate_fm(raw, raw.len() / 2);
    let aligned = align(&demodulated, ALIGNED_SECTOR_SIZE, SYNC_BYTE);

    let mut error = validate(&aligned, expected);
    if error.has_error() && stats.violation_before(ALIGNED_SECTOR_SIZE) {
        log::debug!(
            "{} with clock violations ({}) at {:?}",
            error,
            stats,
            expected
        );
        error = SectorError::InvalidClockBits;
    }

    DecodedSector {
        aligned,
        stats,
        error,
    }
}
