/// Capturing disks from a device and re-decoding stored captures

/// Capture session configuration
pub mod config;
/// Capture device interface
pub mod device;
/// Capture state machine
pub mod session;

pub use config::{CaptureConfig, DEFAULT_READ_ORDER, DEFAULT_RETRIES};
pub use device::{BitcellTiming, CaptureDevice, Density, ReadStatus, ReplayDevice, SectorRead};
pub use session::{CancelHandle, CaptureEvent, CaptureSession, CaptureState};

use crate::decode::{decode_sector, SectorAddress};
use crate::image::{DataBlock, RawDataBlock, Sector, Track};
use crate::status::SectorError;

/// Decode every stored raw capture again and build a Data block from them
///
/// Raw tracks keep their order. Empty captures become hardware read
/// failures and sectors with no capture at all are backfilled the same way.
pub fn reprocess(raw: &RawDataBlock, sides: u8) -> DataBlock {
    let mut data = DataBlock::new();

    for raw_track in raw.tracks() {
        let mut track = Track::new(raw_track.side, raw_track.track);
        for raw_sector in raw_track.sectors() {
            let sector = if raw_sector.size() == 0 {
                Sector::empty(raw_sector.number, SectorError::HardwareReadFailure)
            } else {
                let address =
                    SectorAddress::new(sides, raw_track.side, raw_track.track, raw_sector.number);
                let decoded = decode_sector(raw_sector.data(), &address);
                Sector::new(raw_sector.number, decoded.error, decoded.aligned)
            };
            track.add_sector(sector);
        }
        track.backfill();
        log::debug!(
            "Reprocessed side {} track {}: {} errors",
            track.side,
            track.track,
            track.error_count()
        );
        data.add_track(track);
    }

    data
}
