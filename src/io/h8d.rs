/// H8D and raw sector exports, and H8D import

use crate::decode::SectorAddress;
use crate::error::{H17Error, Result};
use crate::format::constants::*;
use crate::format::{BlockType, DistributionStatus, TrackSource};
use crate::image::builder::format_sector;
use crate::image::{DataBlock, DiskImage, Flags, Sector, Track};
use std::io::Write;

/// Bytes per track in an H8D image
pub const H8D_TRACK_SIZE: usize = SECTORS_PER_TRACK * SECTOR_DATA_SIZE;

fn require_data(image: &DiskImage) -> Result<&DataBlock> {
    image
        .data()
        .ok_or_else(|| H17Error::missing_block(BlockType::Data.name()))
}

/// Geometry to export: the format block if present, else what the data covers
///
/// Tracks recorded on a side the drive does not have are rejected.
fn export_geometry(image: &DiskImage, data: &DataBlock) -> Result<(u8, u8)> {
    if let Some(bad) = data.tracks().iter().find(|t| t.side >= MAX_SIDES) {
        return Err(H17Error::InvalidTrack {
            side: bad.side,
            track: bad.track,
        });
    }

    Ok(match image.disk_format() {
        Some(format) => (format.sides.clamp(1, MAX_SIDES), format.tracks),
        None => {
            let sides = data.tracks().iter().map(|t| t.side + 1).max().unwrap_or(1);
            let tracks = data
                .tracks()
                .iter()
                .map(|t| t.track.saturating_add(1))
                .max()
                .unwrap_or(0);
            (sides, tracks)
        }
    })
}

/// Write the image as H8D: 256 user bytes per sector in physical order,
/// track by track, sides interleaved within a track
///
/// Sectors with no recoverable user data are filled with
/// `EXPORT_FILLER_BYTE`. Returns the number of filled sectors.
pub fn export_h8d<W: Write>(image: &DiskImage, mut out: W) -> Result<usize> {
    let data = require_data(image)?;
    let (sides, tracks) = export_geometry(image, data)?;
    let filler = [EXPORT_FILLER_BYTE; SECTOR_DATA_SIZE];
    let mut filled = 0;

    for track_num in 0..tracks {
        for side in 0..sides {
            let track = data.get_track(side, track_num);
            for number in 0..SECTORS_PER_TRACK as u8 {
                match track
                    .and_then(|t| t.get_sector(number))
                    .and_then(Sector::user_data)
                {
                    Some(user) => out.write_all(user)?,
                    None => {
                        filled += 1;
                        out.write_all(&filler)?;
                    }
                }
            }
        }
    }

    if filled > 0 {
        log::warn!("H8D export filled {} unreadable sectors", filled);
    }
    out.flush()?;
    Ok(filled)
}

/// Write each track as ten framed sectors of `ALIGNED_SECTOR_SIZE` bytes
///
/// Tracks follow Data block order; stored sectors are padded or truncated
/// to size and missing ones are zero. Returns the number of tracks written.
pub fn export_raw<W: Write>(image: &DiskImage, mut out: W) -> Result<usize> {
    let data = require_data(image)?;
    let mut buf = vec![0u8; ALIGNED_SECTOR_SIZE];

    for track in data.tracks() {
        for sector in track.physical_order() {
            buf.fill(0);
            if let Some(sector) = sector {
                let n = sector.size().min(ALIGNED_SECTOR_SIZE);
                buf[..n].copy_from_slice(&sector.data()[..n]);
            }
            out.write_all(&buf)?;
        }
    }

    out.flush()?;
    Ok(data.track_count())
}

/// Build an image from H8D bytes
///
/// Every sector is framed and checksummed as if it had been captured.
pub fn import_h8d(bytes: &[u8], sides: u8) -> Result<DiskImage> {
    let sides = sides.max(1);
    let side_size = H8D_TRACK_SIZE * sides as usize;
    if bytes.is_empty() || bytes.len() % side_size != 0 {
        return Err(H17Error::invalid_format(format!(
            "H8D size {} is not a whole number of {}-sided tracks",
            bytes.len(),
            sides
        )));
    }
    let tracks = u8::try_from(bytes.len() / side_size).map_err(|_| {
        H17Error::invalid_format(format!("H8D image of {} bytes is too large", bytes.len()))
    })?;

    let mut data = DataBlock::new();
    let mut chunks = bytes.chunks_exact(SECTOR_DATA_SIZE);
    for track_num in 0..tracks {
        for side in 0..sides {
            let mut track = Track::new(side, track_num);
            for number in 0..SECTORS_PER_TRACK as u8 {
                let user = chunks.next().ok_or_else(|| {
                    H17Error::invalid_format("H8D image ended inside a track")
                })?;
                let address = SectorAddress::new(sides, side, track_num, number);
                track.add_sector(Sector::with_data(number, format_sector(&address, 0, user)));
            }
            data.add_track(track);
        }
    }

    let mut image = DiskImage::new();
    image.set_disk_format(sides, tracks);
    image.set_flags(Flags {
        write_protect: false,
        distribution: DistributionStatus::Unknown,
        track_source: TrackSource::ConvertedFromLegacyFormat,
    });
    image.set_data(data);
    log::info!("Imported H8D: {} side(s), {} tracks", sides, tracks);
    Ok(image)
}
