/// Builder for creating H17D images

use crate::decode::{frame_sector, insert_at_bit, modulate_fm, SectorAddress};
use crate::format::constants::{ALIGNED_SECTOR_SIZE, RAW_SECTOR_SIZE, SECTORS_PER_TRACK};
use crate::format::{DistributionStatus, TrackSource};
use crate::image::{
    DataBlock, DiskImage, Flags, RawDataBlock, RawSector, RawTrack, Sector, Track,
};

/// Header sync position in sectors laid out by this crate
pub const FORMAT_HEADER_OFFSET: usize = 10;

/// Gap between the header field and the data sync in sectors laid out by this crate
pub const FORMAT_DATA_GAP: usize = 10;

/// Lay out a sector's user data as an aligned, checksummed buffer
pub fn format_sector(address: &SectorAddress, volume: u8, data: &[u8]) -> Vec<u8> {
    frame_sector(
        volume,
        address.expected_track_byte(),
        address.sector,
        data,
        FORMAT_HEADER_OFFSET,
        FORMAT_DATA_GAP,
        ALIGNED_SECTOR_SIZE,
    )
}

/// FM encode an aligned sector buffer as a device-sized raw capture
pub fn synthesize_raw(aligned: &[u8]) -> Vec<u8> {
    let mut stream = vec![0u8; RAW_SECTOR_SIZE / 2];
    insert_at_bit(&mut stream, 0, aligned);
    modulate_fm(&stream)
}

/// Builder for constructing formatted H17D images
#[derive(Debug, Clone)]
pub struct DiskImageBuilder {
    sides: u8,
    tracks: u8,
    volume: u8,
    filler_byte: u8,
    flags: Flags,
    label: Option<String>,
    comment: Option<String>,
    raw: bool,
}

impl Default for DiskImageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskImageBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            sides: 1,
            tracks: 40,
            volume: 0,
            filler_byte: 0xE5,
            flags: Flags {
                write_protect: false,
                distribution: DistributionStatus::Unknown,
                track_source: TrackSource::CreatedOnEmulator,
            },
            label: None,
            comment: None,
            raw: false,
        }
    }

    /// Set the number of sides
    pub fn sides(mut self, sides: u8) -> Self {
        self.sides = sides;
        self
    }

    /// Set the number of tracks per side
    pub fn tracks(mut self, tracks: u8) -> Self {
        self.tracks = tracks;
        self
    }

    /// Set the volume number written into sector headers
    pub fn volume(mut self, volume: u8) -> Self {
        self.volume = volume;
        self
    }

    /// Set the byte every sector is filled with
    pub fn filler_byte(mut self, filler_byte: u8) -> Self {
        self.filler_byte = filler_byte;
        self
    }

    /// Set the flags block
    pub fn flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the label block
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the comment block
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Also produce a RawData block of synthesized FM captures
    pub fn with_raw(mut self, raw: bool) -> Self {
        self.raw = raw;
        self
    }

    /// Build the image with the specified configuration
    pub fn build(self) -> DiskImage {
        let user = vec![self.filler_byte; crate::format::SECTOR_DATA_SIZE];
        let mut data = DataBlock::new();
        let mut raw_data = RawDataBlock::new();

        for track_num in 0..self.tracks {
            for side in 0..self.sides {
                let mut track = Track::new(side, track_num);
                let mut raw_track = RawTrack::new(side, track_num);

                for sector_num in 0..SECTORS_PER_TRACK as u8 {
                    let address = SectorAddress::new(self.sides, side, track_num, sector_num);
                    let aligned = format_sector(&address, self.volume, &user);
                    if self.raw {
                        raw_track.add_sector(RawSector::new(sector_num, synthesize_raw(&aligned)));
                    }
                    track.add_sector(Sector::with_data(sector_num, aligned));
                }

                data.add_track(track);
                if self.raw {
                    raw_data.add_track(raw_track);
                }
            }
        }

        let mut image = DiskImage::new();
        image.set_disk_format(self.sides, self.tracks);
        image.set_flags(self.flags);
        if let Some(label) = self.label {
            image.set_label(label);
        }
        if let Some(comment) = self.comment {
            image.set_comment(comment);
        }
        image.set_data(data);
        if self.raw {
            image.set_raw_data(raw_data);
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode_sector, validate};
    use crate::status::SectorError;

    #[test]
    fn test_default_build() {
        let image = DiskImageBuilder::new().build();
        assert_eq!(image.sides(), 1);
        assert_eq!(image.tracks(), 40);
        assert!(image.is_usable());
        assert!(image.raw_data().is_none());

        let data = image.data().unwrap();
        assert_eq!(data.track_count(), 40);
        assert_eq!(data.sector_count(), 400);
        assert_eq!(data.error_count(), 0);
    }

    #[test]
    fn test_formatted_sectors_validate() {
        let image = DiskImageBuilder::new().sides(2).tracks(3).build();
        let sector = image.get_sector(1, 2, 7).unwrap();
        assert_eq!(sector.size(), ALIGNED_SECTOR_SIZE);
        assert_eq!(
            validate(sector.data(), &SectorAddress::new(2, 1, 2, 7)),
            SectorError::NoError
        );
        assert_eq!(sector.user_data().unwrap()[0], 0xE5);
    }

    #[test]
    fn test_synthesized_raw_decodes() {
        let address = SectorAddress::new(1, 0, 9, 3);
        let aligned = format_sector(&address, 0, &[0x3C; 256]);
        let raw = synthesize_raw(&aligned);
        assert_eq!(raw.len(), RAW_SECTOR_SIZE);

        let decoded = decode_sector(&raw, &address);
        assert_eq!(decoded.error, SectorError::NoError);
        assert_eq!(decoded.aligned, aligned);
    }

    #[test]
    fn test_with_raw() {
        let image = DiskImageBuilder::new()
            .tracks(2)
            .filler_byte(0)
            .label("BLANK")
            .comment("test")
            .with_raw(true)
            .build();
        let raw = image.raw_data().unwrap();
        assert_eq!(raw.track_count(), 2);
        assert_eq!(raw.get_track(0, 1).unwrap().sector_count(), 10);
        assert_eq!(image.label(), Some("BLANK"));
        assert_eq!(image.comment(), Some("test"));
    }
}
