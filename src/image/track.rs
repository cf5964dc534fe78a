/// Track data structures

use crate::format::constants::{RAW_TRACK_HEADER_SIZE, SECTORS_PER_TRACK, TRACK_HEADER_SIZE};
use crate::image::sector::{RawSector, Sector};
use crate::status::SectorError;

/// A track of validated sectors
///
/// Sectors are kept in file order. Identity is the sector's own number, so
/// duplicates and gaps can be represented and are reported, not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Side number (0 or 1)
    pub side: u8,
    /// Track number
    pub track: u8,
    sectors: Vec<Sector>,
}

impl Track {
    /// Create a new track
    pub fn new(side: u8, track: u8) -> Self {
        Self {
            side,
            track,
            sectors: Vec::with_capacity(SECTORS_PER_TRACK),
        }
    }

    /// Add a sector to this track
    pub fn add_sector(&mut self, sector: Sector) {
        self.sectors.push(sector);
    }

    /// Get a reference to all sectors
    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    /// Get a sector by its number
    pub fn get_sector(&self, number: u8) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.number == number)
    }

    /// Get a sector by its position index
    pub fn get_sector_by_index(&self, index: usize) -> Option<&Sector> {
        self.sectors.get(index)
    }

    /// Get the number of sectors in this track
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this track has any sectors
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Check if this track contains a sector with the given number
    pub fn has_sector(&self, number: u8) -> bool {
        self.get_sector(number).is_some()
    }

    /// Sector numbers 0-9 that are not present
    pub fn missing_sectors(&self) -> Vec<u8> {
        (0..SECTORS_PER_TRACK as u8)
            .filter(|&n| !self.has_sector(n))
            .collect()
    }

    /// Sector numbers that appear more than once
    pub fn duplicate_sectors(&self) -> Vec<u8> {
        let mut seen = [0usize; 256];
        for sector in &self.sectors {
            seen[sector.number as usize] += 1;
        }
        (0..=255u8).filter(|&n| seen[n as usize] > 1).collect()
    }

    /// A track is complete when every sector number 0-9 is present
    pub fn is_complete(&self) -> bool {
        self.missing_sectors().is_empty()
    }

    /// Fill missing sector slots with empty, error-flagged sectors
    pub fn backfill(&mut self) {
        for number in self.missing_sectors() {
            self.sectors
                .push(Sector::empty(number, SectorError::HardwareReadFailure));
        }
    }

    /// Sectors in physical order 0-9, `None` for missing ones
    pub fn physical_order(&self) -> Vec<Option<&Sector>> {
        (0..SECTORS_PER_TRACK as u8)
            .map(|n| self.get_sector(n))
            .collect()
    }

    /// Number of sectors with a read error
    pub fn error_count(&self) -> usize {
        self.sectors.iter().filter(|s| s.has_error()).count()
    }

    /// Payload length of this track's sub-block
    pub fn payload_size(&self) -> usize {
        self.sectors.iter().map(|s| s.encoded_size()).sum()
    }

    /// Size of this track's sub-block in the file
    pub fn encoded_size(&self) -> usize {
        TRACK_HEADER_SIZE + self.payload_size()
    }
}

/// A track of raw flux captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTrack {
    /// Side number (0 or 1)
    pub side: u8,
    /// Track number
    pub track: u8,
    sectors: Vec<RawSector>,
}

impl RawTrack {
    /// Create a new raw track
    pub fn new(side: u8, track: u8) -> Self {
        Self {
            side,
            track,
            sectors: Vec::with_capacity(SECTORS_PER_TRACK),
        }
    }

    /// Add a raw sector to this track
    pub fn add_sector(&mut self, sector: RawSector) {
        self.sectors.push(sector);
    }

    /// Get a reference to all raw sectors
    pub fn sectors(&self) -> &[RawSector] {
        &self.sectors
    }

    /// Get a raw sector by its number
    pub fn get_sector(&self, number: u8) -> Option<&RawSector> {
        self.sectors.iter().find(|s| s.number == number)
    }

    /// Get the number of raw sectors
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Check if this track has any raw sectors
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Payload length of this raw track's sub-block
    pub fn payload_size(&self) -> usize {
        self.sectors.iter().map(|s| s.encoded_size()).sum()
    }

    /// Size of this raw track's sub-block in the file
    pub fn encoded_size(&self) -> usize {
        RAW_TRACK_HEADER_SIZE + self.payload_size()
    }
}
