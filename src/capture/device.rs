/// Capture device interface

use crate::error::Result;
use crate::image::RawDataBlock;
use std::collections::HashMap;

/// Recording density the device should expect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Density {
    /// Single density (H17 FM)
    #[default]
    Single,
    /// Double density
    Double,
}

impl std::fmt::Display for Density {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Density::Single => write!(f, "Single"),
            Density::Double => write!(f, "Double"),
        }
    }
}

/// Expected duration of one encoded bit cell, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitcellTiming(pub u32);

impl Default for BitcellTiming {
    fn default() -> Self {
        BitcellTiming(4000)
    }
}

/// Outcome the device reports for a sector read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Data returned normally
    Ok,
    /// Nothing came back; the raw buffer is meaningless
    NoData,
    /// Data came back with a device-specific failure code
    Error(i32),
}

/// One sector read from a capture device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorRead {
    /// Raw FM capture
    pub raw: Vec<u8>,
    /// The device's own decode of the capture, if it makes one
    pub processed: Vec<u8>,
    /// Read outcome
    pub status: ReadStatus,
}

impl SectorRead {
    /// A read that returned nothing
    pub fn no_data() -> Self {
        Self {
            raw: Vec::new(),
            processed: Vec::new(),
            status: ReadStatus::NoData,
        }
    }

    /// A read that returned a raw capture
    pub fn with_raw(raw: Vec<u8>) -> Self {
        Self {
            raw,
            processed: Vec::new(),
            status: ReadStatus::Ok,
        }
    }
}

/// A floppy capture device with a synchronous read primitive
///
/// An `Err` from any method is fatal to the capture session. Per-read
/// problems that are worth retrying are reported through [`ReadStatus`].
pub trait CaptureDevice {
    /// Move the head to a physical track
    fn seek(&mut self, physical_track: u8) -> Result<()>;

    /// Return the head to track 0
    fn recalibrate(&mut self) -> Result<()>;

    /// Select the recording density
    fn set_density(&mut self, density: Density) -> Result<()>;

    /// Capture one hard sector
    fn read_sector(
        &mut self,
        side: u8,
        track: u8,
        sector: u8,
        timing: BitcellTiming,
    ) -> Result<SectorRead>;

    /// Text recorded in the Imager block
    fn description(&self) -> String {
        "Unknown device".to_string()
    }
}

/// Device that plays back the captures stored in a RawData block
///
/// Sectors with no stored capture read as `NoData`.
#[derive(Debug, Clone)]
pub struct ReplayDevice {
    captures: HashMap<(u8, u8, u8), Vec<u8>>,
    head: u8,
    seeks: usize,
}

impl ReplayDevice {
    /// Create a device over a raw data block
    pub fn new(raw: &RawDataBlock) -> Self {
        let captures = raw
            .tracks()
            .iter()
            .flat_map(|track| {
                track.sectors().iter().map(move |sector| {
                    ((track.side, track.track, sector.number), sector.data().to_vec())
                })
            })
            .collect();
        Self {
            captures,
            head: 0,
            seeks: 0,
        }
    }

    /// Physical track the head is over
    pub fn head(&self) -> u8 {
        self.head
    }

    /// Number of seeks performed
    pub fn seeks(&self) -> usize {
        self.seeks
    }
}

impl CaptureDevice for ReplayDevice {
    fn seek(&mut self, physical_track: u8) -> Result<()> {
        self.head = physical_track;
        self.seeks += 1;
        Ok(())
    }

    fn recalibrate(&mut self) -> Result<()> {
        self.head = 0;
        Ok(())
    }

    fn set_density(&mut self, _density: Density) -> Result<()> {
        Ok(())
    }

    fn read_sector(
        &mut self,
        side: u8,
        track: u8,
        sector: u8,
        _timing: BitcellTiming,
    ) -> Result<SectorRead> {
        Ok(match self.captures.get(&(side, track, sector)) {
            Some(raw) if !raw.is_empty() => SectorRead::with_raw(raw.clone()),
            _ => SectorRead::no_data(),
        })
    }

    fn description(&self) -> String {
        "Raw capture replay".to_string()
    }
}
