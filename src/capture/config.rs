/// Capture session configuration

use crate::capture::device::{BitcellTiming, Density};
use crate::error::{H17Error, Result};
use crate::format::constants::{MAX_SIDES, SECTORS_PER_TRACK};
use crate::format::DistributionStatus;

/// Read order that alternates even and odd sectors
pub const DEFAULT_READ_ORDER: [u8; SECTORS_PER_TRACK] = [0, 2, 4, 6, 8, 1, 3, 5, 7, 9];

/// Attempts per sector before the last result is kept
pub const DEFAULT_RETRIES: u8 = 6;

/// Settings for a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Sides to read (1 or 2)
    pub sides: u8,
    /// Tracks per side
    pub tracks: u8,
    /// Attempts per sector
    pub retries: u8,
    /// Order sectors are read within a track
    pub read_order: [u8; SECTORS_PER_TRACK],
    /// Recording density
    pub density: Density,
    /// Bit cell timing passed to every read
    pub bitcell: BitcellTiming,
    /// Seek to `2 * track`, for 40-track media in an 80-track drive
    pub double_step: bool,
    /// Keep raw captures and write a RawData block
    pub keep_raw: bool,
    /// Write-protect tab present
    pub write_protect: bool,
    /// Distribution status recorded in the Flags block
    pub distribution: DistributionStatus,
    /// Label block text
    pub label: Option<String>,
    /// Comment block text
    pub comment: Option<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sides: 1,
            tracks: 40,
            retries: DEFAULT_RETRIES,
            read_order: DEFAULT_READ_ORDER,
            density: Density::Single,
            bitcell: BitcellTiming::default(),
            double_step: false,
            keep_raw: true,
            write_protect: false,
            distribution: DistributionStatus::Unknown,
            label: None,
            comment: None,
        }
    }
}

impl CaptureConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
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

    /// Set the attempts per sector
    pub fn retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// Set the sector read order
    pub fn read_order(mut self, read_order: [u8; SECTORS_PER_TRACK]) -> Self {
        self.read_order = read_order;
        self
    }

    /// Set the recording density
    pub fn density(mut self, density: Density) -> Self {
        self.density = density;
        self
    }

    /// Set the bit cell timing
    pub fn bitcell(mut self, bitcell: BitcellTiming) -> Self {
        self.bitcell = bitcell;
        self
    }

    /// Enable double stepping
    pub fn double_step(mut self, double_step: bool) -> Self {
        self.double_step = double_step;
        self
    }

    /// Keep raw captures
    pub fn keep_raw(mut self, keep_raw: bool) -> Self {
        self.keep_raw = keep_raw;
        self
    }

    /// Record the write-protect tab
    pub fn write_protect(mut self, write_protect: bool) -> Self {
        self.write_protect = write_protect;
        self
    }

    /// Record the distribution status
    pub fn distribution(mut self, distribution: DistributionStatus) -> Self {
        self.distribution = distribution;
        self
    }

    /// Set the label
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Physical track the head must be over for a logical track
    pub fn physical_track(&self, track: u8) -> u8 {
        if self.double_step {
            track.saturating_mul(2)
        } else {
            track
        }
    }

    /// Check values are in range
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_SIDES).contains(&self.sides) {
            return Err(H17Error::invalid_config(format!(
                "sides must be 1 to {}, not {}",
                MAX_SIDES, self.sides
            )));
        }
        if self.tracks == 0 || self.tracks > 80 {
            return Err(H17Error::invalid_config(format!(
                "tracks must be 1-80, not {}",
                self.tracks
            )));
        }
        if self.double_step && self.tracks > 40 {
            return Err(H17Error::invalid_config(
                "double stepping needs 40 tracks or fewer",
            ));
        }
        if self.retries == 0 {
            return Err(H17Error::invalid_config("retries must be at least 1"));
        }

        let mut seen = [false; SECTORS_PER_TRACK];
        for &sector in &self.read_order {
            match seen.get_mut(sector as usize) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return Err(H17Error::invalid_config(format!(
                        "read order {:?} is not a permutation of 0-9",
                        self.read_order
                    )))
                }
            }
        }
        Ok(())
    }
}
