/// FM bit demodulation
///
/// Every data bit on the medium is recorded as a pair of raw bits. A `11`
/// pair is always a one. A `01` or `10` pair is a zero, but which of the two
/// is legal depends on whether the data bit sits in the upper or lower half
/// of the pair, which the decoder learns from the stream. A `00` pair can
/// never occur in valid FM.

use crate::error::{H17Error, Result};
use std::fmt;

/// Bit encoding used on the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingMode {
    /// Frequency modulation - H17 single density
    #[default]
    FM,
    /// Modified frequency modulation
    MFM,
}

/// Which half of a raw bit pair carries the data bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unlocked,
    Upper,
    Lower,
}

/// Clock violation counters gathered while demodulating
///
/// These are diagnostics; they never change the decoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DemodStats {
    /// `00` pairs seen (no flux in either half)
    pub zero_errors: usize,
    /// `10` pairs seen while locked to the upper half
    pub upper_slips: usize,
    /// `01` pairs seen while locked to the lower half
    pub lower_slips: usize,
    /// Output byte index of the first violation of any kind
    pub first_violation: Option<usize>,
}

impl DemodStats {
    /// Total phase contradictions
    pub fn one_errors(&self) -> usize {
        self.upper_slips + self.lower_slips
    }

    /// Total violations of any kind
    pub fn total(&self) -> usize {
        self.zero_errors + self.one_errors()
    }

    /// Check if no violations were seen
    pub fn is_clean(&self) -> bool {
        self.total() == 0
    }

    /// Check if a violation occurred before the given output byte index
    pub fn violation_before(&self, index: usize) -> bool {
        self.first_violation.is_some_and(|first| first < index)
    }

    fn record(&mut self, index: usize) {
        if self.first_violation.is_none() {
            self.first_violation = Some(index);
        }
    }
}

impl fmt::Display for DemodStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "zero={} upper={} lower={}",
            self.zero_errors, self.upper_slips, self.lower_slips
        )
    }
}

/// Decode raw bytes with the given recording mode
///
/// Only FM is implemented; MFM requests fail.
pub fn demodulate(
    mode: RecordingMode,
    raw: &[u8],
    pair_count: usize,
) -> Result<(Vec<u8>, DemodStats)> {
    match mode {
        RecordingMode::FM => Ok(demodulate_fm(raw, pair_count)),
        RecordingMode::MFM => Err(H17Error::UnsupportedEncoding(
            "MFM demodulation".to_string(),
        )),
    }
}

/// Decode `pair_count` raw byte pairs into `pair_count` data bytes
///
/// The whole input is always decoded; violations only update the statistics.
pub fn demodulate_fm(raw: &[u8], pair_count: usize) -> (Vec<u8>, DemodStats) {
    let pair_count = pair_count.min(raw.len() / 2);
    let mut out = Vec::with_capacity(pair_count);
    let mut stats = DemodStats::default();
    let mut phase = Phase::Unlocked;
    let mut last_bit = 0u8;

    for (index, word) in raw.chunks_exact(2).take(pair_count).enumerate() {
        let mut value = 0u8;

        for &byte in word {
            for shift in [6u8, 4, 2, 0] {
                let bit = match (byte >> shift) & 0b11 {
                    0b11 => 1,
                    0b00 => {
                        stats.zero_errors += 1;
                        stats.record(index);
                        last_bit
                    }
                    0b10 => {
                        if phase == Phase::Upper {
                            stats.upper_slips += 1;
                            stats.record(index);
                        }
                        phase = Phase::Lower;
                        0
                    }
                    _ => {
                        if phase == Phase::Lower {
                            stats.lower_slips += 1;
                            stats.record(index);
                        }
                        phase = Phase::Upper;
                        0
                    }
                };
                last_bit = bit;
                value = (value << 1) | bit;
            }
        }

        out.push(value);
    }

    log::trace!("FM demodulated {} bytes: {}", out.len(), stats);
    (out, stats)
}

/// Encode data bytes as FM with the clock in the upper half of each pair
///
/// Produces two raw bytes per data byte; `demodulate_fm` reverses it.
pub fn modulate_fm(data: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(data.len() * 2);

    for &byte in data {
        let mut word = 0u16;
        for bit in (0..8).rev() {
            word = (word << 2) | 0b10 | ((byte >> bit) & 1) as u16;
        }
        raw.extend_from_slice(&word.to_be_bytes());
    }

    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ones() {
        let (out, stats) = demodulate_fm(&[0xFF, 0xFF], 1);
        assert_eq!(out, vec![0xFF]);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_lower_phase_zeros() {
        // 10 pairs only: clock upper, data lower
        let (out, stats) = demodulate_fm(&[0xAA, 0xAA], 1);
        assert_eq!(out, vec![0x00]);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_modulate_round_trip() {
        let data: Vec<u8> = (0..=255).collect();
        let raw = modulate_fm(&data);
        assert_eq!(raw.len(), 512);

        let (out, stats) = demodulate_fm(&raw, raw.len() / 2);
        assert_eq!(out, data);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_zero_pair_holds_last_bit() {
        // 11 00 10 10 | 10 10 10 10 -> 1 1 0 0 0 0 0 0
        let (out, stats) = demodulate_fm(&[0b1100_1010, 0xAA], 1);
        assert_eq!(out, vec![0xC0]);
        assert_eq!(stats.zero_errors, 1);
        assert_eq!(stats.first_violation, Some(0));
    }

    #[test]
    fn test_phase_slip_counted() {
        // lock lower with 10, then 01 contradicts it
        let (out, stats) = demodulate_fm(&[0xAA, 0xAA, 0b1001_0101, 0x55], 2);
        assert_eq!(out, vec![0x00, 0x00]);
        assert_eq!(stats.lower_slips, 1);
        assert_eq!(stats.upper_slips, 0);
        assert_eq!(stats.one_errors(), 1);
        assert!(stats.violation_before(2));
        assert!(!stats.violation_before(1));
    }

    #[test]
    fn test_first_pair_locks_without_error() {
        let (_, stats) = demodulate_fm(&[0b0101_0101, 0x55], 1);
        assert!(stats.is_clean());
    }

    #[test]
    fn test_pair_count_clamped() {
        let (out, _) = demodulate_fm(&[0xFF, 0xFF, 0xFF], 10);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_mfm_unsupported() {
        let result = demodulate(RecordingMode::MFM, &[0xAA, 0xAA], 1);
        assert!(matches!(result, Err(H17Error::UnsupportedEncoding(_))));
    }
}
