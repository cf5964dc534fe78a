/// Sector map visualization

use crate::image::{DiskImage, SectorStatus};
use crate::format::constants::SECTORS_PER_TRACK;
use crate::status::SectorError;
use std::fmt::Write;

/// ANSI color codes for sector map
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
    pub const DARK_WHITE: &str = "\x1b[37m";
    pub const BRIGHT_RED: &str = "\x1b[91m";
    pub const DARK_RED: &str = "\x1b[2;31m";
    pub const BRIGHT_YELLOW: &str = "\x1b[93m";
    pub const DARK_YELLOW: &str = "\x1b[2;33m";
}

const BLOCK_NO_DATA: &str = "\u{2591}"; // ░ - Light shade (filler)
const BLOCK_HAS_DATA: &str = "\u{2593}"; // ▓ - Dark shade (in-use)
const BLOCK_MISSING: &str = "\u{00B7}"; // · - nothing preserved

/// Colour for a sector, by outcome and content
fn sector_color(error: SectorError, in_use: bool) -> &'static str {
    match (error, in_use) {
        (SectorError::NoError, true) => colors::BRIGHT_WHITE,
        (SectorError::NoError, false) => colors::DARK_WHITE,
        // header read fine, data field is bad
        (e, true) if e.header_valid() => colors::BRIGHT_YELLOW,
        (e, false) if e.header_valid() => colors::DARK_YELLOW,
        (_, true) => colors::BRIGHT_RED,
        (_, false) => colors::DARK_RED,
    }
}

/// Render a sector map for one side
///
/// Columns are tracks, rows are sector numbers with sector 0 at the bottom.
pub fn render_sector_map(image: &DiskImage, side: u8) -> String {
    let mut out = String::new();
    let Some(data) = image.data() else {
        out.push_str("No data block.\n");
        return out;
    };

    let tracks = data
        .tracks()
        .iter()
        .filter(|t| t.side == side)
        .map(|t| t.track as usize + 1)
        .max()
        .unwrap_or(0)
        .max(image.tracks() as usize);
    if data.tracks().iter().all(|t| t.side != side) {
        let _ = writeln!(out, "No tracks found on side {}.", side);
        return out;
    }

    let _ = writeln!(out, "=== Sector Map (Side {}) ===", side);
    let _ = writeln!(
        out,
        "Legend: {}In Use{} {}Filler{} {}Data Error{} {}Header Error{} {}Missing",
        colors::BRIGHT_WHITE,
        colors::RESET,
        colors::DARK_WHITE,
        colors::RESET,
        colors::BRIGHT_YELLOW,
        colors::RESET,
        colors::BRIGHT_RED,
        colors::RESET,
        BLOCK_MISSING
    );
    out.push('\n');

    for number in (0..SECTORS_PER_TRACK as u8).rev() {
        let _ = write!(out, "{:>2} ", number);
        for track_num in 0..tracks {
            let sector = data
                .get_track(side, track_num as u8)
                .and_then(|t| t.get_sector(number));
            match sector {
                Some(sector) if sector.size() > 0 => {
                    let in_use = sector.status() == SectorStatus::InUse;
                    let block = if in_use { BLOCK_HAS_DATA } else { BLOCK_NO_DATA };
                    let _ = write!(
                        out,
                        "{}{}{}",
                        sector_color(sector.error, in_use),
                        block,
                        colors::RESET
                    );
                }
                Some(sector) => {
                    let _ = write!(
                        out,
                        "{}{}{}",
                        sector_color(sector.error, false),
                        BLOCK_MISSING,
                        colors::RESET
                    );
                }
                None => out.push(' '),
            }
        }
        out.push('\n');
    }

    // Track number axis, a label every 5 columns
    out.push_str("   ");
    let mut printed_cols = vec![false; tracks];
    for track_num in 0..tracks {
        if track_num % 5 == 0 && !printed_cols[track_num] {
            for (i, digit) in track_num.to_string().chars().enumerate() {
                let col = track_num + i;
                if col < tracks {
                    out.push(digit);
                    printed_cols[col] = true;
                }
            }
        } else if !printed_cols[track_num] {
            out.push(' ');
        }
    }
    out.push('\n');
    out
}

/// Draw a visual sector map for a disk side
pub fn draw_sector_map(image: &DiskImage, side: u8) {
    print!("{}", render_sector_map(image, side));
}
