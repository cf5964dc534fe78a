/// Sync-driven byte alignment
///
/// Demodulated bytes are cut at arbitrary points relative to the bytes the
/// H17 controller wrote, and bits were sent least-significant first. The
/// aligner finds each sync byte at any of the eight bit offsets and copies the
/// field that follows it with that offset, keeping every byte at its absolute
/// position so the validator sees the same layout the medium had.

use crate::format::constants::{DATA_FIELD_SIZE, HEADER_FIELD_SIZE};

/// Header sync must start within this many bytes of the sector hole
pub const HEADER_SCAN_LIMIT: usize = 87;

/// Data sync must start before this byte position
pub const DATA_SYNC_SCAN_LIMIT: usize = 92;

/// A sync byte found in the stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncMatch {
    /// Byte position in the demodulated stream
    pub position: usize,
    /// Bit offset within that byte (0-7)
    pub offset: u8,
}

/// Extract the byte starting `offset` bits into `buf[pos]`, undoing the
/// least-significant-first bit order
///
/// Bytes past the end of the buffer read as zero.
#[inline]
pub fn extract_byte(buf: &[u8], pos: usize, offset: u8) -> u8 {
    let hi = buf.get(pos).copied().unwrap_or(0) as u16;
    let lo = buf.get(pos + 1).copied().unwrap_or(0) as u16;
    let window = (hi << 8) | lo;
    (((window << offset) >> 8) as u8).reverse_bits()
}

/// Write bytes into a demodulated stream starting at an absolute bit index
///
/// The inverse of `extract_byte`; bits that would fall past the end of the
/// stream are dropped.
pub fn insert_at_bit(stream: &mut [u8], bit_index: usize, bytes: &[u8]) {
    let total_bits = stream.len() * 8;

    for (i, &byte) in bytes.iter().enumerate() {
        let wire = byte.reverse_bits();
        for bit in 0..8 {
            let target = bit_index + i * 8 + bit;
            if target >= total_bits {
                return;
            }
            let mask = 0x80u8 >> (target % 8);
            if wire & (0x80 >> bit) != 0 {
                stream[target / 8] |= mask;
            } else {
                stream[target / 8] &= !mask;
            }
        }
    }
}

/// Find the earliest sync at byte positions `start..end`, trying all eight
/// bit offsets at each position
pub fn find_sync(buf: &[u8], start: usize, end: usize, sync: u8) -> Option<SyncMatch> {
    let end = end.min(buf.len());

    (start..end).find_map(|position| {
        (0..8u8)
            .find(|&offset| extract_byte(buf, position, offset) == sync)
            .map(|offset| SyncMatch { position, offset })
    })
}

/// Copy `len` bytes starting at `position` using a fixed bit offset
fn copy_field(src: &[u8], out: &mut [u8], position: usize, len: usize, offset: u8) {
    let end = (position + len).min(out.len()).min(src.len());
    for (pos, slot) in out.iter_mut().enumerate().take(end).skip(position) {
        *slot = extract_byte(src, pos, offset);
    }
}

/// Align a demodulated sector stream into an `out_len` byte buffer
///
/// Regions where no sync could be found are left zero-filled, which the
/// validator rejects.
pub fn align(raw: &[u8], out_len: usize, sync: u8) -> Vec<u8> {
    let mut out = vec![0u8; out_len];

    let Some(header) = find_sync(raw, 0, HEADER_SCAN_LIMIT, sync) else {
        log::trace!("No header sync in first {} bytes", HEADER_SCAN_LIMIT);
        return out;
    };
    copy_field(raw, &mut out, header.position, HEADER_FIELD_SIZE, header.offset);

    let data_start = header.position + HEADER_FIELD_SIZE;
    let Some(data) = find_sync(raw, data_start, DATA_SYNC_SCAN_LIMIT, sync) else {
        log::trace!("Header sync at {:?} but no data sync", header);
        return out;
    };
    copy_field(raw, &mut out, data.position, DATA_FIELD_SIZE, data.offset);

    // The next sector's header sync fixes the tail; everything from it on is
    // copied straight with its offset.
    let tail_start = data.position + DATA_FIELD_SIZE;
    if let Some(next) = find_sync(raw, tail_start, out_len, sync) {
        copy_field(raw, &mut out, next.position, out_len, next.offset);
    }

    log::trace!("Aligned header {:?}, data {:?}", header, data);
    out
}
