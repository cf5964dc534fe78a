/*!
# h17disk

A Rust library for recovering Heathkit H17 hard-sectored floppy disks from
raw flux captures and storing them in the H17D disk image format.

## Features

- FM demodulation, sync-driven byte alignment and sector validation
- Read and write H17D images, including raw captures for re-decoding
- Retry-driven capture sessions over any device implementing `CaptureDevice`
- H8D and raw sector exports
- Idiomatic Rust API with comprehensive error handling

## Quick Start

```rust,no_run
use h17disk::{DetailLevel, DiskImage, export_h8d};

// Open an existing H17D file
let mut image = DiskImage::open("disk.h17")?;
println!("{}", image.report(DetailLevel::Summary));

// Read a sector's user data
let sector = image.get_sector(0, 0, 5)?;
println!("{}: {:?}", sector.error, sector.user_data().map(|d| d.len()));

// Decode the raw captures again and save
image.reprocess_raw()?;
image.save("disk.h17")?;

// Export the user data as H8D
export_h8d(&image, std::fs::File::create("disk.h8d")?)?;
# Ok::<(), h17disk::H17Error>(())
```

## Modules

- `format`: H17D block types, versions and constants
- `decode`: FM demodulator, aligner and validator
- `image`: Core image data structures (DiskImage, Block, Track, Sector)
- `io`: H17D reader and writer, H8D and raw exports
- `capture`: Capture device interface and session state machine
- `status`: Per-sector read outcomes
- `error`: Error types and Result alias
*/

#![warn(missing_docs)]

/// Capture device interface and session state machine
pub mod capture;
/// FM demodulation, alignment and validation
pub mod decode;
/// Error types and Result alias
pub mod error;
/// H17D format constants and block types
pub mod format;
/// Core image data structures (DiskImage, Block, Track, Sector)
pub mod image;
/// I/O operations for reading and writing H17D files
pub mod io;
/// Sector map visualization
pub mod map;
/// Per-sector read outcomes
pub mod status;

// Re-export common types
pub use capture::{
    reprocess, CancelHandle, CaptureConfig, CaptureDevice, CaptureEvent, CaptureSession,
    CaptureState, ReplayDevice,
};
pub use decode::{decode_sector, DecodedSector, SectorAddress};
pub use error::{H17Error, Result};
pub use format::{BlockType, DistributionStatus, FormatVersion, TrackSource};
pub use image::{
    Block, DataBlock, DetailLevel, DiskFormat, DiskImage, DiskImageBuilder, Flags, RawDataBlock,
    RawSector, RawTrack, Sector, SectorStatus, Track,
};
pub use io::{export_h8d, export_raw, import_h8d, read_h17, read_h17_bytes, write_h17};
pub use status::SectorError;
