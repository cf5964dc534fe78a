/// I/O operations for reading and writing H17D files

/// H8D and raw exports
pub mod h8d;
/// Reader implementation for H17D files
pub mod reader;
/// Writer implementation for H17D files
pub mod writer;

pub use h8d::{export_h8d, export_raw, import_h8d};
pub use reader::{read_h17, read_h17_bytes};
pub use writer::{write_h17, write_h17_bytes, write_h17_file, ImageWriter, LengthWidth, PendingLength};
