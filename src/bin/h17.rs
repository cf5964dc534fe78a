/// Interactive H17D console application

use h17disk::map::draw_sector_map;
use h17disk::*;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::fs::File;
use std::io::BufWriter;

/// Command completer for the REPL
struct CommandCompleter {
    commands: Vec<&'static str>,
}

impl CommandCompleter {
    fn new() -> Self {
        Self {
            commands: vec![
                "comment",
                "dump",
                "exit",
                "export-h8d",
                "export-raw",
                "help",
                "import-h8d",
                "info",
                "label",
                "map",
                "open",
                "quit",
                "read-sector",
                "reprocess",
                "save",
                "sectors",
                "tracks",
            ],
        }
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Only complete the first word (command name)
        let line_to_cursor = &line[..pos];
        if line_to_cursor.contains(' ') {
            return Ok((pos, vec![]));
        }

        let prefix = line_to_cursor.to_lowercase();
        let matches: Vec<Pair> = self
            .commands
            .iter()
            .filter(|cmd| cmd.starts_with(&prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Get the path to the history file
fn history_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|mut p| {
        p.push(".h17disk_history");
        p
    })
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("=== H17 Disk ===");
    println!("Interactive console for exploring H17D hard-sectored disk images.");
    println!("Type 'help' for available commands\n");

    let mut rl = match Editor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("Failed to create editor: {}", e);
            std::process::exit(1);
        }
    };
    rl.set_helper(Some(CommandCompleter::new()));

    if let Some(history_path) = history_path() {
        let _ = rl.load_history(&history_path);
    }

    let mut image: Option<DiskImage> = None;

    loop {
        let input = match rl.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        let _ = rl.add_history_entry(input);

        let parts = parse_command_line(input);
        if parts.is_empty() {
            continue;
        }
        let command = parts[0].to_lowercase();

        match command.as_str() {
            "help" => print_help(),
            "quit" | "exit" => {
                if let Some(history_path) = history_path() {
                    let _ = rl.save_history(&history_path);
                }
                println!("Goodbye!");
                break;
            }
            "open" => {
                if parts.len() < 2 {
                    println!("Usage: open <path>");
                    continue;
                }
                match DiskImage::open(&parts[1]) {
                    Ok(img) => {
                        println!("Opened: {} (H17D {})", parts[1], img.version());
                        for block in img.missing_mandatory_blocks() {
                            println!("Warning: missing mandatory block {}", block);
                        }
                        image = Some(img);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "import-h8d" => {
                if parts.len() < 2 {
                    println!("Usage: import-h8d <path> [sides]");
                    continue;
                }
                let sides = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(1);
                let result = std::fs::read(&parts[1])
                    .map_err(H17Error::from)
                    .and_then(|bytes| import_h8d(&bytes, sides));
                match result {
                    Ok(img) => {
                        println!(
                            "Imported {} side(s), {} tracks from {}",
                            img.sides(),
                            img.tracks(),
                            parts[1]
                        );
                        image = Some(img);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            _ => {
                let Some(img) = image.as_mut() else {
                    println!("No image loaded. Use 'open <path>' first.");
                    continue;
                };
                run_image_command(img, &command, &parts);
            }
        }
    }
}

/// Commands that act on the loaded image
fn run_image_command(img: &mut DiskImage, command: &str, parts: &[String]) {
    match command {
        "info" => print_info(img),
        "dump" => print!("{}", img.report(DetailLevel::Detailed)),
        "tracks" => list_tracks(img),
        "sectors" => {
            if parts.len() >= 3 {
                let side = parse_hex_or_dec(&parts[1]).unwrap_or(0);
                let track = parse_hex_or_dec(&parts[2]).unwrap_or(0);
                list_sectors_on_track(img, side, track);
            } else if parts.len() == 2 {
                println!("Usage: sectors [<side> <track>]");
            } else {
                list_all_sectors(img);
            }
        }
        "read-sector" => {
            if parts.len() < 4 {
                println!("Usage: read-sector <side> <track> <sector> [user]");
                return;
            }
            let side = parse_hex_or_dec(&parts[1]).unwrap_or(0);
            let track = parse_hex_or_dec(&parts[2]).unwrap_or(0);
            let number = parse_hex_or_dec(&parts[3]).unwrap_or(0);
            let user_only = parts.get(4).is_some_and(|p| p == "user");

            match img.get_sector(side, track, number) {
                Ok(sector) => {
                    println!(
                        "Sector {}:{}:{} {} ({} bytes, {}):",
                        side,
                        track,
                        number,
                        sector.error,
                        sector.size(),
                        sector.status()
                    );
                    if user_only {
                        match sector.user_data() {
                            Some(user) => print_hex_dump(user, user.len()),
                            None => println!("No user data could be located."),
                        }
                    } else {
                        if let Some(frame) = h17disk::decode::locate_frame(sector.data()) {
                            println!(
                                "Header at {}: volume {} track {} sector {} checksum {}",
                                frame.header_offset,
                                frame.volume,
                                frame.track,
                                frame.sector,
                                if frame.header_checksum_valid() { "ok" } else { "bad" }
                            );
                        }
                        print_hex_dump(sector.data(), sector.size());
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
        }
        "map" => {
            if let Some(side) = parts.get(1).and_then(|s| parse_hex_or_dec(s)) {
                draw_sector_map(img, side);
            } else {
                for side in 0..img.sides() {
                    draw_sector_map(img, side);
                    println!();
                }
            }
        }
        "reprocess" => match img.reprocess_raw() {
            Ok(errors) => println!("Reprocessed raw captures: {} sector error(s)", errors),
            Err(e) => println!("Error: {}", e),
        },
        "export-h8d" | "export-raw" => {
            if parts.len() < 2 {
                println!("Usage: {} <path>", command);
                return;
            }
            let result = File::create(&parts[1]).map_err(H17Error::from).and_then(|file| {
                let out = BufWriter::new(file);
                if command == "export-h8d" {
                    export_h8d(&*img, out).map(|filled| format!("{} sector(s) zero-filled", filled))
                } else {
                    export_raw(&*img, out).map(|tracks| format!("{} track(s)", tracks))
                }
            });
            match result {
                Ok(summary) => println!("Exported to {}: {}", parts[1], summary),
                Err(e) => println!("Error: {}", e),
            }
        }
        "label" | "comment" => {
            let block_type = if command == "label" {
                BlockType::Label
            } else {
                BlockType::Comment
            };
            if parts.len() < 2 {
                match img.text(block_type) {
                    Some(text) => println!("{}: {}", block_type.name(), text),
                    None => println!("No {} set.", command),
                }
                return;
            }
            if parts[1] == "-" {
                match img.remove_block(block_type) {
                    Some(_) => println!("{} removed.", block_type.name()),
                    None => println!("No {} set.", command),
                }
                return;
            }
            match img.set_text(block_type, parts[1..].join(" ")) {
                Ok(()) => println!("{} updated.", block_type.name()),
                Err(e) => println!("Error: {}", e),
            }
        }
        "save" => {
            let path = match parts.get(1) {
                Some(path) => path.clone(),
                None => match img.filename() {
                    Some(name) => name.to_string(),
                    None => {
                        println!("Usage: save <path>");
                        return;
                    }
                },
            };
            match img.save(&path) {
                Ok(()) => println!("Saved: {}", path),
                Err(e) => println!("Error: {}", e),
            }
        }
        _ => println!("Unknown command: {}. Type 'help' for available commands.", command),
    }
}

/// Parse command line input, respecting quoted strings
fn parse_command_line(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in input.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() {
        parts.push(current);
    }

    parts
}

fn print_help() {
    println!("Available commands:");
    println!("  open <path>                    - Open an H17D image (use quotes for paths with spaces)");
    println!("  import-h8d <path> [sides]      - Build an image from an H8D file");
    println!("  info                           - Show disk information");
    println!("  dump                           - Show every block in detail");
    println!("  tracks                         - List all tracks");
    println!("  sectors [<side> <track>]       - List sectors (all or one side/track)");
    println!("  read-sector <s> <t> <n> [user] - Hex dump a sector (user: 256 data bytes only)");
    println!("  map [side]                     - Visual sector map (white=ok, yellow=data error, red=header error)");
    println!("  reprocess                      - Decode the raw captures again");
    println!("  export-h8d <path>              - Export user data as H8D");
    println!("  export-raw <path>              - Export framed 320-byte sectors");
    println!("  label [text|-]                 - Show, set or remove (-) the label");
    println!("  comment [text|-]               - Show, set or remove (-) the comment");
    println!("  save [path]                    - Save image to file");
    println!("  help                           - Show this help");
    println!("  quit, exit                     - Exit");
}

fn print_info(image: &DiskImage) {
    if let Some(filename) = image.filename() {
        println!("Filename: {}", filename);
    }
    println!("Version: {}", image.version());
    match image.disk_format() {
        Some(format) => {
            println!("Sides: {}", format.sides);
            println!("Tracks per side: {}", format.tracks);
        }
        None => println!("Disk format: missing"),
    }
    if let Some(flags) = image.flags() {
        println!("Write protect: {}", if flags.write_protect { "Yes" } else { "No" });
        println!("Distribution: {}", flags.distribution);
        println!("Source: {}", flags.track_source);
    }
    for block_type in BlockType::ALL.into_iter().filter(BlockType::is_text) {
        if let Some(text) = image.text(block_type) {
            println!("{}: {}", block_type.name(), text);
        }
    }
    if let Some(data) = image.data() {
        println!(
            "Data: {} tracks, {} sectors, {} errors",
            data.track_count(),
            data.sector_count(),
            data.error_count()
        );
    }
    if let Some(raw) = image.raw_data() {
        println!("Raw captures: {} tracks", raw.track_count());
    }
    for issue in image.consistency_issues() {
        println!("Warning: {}", issue);
    }
    println!("Changed: {}", if image.is_changed() { "Yes" } else { "No" });
}

fn list_tracks(image: &DiskImage) {
    let Some(data) = image.data() else {
        println!("No data block.");
        return;
    };

    println!(
        "{:<5} {:<6} {:<8} {:<7} {:<7} {:<10}",
        "Side", "Track", "Sectors", "Errors", "Bytes", "Status"
    );
    println!("{}", "-".repeat(48));

    for track in data.tracks() {
        let status = if !track.is_complete() {
            "Incomplete"
        } else if !track.duplicate_sectors().is_empty() {
            "Duplicates"
        } else if track.error_count() > 0 {
            "Errors"
        } else {
            "Good"
        };
        println!(
            "{:<5} {:<6} {:<8} {:<7} {:<7} {:<10}",
            track.side,
            track.track,
            track.sector_count(),
            track.error_count(),
            track.payload_size(),
            status
        );
    }
}

fn list_sectors_on_track(image: &DiskImage, side: u8, track: u8) {
    match image.get_track(side, track) {
        Ok(t) => {
            println!("Side {} Track {}:", side, track);
            println!(
                "{:<6} {:<6} {:<24} {:<6} {:<8}",
                "Index", "Sector", "Result", "Size", "Content"
            );
            println!("{}", "-".repeat(54));
            for (index, sector) in t.sectors().iter().enumerate() {
                println!(
                    "{:<6} {:<6} {:<24} {:<6} {:<8}",
                    index,
                    sector.number,
                    sector.error.to_string(),
                    sector.size(),
                    sector.status().to_string()
                );
            }
        }
        Err(e) => println!("Error: {}", e),
    }
}

fn list_all_sectors(image: &DiskImage) {
    let Some(data) = image.data() else {
        println!("No data block.");
        return;
    };

    for track in data.tracks() {
        let codes: Vec<String> = track
            .physical_order()
            .into_iter()
            .map(|s| match s {
                Some(sector) => format!("{:<5}", sector.error.mnemonic()),
                None => format!("{:<5}", "-"),
            })
            .collect();
        println!("S{} T{:>2}: {}", track.side, track.track, codes.join(" "));
    }
}

fn print_hex_dump(data: &[u8], max_bytes: usize) {
    let len = data.len().min(max_bytes);

    for (i, chunk) in data[..len].chunks(16).enumerate() {
        print!("{:04X}: ", i * 16);

        for (j, byte) in chunk.iter().enumerate() {
            print!("{:02X} ", byte);
            if j == 7 {
                print!(" ");
            }
        }

        // Pad if less than 16 bytes
        for j in chunk.len()..16 {
            print!("   ");
            if j == 7 {
                print!(" ");
            }
        }

        print!(" |");
        for byte in chunk {
            let c = if (32..127).contains(byte) {
                *byte as char
            } else {
                '.'
            };
            print!("{}", c);
        }
        println!("|");
    }

    if data.len() > max_bytes {
        println!("... ({} more bytes)", data.len() - max_bytes);
    }
}

fn parse_hex_or_dec(s: &str) -> Option<u8> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u8::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}
