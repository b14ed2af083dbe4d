//! Example demonstrating MCAP export functionality
//!
//! Reads the channel catalog of one container, then writes the wide, long
//! and summary exports next to it (or into an output directory).

use anyhow::Result;
use mcap_export::{compute_export_path, convert, ExportFormat, ExportOptions, LogReader};
use std::path::Path;

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <mcap_file> [output_dir]", args[0]);
        eprintln!("\nExample:");
        eprintln!("  {} drive.mcap", args[0]);
        eprintln!("  {} drive.mcap ./exports", args[0]);
        std::process::exit(1);
    }

    let input = Path::new(&args[1]);
    let output_dir = args.get(2).map(Path::new);

    println!("=== MCAP Export Demo ===");
    println!("Input file: {}", input.display());

    let reader = LogReader::open(input)?;
    let summary = reader.summary()?;
    println!("\n=== Channels ===");
    for channel in &summary.channels {
        println!(
            "  {:<40} {:>8} messages ({})",
            channel.topic,
            channel.message_count.unwrap_or(0),
            channel.message_encoding
        );
    }
    println!("Duration: {:.3} s", summary.duration_ns() as f64 / 1e9);

    println!("\n=== Exports ===");
    let options = ExportOptions::default();
    for format in [ExportFormat::Omni, ExportFormat::Tvn, ExportFormat::Ld] {
        let output = compute_export_path(input, format, output_dir);
        let report = convert(input, &output, format.name(), &options)?;
        if report.is_data {
            println!(
                "  {:<5} {} ({} rows, {} columns)",
                format.name(),
                output.display(),
                report.rows,
                report.columns
            );
        } else {
            println!("  {:<5} {} (summary only)", format.name(), output.display());
        }
    }

    Ok(())
}
