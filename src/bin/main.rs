//! CLI binary for MCAP export
//!
//! This provides the command-line interface for the mcap_export library.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use glob::glob;
use mcap_export::{
    compute_export_path, convert, parse_log, ExportFormat, ExportOptions, FieldProfile, FlattenDepth,
    JobKind, LogReader, Orchestrator, Settings, SourceRef,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const FORMAT_NAMES: [&str; 6] = ["omni", "tvn", "ld", "wide", "long", "placeholder"];

fn long_version() -> &'static str {
    static VERSION: OnceLock<String> = OnceLock::new();
    VERSION.get_or_init(|| {
        format!(
            "{} (git {}, {})",
            env!("CARGO_PKG_VERSION"),
            option_env!("VERGEN_GIT_SHA").unwrap_or("unknown"),
            option_env!("VERGEN_GIT_COMMIT_DATE").unwrap_or("unknown date"),
        )
    })
}

fn files_arg() -> Arg {
    Arg::new("files")
        .help("MCAP files to read (.mcap, case-insensitive, supports globbing)")
        .required(true)
        .num_args(1..)
        .index(1)
}

fn output_dir_arg() -> Arg {
    Arg::new("output-dir")
        .long("output-dir")
        .help("Directory for exported files (default: same as input file)")
        .value_name("DIR")
}

fn cli() -> Command {
    Command::new("mcap_export")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version())
        .about("Read MCAP telemetry logs and export them as wide, long or summary tables.")
        .subcommand_required(true)
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .help("Enable debug logging (overrides RUST_LOG)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .help("TOML settings file")
                .value_name("FILE"),
        )
        .subcommand(
            Command::new("info")
                .about("Show the channel catalog and time bounds from the summary section")
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("parse")
                .about("Print the parse result (summary plus mapped roles) as JSON")
                .arg(files_arg()),
        )
        .subcommand(
            Command::new("convert")
                .about("Export decoded messages to omni (wide), tvn (long) or ld (placeholder)")
                .arg(files_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Export format")
                        .value_parser(FORMAT_NAMES)
                        .default_value("omni"),
                )
                .arg(output_dir_arg())
                .arg(
                    Arg::new("shallow")
                        .long("shallow")
                        .help("Only flatten top-level fields")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("keyword")
                        .long("keyword")
                        .help("Keep only fields whose path contains this marker (repeatable)")
                        .action(ArgAction::Append)
                        .conflicts_with("all-fields"),
                )
                .arg(
                    Arg::new("all-fields")
                        .long("all-fields")
                        .help("Keep every field regardless of the format's default profile")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("recover")
                .about("Repair a truncated container with the external repair tool")
                .arg(Arg::new("file").required(true).index(1))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Repaired file (default: <stem>-recovered.mcap)")
                        .value_name("FILE"),
                ),
        )
        .subcommand(
            Command::new("process")
                .about("Run recovery, parse and export as retried jobs")
                .arg(files_arg())
                .arg(
                    Arg::new("recover")
                        .long("recover")
                        .help("Repair each file first; parse runs as its continuation")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Export format to produce after parsing (repeatable)")
                        .value_parser(FORMAT_NAMES)
                        .action(ArgAction::Append),
                )
                .arg(output_dir_arg()),
        )
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Expand patterns into existing `.mcap` files
fn collect_paths(matches: &ArgMatches) -> Result<Vec<PathBuf>> {
    let patterns: Vec<&String> = matches
        .get_many::<String>("files")
        .map(|values| values.collect())
        .unwrap_or_default();
    debug!(?patterns, "Input patterns");

    let mut valid_paths = Vec::new();
    for pattern in &patterns {
        let paths: Vec<PathBuf> = if pattern.contains('*') || pattern.contains('?') {
            match glob(pattern) {
                Ok(glob_iter) => match glob_iter.collect::<Result<Vec<_>, _>>() {
                    Ok(paths) => {
                        debug!(pattern = %pattern, matched = paths.len(), "Expanded glob pattern");
                        paths
                    }
                    Err(e) => {
                        warn!(pattern = %pattern, error = %e, "Error expanding glob pattern");
                        continue;
                    }
                },
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Invalid glob pattern");
                    continue;
                }
            }
        } else {
            vec![PathBuf::from(pattern)]
        };

        for path in paths {
            if !path.exists() {
                warn!("File does not exist: {}", path.display());
                continue;
            }
            let valid_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("mcap"))
                .unwrap_or(false);
            if !valid_extension {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("none");
                warn!("Skipping file with unsupported extension '{ext}': {}", path.display());
                continue;
            }
            valid_paths.push(path);
        }
    }

    if valid_paths.is_empty() {
        bail!("no valid .mcap files found (input patterns were: {patterns:?})");
    }
    Ok(valid_paths)
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("unknown")
}

/// Run `f` over every file, continuing past failures
fn for_each_file(paths: &[PathBuf], mut f: impl FnMut(&Path) -> Result<()>) -> Result<()> {
    let mut processed = 0;
    for path in paths {
        match f(path) {
            Ok(()) => processed += 1,
            Err(e) => error!("Error processing {}: {e:#}", file_name(path)),
        }
    }
    if processed == 0 {
        bail!(
            "no files were successfully processed out of {} files found",
            paths.len()
        );
    }
    Ok(())
}

fn run_info(matches: &ArgMatches) -> Result<()> {
    let paths = collect_paths(matches)?;
    for_each_file(&paths, |path| {
        let reader = LogReader::open(path)?;
        let summary = reader.summary()?;
        println!("{}", path.display());
        println!("  size: {} bytes", reader.len());
        if let Some(count) = summary.message_count {
            println!("  messages: {count}");
        }
        println!("  duration: {:.3}s", summary.duration_ns() as f64 / 1e9);
        println!("  channels: {}", summary.channels.len());
        for channel in &summary.channels {
            println!(
                "    [{}] {} ({}, {}) {} messages",
                channel.id,
                channel.topic,
                channel.message_encoding,
                channel.schema_name.as_deref().unwrap_or("no schema"),
                channel
                    .message_count
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "?".to_string())
            );
        }
        Ok(())
    })
}

fn run_parse(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let paths = collect_paths(matches)?;
    for_each_file(&paths, |path| {
        let result = parse_log(path, settings.roles.as_ref())?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    })
}

fn run_convert(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let paths = collect_paths(matches)?;
    let format_name = matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("omni");
    let format: ExportFormat = format_name.parse()?;

    let mut options: ExportOptions = settings.export_options();
    if let Some(dir) = matches.get_one::<String>("output-dir") {
        options.output_dir = Some(PathBuf::from(dir));
    }
    if matches.get_flag("shallow") {
        options.depth = FlattenDepth::Shallow;
    }
    if matches.get_flag("all-fields") {
        options.profile = Some(FieldProfile::All);
    } else if let Some(keywords) = matches.get_many::<String>("keyword") {
        options.profile = Some(FieldProfile::keywords(keywords));
    }
    if !format.is_data() {
        info!("The ld format writes a text summary, not a data table");
    }

    for_each_file(&paths, |path| {
        let output = compute_export_path(path, format, options.output_dir.as_deref());
        let report = convert(path, &output, format_name, &options)
            .with_context(|| format!("failed to convert {}", path.display()))?;
        println!(
            "{} -> {} ({} rows, {} columns)",
            file_name(path),
            report.output.display(),
            report.rows,
            report.columns
        );
        Ok(())
    })
}

async fn run_recover(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let input = matches
        .get_one::<String>("file")
        .map(PathBuf::from)
        .context("missing input file")?;
    let mut source = SourceRef::new(&input);
    if let Some(output) = matches.get_one::<String>("output") {
        source = source.with_recovered(output);
    }
    let repaired = settings
        .repair_tool()
        .repair(&source.original, &source.recovered)
        .await
        .with_context(|| format!("failed to recover {}", input.display()))?;
    println!("{} -> {}", file_name(&input), repaired.display());
    Ok(())
}

async fn run_process(matches: &ArgMatches, settings: &Settings) -> Result<()> {
    let paths = collect_paths(matches)?;
    let formats: Vec<ExportFormat> = matches
        .get_many::<String>("format")
        .map(|values| values.map(|v| v.parse::<ExportFormat>()).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    let output_dir = matches
        .get_one::<String>("output-dir")
        .map(PathBuf::from)
        .or_else(|| settings.export.output_dir.clone());

    let orchestrator = Orchestrator::new(Arc::new(settings.pipeline_runner()), settings.retry_policy());
    let mut failed = 0;

    for path in &paths {
        let source = SourceRef::new(path);
        let first = if matches.get_flag("recover") {
            orchestrator.submit_recovery(source.clone())
        } else {
            orchestrator.submit(source.clone(), JobKind::Parse)
        };
        let mut results = orchestrator.run_chain(first).await?;

        for format in &formats {
            let output = compute_export_path(path, *format, output_dir.as_deref());
            let id = orchestrator.submit(
                source.clone(),
                JobKind::Export {
                    format: format.name().to_string(),
                    output,
                },
            );
            results.push((id, orchestrator.run(id).await?));
        }

        for (id, status) in results {
            let kind = orchestrator.store().get(id)?.kind;
            println!("{} {} [{}]: {}", file_name(path), kind.name(), id, status.status);
            if status.error_message.is_some() {
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} job(s) ended in error");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("debug"));

    let settings = Settings::load(matches.get_one::<String>("config").map(Path::new))
        .context("failed to load settings")?;
    debug!(?settings, "Loaded settings");

    match matches.subcommand() {
        Some(("info", sub)) => run_info(sub),
        Some(("parse", sub)) => run_parse(sub, &settings),
        Some(("convert", sub)) => run_convert(sub, &settings),
        Some(("recover", sub)) => run_recover(sub, &settings).await,
        Some(("process", sub)) => run_process(sub, &settings).await,
        Some((name, _)) => bail!("unknown subcommand: {name}"),
        None => bail!("no subcommand given"),
    }
}
