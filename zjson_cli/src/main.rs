use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use zjson_codecs::{default_readers, default_writers};
use zjson_core::{
    DirectoryScan, ErrorPolicy, ReadOptions, RecordReader, RecordWriter, WriteOptions,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "zjson",
    about = "Read, scan and write line-delimited JSON inside zst, bz2 and xz files",
    version
)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress one file and print its records as JSON lines
    Cat {
        /// Compressed file (codec chosen by extension)
        file: PathBuf,
        /// Log and skip unreadable lines instead of stopping
        #[arg(long)]
        skip_bad_lines: bool,
    },
    /// Print the records of every matching file in a directory, in name order
    Scan {
        /// Directory to scan
        directory: PathBuf,
        /// Extensions to read, e.g. --ext .zst --ext .bz2
        #[arg(short, long = "ext", required = true)]
        extensions: Vec<String>,
        /// Start at this file name; earlier names are skipped
        #[arg(short, long)]
        resume_from: Option<String>,
        /// Log and skip unreadable lines instead of stopping
        #[arg(long)]
        skip_bad_lines: bool,
    },
    /// Compress JSON lines into a new file
    Pack {
        /// Plain JSON-lines input ("-" reads stdin)
        input: PathBuf,
        /// Destination file (codec chosen by extension)
        output: PathBuf,
        /// Compression level (codec default when omitted)
        #[arg(short, long)]
        level: Option<i32>,
    },
    /// Count the records of a file or of a directory scan
    Count {
        /// File, or directory together with --ext
        path: PathBuf,
        /// Extensions to read when PATH is a directory
        #[arg(short, long = "ext")]
        extensions: Vec<String>,
        /// Log and skip unreadable lines instead of stopping
        #[arg(long)]
        skip_bad_lines: bool,
    },
    /// List the registered extensions and their codecs
    Formats,
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn read_options(skip_bad_lines: bool) -> ReadOptions {
    let policy = if skip_bad_lines {
        ErrorPolicy::Skip
    } else {
        ErrorPolicy::Abort
    };
    ReadOptions::default().error_policy(policy)
}

/// Compressed sizes for the summaries, in binary units.
fn human_bytes(bytes: u64) -> String {
    const SCALED: [&str; 4] = ["KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut scaled = bytes as f64 / 1024.0;
    let mut unit = SCALED[0];
    for &next in &SCALED[1..] {
        if scaled < 1024.0 {
            break;
        }
        scaled /= 1024.0;
        unit = next;
    }
    format!("{scaled:.2} {unit}")
}

fn print_records<I>(records: I) -> anyhow::Result<u64>
where
    I: Iterator<Item = zjson_core::Result<Value>>,
{
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut n = 0u64;
    for record in records {
        serde_json::to_writer(&mut out, &record?)?;
        out.write_all(b"\n")?;
        n += 1;
    }
    out.flush()?;
    Ok(n)
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_cat(file: PathBuf, skip_bad_lines: bool) -> anyhow::Result<()> {
    let mut reader = RecordReader::open(&file, default_readers(), read_options(skip_bad_lines))
        .with_context(|| format!("opening {:?}", file))?;
    let n = print_records(reader.records())?;
    if reader.skipped_lines() > 0 {
        eprintln!("  skipped     : {} lines", reader.skipped_lines());
    }
    debug!(records = n, "cat finished");
    reader.close();
    Ok(())
}

fn run_scan(
    directory: PathBuf,
    extensions: Vec<String>,
    resume_from: Option<String>,
    skip_bad_lines: bool,
) -> anyhow::Result<()> {
    let mut scan = DirectoryScan::new(&directory)
        .extensions(&extensions)
        .options(read_options(skip_bad_lines));
    if let Some(name) = resume_from {
        scan = scan.resume_from(name);
    }
    let records = scan
        .records::<Value>(default_readers())
        .with_context(|| format!("scanning {:?}", directory))?;
    let n = print_records(records)?;
    debug!(records = n, "scan finished");
    Ok(())
}

fn run_pack(input: PathBuf, output: PathBuf, level: Option<i32>) -> anyhow::Result<()> {
    let src: Box<dyn BufRead> = if input.to_str() == Some("-") {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file =
            File::open(&input).with_context(|| format!("opening input file {:?}", input))?;
        Box::new(BufReader::new(file))
    };

    let options = WriteOptions { level };
    let mut writer = RecordWriter::create(&output, default_writers(), options)
        .with_context(|| format!("creating output file {:?}", output))?;

    let t0 = Instant::now();
    let mut raw_bytes = 0u64;
    for (idx, line) in src.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", idx + 1))?;
        raw_bytes += line.len() as u64 + 1;
        let record: Value = serde_json::from_str(&line)
            .with_context(|| format!("line {} is not valid JSON", idx + 1))?;
        writer.write(&record)?;
    }
    let records = writer.records_written();
    let codec = writer.codec_name();
    writer.finish()?;
    let elapsed = t0.elapsed();

    let compressed_size = std::fs::metadata(&output)?.len();
    let ratio = raw_bytes as f64 / compressed_size.max(1) as f64;

    eprintln!("  codec       : {}", codec);
    eprintln!("  records     : {}", records);
    eprintln!("  raw size    : {}", human_bytes(raw_bytes));
    eprintln!("  compressed  : {}", human_bytes(compressed_size));
    eprintln!("  ratio       : {:.2}x", ratio);
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_count(path: PathBuf, extensions: Vec<String>, skip_bad_lines: bool) -> anyhow::Result<()> {
    let t0 = Instant::now();
    if path.is_dir() {
        if extensions.is_empty() {
            anyhow::bail!("counting a directory needs at least one --ext");
        }
        let scan = DirectoryScan::new(&path)
            .extensions(&extensions)
            .options(read_options(skip_bad_lines));
        let files = scan.files()?.len();
        let mut records = 0u64;
        for record in scan.records::<Value>(default_readers())? {
            record?;
            records += 1;
        }
        eprintln!("  files       : {}", files);
        eprintln!("  records     : {}", records);
    } else {
        let mut reader = RecordReader::open(&path, default_readers(), read_options(skip_bad_lines))
            .with_context(|| format!("opening {:?}", path))?;
        let mut records = 0u64;
        while let Some(record) = reader.next_record::<Value>() {
            record?;
            records += 1;
        }
        eprintln!("  codec       : {}", reader.codec_name());
        eprintln!("  records     : {}", records);
        eprintln!("  lines       : {}", reader.line_number());
        eprintln!("  skipped     : {}", reader.skipped_lines());
        eprintln!("  compressed  : {}", human_bytes(reader.compressed_position()));
        reader.close();
    }
    eprintln!("  elapsed     : {:.3}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn run_formats() -> anyhow::Result<()> {
    let readers = default_readers();
    let writers = default_writers();
    println!("  {:<8}  {:<12}  {:<12}", "ext", "read", "write");
    for ext in readers.extensions() {
        let read = readers.get(ext).map_or("-", |c| c.name());
        let write = writers.get(ext).map_or("-", |c| c.name());
        println!("  {:<8}  {:<12}  {:<12}", ext, read, write);
    }
    Ok(())
}

fn describe(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Cat {
            file,
            skip_bad_lines,
        } => run_cat(file, skip_bad_lines),
        Commands::Scan {
            directory,
            extensions,
            resume_from,
            skip_bad_lines,
        } => run_scan(directory, extensions, resume_from, skip_bad_lines),
        Commands::Pack {
            input,
            output,
            level,
        } => {
            let label = describe(&output);
            run_pack(input, output, level).with_context(|| format!("packing into {label}"))
        }
        Commands::Count {
            path,
            extensions,
            skip_bad_lines,
        } => run_count(path, extensions, skip_bad_lines),
        Commands::Formats => run_formats(),
    }
}
