//! Kinopio CLI - Command-line tool for platformer stage archives.
//!
//! This is the main entry point for the Kinopio command-line application.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use kinopio::prelude::*;

/// Kinopio - stage archive extraction and inspection tool
#[derive(Parser)]
#[command(name = "kinopio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompress a Yaz0 file
    Yaz0Decompress {
        /// Compressed input file
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, env = "KINOPIO_OUTPUT")]
        output: PathBuf,
    },

    /// Compress a file with Yaz0
    Yaz0Compress {
        /// Input file
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, env = "KINOPIO_OUTPUT")]
        output: PathBuf,

        /// Compression level (0 = literals only, 9 = full window)
        #[arg(short, long)]
        level: Option<u8>,
    },

    /// List contents of a NARC archive (plain or Yaz0-compressed)
    NarcList {
        /// Path to the archive
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract files from a NARC archive
    NarcExtract {
        /// Path to the archive
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, env = "KINOPIO_OUTPUT")]
        output: PathBuf,

        /// Filter pattern (glob-style)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Pack a directory into a NARC archive
    NarcPack {
        /// Directory to pack
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Output archive
        #[arg(short, long, env = "KINOPIO_OUTPUT")]
        output: PathBuf,

        /// Yaz0-compress the archive at this level
        #[arg(short, long)]
        compress: Option<u8>,
    },

    /// Dump a BYML document as JSON
    BymlDump {
        /// BYML file, or an archive containing one
        #[arg(short, long, env = "KINOPIO_INPUT")]
        input: PathBuf,

        /// Entry to read when the input is an archive
        #[arg(short, long, default_value = "StageData.byml")]
        entry: String,

        /// Dump only this key of the root dictionary
        #[arg(short, long)]
        key: Option<String>,

        /// Output JSON file (stdout if omitted)
        #[arg(short, long, env = "KINOPIO_OUTPUT")]
        output: Option<PathBuf>,

        /// Text encoding of keys and strings
        #[arg(long, value_enum, default_value_t = EncodingArg::ShiftJis)]
        encoding: EncodingArg,
    },

    /// Load stage archives and summarize their objects
    StageInfo {
        /// Stage files or glob patterns
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Creator class name table archive
        #[arg(long)]
        class_table: Option<PathBuf>,

        /// Print every warning instead of a count
        #[arg(short, long)]
        verbose: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    ShiftJis,
    Utf8,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::ShiftJis => TextEncoding::ShiftJis,
            EncodingArg::Utf8 => TextEncoding::Utf8,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Yaz0Decompress { input, output } => {
            cmd_yaz0_decompress(&input, &output)?;
        }
        Commands::Yaz0Compress { input, output, level } => {
            cmd_yaz0_compress(&input, &output, level)?;
        }
        Commands::NarcList { input, filter, detailed } => {
            cmd_narc_list(&input, filter.as_deref(), detailed)?;
        }
        Commands::NarcExtract { input, output, filter } => {
            cmd_narc_extract(&input, &output, filter.as_deref())?;
        }
        Commands::NarcPack { input, output, compress } => {
            cmd_narc_pack(&input, &output, compress)?;
        }
        Commands::BymlDump {
            input,
            entry,
            key,
            output,
            encoding,
        } => {
            cmd_byml_dump(&input, &entry, key.as_deref(), output.as_deref(), encoding.into())?;
        }
        Commands::StageInfo {
            inputs,
            class_table,
            verbose,
        } => {
            cmd_stage_info(&inputs, class_table.as_deref(), verbose)?;
        }
    }

    Ok(())
}

fn progress_bar(len: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

fn compile_filter(filter: Option<&str>) -> Result<Option<Pattern>> {
    filter
        .map(|pattern| Pattern::new(pattern).with_context(|| format!("Invalid filter pattern: {}", pattern)))
        .transpose()
}

fn matches_filter(filter: &Option<Pattern>, name: &str) -> bool {
    filter.as_ref().map_or(true, |pattern| pattern.matches(name))
}

fn open_archive(path: &Path) -> Result<Narc> {
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Narc::read(&data).context("Failed to open NARC archive")
}

fn cmd_yaz0_decompress(input: &Path, output: &Path) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;

    if !kinopio::yaz0::is_yaz0(&data) {
        anyhow::bail!("Input file is not Yaz0-compressed");
    }

    let start = Instant::now();
    let decompressed = kinopio::yaz0::decompress(&data).context("Failed to decompress")?;
    fs::write(output, &decompressed).context("Failed to write output file")?;

    println!(
        "Decompressed {} -> {} bytes in {:?}",
        data.len(),
        decompressed.len(),
        start.elapsed()
    );

    Ok(())
}

fn cmd_yaz0_compress(input: &Path, output: &Path, level: Option<u8>) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;

    let start = Instant::now();
    let compressed = kinopio::yaz0::compress(&data, level);
    fs::write(output, &compressed).context("Failed to write output file")?;

    println!(
        "Compressed {} -> {} bytes in {:?}",
        data.len(),
        compressed.len(),
        start.elapsed()
    );

    Ok(())
}

fn cmd_narc_list(input: &Path, filter: Option<&str>, detailed: bool) -> Result<()> {
    let archive = open_archive(input)?;
    let filter = compile_filter(filter)?;

    let mut count = 0;
    for entry in archive.iter() {
        if !matches_filter(&filter, entry.name()) {
            continue;
        }

        if detailed {
            let data = entry.data();
            let kind = if kinopio::yaz0::is_yaz0(data) {
                "Yaz0"
            } else if kinopio::byml::is_byml(data) {
                "BYML"
            } else if Narc::is_narc(data) {
                "NARC"
            } else {
                ""
            };
            println!("{:>12} {:<4} {}", data.len(), kind, entry.name());
        } else {
            println!("{}", entry.name());
        }
        count += 1;
    }

    println!("\nTotal: {} entries", count);

    Ok(())
}

fn cmd_narc_extract(input: &Path, output: &Path, filter: Option<&str>) -> Result<()> {
    println!("Opening archive: {}", input.display());

    let archive = open_archive(input)?;
    let filter = compile_filter(filter)?;
    let entries: Vec<&NarcEntry> = archive.iter().filter(|e| matches_filter(&filter, e.name())).collect();

    println!("Extracting {} of {} entries...", entries.len(), archive.len());

    fs::create_dir_all(output)?;

    let pb = progress_bar(entries.len())?;
    let start = Instant::now();
    for entry in &entries {
        let output_path = output.join(entry.name().replace('/', std::path::MAIN_SEPARATOR_STR));

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&output_path, entry.data())
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("Extraction completed in {:?}", start.elapsed());

    Ok(())
}

fn cmd_narc_pack(input: &Path, output: &Path, compress: Option<u8>) -> Result<()> {
    println!("Packing: {} -> {}", input.display(), output.display());

    let mut archive = Narc::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.context("Failed to walk input directory")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(input)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let data = fs::read(entry.path()).with_context(|| format!("Failed to read {}", entry.path().display()))?;
        archive
            .insert(name.as_str(), data)
            .with_context(|| format!("Failed to add {}", name))?;
    }

    let bytes = match compress {
        Some(level) => archive.write_compressed(Some(level)),
        None => archive.write(),
    }
    .context("Failed to write archive")?;
    fs::write(output, &bytes).context("Failed to write output file")?;

    println!("Packed {} files ({} bytes)", archive.len(), bytes.len());

    Ok(())
}

fn cmd_byml_dump(
    input: &Path,
    entry: &str,
    key: Option<&str>,
    output: Option<&Path>,
    encoding: TextEncoding,
) -> Result<()> {
    let data = fs::read(input).context("Failed to read input file")?;

    // Archives are unpacked first; a bare Yaz0 file may hold either.
    let data = if kinopio::yaz0::is_yaz0(&data) {
        kinopio::yaz0::decompress(&data).context("Failed to decompress")?
    } else {
        data
    };
    let doc = if Narc::is_narc(&data) {
        let archive = Narc::parse(&data).context("Failed to parse NARC archive")?;
        let bytes = archive
            .get(entry)
            .with_context(|| format!("Archive has no entry named {}", entry))?;
        Byml::parse_with(bytes, &DecodeOptions { encoding })
    } else {
        Byml::parse_with(&data, &DecodeOptions { encoding })
    }
    .context("Failed to parse BYML")?;

    tracing::debug!(
        endian = %doc.endian(),
        version = doc.version(),
        containers = doc.container_count(),
        "parsed document"
    );

    let view = match key {
        Some(key) => {
            let root = doc.root_dictionary().context("Document has no root dictionary")?;
            let node = root
                .get(key)
                .with_context(|| format!("Root dictionary has no key named {}", key))?;
            doc.json_view_of(node)
        }
        None => doc.json_view(),
    };

    match output {
        Some(path) => {
            let file = fs::File::create(path).context("Failed to create output file")?;
            let mut writer = std::io::BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &view).context("Failed to write JSON")?;
            writer.flush()?;
            println!("Wrote {}", path.display());
        }
        None => {
            let json = serde_json::to_string_pretty(&view).context("Failed to render JSON")?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Expand arguments that are glob patterns; plain paths are kept as given.
fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }
        for path in glob::glob(input).with_context(|| format!("Invalid glob pattern: {}", input))? {
            paths.push(path?);
        }
    }
    Ok(paths)
}

fn cmd_stage_info(inputs: &[String], class_table: Option<&Path>, verbose: bool) -> Result<()> {
    let paths = expand_inputs(inputs)?;
    let config = StageConfig::default();

    let classes = match class_table {
        Some(path) => {
            let data = fs::read(path).context("Failed to read class name table")?;
            let options = DecodeOptions {
                encoding: config.encoding,
            };
            let table = ClassNameTable::from_archive(&data, &options).context("Failed to load class name table")?;
            println!("Loaded {} class names", table.len());
            Some(table)
        }
        None => None,
    };

    println!("Loading {} stage files...", paths.len());

    let start = Instant::now();
    let results = kinopio::batch::load_stages(&paths, &config);

    let mut loaded = 0;
    let mut errors = 0;
    for result in &results {
        let stage = match &result.stage {
            Ok(stage) => stage,
            Err(e) => {
                eprintln!("Error loading {}: {}", result.path.display(), e);
                errors += 1;
                continue;
            }
        };
        loaded += 1;

        let all = stage.data.all_objects();
        println!(
            "{} ({}, {}): {} objects ({} including children), {} rails",
            stage.file_name,
            stage.data.file_kind,
            stage.endian,
            stage.data.objects.len(),
            all.len(),
            stage.data.rails.len()
        );

        for &kind in &stage.data.categories {
            println!("  {:?}: {}", kind, stage.data.objects_of(kind).count());
        }

        if let Some(classes) = &classes {
            let unknown = all
                .iter()
                .filter_map(|obj| obj.name())
                .filter(|name| classes.class_of(name).is_none())
                .count();
            if unknown > 0 {
                println!("  {} objects without a creator class", unknown);
            }
        }

        if verbose {
            for warning in &stage.data.warnings {
                println!("  warning: {}", warning);
            }
        } else if !stage.data.warnings.is_empty() {
            println!("  {} warnings", stage.data.warnings.len());
        }
    }

    println!(
        "Loaded {} stages in {:?} ({} errors)",
        loaded,
        start.elapsed(),
        errors
    );

    Ok(())
}
