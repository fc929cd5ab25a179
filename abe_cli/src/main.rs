use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use abe_codecs::{decode_report, encode_report, AttestationReport, ProofPositions};
use abe_core::{MetaHeader, PositionInfo, BLOCK_SIZE, META_HEADER_SIZE};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "abe",
    about = "Attestation Block Encoding — encode, decode, and inspect report buffers",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON attestation report into a block-aligned buffer
    Encode {
        /// JSON report file
        input: PathBuf,
        /// Destination buffer file
        output: PathBuf,
        /// Sidecar file for the meta header and section positions
        /// (default: <output>.json)
        #[arg(short, long)]
        sidecar: Option<PathBuf>,
    },
    /// Decode a buffer back into a JSON report on stdout
    Decode {
        /// Encoded buffer file
        input: PathBuf,
        /// Sidecar produced by `encode` (default: <input>.json)
        #[arg(short, long)]
        sidecar: Option<PathBuf>,
    },
    /// Print the section table of an encoded buffer
    Inspect {
        /// Encoded buffer file
        input: PathBuf,
        /// Sidecar produced by `encode` (default: <input>.json)
        #[arg(short, long)]
        sidecar: Option<PathBuf>,
        /// Hex-dump each section's blocks
        #[arg(long)]
        blocks: bool,
    },
}

/// On-disk companion of an encoded buffer: the 32-byte meta header in hex
/// plus the block-unit position of every section.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Sidecar {
    meta_header: String,
    positions: ProofPositions,
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn sidecar_path(explicit: Option<PathBuf>, buffer_path: &Path) -> PathBuf {
    explicit.unwrap_or_else(|| {
        let mut name = buffer_path.as_os_str().to_owned();
        name.push(".json");
        PathBuf::from(name)
    })
}

fn load_sidecar(path: &Path) -> anyhow::Result<(MetaHeader, ProofPositions)> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading sidecar file {:?}", path))?;
    let sidecar: Sidecar =
        serde_json::from_str(&raw).with_context(|| format!("parsing sidecar file {:?}", path))?;

    let header_bytes = hex::decode(&sidecar.meta_header)
        .with_context(|| format!("sidecar {:?} has a malformed meta header", path))?;
    let meta = MetaHeader::from_bytes(&header_bytes)
        .with_context(|| format!("sidecar {:?} has a malformed meta header", path))?;

    Ok((meta, sidecar.positions))
}

fn hex_dump(bytes: &[u8], start_block: usize) {
    for (i, chunk) in bytes.chunks(BLOCK_SIZE).enumerate() {
        print!("  block {:>4}  ", start_block + i);
        for byte in chunk {
            print!("{:02x} ", byte);
        }
        print!(" |");
        for byte in chunk {
            if byte.is_ascii_graphic() || *byte == b' ' {
                print!("{}", *byte as char);
            } else {
                print!(".");
            }
        }
        println!("|");
    }
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_encode(input: PathBuf, output: PathBuf, sidecar: Option<PathBuf>) -> anyhow::Result<()> {
    let raw = fs::read_to_string(&input)
        .with_context(|| format!("reading report file {:?}", input))?;
    let report: AttestationReport =
        serde_json::from_str(&raw).with_context(|| format!("parsing report file {:?}", input))?;

    let encoded = encode_report(&report).context("encoding report")?;

    let mut header_bytes = [0u8; META_HEADER_SIZE];
    encoded
        .meta
        .write_into(&mut header_bytes)
        .context("serializing meta header")?;

    let sidecar_file = sidecar_path(sidecar, &output);
    let sidecar_json = serde_json::to_string_pretty(&Sidecar {
        meta_header: hex::encode(header_bytes),
        positions: encoded.positions.clone(),
    })?;

    fs::write(&output, &encoded.buffer)
        .with_context(|| format!("writing buffer file {:?}", output))?;
    fs::write(&sidecar_file, sidecar_json)
        .with_context(|| format!("writing sidecar file {:?}", sidecar_file))?;

    eprintln!("  buffer   : {:?}", output);
    eprintln!("  sidecar  : {:?}", sidecar_file);
    eprintln!("  size     : {} bytes", encoded.buffer.len());
    eprintln!("  blocks   : {}", encoded.buffer.len() / BLOCK_SIZE);
    Ok(())
}

fn run_decode(input: PathBuf, sidecar: Option<PathBuf>) -> anyhow::Result<()> {
    let buffer = fs::read(&input).with_context(|| format!("reading buffer file {:?}", input))?;
    let (meta, positions) = load_sidecar(&sidecar_path(sidecar, &input))?;

    let report = decode_report(&buffer, &meta, &positions).context("decoding report")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_inspect(input: PathBuf, sidecar: Option<PathBuf>, blocks: bool) -> anyhow::Result<()> {
    let buffer = fs::read(&input).with_context(|| format!("reading buffer file {:?}", input))?;
    let (meta, positions) = load_sidecar(&sidecar_path(sidecar, &input))?;

    let sections: [(&str, &PositionInfo, u16); 10] = [
        ("data", &positions.data, meta.attestation_data_len),
        ("timestamp", &positions.timestamp, meta.timestamp_len),
        ("statusCode", &positions.status_code, meta.status_code_len),
        ("method", &positions.method, meta.method_len),
        (
            "responseFormat",
            &positions.response_format,
            meta.response_format_len,
        ),
        ("url", &positions.url, meta.url_len),
        ("selector", &positions.selector, meta.selector_len),
        (
            "encodingOptions",
            &positions.encoding_options,
            meta.encoding_options_len,
        ),
        (
            "requestHeaders",
            &positions.request_headers,
            meta.headers_len,
        ),
        (
            "optionalFields",
            &positions.optional_fields,
            meta.optional_fields_len,
        ),
    ];

    println!("=== ABE buffer: {:?} ===", input);
    println!();
    println!("  size   : {} bytes", buffer.len());
    println!("  blocks : {}", buffer.len() / BLOCK_SIZE);
    println!();
    println!(
        "  {:<16} {:>11} {:>8} {:>8} {:>12}",
        "section", "start block", "blocks", "bytes", "content len"
    );
    println!("  {}", "-".repeat(60));
    for (name, pos, len) in &sections {
        println!(
            "  {:<16} {:>11} {:>8} {:>8} {:>12}",
            name,
            pos.start_block,
            pos.block_count,
            pos.block_count * BLOCK_SIZE,
            len
        );
    }

    if blocks {
        for (name, pos, _) in &sections {
            let start = pos.start_block * BLOCK_SIZE;
            let end = start + pos.block_count * BLOCK_SIZE;
            let Some(bytes) = buffer.get(start..end) else {
                anyhow::bail!("section `{}` lies outside the buffer", name);
            };
            println!();
            println!("--- {} ---", name);
            hex_dump(bytes, pos.start_block);
        }
    }

    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            input,
            output,
            sidecar,
        } => run_encode(input, output, sidecar),
        Commands::Decode { input, sidecar } => run_decode(input, sidecar),
        Commands::Inspect {
            input,
            sidecar,
            blocks,
        } => run_inspect(input, sidecar, blocks),
    }
}
