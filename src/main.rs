use bvpack::convert::{convert, unpack, ConvertOptions};
use bvpack::gradient::GradientKernel;
use bvpack::manifest::Transform;
use bvpack::volume::Dimensions;
use bvpack::zip::ZipArchive;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "raw2bvp", about = "Convert raw 8-bit volumes into bricked BVP archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a raw volume (stdin by default) into an archive (stdout by default)
    #[command(disable_help_flag = true)]
    Convert {
        #[arg(short, long)]
        width: u32,
        #[arg(short, long)]
        height: u32,
        #[arg(short, long)]
        depth: u32,
        /// Nominal block edge length in voxels
        #[arg(short, long, default_value = "128")]
        block_size: u32,
        /// Attach a gradient channel (4 components per voxel)
        #[arg(short, long)]
        gradient: bool,
        /// Gradient kernel
        #[arg(long, value_enum, default_value = "sobel")]
        kernel: GradientKernel,
        #[arg(long, default_value = "default")]
        modality_name: String,
        #[arg(long, default_value = "Volume")]
        volume_name: String,
        #[arg(long, default_value = "Volume generated with raw2bvp")]
        volume_comment: String,
        /// Row-major 4x4 voxel-to-world matrix (16 values)
        #[arg(long, num_args = 16, allow_negative_numbers = true)]
        transform: Option<Vec<f32>>,
        /// Emit an explicit `blocks/` directory entry
        #[arg(long)]
        directory_entry: bool,
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, action = ArgAction::Help)]
        help: Option<bool>,
    },
    /// List archive entries
    List {
        input: PathBuf,
    },
    /// Check CRCs and manifest, and reassemble the volume
    Verify {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {

        // ── Convert ──────────────────────────────────────────────────────────
        Commands::Convert {
            width, height, depth, block_size, gradient, kernel,
            modality_name, volume_name, volume_comment, transform,
            directory_entry, input, output, help: _,
        } => {
            let transform = match transform {
                Some(values) => {
                    let mut matrix = [0.0f32; 16];
                    matrix.copy_from_slice(&values);
                    Transform { matrix }
                }
                None => Transform::IDENTITY,
            };
            let opts = ConvertOptions {
                dimensions: Dimensions::new(width, height, depth),
                block_size,
                gradient,
                kernel,
                modality_name,
                volume_name,
                volume_comment,
                transform,
                directory_entry,
            };

            let reader: Box<dyn Read> = match &input {
                Some(path) => Box::new(BufReader::new(std::fs::File::open(path)?)),
                None       => Box::new(io::stdin().lock()),
            };
            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(std::fs::File::create(path)?)),
                None       => Box::new(BufWriter::new(io::stdout().lock())),
            };
            let report = convert(reader, writer, &opts)?;
            log::info!(
                "converted {} volume into {} block(s)",
                report.dimensions, report.block_count
            );
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let bytes = std::fs::read(&input)?;
            let ar = ZipArchive::parse(&bytes)?;
            println!("Archive: {}", input.display());
            println!("{:<32} {:>12} {:>10} {:>10}", "Name", "Size", "Offset", "CRC32");
            for entry in ar.entries() {
                println!("{:<32} {:>12} {:>10} {:08x}",
                    entry.name, entry.data.len(), entry.offset, entry.crc);
            }
            println!("{} entries, central directory {} B at {}",
                ar.len(), ar.eocd.cd_size, ar.eocd.cd_offset);
        }

        // ── Verify ───────────────────────────────────────────────────────────
        Commands::Verify { input } => {
            let bytes = std::fs::read(&input)?;
            let (manifest, volume) = unpack(&bytes)?;
            println!("── BVP Archive ──────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Name           {}", manifest.meta.name);
            println!("  Comment        {}", manifest.meta.comment);
            println!("  Version        {}", manifest.meta.version);
            println!("  Dimensions     {}", volume.dimensions());
            println!("  Components     {}", volume.components());
            println!("  Blocks         {}", manifest.blocks.len());
            println!("  Voxels         {}", volume.dimensions().voxel_count());
            println!("  OK");
        }
    }

    Ok(())
}
