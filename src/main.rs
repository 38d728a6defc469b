#![forbid(unsafe_code)]

mod ui;

use clap::{Parser, Subcommand};
use gmad::gma;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gmad", version, about = "Pack, inspect and extract GMA addon archives")]
struct Cli {
    /// Log filter (e.g. "debug", "gmad=trace"). Falls back to RUST_LOG, then "info".
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive wizard for building an addon (terminal).
    Ui,

    /// Print the header of a .gma.
    Info {
        #[arg(long)]
        gma: PathBuf,
    },

    /// List entries in a .gma.
    List {
        #[arg(long)]
        gma: PathBuf,
        /// Print numbers, sizes, offsets and CRCs too.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },

    /// Extract a .gma to an output directory.
    Extract {
        #[arg(long)]
        gma: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Only extract entries that contain this substring (repeatable).
        #[arg(long)]
        filter: Vec<String>,
    },

    /// Build a .gma from an addon directory. Only files the game accepts are packed.
    Build {
        /// Addon directory (containing lua/, materials/, ...).
        #[arg(long)]
        input: PathBuf,
        /// Output .gma file.
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        author: String,
        #[arg(long, default_value_t = 0)]
        steam_id: u64,
        #[arg(long, default_value_t = 1)]
        addon_version: i32,
        /// Record CRC32 of each file.
        #[arg(long, default_value_t = false)]
        crc: bool,
    },

    /// Rewrite a .gma with entries removed and/or files added.
    Amend {
        #[arg(long)]
        gma: PathBuf,
        /// Output .gma file; defaults to replacing the input.
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory whose allowed files are added (replacing same-named entries).
        #[arg(long)]
        add: Option<PathBuf>,
        /// Remove entries that contain this substring (repeatable).
        #[arg(long)]
        remove: Vec<String>,
        /// Record CRC32 of added files.
        #[arg(long, default_value_t = false)]
        crc: bool,
    },

    /// Check payload bounds and recorded CRCs.
    Verify {
        #[arg(long)]
        gma: PathBuf,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cmd: Command) -> gma::GmaResult<()> {
    match cmd {
        Command::Ui => ui::run(),
        Command::Info { gma: path } => gma::info(&path),
        Command::List { gma: path, verbose } => gma::list(&path, verbose),
        Command::Extract {
            gma: path,
            output,
            filter,
        } => gma::extract(&path, &output, &filter).map(|n| println!("extracted {n} files")),
        Command::Build {
            input,
            output,
            name,
            description,
            author,
            steam_id,
            addon_version,
            crc,
        } => {
            let opts = gma::BuildOptions {
                name,
                description,
                author,
                steam_id,
                addon_version,
                timestamp: None,
                compute_crc: crc,
            };
            gma::build(&input, &output, &opts).map(|n| println!("packed {n} files"))
        }
        Command::Amend {
            gma: path,
            output,
            add,
            remove,
            crc,
        } => {
            let output = output.unwrap_or_else(|| path.clone());
            gma::amend(&path, &output, add.as_deref(), &remove, crc)
                .map(|n| println!("wrote {n} entries"))
        }
        Command::Verify { gma: path } => gma::verify(&path).map(|n| println!("ok: {n} entries")),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(e) = run(cli.cmd) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
