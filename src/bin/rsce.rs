use clap::Parser;
use rsce::config::{Config, UnpackMode, DEFAULT_IMAGE_PATH, DEFAULT_UNPACK_DIR};
use sloggers::terminal::{Destination, TerminalLoggerBuilder};
use sloggers::types::{Format, Severity};
use sloggers::Build;
use std::error::Error;
use std::path::PathBuf;

/// Pack files into a resource partition image, or unpack one
#[derive(Parser, Debug)]
#[command(name = "rsce", version)]
struct Cli {
    /// Pack the given files into the image (the default)
    #[arg(long, conflicts_with = "unpack")]
    pack: bool,

    /// Unpack the image into the given directory
    #[arg(long)]
    unpack: bool,

    /// Image to write or read
    #[arg(long, value_name = "PATH", default_value = DEFAULT_IMAGE_PATH)]
    image: PathBuf,

    /// With --unpack, report the header and index table without writing any file
    #[arg(long)]
    print: bool,

    /// Log every block written or read
    #[arg(long)]
    verbose: bool,

    /// Prefix stripped from the path stored for each packed file
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,

    /// Files to pack, or the directory to unpack into
    #[arg(value_name = "FILES")]
    paths: Vec<PathBuf>,
}

fn main() {
    std::process::exit(real_main());
}

fn real_main() -> i32 {
    let cli = Cli::parse();

    let mut builder = TerminalLoggerBuilder::new();
    builder.level(if cli.verbose {
        Severity::Debug
    } else {
        Severity::Info
    });
    builder.destination(Destination::Stderr);
    builder.format(Format::Full);
    let logger = match builder.build() {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("Failed to set up logging: {}", e);
            return 1;
        }
    };

    let config = Config {
        image_path: cli.image,
        root_path: cli.root,
        mode: if cli.print {
            UnpackMode::PrintOnly
        } else {
            UnpackMode::Extract
        },
        logger: Some(logger.clone()),
    };

    let result = if cli.unpack {
        let output_dir = match cli.paths.as_slice() {
            [] => PathBuf::from(DEFAULT_UNPACK_DIR),
            [dir] => dir.clone(),
            _ => {
                slog::crit!(logger, "--unpack takes at most one output directory");
                return 1;
            }
        };
        rsce::unpack(&config, output_dir)
            .map(|_| ())
            .map_err(|e| Box::new(e) as Box<dyn Error>)
    } else {
        if cli.print {
            slog::warn!(logger, "--print only applies to --unpack, ignoring it");
        }
        rsce::pack(&config, &cli.paths)
            .map(|_| ())
            .map_err(|e| Box::new(e) as Box<dyn Error>)
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            slog::crit!(logger, "{}", e);
            1
        }
    }
}
