use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use xlscompact::{CompactOptions, DEFAULT_SUFFIX};

#[derive(Parser, Debug)]
#[command(
    name = "xlscompact",
    version,
    about = "Drop blank rows from the first sheet of a legacy Excel workbook"
)]
struct Cli {
    /// Log level or filter directive (error,warn,info,debug,trace)
    #[arg(long, global = true, env = "XLSCOMPACT_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write {stem}_corrected{ext} without the blank rows and print its path
    Compact {
        /// Workbook to compact
        path: PathBuf,

        /// Text inserted between the file stem and its extension
        #[arg(long, default_value = DEFAULT_SUFFIX)]
        suffix: String,
    },
    /// Print the rows of the first sheet, tab separated
    Dump {
        /// Workbook to print
        path: PathBuf,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
    debug!("logging initialized");
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    // Failures are already logged by the library
    let outcome = match cli.command {
        Command::Compact { path, suffix } => {
            let options = CompactOptions::default().with_suffix(suffix);
            xlscompact::compact_with(&path, &options).map(|output| println!("{}", output.display()))
        },
        Command::Dump { path } => xlscompact::dump(&path, &mut io::stdout().lock()).map(|_| ()),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
