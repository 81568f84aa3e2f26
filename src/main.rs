// lifelog - main.rs
// Entry point: parse the command line, install the tracing subscriber, dispatch

use clap::Parser;
use std::process::exit;
use tracing::{error, Level};

use lifelog::cli::{dispatch, Cli};

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = dispatch(cli).await {
        error!("{e:#}");
        exit(1);
    }
}
