// logweave - main.rs
// Command line front end over the logging façade

use clap::Parser;
use logweave::cli::{run, Cli};

fn main() -> anyhow::Result<()> {
    // the crate's own diagnostics (e.g. prune failures) go to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    run(Cli::parse())
}
