use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::app::App;

mod cli;

fn main() -> anyhow::Result<()> {
    let app = App::parse();
    init_tracing(app.verbose);
    app.run()
}

/// `-v` and `-vv` win over `RUST_LOG`; otherwise `RUST_LOG`, then `info`.
fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
