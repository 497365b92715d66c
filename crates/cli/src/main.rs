//! The `solmove` CLI.

use clap::Parser;
use solmove_cli::opts::App;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let app = App::parse();
    match app.run() {
        Ok(had_errors) => std::process::exit(i32::from(had_errors)),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    }
}
