mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{
    error,
    info,
};
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;
use errors::CliError;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_cli_overrides(&args)?;
    info!("Parsed configuration: {:#?}", config);

    let (Some(input), Some(output)) = (&config.input, &config.output) else {
        return Err(CliError::Config(
            "Input and output need to be configured".to_string(),
        ));
    };
    std::fs::create_dir_all(&output.directory).map_err(|e| CliError::io(e, &output.directory))?;

    if let Err(e) = processing::run(input, &config.analysis, output) {
        error!("Error running the alignment: {}", e);
        return Err(e);
    }
    Ok(())
}
