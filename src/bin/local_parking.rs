use clap::Parser;
use rust_parking::parking::config::{CommandLineArgs, Config};
use rust_parking::parking::controller::LocalController;
use rust_parking::parking::logging::init_std_out_logging_thread_local;
use std::error::Error;
use std::sync::Arc;
use tracing::info;

fn main() -> Result<(), Box<dyn Error>> {
    let _guard = init_std_out_logging_thread_local();

    let args = CommandLineArgs::parse();
    info!("Started with args: {:?}", args);

    // Load and adapt config
    let config = Arc::new(Config::try_from(args)?);

    let controller = LocalController::from_config(config)?;
    let summary = controller.run()?;

    info!(
        admitted = summary.admitted.len(),
        rejected = summary.rejected.len(),
        remaining = summary.remaining.len(),
        "Run finished"
    );
    Ok(())
}
