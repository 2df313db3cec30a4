use std::env;
use std::process::ExitCode;

use svdconfig::Config;
use svddisplay::DisplayError;
use svddisplay::logs::{LoggingOptions, init_logging};
use tracing::{error, info};

fn main() -> ExitCode {
    let config = match Config::load_config("") {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Cannot load configuration: {:#}", err);
            return ExitCode::from(1);
        }
    };

    if let Err(err) = init_logging(LoggingOptions::from_config(&config)) {
        eprintln!("{:#}", err);
    }

    info!("Starting SonosDisplay");
    if let Some(path) = config.path() {
        info!("Configuration file {}", path.display());
    }

    // the only argument is the room name of the player to show
    let device_name = env::args()
        .nth(1)
        .unwrap_or_else(|| config.get_default_device());

    match svddisplay::run(&config, &device_name) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Error: {:#}", err);
            let code = err
                .downcast_ref::<DisplayError>()
                .map(DisplayError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}
