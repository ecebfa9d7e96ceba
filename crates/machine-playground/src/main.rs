use anyhow::Result;
use machine_config::AppConfig;
use std::io;

mod actions;
mod logger;
mod reducers;
mod scenario;
mod state;

fn main() -> Result<()> {
    let log_file = logger::init()?;

    log::info!("Starting machine-playground");

    let config = AppConfig::load();
    log::debug!("Config: {:?}", config);

    let stdout = io::stdout();
    let report = scenario::run(&config, &mut stdout.lock())?;

    println!("final state: {}", report.final_state);
    println!(
        "{} commits observed, log written to {}",
        report.commits,
        log_file.display()
    );

    log::info!("Exiting machine-playground");
    Ok(())
}
