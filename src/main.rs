use anyhow::Result;
use clap::Parser;
use doughnut::{CONFIG_DIRECTORY, LOG_FILE, app, cli::Cli, settings::SettingsStore};
use log::LevelFilter;
use std::fs::File;

// stdout carries IPC envelopes, so logs go to a file
fn init_logging(level: LevelFilter) {
    use simplelog::{Config, WriteLogger};

    let log_path = dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CONFIG_DIRECTORY)
        .join(LOG_FILE);

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    match File::create(&log_path) {
        Ok(file) => {
            if WriteLogger::init(level, Config::default(), file).is_ok() {
                log::info!("doughnut starting (log level: {level:?})");
            }
        }
        Err(e) => eprintln!("Cannot create log file {}: {e}", log_path.display()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let store = app::settings_store(cli.config.as_deref())?;
    let settings = store.load()?;

    init_logging(match cli.verbose {
        true => LevelFilter::Debug,
        false => settings.level_filter(),
    });

    app::run(cli.command, store, settings)
}
