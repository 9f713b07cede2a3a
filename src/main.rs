//! TalkTally CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use talktally::cli::{
    app::{load_merged_settings, run_devices, run_dictate, run_record, run_transcribe, EXIT_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use talktally::domain::config::Settings;
use talktally::infrastructure::XdgSettingsStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let presenter = Presenter::new();

    match cli.command {
        Commands::Devices => run_devices().await,
        Commands::Record {
            duration,
            format,
            output_dir,
            device,
        } => {
            let overrides = Settings {
                file_format: format,
                output_dir,
                device_name: device,
                ..Settings::empty()
            };
            let settings = load_merged_settings(overrides).await;
            run_record(settings, duration).await
        }
        Commands::Dictate => {
            let settings = load_merged_settings(Settings::empty()).await;
            run_dictate(settings).await
        }
        Commands::Transcribe {
            file,
            model,
            overwrite,
            list,
        } => {
            let settings = load_merged_settings(Settings::empty()).await;
            run_transcribe(settings, file, model, overwrite, list).await
        }
        Commands::Config { action } => {
            let store = XdgSettingsStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
    }
}
