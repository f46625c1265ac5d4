use std::process;

use clap::Parser;
use console::style;
use log::{debug, error, info};

use prepase::{isolate_ephemeral, run_config_command, App, Cli, Commands, Config, Result, Services};

pub fn initialize_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    debug!("Logger initialized");
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;
    if let Some(dir) = cli.data_dir {
        config.set_data_dir(dir);
    }
    if let Some(url) = cli.backend_url {
        config.backend_url = url;
    }

    let command = match cli.command {
        Commands::Config(command) => return run_config_command(&config, &config_path, command),
        other => other,
    };

    let (services, _scratch) = if cli.ephemeral {
        info!("Using in-memory stores, nothing will be persisted");
        let scratch = isolate_ephemeral(&mut config)?;
        (Services::ephemeral(&config)?, Some(scratch))
    } else {
        (Services::from_config(&config)?, None)
    };

    let app = App::new(services, config, config_path, cli.verbose);
    app.run(command).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("{} {}", style("Error:").red().bold(), e);
        process::exit(1);
    }
}
