use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use update_watch::cli::{AppContext, Cli, CliError, Command};
use update_watch::config::{self, WatchConfig};
use update_watch::logging;

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.unwrap_or_else(config::config_path);
    let config = WatchConfig::load(&config_path)?;

    // decrypting needs neither the store nor the log file
    if let Command::Decrypt { value } = &cli.command {
        let mut stdout = std::io::stdout();
        update_watch::cli::decrypt::run(&config, value.as_deref(), &mut stdout)?;
        return Ok(());
    }

    let _guard = logging::init(&config::log_path(), cli.json_log)?;
    let app = AppContext::open(config, &config::db_path())?;

    let mut stdout = std::io::stdout();
    update_watch::cli::run(cli.command, &app, &mut stdout)
        .await
        .inspect_err(|e| error!("{}", e))?;

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::from)
        .and_then(|runtime| runtime.block_on(execute(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code as u8)
        }
    }
}
