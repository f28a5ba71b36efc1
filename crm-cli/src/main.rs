//! `crm` command line client.
//!
//! Lists and deletes records and files duplicate groups in a CRM org. Configuration is read
//! from `configuration/` and `APP_` environment variables; logs go to stderr.

use clap::Parser;
use crm::api::ApiPaths;
use crm::transport::HttpTransport;
use crm_config::Profile;
use crm_config::shared::CrmConfig;
use crm_telemetry::tracing::init_tracing;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{Args, Command};
use crate::commands::Context;
use crate::config::load_crm_config;
use crate::error::{CliError, CliResult};
use crate::session::acquire_session;

mod args;
mod commands;
mod config;
mod error;
mod grouping_file;
mod output;
mod session;

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> CliResult<()> {
    let _log_flusher =
        init_tracing(env!("CARGO_BIN_NAME"), args.log_dir.as_deref()).map_err(CliError::config)?;

    let profile = Profile::load().map_err(CliError::config)?;
    let config = load_crm_config(args.config_dir.as_deref(), profile)?;
    info!(%profile, "loaded configuration");

    // One command runs at a time, so a single threaded runtime is enough.
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args.command, config, profile))
}

async fn async_main(command: Command, config: CrmConfig, profile: Profile) -> CliResult<()> {
    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, canceling");
            interrupt.cancel();
        }
    });

    let session = acquire_session(&config, profile).await?;
    let transport = HttpTransport::new(session, config.connection.request_timeout())?;
    let paths = ApiPaths::new(
        config.connection.api_version.clone(),
        config.connection.bulk_api_version.clone(),
    );

    let ctx = Context {
        transport,
        paths,
        config,
        cancellation,
    };

    commands::run(command, &ctx).await
}
