use logpipe::{app, logging};
use logpipe_core::config::{self, WrapperPaths};
use logpipe_core::error::CliError;

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("logpipe: {e}");
            e.exit_code()
        }
    };

    // A blocking read on our stdin may still be parked in the runtime's
    // blocking pool; exiting here keeps it from holding the process open.
    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let paths = WrapperPaths::current().map_err(|e| CliError::Config(e.to_string()))?;
    let cfg = config::load_settings(&paths).map_err(|e| CliError::Config(e.to_string()))?;
    logging::init_tracing(&cfg.logging, &paths).map_err(CliError::Config)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        command_file = %paths.command.display(),
        transcript = %paths.transcript.display(),
        "logpipe starting"
    );

    let args = std::env::args_os().skip(1).collect();
    app::run_app(&paths, &cfg, args).await
}
