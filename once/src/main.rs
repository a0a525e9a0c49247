use anyhow::{Context, Result};
use once_core::config::OnceConfig;
use once_core::logging::init_logging;
use once_core::{session, ChildExit, Invocation};
use tracing::debug;

mod cli;

fn main() {
    let invocation = cli::parse().into_invocation();

    match run(&invocation) {
        Ok(exit) => std::process::exit(exit.exit_code()),
        Err(err) => {
            if let Some(core) = err.downcast_ref::<once_core::Error>() {
                debug!(category = core.category().as_str(), "aborting");
            }
            eprintln!("once: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run(invocation: &Invocation) -> Result<ChildExit> {
    let config = OnceConfig::load().context("resolve state directory")?;
    init_logging(&config.log_filter, config.log_format);
    debug!(state_dir = %config.state_dir.display(), command = %invocation.command, "starting");

    let exit = session::run(&config, invocation)?;
    if !exit.success() {
        debug!(?exit, "command did not exit cleanly");
    }
    Ok(exit)
}
