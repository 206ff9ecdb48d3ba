//! picam-streamer binary entry point.

use anyhow::Result;
use clap::Parser;
use picam_streamer::cli;
use picam_streamer::core::error::{render_chain, user_friendly_error};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let config = cli.build_config();
    config.init_logging();
    let non_blocking = cli.non_blocking();

    match cli.execute_with_config(config).await {
        Ok(()) => Ok(()),
        Err(e) if non_blocking => {
            error!("Command failed, ignored because of --non-blocking: {}", render_chain(&e));
            Ok(())
        }
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(1);
        }
    }
}
