// Entry point for the `nodevin` binary.

use clap::Parser;

use nodevin::cli::Cli;
use nodevin::commands;
use nodevin_common::constants::return_code;

fn main() {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    let exit_code = runtime.block_on(async move { run(cli).await });

    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> i32 {
    if let Err(e) = commands::init_logging(&cli.command) {
        eprintln!("Error: {e:#}");
        return return_code::TERMINATED_ERROR;
    }
    tracing::debug!("nodevin {}", nodevin_sdk::NodevinPackage::VERSION);

    match commands::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("Command failed: {e:?}");
            eprintln!("Error: {e:#}");
            return_code::TERMINATED_ERROR
        }
    }
}
