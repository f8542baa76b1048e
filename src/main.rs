use clap::Parser;
use netsweep::cli::Cli;
use netsweep::{logging, output};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = cli.command.name();
    cli.run()
        .await
        .map_err(|e| anyhow::Error::new(e).context(format!("{} failed", command)))
}
