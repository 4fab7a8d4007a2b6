use catalog_cli::Cli;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    engine_logging::initialize(cli.log_destination(), cli.log_level());

    let summary = catalog_cli::run(&cli).await?;
    print!("{}", summary.render());
    Ok(())
}
