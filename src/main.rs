use clap::Parser;
use nbpilot::Cli;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    nbpilot::run(cli).await
}
