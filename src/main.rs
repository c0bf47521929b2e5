//! Roomy API gateway binary.

use clap::Parser;

use roomy_gateway::lifecycle::startup::{self, Cli};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    startup::run(Cli::parse()).await?;
    Ok(())
}
