use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    extern crate filterview;

    filterview::init_logger();
    filterview::config::init()?;

    filterview::cli::run(filterview::cli::Cli::parse()).await
}
