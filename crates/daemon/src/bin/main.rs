//! Modelplex gateway binary.

use clap::Parser;
use modelplex_daemon::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    App::parse().run().await
}
