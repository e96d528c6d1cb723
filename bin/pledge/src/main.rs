//! Pledge storage deal client binary.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    pledge_cli::run().await
}
