use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    marketplace::cli::run().await
}
