#[tokio::main]
async fn main() -> anyhow::Result<()> {
    docgen_server::start().await
}
