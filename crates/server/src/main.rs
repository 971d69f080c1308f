#[tokio::main]
async fn main() -> anyhow::Result<()> {
    adintel_server::start().await
}
