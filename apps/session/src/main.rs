#[tokio::main]
async fn main() -> anyhow::Result<()> {
    leitner_session::run().await
}
