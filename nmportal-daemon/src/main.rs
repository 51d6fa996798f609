#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nmportal_daemon::run().await
}
