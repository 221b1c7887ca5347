#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizhall::run().await {
        eprintln!("quizhall fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
