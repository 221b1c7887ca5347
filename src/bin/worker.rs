#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = quizhall::run_worker().await {
        eprintln!("quizhall-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
