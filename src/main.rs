// src/main.rs

use spoolq::logging::LogConfig;
use spoolq::{cli, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("spoolq error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    LogConfig::from_env().init()?;
    run(args).await
}
