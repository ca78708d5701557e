use anyhow::Context;
use clap::Parser;
use restate_gen::{Cli, Orchestrator, Settings, logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let root = cli.resolve_root(&cwd).with_context(|| {
        let requested = cli.root.as_deref().unwrap_or(&cwd);
        format!("Project root not found: {}", requested.display())
    })?;

    let settings = Settings::load(&root).map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    logging::init_with_config(&settings.logging);

    let orchestrator =
        Orchestrator::new(&root, settings).context("Failed to set up the extractor")?;

    // Returns only if the watcher cannot start
    orchestrator.run().await.context("Failed to start watcher")?;
    Ok(())
}
