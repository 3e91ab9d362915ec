//! Ranks every labelled test case against the corpus and records the matches.

use image_similarity::infrastructure::{logging, AppConfig, Services};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("eval_test_cases=info,image_similarity=info");

    let services = Services::from_config(AppConfig::load()?)?;
    let report = services.evaluate_pipeline().run().await?;
    info!(
        model = %services.embedder.model_tag(),
        succeeded = report.succeeded,
        failed = report.failed,
        "evaluation complete"
    );
    if report.aborted {
        anyhow::bail!("evaluation stopped after {} errors", report.failed);
    }
    Ok(())
}
