//! Embeds every image in the configured storage folder into the model's table.

use image_similarity::infrastructure::{logging, AppConfig, Services};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("seed_embeddings=info,image_similarity=info");

    let services = Services::from_config(AppConfig::load()?)?;
    info!(
        table = %services.embedder.model_tag().table_name(),
        folder = %services.config.pipelines.seed.folder,
        "seeding embeddings"
    );

    let report = services.seed_pipeline().run().await?;
    info!(
        succeeded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        "seeding complete"
    );
    if report.aborted {
        anyhow::bail!("seeding stopped after {} errors", report.failed);
    }
    Ok(())
}
