//! Resizes the configured local image directory and uploads it into the
//! storage bucket.

use image_similarity::infrastructure::{logging, AppConfig, Services};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("upload_images=info,image_similarity=info");

    let services = Services::from_config(AppConfig::load()?)?;
    info!(
        dir = %services.config.pipelines.upload.images_dir.display(),
        folder = %services.config.pipelines.upload.folder,
        "uploading images"
    );

    let report = services.upload_pipeline().run().await?;
    info!(
        uploaded = report.succeeded,
        skipped = report.skipped,
        failed = report.failed,
        "upload complete"
    );
    if report.aborted {
        anyhow::bail!("upload stopped after {} errors", report.failed);
    }
    Ok(())
}
