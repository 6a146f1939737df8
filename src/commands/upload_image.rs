//! Push a local image to decentralized storage

use crate::errors::{HeroError, HeroResult};
use crate::retry::RetryPolicy;
use crate::structured_logging::OperationLogger;
use crate::upload::{upload_with_retry, UploadContent, Uploader};
use chrono::Utc;
use std::path::Path;

/// Upload the file at `path` and return its public link
pub async fn upload_image(
    uploader: &dyn Uploader,
    path: &Path,
    policy: &RetryPolicy,
    logger: &OperationLogger,
) -> HeroResult<String> {
    if !path.is_file() {
        return Err(HeroError::validation(format!(
            "image file {} does not exist",
            path.display()
        )));
    }
    let bytes = tokio::fs::read(path).await?;
    let content = UploadContent::image(path, bytes)?;

    let started = Utc::now();
    logger.info(&format!(
        "Uploading {} ({} bytes) to {} at {}",
        path.display(),
        content.bytes.len(),
        uploader.name(),
        started.to_rfc3339()
    ));
    let link = upload_with_retry(uploader, &content, policy, logger).await?;
    let finished = Utc::now();
    logger.info(&format!(
        "Upload finished at {} after {} ms",
        finished.to_rfc3339(),
        (finished - started).num_milliseconds()
    ));
    Ok(link)
}
