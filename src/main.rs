/*
 * Responsibility
 * - Start the tokio runtime
 * - Call app::run() (no logic here); a configuration error exits non-zero
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cms_api::app::run().await
}
