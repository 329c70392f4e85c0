pub mod cli;
pub mod errors;
pub mod loader;
pub mod resource_locator;

use std::path::Path;

use errors::FrontendError;
use ldtk_config::AppConfig;
use tracing::info;

/// 启动 CLI 概览前端。
pub fn run_cli(path: Option<&Path>, config: &AppConfig) -> Result<(), FrontendError> {
    info!("启动 CLI 概览前端");
    cli::run(path, config)
}
