use std::path::PathBuf;

use ldtk_io::LoadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrontendError {
    #[error("加载 LDtk 工程 {path:?} 失败: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },
    #[error("未指定工程路径，请传入 .ldtk 文件或设置 `LDTK_CLI_SAMPLE_PROJECT`")]
    NoProjectSource,
}
