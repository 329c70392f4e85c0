use std::io::Read;
use std::path::{Path, PathBuf};

use ldtk_core::project::Project;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

mod resolve;
mod schema;
pub mod source;

use resolve::Resolver;
use schema::RawProject;
use source::{AssetSource, FsSource};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed LDtk document: {0}")]
    MalformedDocument(String),
    #[error("unresolved reference: {0}")]
    UnresolvedReference(String),
}

/// 加载选项。
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// 启用后，找不到瓦片集 UID 时返回 `UnresolvedReference`，否则仅保留空引用。
    pub strict_references: bool,
}

pub trait ProjectLoader {
    fn load(&self, path: &Path) -> Result<Project, LoadError>;
}

/// 基于 `AssetSource` 的 LDtk 加载入口，默认直接读取本地文件系统。
pub struct LdtkFacade<S = FsSource> {
    source: S,
    options: LoadOptions,
}

impl LdtkFacade {
    pub fn new() -> Self {
        Self::with_source(FsSource::default())
    }
}

impl Default for LdtkFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AssetSource> LdtkFacade<S> {
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    #[inline]
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: AssetSource> ProjectLoader for LdtkFacade<S> {
    fn load(&self, path: &Path) -> Result<Project, LoadError> {
        load_from_source_with(&self.source, path, &self.options)
    }
}

/// 从内存字节解析工程。
pub fn load_bytes(data: &[u8]) -> Result<Project, LoadError> {
    load_bytes_with(data, &LoadOptions::default())
}

pub fn load_bytes_with(data: &[u8], options: &LoadOptions) -> Result<Project, LoadError> {
    let raw: Value = serde_json::from_slice(data)
        .map_err(|err| LoadError::MalformedDocument(err.to_string()))?;
    let document = RawProject::deserialize(&raw)
        .map_err(|err| LoadError::MalformedDocument(err.to_string()))?;
    Resolver::new(&raw, options).resolve(document)
}

/// 从任意字节流读取并解析，流读完后才开始解码。
pub fn load_reader<R: Read>(mut reader: R) -> Result<Project, LoadError> {
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|source| LoadError::Io {
            path: PathBuf::new(),
            source,
        })?;
    load_bytes(&data)
}

pub fn load_from_source(source: &dyn AssetSource, path: &Path) -> Result<Project, LoadError> {
    load_from_source_with(source, path, &LoadOptions::default())
}

pub fn load_from_source_with(
    source: &(impl AssetSource + ?Sized),
    path: &Path,
    options: &LoadOptions,
) -> Result<Project, LoadError> {
    let data = source.read_bytes(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), bytes = data.len(), "读取 LDtk 工程");
    load_bytes_with(&data, options)
}
