use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use ldtk_config::AppConfig;
use ldtk_core::project::Project;
use tracing::{debug, trace};

const ASSET_ROOTS_ENV: &str = "LDTK_ASSET_ROOTS";

/// 在工程目录、配置目录与环境变量目录中依次查找图片资源。
pub struct AssetLocator {
    search_roots: Vec<PathBuf>,
}

impl AssetLocator {
    pub fn from_config(base_dir: Option<&Path>, config: &AppConfig) -> Self {
        let mut roots: Vec<PathBuf> = Vec::new();

        if let Some(dir) = base_dir {
            roots.push(dir.to_path_buf());
        }

        roots.extend(
            config
                .resources
                .asset_roots
                .iter()
                .cloned()
                .filter(|path| path.is_dir()),
        );

        if let Some(env_paths) = env::var_os(ASSET_ROOTS_ENV) {
            roots.extend(env::split_paths(&env_paths).filter(|path| path.is_dir()));
        }

        Self::with_roots(roots)
    }

    /// 去重后保持靠前优先级。
    pub fn with_roots(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut search_roots: Vec<PathBuf> = Vec::new();
        for root in roots {
            if !search_roots.contains(&root) {
                search_roots.push(root);
            }
        }
        Self { search_roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.search_roots
    }

    pub fn resolve(&self, rel_path: &str) -> Option<PathBuf> {
        let raw_path = Path::new(rel_path);
        if raw_path.is_absolute() {
            if raw_path.exists() {
                return Some(Self::canonicalize_or_clone(raw_path));
            }
            debug!(path = %raw_path.display(), "资源路径为绝对路径但未找到对应文件");
            return None;
        }

        self.search_roots
            .iter()
            .map(|root| root.join(raw_path))
            .inspect(|candidate| trace!(candidate = %candidate.display(), "asset locator candidate"))
            .find(|candidate| candidate.exists())
            .map(|candidate| Self::canonicalize_or_clone(&candidate))
    }

    fn canonicalize_or_clone(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    }
}

/// 工程引用的图片路径到本地文件的映射，未找到的条目为 `None`。
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AssetIndex {
    entries: BTreeMap<String, Option<PathBuf>>,
}

impl AssetIndex {
    pub fn get(&self, rel_path: &str) -> Option<&Path> {
        self.entries.get(rel_path).and_then(|path| path.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Path>)> + '_ {
        self.entries
            .iter()
            .map(|(rel, path)| (rel.as_str(), path.as_deref()))
    }

    pub fn missing(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(|(_, path)| path.is_none())
            .map(|(rel, _)| rel.as_str())
    }
}

/// 收集瓦片集、图层与关卡背景引用的全部图片并逐一定位。
pub fn resolve_project_assets(project: &Project, locator: &AssetLocator) -> AssetIndex {
    let tileset_paths = project.tilesets.iter().map(|tileset| tileset.rel_path.as_str());
    let layer_paths = project
        .levels
        .iter()
        .flat_map(|level| level.layers.iter())
        .filter_map(|layer| layer.tileset_rel_path.as_deref());
    let background_paths = project
        .levels
        .iter()
        .filter_map(|level| level.bg_image.as_ref())
        .map(|image| image.rel_path.as_str());

    let entries = tileset_paths
        .chain(layer_paths)
        .chain(background_paths)
        .filter(|rel| !rel.is_empty())
        .map(|rel| (rel.to_string(), locator.resolve(rel)))
        .collect();

    AssetIndex { entries }
}
