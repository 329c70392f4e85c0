use std::env;
use std::path::{Path, PathBuf};

use ldtk_config::{AppConfig, LoaderConfig};
use ldtk_engine::scene::Scene;
use ldtk_io::{LdtkFacade, LoadOptions, ProjectLoader};
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::resource_locator::{AssetIndex, AssetLocator, resolve_project_assets};

pub const SAMPLE_PROJECT_ENV: &str = "LDTK_CLI_SAMPLE_PROJECT";

/// 加载后的场景与资源定位结果。
#[derive(Debug)]
pub struct LoadedScene {
    pub scene: Scene,
    pub path: PathBuf,
    pub assets: AssetIndex,
}

pub fn load_options(config: &LoaderConfig) -> LoadOptions {
    LoadOptions {
        strict_references: config.strict_references,
    }
}

/// 显式路径优先，否则读取环境变量 `LDTK_CLI_SAMPLE_PROJECT`。
pub fn project_path(explicit: Option<&Path>) -> Result<PathBuf, FrontendError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    env::var_os(SAMPLE_PROJECT_ENV)
        .map(PathBuf::from)
        .ok_or(FrontendError::NoProjectSource)
}

pub fn load_scene(explicit: Option<&Path>, config: &AppConfig) -> Result<LoadedScene, FrontendError> {
    let path = project_path(explicit)?;
    let loader = LdtkFacade::new().with_options(load_options(&config.loader));
    let project = loader.load(&path).map_err(|source| FrontendError::Load {
        path: path.clone(),
        source,
    })?;
    info!(
        path = %path.display(),
        levels = project.levels.len(),
        tilesets = project.tilesets.len(),
        "从 LDtk 加载工程成功"
    );

    let locator = AssetLocator::from_config(path.parent(), config);
    let assets = resolve_project_assets(&project, &locator);
    for missing in assets.missing() {
        warn!(asset = missing, "未找到工程引用的图片资源");
    }

    let mut scene = Scene::new(project);
    if let Some(start) = config.frontend.start_level.as_deref() {
        if let Err(err) = scene.goto_level_by_identifier(start) {
            warn!(level = start, error = %err, "起始关卡不存在，使用第一个关卡");
        }
    }

    Ok(LoadedScene {
        scene,
        path,
        assets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PROJECT: &str = r#"{
        "defs": { "tilesets": [] },
        "levels": [
            { "identifier": "First", "pxWid": 16, "pxHei": 16, "layerInstances": [] },
            { "identifier": "Second", "worldX": 16, "pxWid": 16, "pxHei": 16, "layerInstances": [
                { "__identifier": "Deco", "__type": "Tiles", "__cWid": 1, "__cHei": 1, "__gridSize": 16,
                  "__tilesetDefUid": 5 }
            ] }
        ]
    }"#;

    #[test]
    fn explicit_path_wins_and_start_level_is_applied() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("world.ldtk");
        fs::write(&path, PROJECT).unwrap();

        let mut config = AppConfig::default();
        config.frontend.start_level = Some("Second".to_string());
        let loaded = load_scene(Some(&path), &config).expect("load scene");
        assert_eq!(loaded.path, path);
        assert_eq!(loaded.scene.current_level().unwrap().identifier, "Second");
        assert!(loaded.assets.is_empty());

        config.frontend.start_level = Some("Missing".to_string());
        let loaded = load_scene(Some(&path), &config).expect("load scene");
        assert_eq!(loaded.scene.current_index(), 0);
    }

    #[test]
    fn strict_loader_config_is_forwarded() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("world.ldtk");
        fs::write(&path, PROJECT).unwrap();

        let mut config = AppConfig::default();
        config.loader.strict_references = true;
        let err = load_scene(Some(&path), &config).unwrap_err();
        assert!(matches!(
            err,
            FrontendError::Load {
                source: ldtk_io::LoadError::UnresolvedReference(_),
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = load_scene(Some(Path::new("/no/such/world.ldtk")), &AppConfig::default())
            .unwrap_err();
        assert!(matches!(err, FrontendError::Load { .. }));
    }
}
