pub mod command;
pub mod render;

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum EngineError {
        #[error("level {0} not found")]
        LevelNotFound(String),
        #[error("layer {0} not found in current level")]
        LayerNotFound(String),
    }
}

pub mod scene {
    use std::collections::HashMap;

    use ldtk_core::glam::IVec2;
    use ldtk_core::project::{Layer, Level, Project};
    use tracing::debug;

    use crate::errors::EngineError;
    use crate::render::{self, RenderPlan};

    /// 持有已解析的工程以及浏览时的运行时状态：当前关卡与图层显隐覆盖。
    ///
    /// 工程本身保持只读，显隐覆盖按图层标识符记录，切换关卡时清空。
    #[derive(Debug)]
    pub struct Scene {
        project: Project,
        current: usize,
        layer_overrides: HashMap<String, bool>,
    }

    impl Scene {
        pub fn new(project: Project) -> Self {
            Self {
                project,
                current: 0,
                layer_overrides: HashMap::new(),
            }
        }

        #[inline]
        pub fn project(&self) -> &Project {
            &self.project
        }

        #[inline]
        pub fn level_count(&self) -> usize {
            self.project.levels.len()
        }

        #[inline]
        pub fn current_index(&self) -> usize {
            self.current
        }

        /// 工程不含关卡时返回 `None`。
        #[inline]
        pub fn current_level(&self) -> Option<&Level> {
            self.project.levels.get(self.current)
        }

        pub fn goto_level(&mut self, index: usize) -> Result<&Level, EngineError> {
            if index >= self.level_count() {
                return Err(EngineError::LevelNotFound(index.to_string()));
            }
            self.switch_to(index);
            self.current_level()
                .ok_or_else(|| EngineError::LevelNotFound(index.to_string()))
        }

        pub fn goto_level_by_identifier(&mut self, identifier: &str) -> Result<&Level, EngineError> {
            let index = self
                .project
                .levels
                .iter()
                .position(|level| level.identifier == identifier)
                .ok_or_else(|| EngineError::LevelNotFound(identifier.to_string()))?;
            self.goto_level(index)
        }

        /// 切换到下一关卡，末尾回绕到第一个。
        pub fn next_level(&mut self) -> Result<&Level, EngineError> {
            let count = self.level_count();
            if count == 0 {
                return Err(EngineError::LevelNotFound("next".to_string()));
            }
            self.goto_level((self.current + 1) % count)
        }

        pub fn previous_level(&mut self) -> Result<&Level, EngineError> {
            let count = self.level_count();
            if count == 0 {
                return Err(EngineError::LevelNotFound("previous".to_string()));
            }
            self.goto_level((self.current + count - 1) % count)
        }

        /// 切换到包含该世界坐标的关卡，返回其下标。
        pub fn select_level_at(&mut self, point: IVec2) -> Option<usize> {
            let index = self
                .project
                .levels
                .iter()
                .position(|level| level.contains_point(point))?;
            self.switch_to(index);
            Some(index)
        }

        fn switch_to(&mut self, index: usize) {
            if index != self.current {
                self.layer_overrides.clear();
            }
            self.current = index;
            if let Some(level) = self.current_level() {
                debug!(level = %level.identifier, index, "切换关卡");
            }
        }

        fn current_layer(&self, identifier: &str) -> Result<&Layer, EngineError> {
            self.current_level()
                .and_then(|level| level.layer_by_identifier(identifier))
                .ok_or_else(|| EngineError::LayerNotFound(identifier.to_string()))
        }

        /// 覆盖优先，否则沿用文件中的 `visible`。
        pub fn is_layer_visible(&self, layer: &Layer) -> bool {
            self.layer_overrides
                .get(&layer.identifier)
                .copied()
                .unwrap_or(layer.visible)
        }

        pub fn set_layer_visible(&mut self, identifier: &str, visible: bool) -> Result<(), EngineError> {
            self.current_layer(identifier)?;
            self.layer_overrides.insert(identifier.to_string(), visible);
            Ok(())
        }

        /// 返回切换后的可见性。
        pub fn toggle_layer(&mut self, identifier: &str) -> Result<bool, EngineError> {
            let visible = !self.is_layer_visible(self.current_layer(identifier)?);
            self.layer_overrides.insert(identifier.to_string(), visible);
            Ok(visible)
        }

        #[inline]
        pub fn reset_layer_visibility(&mut self) {
            self.layer_overrides.clear();
        }

        /// 当前关卡的绘制清单，隐藏图层不出现在结果中。
        pub fn render_plan(&self) -> Option<RenderPlan> {
            let level = self.current_level()?;
            Some(render::build_plan(&self.project, level, |layer| {
                self.is_layer_visible(layer)
            }))
        }
    }

}
