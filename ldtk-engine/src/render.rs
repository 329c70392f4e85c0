//! 与图形后端无关的绘制清单。
//!
//! 所有坐标均为关卡内像素坐标；调用方自行叠加 `RenderPlan::origin`
//! 把关卡放到世界坐标中。

use ldtk_core::color::Rgba;
use ldtk_core::geometry::Rect;
use ldtk_core::glam::{DVec2, IVec2};
use ldtk_core::project::{Layer, Level, Project};
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
pub struct TileDraw {
    pub dest: IVec2,
    pub src: Rect,
    pub flip_x: bool,
    pub flip_y: bool,
}

/// 带图标的实体，`dest` 为按锚点换算后的包围盒。
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub entity: String,
    pub dest: Rect,
    pub src: Rect,
    pub tileset_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerDraw {
    pub identifier: String,
    pub tileset_path: Option<String>,
    pub opacity: f32,
    pub tiles: Vec<TileDraw>,
    pub sprites: Vec<SpriteDraw>,
}

impl LayerDraw {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty() && self.sprites.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackgroundDraw {
    pub rel_path: String,
    pub dest: IVec2,
    pub scale: DVec2,
    /// 源图裁剪区域 `[x, y, w, h]`。
    pub crop: [f64; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderPlan {
    pub level: String,
    pub origin: IVec2,
    pub size: IVec2,
    pub fill: Rgba,
    pub background: Option<BackgroundDraw>,
    /// 自底向上。
    pub layers: Vec<LayerDraw>,
}

impl RenderPlan {
    pub fn tile_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.tiles.len()).sum()
    }

    pub fn sprite_count(&self) -> usize {
        self.layers.iter().map(|layer| layer.sprites.len()).sum()
    }
}

pub fn build_plan(
    project: &Project,
    level: &Level,
    visible: impl Fn(&Layer) -> bool,
) -> RenderPlan {
    let layers = level
        .layers
        .iter()
        .filter(|layer| visible(*layer))
        .map(|layer| layer_draw(project, layer))
        .collect();

    let background = level.bg_image.as_ref().map(|image| BackgroundDraw {
        rel_path: image.rel_path.clone(),
        dest: image.top_left,
        scale: image.scale,
        crop: image.crop_rect,
    });

    RenderPlan {
        level: level.identifier.clone(),
        origin: level.world_position,
        size: IVec2::new(level.px_width, level.px_height),
        fill: level.bg_color,
        background,
        layers,
    }
}

fn layer_draw(project: &Project, layer: &Layer) -> LayerDraw {
    let tileset_path = project
        .tileset_for(layer)
        .map(|tileset| tileset.rel_path.clone())
        .or_else(|| layer.tileset_rel_path.clone());

    let tiles: Vec<TileDraw> = layer
        .all_tiles()
        .map(|tile| TileDraw {
            dest: layer.to_world_position(tile.px),
            src: tile.src,
            flip_x: tile.flip_x(),
            flip_y: tile.flip_y(),
        })
        .collect();

    let sprites: Vec<SpriteDraw> = layer
        .entities
        .iter()
        .filter_map(|entity| {
            let tile = entity.tile.as_ref()?;
            let bounds = entity.bounds();
            let top_left = layer.to_world_position(bounds.min());
            Some(SpriteDraw {
                entity: entity.identifier.clone(),
                dest: Rect::new(top_left.x, top_left.y, bounds.w, bounds.h),
                src: tile.rect,
                tileset_path: project
                    .tileset_for_rect(tile)
                    .map(|tileset| tileset.rel_path.clone()),
            })
        })
        .collect();

    trace!(
        layer = %layer.identifier,
        tiles = tiles.len(),
        sprites = sprites.len(),
        "图层绘制清单"
    );

    LayerDraw {
        identifier: layer.identifier.clone(),
        tileset_path,
        opacity: layer.opacity,
        tiles,
        sprites,
    }
}
