//! 与 LDtk JSON 字段一一对应的原始结构，仅做结构化解码。
//!
//! 瓦片集的 customData / enumTags、关卡背景位置以及 IntGrid 值名称
//! 不在这里解码，由 `resolve` 模块直接查询原始 JSON 树。

use ldtk_core::project::{LayerType, WorldLayout};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawProject {
    #[serde(default)]
    pub world_layout: Option<WorldLayout>,
    #[serde(default)]
    pub world_grid_width: i32,
    #[serde(default)]
    pub world_grid_height: i32,
    #[serde(default)]
    pub default_level_bg_color: Option<String>,
    #[serde(default)]
    pub json_version: String,
    #[serde(default)]
    pub levels: Vec<RawLevel>,
    #[serde(default)]
    pub defs: RawDefinitions,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawDefinitions {
    #[serde(default)]
    pub tilesets: Vec<RawTilesetDef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTilesetDef {
    pub uid: i64,
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub rel_path: Option<String>,
    pub tile_grid_size: i32,
    #[serde(rename = "pxWid")]
    pub px_wid: i32,
    #[serde(rename = "pxHei")]
    pub px_hei: i32,
    #[serde(default)]
    pub spacing: i32,
    #[serde(default)]
    pub padding: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLevel {
    pub identifier: String,
    #[serde(default)]
    pub uid: i64,
    #[serde(default)]
    pub world_x: i32,
    #[serde(default)]
    pub world_y: i32,
    #[serde(rename = "pxWid")]
    pub px_wid: i32,
    #[serde(rename = "pxHei")]
    pub px_hei: i32,
    #[serde(rename = "__bgColor", default)]
    pub bg_color: Option<String>,
    #[serde(default)]
    pub bg_rel_path: Option<String>,
    /// 外部关卡文件（`externalRelPath`）的图层为 null。
    #[serde(default)]
    pub layer_instances: Option<Vec<RawLayer>>,
    #[serde(default)]
    pub field_instances: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawLayer {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type")]
    pub layer_type: LayerType,
    #[serde(rename = "__cWid")]
    pub c_wid: i32,
    #[serde(rename = "__cHei")]
    pub c_hei: i32,
    #[serde(rename = "__gridSize")]
    pub grid_size: i32,
    #[serde(rename = "__opacity", default = "RawLayer::default_opacity")]
    pub opacity: f32,
    #[serde(rename = "__pxTotalOffsetX", default)]
    pub px_total_offset_x: i32,
    #[serde(rename = "__pxTotalOffsetY", default)]
    pub px_total_offset_y: i32,
    #[serde(rename = "__tilesetDefUid", default)]
    pub tileset_def_uid: Option<i64>,
    #[serde(rename = "__tilesetRelPath", default)]
    pub tileset_rel_path: Option<String>,
    #[serde(default)]
    pub layer_def_uid: i64,
    #[serde(default)]
    pub int_grid_csv: Vec<i32>,
    /// 旧版格式：稀疏的 `{coordId, v}` 列表。
    #[serde(default)]
    pub int_grid: Vec<RawIntGridValue>,
    #[serde(default)]
    pub auto_layer_tiles: Vec<RawTile>,
    #[serde(default)]
    pub grid_tiles: Vec<RawTile>,
    #[serde(default)]
    pub entity_instances: Vec<RawEntity>,
    #[serde(default = "RawLayer::default_visible")]
    pub visible: bool,
}

impl RawLayer {
    fn default_opacity() -> f32 {
        1.0
    }

    fn default_visible() -> bool {
        true
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawIntGridValue {
    pub coord_id: usize,
    pub v: i32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTile {
    pub px: [i32; 2],
    #[serde(default)]
    pub src: Option<[i32; 2]>,
    #[serde(default)]
    pub f: u8,
    pub t: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawEntity {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    pub px: [i32; 2],
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(rename = "__pivot", default)]
    pub pivot: [f32; 2],
    #[serde(rename = "__tags", default)]
    pub tags: Vec<String>,
    #[serde(rename = "__tile", default)]
    pub tile: Option<RawTileRect>,
    #[serde(default)]
    pub field_instances: Vec<RawField>,
}

/// 实体图标：新格式为 `x/y/w/h`，旧格式为 `srcRect` 或 `tileId`。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawTileRect {
    pub tileset_uid: i64,
    #[serde(default)]
    pub x: Option<i32>,
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub w: Option<i32>,
    #[serde(default)]
    pub h: Option<i32>,
    #[serde(default)]
    pub src_rect: Option<[i32; 4]>,
    #[serde(default)]
    pub tile_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawField {
    #[serde(rename = "__identifier")]
    pub identifier: String,
    #[serde(rename = "__type", default)]
    pub field_type: String,
    #[serde(rename = "__value", default)]
    pub value: Value,
}
