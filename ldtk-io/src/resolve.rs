use std::collections::{BTreeMap, BTreeSet};

use ldtk_core::{
    color::Rgba,
    field::{FieldValue, Property},
    geometry::{self, Rect},
    project::{
        BgImage, EntityInstance, IntGridCell, Layer, LayerType, Level, Project, TileRect, Tile,
        Tileset, TilesetIndex,
    },
};
use ldtk_core::glam::{DVec2, IVec2, Vec2};
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::{RawEntity, RawField, RawLayer, RawLevel, RawProject, RawTile, RawTileRect};
use crate::{LoadError, LoadOptions};

/// 第二遍：在结构化解码结果上补全派生字段。
///
/// 持有原始 JSON 树，仅用于按下标回查瓦片集元数据、背景位置与 IntGrid 定义。
pub(crate) struct Resolver<'a> {
    raw: &'a Value,
    options: &'a LoadOptions,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(raw: &'a Value, options: &'a LoadOptions) -> Self {
        Self { raw, options }
    }

    pub(crate) fn resolve(&self, document: RawProject) -> Result<Project, LoadError> {
        let bg_color = parse_color_or_default(document.default_level_bg_color.as_deref(), "project")
            .unwrap_or_default();

        let tilesets: Vec<Tileset> = document
            .defs
            .tilesets
            .into_iter()
            .enumerate()
            .map(|(index, def)| {
                let mut tileset = Tileset {
                    uid: def.uid,
                    identifier: def.identifier,
                    rel_path: def.rel_path.unwrap_or_default(),
                    grid_size: def.tile_grid_size,
                    px_width: def.px_wid,
                    px_height: def.px_hei,
                    spacing: def.spacing,
                    padding: def.padding,
                    custom_data: BTreeMap::new(),
                    enum_tags: BTreeMap::new(),
                };
                self.attach_tileset_metadata(index, &mut tileset);
                tileset
            })
            .collect();

        let int_grid_names = self.int_grid_names();

        let levels = document
            .levels
            .into_iter()
            .enumerate()
            .map(|(index, level)| self.resolve_level(index, level, bg_color, &tilesets))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            levels = levels.len(),
            tilesets = tilesets.len(),
            int_grid_names = int_grid_names.len(),
            "LDtk 工程解析完成"
        );

        Ok(Project {
            world_layout: document.world_layout,
            world_grid_width: document.world_grid_width,
            world_grid_height: document.world_grid_height,
            bg_color,
            json_version: document.json_version,
            levels,
            tilesets,
            int_grid_names,
        })
    }

    /// 从 `defs.tilesets[i]` 读取按瓦片 ID 索引的 customData 与 enumTags。
    fn attach_tileset_metadata(&self, index: usize, tileset: &mut Tileset) {
        let Some(def) = self.raw.pointer(&format!("/defs/tilesets/{index}")) else {
            return;
        };

        for entry in array_at(def, "customData") {
            let Some(tile_id) = entry.get("tileId").and_then(Value::as_i64) else {
                continue;
            };
            let data = entry
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default();
            tileset.custom_data.insert(tile_id as i32, data.to_string());
        }

        for entry in array_at(def, "enumTags") {
            let Some(tag) = entry.get("enumValueId").and_then(Value::as_str) else {
                continue;
            };
            for tile_id in array_at(entry, "tileIds").iter().filter_map(Value::as_i64) {
                tileset
                    .enum_tags
                    .entry(tile_id as i32)
                    .or_insert_with(BTreeSet::new)
                    .insert(tag.to_string());
            }
        }
    }

    /// 按定义顺序收集所有 IntGrid 图层的值名称，下标即常量索引。
    fn int_grid_names(&self) -> Vec<String> {
        let Some(layer_defs) = self.raw.pointer("/defs/layers").and_then(Value::as_array) else {
            return Vec::new();
        };

        layer_defs
            .iter()
            .filter(|def| def.get("type").and_then(Value::as_str) == Some("IntGrid"))
            .flat_map(|def| array_at(def, "intGridValues").iter())
            .map(|value| {
                value
                    .get("identifier")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }

    fn resolve_level(
        &self,
        index: usize,
        level: RawLevel,
        project_bg: Rgba,
        tilesets: &[Tileset],
    ) -> Result<Level, LoadError> {
        let bg_color = match level.bg_color.as_deref() {
            Some(hex) if !hex.is_empty() => {
                parse_color_or_default(Some(hex), &level.identifier).unwrap_or_default()
            }
            _ => project_bg,
        };

        let bg_image = match level.bg_rel_path.as_deref() {
            Some(path) if !path.is_empty() => Some(self.background_image(index, &level, path)?),
            _ => None,
        };

        let mut layers = level
            .layer_instances
            .unwrap_or_default()
            .into_iter()
            .map(|layer| self.resolve_layer(&level.identifier, layer, tilesets))
            .collect::<Result<Vec<_>, _>>()?;
        // LDtk 中第一个图层在最上方，这里改为自底向上
        layers.reverse();

        Ok(Level {
            identifier: level.identifier,
            uid: level.uid,
            world_position: IVec2::new(level.world_x, level.world_y),
            px_width: level.px_wid,
            px_height: level.px_hei,
            bg_color,
            bg_image,
            layers,
            properties: convert_fields(level.field_instances),
        })
    }

    fn background_image(
        &self,
        index: usize,
        level: &RawLevel,
        path: &str,
    ) -> Result<BgImage, LoadError> {
        let bg_pos = self
            .raw
            .pointer(&format!("/levels/{index}/__bgPos"))
            .filter(|value| !value.is_null())
            .ok_or_else(|| {
                LoadError::MalformedDocument(format!(
                    "level {} declares background {path:?} but has no __bgPos",
                    level.identifier
                ))
            })?;

        let scale = floats_at(bg_pos, "scale", 2, &level.identifier)?;
        let crop = floats_at(bg_pos, "cropRect", 4, &level.identifier)?;
        let top_left = array_at(bg_pos, "topLeftPx");
        let top_left = IVec2::new(
            top_left.first().and_then(Value::as_i64).unwrap_or_default() as i32,
            top_left.get(1).and_then(Value::as_i64).unwrap_or_default() as i32,
        );

        Ok(BgImage {
            rel_path: path.to_string(),
            top_left,
            scale: DVec2::new(scale[0], scale[1]),
            crop_rect: [crop[0], crop[1], crop[2], crop[3]],
        })
    }

    fn resolve_layer(
        &self,
        level: &str,
        layer: RawLayer,
        tilesets: &[Tileset],
    ) -> Result<Layer, LoadError> {
        let tileset = match layer.tileset_def_uid {
            Some(uid) => self.bind_tileset(uid, tilesets, &layer.identifier, level)?,
            None => None,
        };
        let bound = tileset.map(|index| &tilesets[index.0]);
        if bound.is_some() && layer.grid_size <= 0 {
            return Err(LoadError::MalformedDocument(format!(
                "layer {} in level {level} binds a tileset but has __gridSize {}",
                layer.identifier, layer.grid_size
            )));
        }

        let tiles = layer
            .grid_tiles
            .iter()
            .map(|tile| resolve_tile(tile, bound, layer.grid_size, level))
            .collect::<Result<Vec<_>, _>>()?;
        let auto_tiles = layer
            .auto_layer_tiles
            .iter()
            .map(|tile| resolve_tile(tile, bound, layer.grid_size, level))
            .collect::<Result<Vec<_>, _>>()?;

        let int_grid = materialize_int_grid(&layer, level)?;

        let entities = layer
            .entity_instances
            .into_iter()
            .map(|entity| self.resolve_entity(entity, tilesets, level))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Layer {
            identifier: layer.identifier,
            layer_type: layer.layer_type,
            layer_def_uid: layer.layer_def_uid,
            grid_size: layer.grid_size,
            px_total_offset: IVec2::new(layer.px_total_offset_x, layer.px_total_offset_y),
            c_width: layer.c_wid,
            c_height: layer.c_hei,
            opacity: layer.opacity,
            visible: layer.visible,
            tileset_uid: layer.tileset_def_uid,
            tileset_rel_path: layer.tileset_rel_path,
            tileset,
            tiles,
            auto_tiles,
            int_grid,
            entities,
        })
    }

    fn resolve_entity(
        &self,
        entity: RawEntity,
        tilesets: &[Tileset],
        level: &str,
    ) -> Result<EntityInstance, LoadError> {
        let tile = match entity.tile {
            Some(raw) => Some(self.resolve_tile_rect(raw, tilesets, &entity.identifier, level)?),
            None => None,
        };

        Ok(EntityInstance {
            identifier: entity.identifier,
            px: IVec2::from_array(entity.px),
            width: entity.width,
            height: entity.height,
            pivot: Vec2::from_array(entity.pivot),
            tags: entity.tags,
            properties: convert_fields(entity.field_instances),
            tile,
        })
    }

    fn resolve_tile_rect(
        &self,
        raw: RawTileRect,
        tilesets: &[Tileset],
        owner: &str,
        level: &str,
    ) -> Result<TileRect, LoadError> {
        let tileset = self.bind_tileset(raw.tileset_uid, tilesets, owner, level)?;
        let bound = tileset.map(|index| &tilesets[index.0]);

        let rect = match (raw.tile_id, bound, raw.src_rect) {
            (Some(tile_id), Some(sheet), _) => source_rect(sheet, tile_id, owner, level)?,
            (_, _, Some([x, y, w, h])) => Rect::new(x, y, w, h),
            _ => Rect::new(
                raw.x.unwrap_or_default(),
                raw.y.unwrap_or_default(),
                raw.w.unwrap_or_default(),
                raw.h.unwrap_or_default(),
            ),
        };

        Ok(TileRect {
            tileset_uid: raw.tileset_uid,
            tileset,
            rect,
        })
    }

    /// 按数值 UID 线性查找瓦片集；未命中时默认保留空引用。
    fn bind_tileset(
        &self,
        uid: i64,
        tilesets: &[Tileset],
        owner: &str,
        level: &str,
    ) -> Result<Option<TilesetIndex>, LoadError> {
        if let Some(position) = tilesets.iter().position(|t| t.uid == uid) {
            return Ok(Some(TilesetIndex(position)));
        }
        if self.options.strict_references {
            return Err(LoadError::UnresolvedReference(format!(
                "{owner} in level {level} references unknown tileset uid {uid}"
            )));
        }
        warn!(owner, level, uid, "未找到对应的瓦片集，引用保持为空");
        Ok(None)
    }
}

fn resolve_tile(
    tile: &RawTile,
    tileset: Option<&Tileset>,
    grid_size: i32,
    level: &str,
) -> Result<Tile, LoadError> {
    let src = match (tileset, tile.src) {
        (Some(sheet), _) => source_rect(sheet, tile.t, "tile", level)?,
        (None, Some([x, y])) => Rect::square(x, y, grid_size),
        (None, None) => Rect::square(0, 0, grid_size),
    };
    Ok(Tile {
        px: IVec2::from_array(tile.px),
        src,
        flip: tile.f,
        id: tile.t,
    })
}

fn source_rect(sheet: &Tileset, tile_id: i32, owner: &str, level: &str) -> Result<Rect, LoadError> {
    sheet.tile_source_rect(tile_id).ok_or_else(|| {
        LoadError::MalformedDocument(format!(
            "{owner} in level {level}: tile id {tile_id} lies outside tileset {}",
            sheet.identifier
        ))
    })
}

fn materialize_int_grid(layer: &RawLayer, level: &str) -> Result<Vec<IntGridCell>, LoadError> {
    let cell = |index: usize, value: i32| -> Result<IntGridCell, LoadError> {
        let px = geometry::index_to_cell(index, layer.c_wid)
            .and_then(|grid| geometry::checked_from_grid(grid, layer.grid_size))
            .ok_or_else(|| {
                LoadError::MalformedDocument(format!(
                    "IntGrid layer {} in level {level}: cell index {index} is out of range",
                    layer.identifier
                ))
            })?;
        Ok(IntGridCell { value, index, px })
    };

    let has_values =
        layer.int_grid_csv.iter().any(|v| *v != 0) || !layer.int_grid.is_empty();
    if has_values && layer.c_wid <= 0 {
        return Err(LoadError::MalformedDocument(format!(
            "IntGrid layer {} in level {level} has non-positive __cWid {}",
            layer.identifier, layer.c_wid
        )));
    }

    if layer.int_grid_csv.is_empty() {
        return layer
            .int_grid
            .iter()
            .filter(|entry| entry.v != 0)
            .map(|entry| cell(entry.coord_id, entry.v))
            .collect();
    }

    layer
        .int_grid_csv
        .iter()
        .enumerate()
        .filter(|(_, value)| **value != 0)
        .map(|(index, value)| cell(index, *value))
        .collect()
}

fn convert_fields(fields: Vec<RawField>) -> Vec<Property> {
    fields
        .into_iter()
        .map(|field| {
            let value = field_value(&field.value, &field.field_type);
            Property {
                identifier: field.identifier,
                field_type: field.field_type,
                value,
            }
        })
        .collect()
}

/// 依据声明类型把任意 JSON 值转换为 `FieldValue`，不做类型校验。
fn field_value(value: &Value, field_type: &str) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(flag) => FieldValue::Bool(*flag),
        Value::Number(number) => {
            if field_type == "Float" {
                FieldValue::Float(number.as_f64().unwrap_or_default())
            } else if let Some(int) = number.as_i64() {
                FieldValue::Int(int)
            } else {
                FieldValue::Float(number.as_f64().unwrap_or_default())
            }
        }
        Value::String(text) if field_type == "Color" => FieldValue::Color(text.clone()),
        Value::String(text) => FieldValue::String(text.clone()),
        Value::Array(items) => {
            let element_type = field_type
                .strip_prefix("Array<")
                .and_then(|inner| inner.strip_suffix('>'))
                .unwrap_or_default();
            FieldValue::Array(
                items
                    .iter()
                    .map(|item| field_value(item, element_type))
                    .collect(),
            )
        }
        Value::Object(map) => FieldValue::Map(
            map.iter()
                .map(|(key, item)| (key.clone(), field_value(item, "")))
                .collect(),
        ),
    }
}

/// 颜色解析失败时记录警告并返回 `None`，调用方回退为透明黑。
fn parse_color_or_default(hex: Option<&str>, owner: &str) -> Option<Rgba> {
    let hex = hex.filter(|h| !h.is_empty())?;
    match Rgba::from_hex(hex) {
        Ok(color) => Some(color),
        Err(err) => {
            warn!(owner, color = hex, error = %err, "背景色解析失败，使用透明黑");
            None
        }
    }
}

fn array_at<'v>(value: &'v Value, key: &str) -> &'v [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn floats_at(value: &Value, key: &str, len: usize, level: &str) -> Result<Vec<f64>, LoadError> {
    let floats: Vec<f64> = array_at(value, key)
        .iter()
        .filter_map(Value::as_f64)
        .collect();
    if floats.len() < len {
        return Err(LoadError::MalformedDocument(format!(
            "level {level} __bgPos.{key} needs {len} numbers, found {}",
            floats.len()
        )));
    }
    Ok(floats)
}
