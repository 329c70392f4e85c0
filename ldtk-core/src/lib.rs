pub use glam;

pub mod geometry {
    use glam::IVec2;
    use serde::{Deserialize, Serialize};

    /// 像素矩形（左上角 + 宽高），用于描述瓦片集中的源区域。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rect {
        pub x: i32,
        pub y: i32,
        pub w: i32,
        pub h: i32,
    }

    impl Rect {
        #[inline]
        pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
            Self { x, y, w, h }
        }

        /// 以 `size` 为边长的正方形，瓦片源矩形均为此形式。
        #[inline]
        pub fn square(x: i32, y: i32, size: i32) -> Self {
            Self::new(x, y, size, size)
        }

        #[inline]
        pub fn min(self) -> IVec2 {
            IVec2::new(self.x, self.y)
        }

        #[inline]
        pub fn size(self) -> IVec2 {
            IVec2::new(self.w, self.h)
        }

        #[inline]
        pub fn max(self) -> IVec2 {
            self.min() + self.size()
        }

        /// 包含边界的点判定（右/下边界也视为在内）。
        #[inline]
        pub fn contains_inclusive(self, point: IVec2) -> bool {
            let max = self.max();
            self.x <= point.x && self.y <= point.y && max.x >= point.x && max.y >= point.y
        }
    }

    /// 世界坐标 → 网格坐标，按向下取整处理负数。
    ///
    /// 网格尺寸小于 1 时按 1 处理，避免除零。
    #[inline]
    pub fn to_grid(point: IVec2, grid_size: i32) -> IVec2 {
        let size = grid_size.max(1);
        IVec2::new(point.x.div_euclid(size), point.y.div_euclid(size))
    }

    /// 网格坐标 → 世界坐标（网格左上角）。
    #[inline]
    pub fn from_grid(cell: IVec2, grid_size: i32) -> IVec2 {
        cell * grid_size
    }

    /// 将扁平数组下标换算为网格坐标 `(i mod w, i div w)`。
    ///
    /// 行号超出 `i32` 时返回 `None`。
    #[inline]
    pub fn index_to_cell(index: usize, cell_width: i32) -> Option<IVec2> {
        let width = cell_width.max(1) as usize;
        let column = i32::try_from(index % width).ok()?;
        let row = i32::try_from(index / width).ok()?;
        Some(IVec2::new(column, row))
    }

    /// 网格坐标乘以网格尺寸，溢出时返回 `None`。
    #[inline]
    pub fn checked_from_grid(cell: IVec2, grid_size: i32) -> Option<IVec2> {
        Some(IVec2::new(
            cell.x.checked_mul(grid_size)?,
            cell.y.checked_mul(grid_size)?,
        ))
    }
}

pub mod color {
    use std::fmt;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum ColorParseError {
        #[error("color {0:?} does not start with '#'")]
        MissingPrefix(String),
        #[error("color {0:?} must be #RGB or #RRGGBB")]
        InvalidLength(String),
        #[error("color {input:?} contains invalid hex digit {digit:?}")]
        InvalidDigit { input: String, digit: char },
    }

    /// 8 位 RGBA 颜色。默认值为全透明黑色。
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Rgba {
        pub r: u8,
        pub g: u8,
        pub b: u8,
        pub a: u8,
    }

    impl Rgba {
        pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);
        pub const BLACK: Rgba = Rgba::new(0, 0, 0, 0xff);
        pub const WHITE: Rgba = Rgba::new(0xff, 0xff, 0xff, 0xff);

        #[inline]
        pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
            Self { r, g, b, a }
        }

        /// 解析 `#RRGGBB` 或 `#RGB`，alpha 恒为 255。
        pub fn from_hex(input: &str) -> Result<Self, ColorParseError> {
            let Some(digits) = input.strip_prefix('#') else {
                return Err(ColorParseError::MissingPrefix(input.to_string()));
            };

            let nibble = |ch: char| {
                ch.to_digit(16)
                    .map(|value| value as u8)
                    .ok_or_else(|| ColorParseError::InvalidDigit {
                        input: input.to_string(),
                        digit: ch,
                    })
            };

            let chars: Vec<char> = digits.chars().collect();
            match chars.as_slice() {
                [r1, r2, g1, g2, b1, b2] => Ok(Self::new(
                    (nibble(*r1)? << 4) | nibble(*r2)?,
                    (nibble(*g1)? << 4) | nibble(*g2)?,
                    (nibble(*b1)? << 4) | nibble(*b2)?,
                    0xff,
                )),
                // 简写形式：每一位重复一次，等价于乘以 17
                [r, g, b] => Ok(Self::new(
                    nibble(*r)? * 17,
                    nibble(*g)? * 17,
                    nibble(*b)? * 17,
                    0xff,
                )),
                _ => Err(ColorParseError::InvalidLength(input.to_string())),
            }
        }

        #[inline]
        pub fn to_array(self) -> [u8; 4] {
            [self.r, self.g, self.b, self.a]
        }
    }

    impl fmt::Display for Rgba {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        }
    }

}

pub mod field {
    use std::collections::BTreeMap;

    use glam::IVec2;
    use serde::{Deserialize, Serialize};
    use thiserror::Error;

    use crate::color::{ColorParseError, Rgba};

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum FieldError {
        #[error("expected {expected} value, found {found}")]
        TypeMismatch {
            expected: &'static str,
            found: &'static str,
        },
        #[error("missing point component {0:?}")]
        MissingComponent(&'static str),
        #[error(transparent)]
        InvalidColor(#[from] ColorParseError),
    }

    /// 自定义字段的值。调用方需要根据 `Property::field_type` 选择访问器，
    /// 类型不符时访问器返回 `FieldError::TypeMismatch`。
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub enum FieldValue {
        #[default]
        Null,
        Int(i64),
        Float(f64),
        Bool(bool),
        String(String),
        Color(String),
        Array(Vec<FieldValue>),
        Map(BTreeMap<String, FieldValue>),
    }

    impl FieldValue {
        pub fn kind_name(&self) -> &'static str {
            match self {
                FieldValue::Null => "null",
                FieldValue::Int(_) => "int",
                FieldValue::Float(_) => "float",
                FieldValue::Bool(_) => "bool",
                FieldValue::String(_) => "string",
                FieldValue::Color(_) => "color",
                FieldValue::Array(_) => "array",
                FieldValue::Map(_) => "map",
            }
        }

        #[inline]
        pub fn is_null(&self) -> bool {
            matches!(self, FieldValue::Null)
        }

        fn mismatch(&self, expected: &'static str) -> FieldError {
            FieldError::TypeMismatch {
                expected,
                found: self.kind_name(),
            }
        }

        /// 浮点值按截断转换。
        pub fn as_int(&self) -> Result<i64, FieldError> {
            match self {
                FieldValue::Int(value) => Ok(*value),
                FieldValue::Float(value) => Ok(*value as i64),
                other => Err(other.mismatch("int")),
            }
        }

        pub fn as_float(&self) -> Result<f64, FieldError> {
            match self {
                FieldValue::Float(value) => Ok(*value),
                FieldValue::Int(value) => Ok(*value as f64),
                other => Err(other.mismatch("float")),
            }
        }

        pub fn as_bool(&self) -> Result<bool, FieldError> {
            match self {
                FieldValue::Bool(value) => Ok(*value),
                other => Err(other.mismatch("bool")),
            }
        }

        /// 字符串、枚举与颜色字段均以字符串形式存储。
        pub fn as_str(&self) -> Result<&str, FieldError> {
            match self {
                FieldValue::String(value) | FieldValue::Color(value) => Ok(value),
                other => Err(other.mismatch("string")),
            }
        }

        pub fn as_color(&self) -> Result<Rgba, FieldError> {
            match self {
                FieldValue::Color(value) | FieldValue::String(value) => {
                    Ok(Rgba::from_hex(value)?)
                }
                other => Err(other.mismatch("color")),
            }
        }

        pub fn as_array(&self) -> Result<&[FieldValue], FieldError> {
            match self {
                FieldValue::Array(values) => Ok(values),
                other => Err(other.mismatch("array")),
            }
        }

        pub fn as_map(&self) -> Result<&BTreeMap<String, FieldValue>, FieldError> {
            match self {
                FieldValue::Map(map) => Ok(map),
                other => Err(other.mismatch("map")),
            }
        }

        /// LDtk 的点字段在 JSON 中是 `{"cx": .., "cy": ..}` 映射。
        pub fn as_point(&self) -> Result<IVec2, FieldError> {
            let map = self.as_map()?;
            let cx = map
                .get("cx")
                .ok_or(FieldError::MissingComponent("cx"))?
                .as_int()?;
            let cy = map
                .get("cy")
                .ok_or(FieldError::MissingComponent("cy"))?
                .as_int()?;
            Ok(IVec2::new(cx as i32, cy as i32))
        }
    }

    /// 关卡或实体上的自定义字段实例。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Property {
        pub identifier: String,
        /// 源文件中的声明类型，例如 `Int`、`Color`、`Array<Point>`。
        pub field_type: String,
        pub value: FieldValue,
    }

}

pub mod project {
    use std::collections::{BTreeMap, BTreeSet};

    use glam::{DVec2, IVec2, Vec2};
    use serde::{Deserialize, Serialize};

    use crate::color::Rgba;
    use crate::field::Property;
    use crate::geometry::{self, Rect};

    /// 瓦片翻转位：bit0 水平，bit1 垂直。
    pub const FLIP_X: u8 = 0b01;
    pub const FLIP_Y: u8 = 0b10;

    #[inline]
    pub fn flip_x(bits: u8) -> bool {
        bits & FLIP_X != 0
    }

    #[inline]
    pub fn flip_y(bits: u8) -> bool {
        bits & FLIP_Y != 0
    }

    static NO_ENUM_TAGS: BTreeSet<String> = BTreeSet::new();

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum WorldLayout {
        #[serde(rename = "LinearHorizontal")]
        Horizontal,
        #[serde(rename = "LinearVertical")]
        Vertical,
        Free,
        GridVania,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum LayerType {
        IntGrid,
        #[serde(rename = "AutoLayer")]
        AutoLayer,
        Tiles,
        Entities,
    }

    /// 指向 `Project::tilesets` 的下标，在解析阶段一次性绑定。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TilesetIndex(pub usize);

    /// 手绘瓦片或自动瓦片。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Tile {
        /// 图层内的像素位置（未叠加图层偏移）。
        pub px: IVec2,
        /// 瓦片集位图上的源矩形，与 `px` 相互独立。
        pub src: Rect,
        pub flip: u8,
        pub id: i32,
    }

    impl Tile {
        #[inline]
        pub fn flip_x(&self) -> bool {
            flip_x(self.flip)
        }

        #[inline]
        pub fn flip_y(&self) -> bool {
            flip_y(self.flip)
        }
    }

    /// IntGrid 中的非零格。零值格不会被实例化。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct IntGridCell {
        pub value: i32,
        /// 在 `intGridCsv` 扁平数组中的下标。
        pub index: usize,
        pub px: IVec2,
    }

    /// 实体图标引用的瓦片集区域。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TileRect {
        pub tileset_uid: i64,
        pub tileset: Option<TilesetIndex>,
        pub rect: Rect,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct EntityInstance {
        pub identifier: String,
        /// 实体锚点（pivot）所在的像素位置。
        pub px: IVec2,
        pub width: i32,
        pub height: i32,
        /// 归一化锚点，`(0.5, 0.5)` 表示中心。
        pub pivot: Vec2,
        pub tags: Vec<String>,
        pub properties: Vec<Property>,
        pub tile: Option<TileRect>,
    }

    impl EntityInstance {
        pub fn property(&self, identifier: &str) -> Option<&Property> {
            self.properties.iter().find(|p| p.identifier == identifier)
        }

        /// 根据锚点换算实体的左上角包围盒。
        pub fn bounds(&self) -> Rect {
            let size = Vec2::new(self.width as f32, self.height as f32);
            let top_left = self.px.as_vec2() - size * self.pivot;
            Rect::new(
                top_left.x.round() as i32,
                top_left.y.round() as i32,
                self.width,
                self.height,
            )
        }

        pub fn has_tag(&self, tag: &str) -> bool {
            self.tags.iter().any(|t| t == tag)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Tileset {
        pub uid: i64,
        pub identifier: String,
        /// 相对于工程文件的图片路径，嵌入式瓦片集为空字符串。
        pub rel_path: String,
        pub grid_size: i32,
        pub px_width: i32,
        pub px_height: i32,
        pub spacing: i32,
        pub padding: i32,
        pub custom_data: BTreeMap<i32, String>,
        pub enum_tags: BTreeMap<i32, BTreeSet<String>>,
    }

    impl Tileset {
        /// 每行可容纳的瓦片数：`floor((pxWid + spacing) / (gridSize + spacing))`。
        pub fn tiles_per_row(&self) -> i32 {
            let (Some(stride), Some(width)) = (
                self.grid_size.checked_add(self.spacing),
                self.px_width.checked_add(self.spacing),
            ) else {
                return 0;
            };
            if stride <= 0 {
                return 0;
            }
            width.div_euclid(stride)
        }

        /// 源矩形坐标超出 `i32` 时返回 `None`。
        pub fn tile_source_rect(&self, tile_id: i32) -> Option<Rect> {
            let per_row = self.tiles_per_row().max(1);
            let stride = self.grid_size.checked_add(self.spacing)?;
            let column = tile_id.rem_euclid(per_row);
            let row = tile_id.div_euclid(per_row);
            Some(Rect::square(
                column.checked_mul(stride)?.checked_add(self.padding)?,
                row.checked_mul(stride)?.checked_add(self.padding)?,
                self.grid_size,
            ))
        }

        /// 未设置时返回空字符串。
        pub fn custom_data(&self, tile_id: i32) -> &str {
            self.custom_data
                .get(&tile_id)
                .map(String::as_str)
                .unwrap_or("")
        }

        pub fn enum_tags(&self, tile_id: i32) -> &BTreeSet<String> {
            self.enum_tags.get(&tile_id).unwrap_or(&NO_ENUM_TAGS)
        }

        pub fn has_enum_tag(&self, tile_id: i32, tag: &str) -> bool {
            self.enum_tags(tile_id).contains(tag)
        }
    }

    /// 关卡背景图的摆放参数。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct BgImage {
        pub rel_path: String,
        pub top_left: IVec2,
        pub scale: DVec2,
        /// `[x, y, w, h]`，单位为源图像素。
        pub crop_rect: [f64; 4],
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub identifier: String,
        pub layer_type: LayerType,
        pub layer_def_uid: i64,
        pub grid_size: i32,
        pub px_total_offset: IVec2,
        /// 以格子计的宽度，例如 160x80 的关卡配 16px 网格得到 10。
        pub c_width: i32,
        pub c_height: i32,
        pub opacity: f32,
        pub visible: bool,
        pub tileset_uid: Option<i64>,
        pub tileset_rel_path: Option<String>,
        pub tileset: Option<TilesetIndex>,
        pub tiles: Vec<Tile>,
        pub auto_tiles: Vec<Tile>,
        pub int_grid: Vec<IntGridCell>,
        pub entities: Vec<EntityInstance>,
    }

    impl Layer {
        /// 手绘瓦片在前，自动瓦片在后。
        pub fn all_tiles(&self) -> impl Iterator<Item = &Tile> + '_ {
            self.tiles.iter().chain(self.auto_tiles.iter())
        }

        #[inline]
        pub fn to_grid_position(&self, point: IVec2) -> IVec2 {
            geometry::to_grid(point, self.grid_size)
        }

        #[inline]
        pub fn from_grid_position(&self, cell: IVec2) -> IVec2 {
            geometry::from_grid(cell, self.grid_size)
        }

        /// 图层内坐标叠加图层总偏移后得到关卡坐标。
        #[inline]
        pub fn to_world_position(&self, px: IVec2) -> IVec2 {
            px + self.px_total_offset
        }

        pub fn entity_by_identifier(&self, identifier: &str) -> Option<&EntityInstance> {
            self.entities.iter().find(|e| e.identifier == identifier)
        }

        pub fn entities_by_identifier<'a>(
            &'a self,
            identifier: &'a str,
        ) -> impl Iterator<Item = &'a EntityInstance> + 'a {
            self.entities
                .iter()
                .filter(move |e| e.identifier == identifier)
        }

        // 以下按格查找均为线性扫描，不考虑图层偏移。

        pub fn tile_at(&self, point: IVec2) -> Option<&Tile> {
            let cell = self.to_grid_position(point);
            self.tiles
                .iter()
                .find(|tile| self.to_grid_position(tile.px) == cell)
        }

        pub fn auto_tile_at(&self, point: IVec2) -> Option<&Tile> {
            let cell = self.to_grid_position(point);
            self.auto_tiles
                .iter()
                .find(|tile| self.to_grid_position(tile.px) == cell)
        }

        pub fn integer_at(&self, point: IVec2) -> Option<&IntGridCell> {
            let cell = self.to_grid_position(point);
            self.int_grid
                .iter()
                .find(|integer| self.to_grid_position(integer.px) == cell)
        }

        pub fn entity_at(&self, point: IVec2) -> Option<&EntityInstance> {
            let cell = self.to_grid_position(point);
            self.entities
                .iter()
                .find(|entity| self.to_grid_position(entity.px) == cell)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Level {
        pub identifier: String,
        pub uid: i64,
        pub world_position: IVec2,
        pub px_width: i32,
        pub px_height: i32,
        /// 未设置时继承工程默认背景色。
        pub bg_color: Rgba,
        pub bg_image: Option<BgImage>,
        /// 自底向上的绘制顺序（与 LDtk 编辑器中的顺序相反）。
        pub layers: Vec<Layer>,
        pub properties: Vec<Property>,
    }

    impl Level {
        #[inline]
        pub fn bounds(&self) -> Rect {
            Rect::new(
                self.world_position.x,
                self.world_position.y,
                self.px_width,
                self.px_height,
            )
        }

        #[inline]
        pub fn contains_point(&self, point: IVec2) -> bool {
            self.bounds().contains_inclusive(point)
        }

        pub fn layer_by_identifier(&self, identifier: &str) -> Option<&Layer> {
            self.layers.iter().find(|l| l.identifier == identifier)
        }

        pub fn property(&self, identifier: &str) -> Option<&Property> {
            self.properties.iter().find(|p| p.identifier == identifier)
        }
    }

    /// 解析完成后的 LDtk 工程，整体只读。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Project {
        pub world_layout: Option<WorldLayout>,
        pub world_grid_width: i32,
        pub world_grid_height: i32,
        pub bg_color: Rgba,
        pub json_version: String,
        pub levels: Vec<Level>,
        pub tilesets: Vec<Tileset>,
        /// 下标即 IntGrid 常量索引。
        pub int_grid_names: Vec<String>,
    }

    impl Project {
        /// 返回包含该世界坐标的第一个关卡；关卡重叠时以列表顺序为准。
        pub fn level_at(&self, point: IVec2) -> Option<&Level> {
            self.levels.iter().find(|level| level.contains_point(point))
        }

        pub fn level_by_identifier(&self, identifier: &str) -> Option<&Level> {
            self.levels.iter().find(|l| l.identifier == identifier)
        }

        pub fn tileset_by_identifier(&self, identifier: &str) -> Option<&Tileset> {
            self.tilesets.iter().find(|t| t.identifier == identifier)
        }

        pub fn tileset_by_uid(&self, uid: i64) -> Option<&Tileset> {
            self.tilesets.iter().find(|t| t.uid == uid)
        }

        #[inline]
        pub fn tileset(&self, index: TilesetIndex) -> Option<&Tileset> {
            self.tilesets.get(index.0)
        }

        /// 图层绑定的瓦片集；实体图层或未匹配的 UID 返回 `None`。
        pub fn tileset_for(&self, layer: &Layer) -> Option<&Tileset> {
            layer.tileset.and_then(|index| self.tileset(index))
        }

        pub fn tileset_for_rect(&self, rect: &TileRect) -> Option<&Tileset> {
            rect.tileset.and_then(|index| self.tileset(index))
        }

        pub fn int_grid_constant_by_name(&self, name: &str) -> Option<usize> {
            self.int_grid_names.iter().position(|n| n == name)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::field::FieldValue;

        fn tileset(px_width: i32, grid_size: i32, spacing: i32, padding: i32) -> Tileset {
            Tileset {
                uid: 1,
                identifier: "Tiles".to_string(),
                rel_path: "tiles.png".to_string(),
                grid_size,
                px_width,
                px_height: px_width,
                spacing,
                padding,
                custom_data: BTreeMap::new(),
                enum_tags: BTreeMap::new(),
            }
        }

        fn layer(grid_size: i32) -> Layer {
            Layer {
                identifier: "Ground".to_string(),
                layer_type: LayerType::Tiles,
                layer_def_uid: 10,
                grid_size,
                px_total_offset: IVec2::new(4, 8),
                c_width: 8,
                c_height: 8,
                opacity: 1.0,
                visible: true,
                tileset_uid: Some(1),
                tileset_rel_path: Some("tiles.png".to_string()),
                tileset: Some(TilesetIndex(0)),
                tiles: Vec::new(),
                auto_tiles: Vec::new(),
                int_grid: Vec::new(),
                entities: Vec::new(),
            }
        }

        fn entity(identifier: &str, x: i32, y: i32) -> EntityInstance {
            EntityInstance {
                identifier: identifier.to_string(),
                px: IVec2::new(x, y),
                width: 16,
                height: 32,
                pivot: Vec2::new(0.5, 1.0),
                tags: vec!["actor".to_string()],
                properties: vec![Property {
                    identifier: "hp".to_string(),
                    field_type: "Int".to_string(),
                    value: FieldValue::Int(3),
                }],
                tile: None,
            }
        }

        fn level(identifier: &str, x: i32, y: i32) -> Level {
            Level {
                identifier: identifier.to_string(),
                uid: 0,
                world_position: IVec2::new(x, y),
                px_width: 64,
                px_height: 64,
                bg_color: Rgba::BLACK,
                bg_image: None,
                layers: vec![layer(16)],
                properties: Vec::new(),
            }
        }

        fn project(levels: Vec<Level>) -> Project {
            Project {
                world_layout: Some(WorldLayout::Free),
                world_grid_width: 256,
                world_grid_height: 256,
                bg_color: Rgba::BLACK,
                json_version: "1.5.3".to_string(),
                levels,
                tilesets: vec![tileset(64, 16, 0, 0)],
                int_grid_names: vec!["walls".to_string(), "water".to_string()],
            }
        }

        #[test]
        fn source_rect_uses_tileset_grid_geometry() {
            let sheet = tileset(256, 32, 0, 0);
            assert_eq!(sheet.tiles_per_row(), 8);
            assert_eq!(sheet.tile_source_rect(10), Some(Rect::new(64, 32, 32, 32)));
            assert_eq!(sheet.tile_source_rect(0), Some(Rect::new(0, 0, 32, 32)));
        }

        #[test]
        fn source_rect_out_of_range_is_none() {
            // 每行一块，行号即瓦片 ID
            let sheet = tileset(16, 16, 0, 0);
            assert_eq!(sheet.tile_source_rect(200_000_000), None);
            assert_eq!(sheet.tile_source_rect(i32::MAX), None);
            assert_eq!(
                sheet.tile_source_rect(1_000),
                Some(Rect::new(0, 16_000, 16, 16))
            );

            let padded = tileset(16, 16, 0, i32::MAX);
            assert_eq!(padded.tile_source_rect(1), None);
        }

        #[test]
        fn source_rect_accounts_for_spacing_and_padding() {
            // (100 + 2) / (16 + 2) = 5 tiles per row
            let sheet = tileset(100, 16, 2, 1);
            assert_eq!(sheet.tiles_per_row(), 5);
            assert_eq!(
                sheet.tile_source_rect(7),
                Some(Rect::new(1 + 2 * 18, 1 + 18, 16, 16))
            );
        }

        #[test]
        fn tileset_metadata_defaults_to_empty() {
            let mut sheet = tileset(64, 16, 0, 0);
            sheet.custom_data.insert(3, "solid".to_string());
            sheet
                .enum_tags
                .insert(3, BTreeSet::from(["Lava".to_string()]));

            assert_eq!(sheet.custom_data(3), "solid");
            assert_eq!(sheet.custom_data(4), "");
            assert!(sheet.has_enum_tag(3, "Lava"));
            assert!(!sheet.has_enum_tag(3, "Water"));
            assert!(sheet.enum_tags(99).is_empty());
        }

        #[test]
        fn grid_conversion_floors_and_is_lossy() {
            let layer = layer(16);
            assert_eq!(layer.to_grid_position(IVec2::new(16, 16)), IVec2::new(1, 1));
            assert_eq!(layer.to_grid_position(IVec2::new(31, 47)), IVec2::new(1, 2));
            assert_eq!(layer.to_grid_position(IVec2::new(-1, -17)), IVec2::new(-1, -2));
            assert_eq!(layer.from_grid_position(IVec2::new(3, 4)), IVec2::new(48, 64));

            for (x, y) in [(0, 0), (5, 33), (-7, 100), (-16, -32)] {
                let point = IVec2::new(x, y);
                let round_trip = layer.from_grid_position(layer.to_grid_position(point));
                let expected = IVec2::new(x.div_euclid(16) * 16, y.div_euclid(16) * 16);
                assert_eq!(round_trip, expected);
            }
        }

        #[test]
        fn index_to_cell_follows_row_major_order() {
            assert_eq!(geometry::index_to_cell(0, 8), Some(IVec2::new(0, 0)));
            assert_eq!(geometry::index_to_cell(9, 8), Some(IVec2::new(1, 1)));
            assert_eq!(geometry::index_to_cell(23, 8), Some(IVec2::new(7, 2)));
            assert_eq!(geometry::index_to_cell(i32::MAX as usize + 1, 1), None);
            assert_eq!(
                geometry::checked_from_grid(IVec2::new(0, i32::MAX / 8), 16),
                None
            );
            assert_eq!(
                geometry::checked_from_grid(IVec2::new(2, 3), 16),
                Some(IVec2::new(32, 48))
            );
        }

        #[test]
        fn cell_lookups_compare_grid_positions() {
            let mut layer = layer(16);
            layer.tiles.push(Tile {
                px: IVec2::new(16, 16),
                src: Rect::square(0, 0, 16),
                flip: 3,
                id: 0,
            });
            layer.auto_tiles.push(Tile {
                px: IVec2::new(32, 0),
                src: Rect::square(16, 0, 16),
                flip: 0,
                id: 1,
            });
            layer.int_grid.push(IntGridCell {
                value: 2,
                index: 9,
                px: IVec2::new(16, 16),
            });
            layer.entities.push(entity("Player", 40, 40));

            let tile = layer.tile_at(IVec2::new(20, 30)).expect("tile in cell (1,1)");
            assert!(tile.flip_x() && tile.flip_y());
            assert!(layer.tile_at(IVec2::new(0, 0)).is_none());
            assert_eq!(layer.auto_tile_at(IVec2::new(47, 15)).map(|t| t.id), Some(1));
            assert_eq!(layer.integer_at(IVec2::new(16, 16)).map(|c| c.value), Some(2));
            assert!(layer.integer_at(IVec2::new(48, 16)).is_none());
            assert_eq!(
                layer.entity_at(IVec2::new(32, 32)).map(|e| e.identifier.as_str()),
                Some("Player")
            );
            assert_eq!(layer.all_tiles().count(), 2);
            assert_eq!(layer.to_world_position(IVec2::new(16, 16)), IVec2::new(20, 24));
        }

        #[test]
        fn identifier_lookups_return_first_match() {
            let mut layer = layer(16);
            layer.entities.push(entity("Coin", 0, 0));
            layer.entities.push(entity("Coin", 16, 0));
            layer.entities.push(entity("Door", 32, 0));

            assert_eq!(layer.entity_by_identifier("Coin").map(|e| e.px.x), Some(0));
            assert_eq!(layer.entities_by_identifier("Coin").count(), 2);
            assert!(layer.entity_by_identifier("Chest").is_none());

            let door = layer.entity_by_identifier("Door").unwrap();
            assert_eq!(door.property("hp").unwrap().value.as_int().unwrap(), 3);
            assert!(door.property("mana").is_none());
            assert!(door.has_tag("actor"));
            assert_eq!(door.bounds(), Rect::new(24, -32, 16, 32));
        }

        #[test]
        fn project_queries() {
            let project = project(vec![
                level("Start", 0, 0),
                level("Overlap", 32, 32),
                level("East", 256, 0),
            ]);

            assert_eq!(
                project.level_at(IVec2::new(64, 64)).map(|l| l.identifier.as_str()),
                Some("Start")
            );
            assert_eq!(
                project.level_at(IVec2::new(90, 90)).map(|l| l.identifier.as_str()),
                Some("Overlap")
            );
            assert!(project.level_at(IVec2::new(200, 200)).is_none());
            assert!(project.level_by_identifier("East").is_some());
            assert!(project.level_by_identifier("West").is_none());

            let start = project.level_by_identifier("Start").unwrap();
            let ground = start.layer_by_identifier("Ground").unwrap();
            assert!(start.layer_by_identifier("Sky").is_none());
            assert_eq!(
                project.tileset_for(ground).map(|t| t.identifier.as_str()),
                Some("Tiles")
            );
            assert!(project.tileset_by_identifier("Tiles").is_some());
            assert!(project.tileset_by_uid(42).is_none());

            assert_eq!(project.int_grid_constant_by_name("water"), Some(1));
            assert_eq!(project.int_grid_constant_by_name("lava"), None);
        }
    }
}
