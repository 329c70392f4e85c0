use std::path::Path;

use ldtk_config::AppConfig;
use ldtk_core::field::{FieldValue, Property};
use ldtk_core::project::{Layer, LayerType, Level, Project};
use ldtk_engine::command::{CommandBus, CommandContext, CommandRequest};
use ldtk_engine::scene::Scene;
use tracing::{info, warn};

use crate::errors::FrontendError;
use crate::loader::load_scene;
use crate::resource_locator::AssetIndex;

/// 加载工程并打印概览：工程元数据、资源定位结果、每个关卡的图层与绘制统计。
pub fn run(path: Option<&Path>, config: &AppConfig) -> Result<(), FrontendError> {
    let loaded = load_scene(path, config)?;
    let mut scene = loaded.scene;
    let command_bus = CommandBus::new();

    let mut commands: Vec<&str> = command_bus.available_commands().copied().collect();
    commands.sort_unstable();
    println!("支持的命令: {}", commands.join(", "));
    println!("已从 LDtk 加载工程：{}", loaded.path.display());

    for line in project_lines(scene.project()) {
        println!("{line}");
    }
    for line in asset_lines(&loaded.assets) {
        println!("{line}");
    }

    let start = scene.current_index();
    let identifiers: Vec<String> = scene
        .project()
        .levels
        .iter()
        .map(|level| level.identifier.clone())
        .collect();
    let mut context = CommandContext { scene: &mut scene };
    for identifier in &identifiers {
        if let Err(err) = dispatch_cli_command(&command_bus, "goto_level", [identifier.as_str()], &mut context) {
            warn!("CLI 命令执行失败: {err}");
            continue;
        }
        for line in level_lines(context.scene) {
            println!("{line}");
        }
    }
    let start = start.to_string();
    if let Err(err) = dispatch_cli_command(&command_bus, "goto_level", [start.as_str()], &mut context) {
        warn!("CLI 命令执行失败: {err}");
    }

    info!(
        levels = identifiers.len(),
        tilesets = context.scene.project().tilesets.len(),
        "CLI 概览输出完成"
    );
    Ok(())
}

fn dispatch_cli_command<const N: usize>(
    bus: &CommandBus,
    name: &str,
    args: [&str; N],
    context: &mut CommandContext<'_>,
) -> Result<(), String> {
    let request = CommandRequest::new(name, args);
    let response = bus.dispatch(&request, context);
    if response.success {
        Ok(())
    } else {
        Err(response.message.unwrap_or_else(|| format!("命令 {name} 执行失败")))
    }
}

pub fn project_lines(project: &Project) -> Vec<String> {
    let mut lines = Vec::new();
    let layout = project
        .world_layout
        .map(|layout| format!("{layout:?}"))
        .unwrap_or_else(|| "<未设置>".to_string());
    lines.push(format!(
        "工程版本={}, 世界布局={}, 默认背景色={}, 关卡数={}",
        if project.json_version.is_empty() {
            "<未知>"
        } else {
            project.json_version.as_str()
        },
        layout,
        project.bg_color,
        project.levels.len()
    ));

    lines.push("瓦片集：".to_string());
    for tileset in &project.tilesets {
        lines.push(format!(
            "  - {} (uid={}, 网格={}, 每行={}, 路径={}, customData={}, enumTags={})",
            tileset.identifier,
            tileset.uid,
            tileset.grid_size,
            tileset.tiles_per_row(),
            if tileset.rel_path.is_empty() {
                "<内置>"
            } else {
                tileset.rel_path.as_str()
            },
            tileset.custom_data.len(),
            tileset.enum_tags.len()
        ));
    }

    if !project.int_grid_names.is_empty() {
        let names: Vec<String> = project
            .int_grid_names
            .iter()
            .enumerate()
            .map(|(index, name)| format!("{index}={name}"))
            .collect();
        lines.push(format!("IntGrid 常量: {}", names.join(", ")));
    }
    lines
}

fn asset_lines(assets: &AssetIndex) -> Vec<String> {
    if assets.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["图片资源：".to_string()];
    for (rel, resolved) in assets.iter() {
        match resolved {
            Some(path) => lines.push(format!("  - {rel} -> {}", path.display())),
            None => lines.push(format!("  - {rel} -> <未找到>")),
        }
    }
    lines
}

/// 当前关卡的概览；图层按自底向上顺序列出。
pub fn level_lines(scene: &Scene) -> Vec<String> {
    let Some(level) = scene.current_level() else {
        return vec!["工程不含关卡。".to_string()];
    };

    let mut lines = vec![level_header(level)];
    for property in &level.properties {
        lines.push(format!("    字段 {}", format_property(property)));
    }
    for layer in &level.layers {
        lines.push(layer_line(scene, layer));
    }
    if let Some(plan) = scene.render_plan() {
        lines.push(format!(
            "    绘制清单: 图层={}, 瓦片={}, 实体图标={}, 背景图={}",
            plan.layers.len(),
            plan.tile_count(),
            plan.sprite_count(),
            plan.background
                .as_ref()
                .map(|bg| bg.rel_path.as_str())
                .unwrap_or("<无>")
        ));
    }
    lines
}

fn level_header(level: &Level) -> String {
    format!(
        "关卡 {} (uid={}), 位置=({}, {}), 尺寸={}x{}, 背景色={}",
        level.identifier,
        level.uid,
        level.world_position.x,
        level.world_position.y,
        level.px_width,
        level.px_height,
        level.bg_color
    )
}

fn layer_line(scene: &Scene, layer: &Layer) -> String {
    let content = match layer.layer_type {
        LayerType::IntGrid => format!(
            "IntGrid 单元格={}, 自动瓦片={}",
            layer.int_grid.len(),
            layer.auto_tiles.len()
        ),
        LayerType::AutoLayer => format!("自动瓦片={}", layer.auto_tiles.len()),
        LayerType::Tiles => format!("瓦片={}", layer.tiles.len()),
        LayerType::Entities => {
            let names: Vec<&str> = layer
                .entities
                .iter()
                .map(|entity| entity.identifier.as_str())
                .collect();
            format!("实体={} [{}]", names.len(), names.join(", "))
        }
    };
    let tileset = scene
        .project()
        .tileset_for(layer)
        .map(|tileset| tileset.identifier.as_str())
        .unwrap_or("<无>");
    format!(
        "  - 图层 {} ({:?}), {}x{} 格 @ {}px, 瓦片集={}, 可见={}, {}",
        layer.identifier,
        layer.layer_type,
        layer.c_width,
        layer.c_height,
        layer.grid_size,
        tileset,
        if scene.is_layer_visible(layer) { "是" } else { "否" },
        content
    )
}

fn format_property(property: &Property) -> String {
    format!(
        "{}: {} = {}",
        property.identifier,
        property.field_type,
        format_value(&property.value)
    )
}

fn format_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "<空>".to_string(),
        FieldValue::Int(v) => v.to_string(),
        FieldValue::Float(v) => format!("{v:.3}"),
        FieldValue::Bool(v) => v.to_string(),
        FieldValue::String(v) => format!("{v:?}"),
        FieldValue::Color(v) => v.clone(),
        FieldValue::Array(items) => {
            let items: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", items.join(", "))
        }
        FieldValue::Map(_) => match value.as_point() {
            Ok(point) => format!("({}, {})", point.x, point.y),
            Err(_) => "{..}".to_string(),
        },
    }
}
