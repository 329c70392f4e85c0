
use std::fs;
use std::path::{Path, PathBuf};

use glam::IVec2;

use golden::assert_golden;
use ldtk_core::{
    color::Rgba,
    geometry::Rect,
    project::{LayerType, WorldLayout},
};
use ldtk_io::{
    LdtkFacade, LoadError, LoadOptions, ProjectLoader, load_bytes, load_from_source, load_reader,
    source::{FsSource, MemorySource},
};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn load_minimal_project_matches_expected_document() {
    let loader = LdtkFacade::new();
    let project = loader.load(&fixture("minimal.ldtk")).expect("读取 LDtk 失败");
    assert_golden("minimal", &project);

    assert_eq!(project.levels.len(), 1);
    let level = &project.levels[0];
    assert_eq!(level.layers.len(), 1);
    let layer = &level.layers[0];
    assert_eq!(layer.tiles.len(), 1);
    assert_eq!(layer.tiles[0].src, Rect::new(0, 0, 16, 16));
    assert_eq!(layer.to_grid_position(IVec2::new(16, 16)), IVec2::new(1, 1));
}

#[test]
fn load_dungeon_project_matches_expected_document() {
    let loader = LdtkFacade::new();
    let project = loader.load(&fixture("dungeon.ldtk")).expect("读取 LDtk 失败");
    assert_golden("dungeon", &project);
}

#[test]
fn layers_run_bottom_to_top() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    let level = project.level_by_identifier("Level_0").expect("未找到 Level_0");

    let order: Vec<&str> = level.layers.iter().map(|l| l.identifier.as_str()).collect();
    assert_eq!(order, ["Ground", "Collisions", "Entities"]);
    assert_eq!(level.layers[0].layer_type, LayerType::Tiles);
    assert_eq!(level.layers[2].layer_type, LayerType::Entities);
}

#[test]
fn background_colors_and_images_are_resolved() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    assert_eq!(project.world_layout, Some(WorldLayout::Free));
    assert_eq!(project.bg_color, Rgba::new(0x40, 0x46, 0x5b, 0xff));

    let level_0 = &project.levels[0];
    assert_eq!(level_0.bg_color, Rgba::new(0x10, 0x20, 0x30, 0xff));
    let image = level_0.bg_image.as_ref().expect("Level_0 应包含背景图");
    assert_eq!(image.rel_path, "bg/sky.png");
    assert_eq!(image.top_left, IVec2::new(-8, 4));
    assert!((image.scale.x - 2.0).abs() < 1e-9);
    assert!((image.scale.y - 1.5).abs() < 1e-9);
    assert_eq!(image.crop_rect, [0.0, 0.0, 32.0, 24.0]);

    // 空字符串继承工程默认色，非法色值回退为透明黑
    assert_eq!(project.levels[1].bg_color, project.bg_color);
    assert!(project.levels[1].bg_image.is_none());
    assert_eq!(project.levels[2].bg_color, Rgba::TRANSPARENT);
    assert!(project.levels[2].layers.is_empty());
}

#[test]
fn int_grid_cells_and_names_are_materialised() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    assert_eq!(project.int_grid_constant_by_name("water"), Some(1));
    assert_eq!(project.int_grid_constant_by_name("lava"), Some(2));
    assert_eq!(project.int_grid_constant_by_name("ice"), None);

    let collisions = project.levels[0]
        .layer_by_identifier("Collisions")
        .expect("未找到 Collisions 图层");
    assert_eq!(collisions.int_grid.len(), 5);
    let water = collisions
        .integer_at(IVec2::new(50, 20))
        .expect("(3,1) 处应为水");
    assert_eq!(water.value, 2);
    assert_eq!(water.index, 7);
    assert!(collisions.integer_at(IVec2::new(0, 16)).is_none());

    let legacy = project.levels[1]
        .layer_by_identifier("Legacy")
        .expect("未找到 Legacy 图层");
    let cell = legacy.integer_at(IVec2::new(31, 31)).expect("旧格式单元格");
    assert_eq!(cell.px, IVec2::new(16, 16));
}

#[test]
fn tilesets_bind_by_uid_and_expose_metadata() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    let tileset = project.tileset_by_uid(7).expect("瓦片集 7");
    assert_eq!(tileset.custom_data(5), "door");
    assert_eq!(tileset.custom_data(4), "");
    assert!(tileset.has_enum_tag(1, "Hazard"));
    assert!(tileset.has_enum_tag(0, "Solid"));
    assert!(!tileset.has_enum_tag(0, "Hazard"));
    assert!(tileset.enum_tags(9).is_empty());

    let collisions = project.levels[0]
        .layer_by_identifier("Collisions")
        .expect("未找到 Collisions 图层");
    assert_eq!(
        project.tileset_for(collisions).map(|t| t.uid),
        Some(7)
    );
    let flipped = collisions
        .auto_tile_at(IVec2::new(48, 16))
        .expect("(3,1) 处应有自动瓦片");
    assert!(flipped.flip_x());
    assert!(!flipped.flip_y());

    // 未知 UID 默认保留空引用，瓦片沿用文档中的源坐标
    let decor = project.levels[1]
        .layer_by_identifier("Decor")
        .expect("未找到 Decor 图层");
    assert_eq!(decor.tileset_uid, Some(99));
    assert!(project.tileset_for(decor).is_none());
    assert_eq!(decor.tiles[0].src, Rect::new(32, 0, 16, 16));
}

#[test]
fn entities_carry_tiles_tags_and_fields() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    let entities = project.levels[0]
        .layer_by_identifier("Entities")
        .expect("未找到 Entities 图层");

    let player = entities.entity_by_identifier("Player").expect("Player");
    assert!(player.has_tag("hero"));
    assert_eq!(player.bounds(), Rect::new(16, 24, 16, 16));
    assert_eq!(
        player.property("hp").map(|p| p.value.as_int()),
        Some(Ok(10))
    );
    let spawn = player.property("spawn").expect("spawn 字段");
    assert_eq!(spawn.value.as_point(), Ok(IVec2::new(1, 2)));
    let tint = player.property("tint").expect("tint 字段");
    assert_eq!(tint.value.as_color(), Ok(Rgba::new(255, 0, 0, 255)));
    assert!(player.property("note").expect("note 字段").value.is_null());
    assert!(player.property("hp").expect("hp 字段").value.as_str().is_err());

    let chest = entities.entity_at(IVec2::new(50, 20)).expect("Chest");
    assert_eq!(chest.identifier, "Chest");
    let chest_tile = chest.tile.as_ref().expect("Chest 图标");
    assert_eq!(chest_tile.rect, Rect::new(32, 16, 16, 16));

    let torch = entities.entity_by_identifier("Torch").expect("Torch");
    let torch_tile = torch.tile.as_ref().expect("Torch 图标");
    assert!(project.tileset_for_rect(torch_tile).is_none());
    assert_eq!(torch_tile.rect, Rect::new(0, 0, 8, 8));
}

#[test]
fn level_lookup_by_world_point_picks_first_match() {
    let project = LdtkFacade::new()
        .load(&fixture("dungeon.ldtk"))
        .expect("读取 LDtk 失败");
    let identifier = |x, y| {
        project
            .level_at(IVec2::new(x, y))
            .map(|level| level.identifier.as_str())
    };
    assert_eq!(identifier(10, 10), Some("Level_0"));
    assert_eq!(identifier(80, 8), Some("Level_1"));
    assert_eq!(identifier(10, 60), Some("Level_2"));
    // 两个关卡共享边界 y=48，列表顺序靠前者胜出
    assert_eq!(identifier(10, 48), Some("Level_0"));
    assert_eq!(identifier(-1, 0), None);
}

#[test]
fn strict_references_reject_unknown_tileset() {
    let loader = LdtkFacade::new().with_options(LoadOptions {
        strict_references: true,
    });
    let err = loader.load(&fixture("dungeon.ldtk")).unwrap_err();
    assert!(
        matches!(err, LoadError::UnresolvedReference(ref message) if message.contains("42")),
        "unexpected error: {err}"
    );
}

#[test]
fn missing_background_position_is_malformed() {
    let err = LdtkFacade::new()
        .load(&fixture("missing_bg_pos.ldtk"))
        .unwrap_err();
    assert!(
        matches!(err, LoadError::MalformedDocument(ref message) if message.contains("__bgPos")),
        "unexpected error: {err}"
    );
}

#[test]
fn missing_file_reports_io_error_with_path() {
    let path = fixture("does_not_exist.ldtk");
    let err = LdtkFacade::new().load(&path).unwrap_err();
    match err {
        LoadError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn entry_points_agree() {
    let path = fixture("dungeon.ldtk");
    let bytes = fs::read(&path).expect("读取夹具失败");

    let from_bytes = load_bytes(&bytes).expect("load_bytes");
    let from_reader = load_reader(bytes.as_slice()).expect("load_reader");
    let rooted = FsSource::with_root(fixture(""));
    let from_fs = load_from_source(&rooted, Path::new("dungeon.ldtk")).expect("FsSource");

    let mut memory = MemorySource::new();
    memory.insert("embedded/dungeon.ldtk", bytes.clone());
    let from_memory =
        load_from_source(&memory, Path::new("embedded/dungeon.ldtk")).expect("MemorySource");

    assert_eq!(from_bytes, from_reader);
    assert_eq!(from_bytes, from_fs);
    assert_eq!(from_bytes, from_memory);
}

#[test]
fn truncated_document_is_malformed() {
    let bytes = fs::read(fixture("minimal.ldtk")).expect("读取夹具失败");
    let err = load_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
    assert!(matches!(err, LoadError::MalformedDocument(_)));
}
