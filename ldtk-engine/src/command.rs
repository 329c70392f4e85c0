use std::collections::HashMap;

use ldtk_core::glam::IVec2;

use crate::scene::Scene;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    pub fn new(name: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(NextLevelCommand);
        bus.register(PreviousLevelCommand);
        bus.register(GotoLevelCommand);
        bus.register(SelectLevelAtCommand);
        bus.register(ToggleLayerCommand);
        bus.register(SetLayerVisibleCommand {
            name: "show_layer",
            visible: true,
        });
        bus.register(SetLayerVisibleCommand {
            name: "hide_layer",
            visible: false,
        });
        bus.register(ResetLayersCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

struct NextLevelCommand;

impl CommandHandler for NextLevelCommand {
    fn name(&self) -> &'static str {
        "next_level"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.scene.next_level() {
            Ok(level) => CommandResponse::ok(format!("当前关卡: {}", level.identifier)),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct PreviousLevelCommand;

impl CommandHandler for PreviousLevelCommand {
    fn name(&self) -> &'static str {
        "previous_level"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match context.scene.previous_level() {
            Ok(level) => CommandResponse::ok(format!("当前关卡: {}", level.identifier)),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

/// 参数可以是关卡标识符，也可以是下标。
struct GotoLevelCommand;

impl CommandHandler for GotoLevelCommand {
    fn name(&self) -> &'static str {
        "goto_level"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(target) = request.args.first() else {
            return CommandResponse::err("goto_level 需要关卡标识符或下标");
        };
        let result = match target.parse::<usize>() {
            Ok(index) => context.scene.goto_level(index),
            Err(_) => context.scene.goto_level_by_identifier(target),
        };
        match result {
            Ok(level) => CommandResponse::ok(format!("当前关卡: {}", level.identifier)),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct SelectLevelAtCommand;

impl CommandHandler for SelectLevelAtCommand {
    fn name(&self) -> &'static str {
        "select_level_at"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let coords: Vec<i32> = request
            .args
            .iter()
            .filter_map(|arg| arg.parse().ok())
            .collect();
        let [x, y] = coords.as_slice() else {
            return CommandResponse::err("select_level_at 需要两个整数坐标");
        };
        match context.scene.select_level_at(IVec2::new(*x, *y)) {
            Some(index) => CommandResponse::ok(format!("已切换到第 {index} 个关卡")),
            None => CommandResponse::err(format!("({x}, {y}) 不在任何关卡内")),
        }
    }
}

struct ToggleLayerCommand;

impl CommandHandler for ToggleLayerCommand {
    fn name(&self) -> &'static str {
        "toggle_layer"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(identifier) = request.args.first() else {
            return CommandResponse::err("toggle_layer 需要图层标识符");
        };
        match context.scene.toggle_layer(identifier) {
            Ok(true) => CommandResponse::ok(format!("图层 {identifier} 已显示")),
            Ok(false) => CommandResponse::ok(format!("图层 {identifier} 已隐藏")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

/// `show_layer` / `hide_layer`：显式设置显隐，覆盖文件中的 `visible`。
struct SetLayerVisibleCommand {
    name: &'static str,
    visible: bool,
}

impl CommandHandler for SetLayerVisibleCommand {
    fn name(&self) -> &'static str {
        self.name
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let Some(identifier) = request.args.first() else {
            return CommandResponse::err(format!("{} 需要图层标识符", self.name));
        };
        match context.scene.set_layer_visible(identifier, self.visible) {
            Ok(()) if self.visible => CommandResponse::ok(format!("图层 {identifier} 已显示")),
            Ok(()) => CommandResponse::ok(format!("图层 {identifier} 已隐藏")),
            Err(err) => CommandResponse::err(err.to_string()),
        }
    }
}

struct ResetLayersCommand;

impl CommandHandler for ResetLayersCommand {
    fn name(&self) -> &'static str {
        "reset_layers"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.scene.reset_layer_visibility();
        CommandResponse::ok("图层显隐已恢复为文件设置")
    }
}
