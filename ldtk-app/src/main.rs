use std::path::PathBuf;

use ldtk_config::AppConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "用法: ldtk-app [--config <配置文件>] [--level <关卡>] [--strict] [工程.ldtk]";

/// 命令行参数；未出现的选项保持配置文件中的取值。
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    project: Option<PathBuf>,
    start_level: Option<String>,
    strict: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().ok_or("`--config` 需要提供配置文件路径")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--level" => {
                    let level = args.next().ok_or("`--level` 需要提供关卡标识符")?;
                    parsed.start_level = Some(level);
                }
                "--strict" => parsed.strict = true,
                flag if flag.starts_with("--") => return Err(format!("未知参数：{flag}")),
                path if parsed.project.is_none() => parsed.project = Some(PathBuf::from(path)),
                extra => return Err(format!("只能指定一个工程文件：{extra}")),
            }
        }
        Ok(parsed)
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(level) = &self.start_level {
            config.frontend.start_level = Some(level.clone());
        }
        if self.strict {
            config.loader.strict_references = true;
        }
    }
}

fn main() {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };

    let mut config = load_configuration(args.config.as_ref());
    args.apply(&mut config);
    init_logging(&config);
    info!(strict = config.loader.strict_references, "启动 LDtk 工程查看器");

    if let Err(err) = ldtk_frontend::run_cli(args.project.as_deref(), &config) {
        error!(error = %err, "执行 CLI 概览失败");
        std::process::exit(1);
    }
}

/// 配置读取失败不致命，记录后回退到内建默认值。
fn load_configuration(explicit: Option<&PathBuf>) -> AppConfig {
    let loaded = match explicit {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    loaded.unwrap_or_else(|err| {
        warn!(error = %err, "加载配置失败，使用内建默认值");
        AppConfig::default()
    })
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));
    // 重复初始化时忽略
    let _ = fmt().with_env_filter(filter).try_init();
}
