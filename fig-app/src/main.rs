use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fig_config::{AppConfig, ConfigError};
use fig_core::container::Container;
use fig_core::document::Document;
use fig_io::{DocumentLoader, FigFacade, normalize};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const USAGE: &str = "用法：fig-app <input.fig> [--output <path>] [--config <path>] [--check]";

fn main() {
    let mut args = std::env::args().skip(1);
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut config_override: Option<PathBuf> = None;
    let mut check = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--check" => check = true,
            "--output" => {
                let Some(path) = args.next() else {
                    eprintln!("`--output` 需要提供输出文件路径");
                    std::process::exit(1);
                };
                output = Some(PathBuf::from(path));
            }
            "--config" => {
                let Some(path) = args.next() else {
                    eprintln!("`--config` 需要提供配置文件路径");
                    std::process::exit(1);
                };
                config_override = Some(PathBuf::from(path));
            }
            other if other.starts_with("--") => {
                eprintln!("未知参数：{other}");
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
            other => {
                if input.replace(PathBuf::from(other)).is_some() {
                    eprintln!("只能指定一个输入文件");
                    std::process::exit(1);
                }
            }
        }
    }

    let Some(input) = input else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };

    let config = load_configuration(config_override);
    init_logging(&config);

    let facade = FigFacade::with_options(config.writer.to_options());
    let mut document = match facade.load(&input) {
        Ok(document) => document,
        Err(err) => {
            error!(path = %input.display(), error = %err, "读取 FIG 文件失败");
            std::process::exit(1);
        }
    };
    log_summary(&input, &document);

    if check && !check_roundtrip(&facade, &input, &document) {
        std::process::exit(2);
    }

    if let Some(path) = output {
        match facade.save_document(&mut document, Some(&path)) {
            Ok(path) => info!(path = %path.display(), "已写出规范化文件"),
            Err(err) => {
                error!(path = %path.display(), error = %err, "写出 FIG 文件失败");
                std::process::exit(1);
            }
        }
    }
}

fn log_summary(path: &Path, document: &Document) {
    let mut kinds: BTreeMap<String, usize> = BTreeMap::new();
    for (_, object) in document.all_objects(true) {
        *kinds.entry(format!("{:?}", object.kind())).or_default() += 1;
    }
    let bounds = document.bounds();
    let extent = if bounds.is_empty() {
        "-".to_string()
    } else {
        bounds.to_string()
    };
    info!(
        path = %path.display(),
        top_level = document.len(),
        colors = document.colors().len(),
        layers = ?document.layers(),
        bounds = %extent,
        "文档概要"
    );
    for (kind, count) in kinds {
        info!(kind = %kind, count, "对象数量");
    }
    for color in document.colors().iter() {
        info!(index = color.index, hex = %color.hex(), "自定义颜色");
    }
}

/// 比较原文件与重新序列化结果（规范化后），返回是否一致。
fn check_roundtrip(facade: &FigFacade, path: &Path, document: &Document) -> bool {
    let original = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            error!(path = %path.display(), error = %err, "无法重新读取原文件");
            return false;
        }
    };
    let expected = normalize(&original);
    let actual = normalize(&facade.write_string(document));
    if expected == actual {
        info!(path = %path.display(), "往返检查通过");
        return true;
    }

    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();
    let total = expected_lines.len().max(actual_lines.len());
    let mut differences = 0usize;
    for index in 0..total {
        let before = expected_lines.get(index).copied().unwrap_or("<缺失>");
        let after = actual_lines.get(index).copied().unwrap_or("<缺失>");
        if before != after {
            differences += 1;
            warn!(line = index + 1, original = before, rewritten = after, "往返差异");
        }
    }
    warn!(path = %path.display(), differences, "往返检查未通过");
    false
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
