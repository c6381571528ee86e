use std::path::PathBuf;

use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use numeral_annotator::utils::logging;
use numeral_annotator::{App, Config};

/// 子命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Ingest,
    Extract,
    Label,
    Run,
    Stats,
    ResetFailed,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "ingest" => Some(Self::Ingest),
            "extract" => Some(Self::Extract),
            "label" => Some(Self::Label),
            "run" => Some(Self::Run),
            "stats" => Some(Self::Stats),
            "reset-failed" => Some(Self::ResetFailed),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Extract => "extract",
            Self::Label => "label",
            Self::Run => "run",
            Self::Stats => "stats",
            Self::ResetFailed => "reset-failed",
        }
    }
}

const USAGE: &str =
    "用法: numeral-annotator [ingest|extract|label|run|stats|reset-failed] [--config <path>]";

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<(Command, Option<PathBuf>)> {
    let mut command = None;
    let mut config_path = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--config" {
            match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => bail!("--config 缺少路径\n{}", USAGE),
            }
        } else if command.is_none() {
            match Command::parse(&arg) {
                Some(cmd) => command = Some(cmd),
                None => bail!("未知命令: {}\n{}", arg, USAGE),
            }
        } else {
            bail!("多余的参数: {}\n{}", arg, USAGE);
        }
    }

    Ok((command.unwrap_or(Command::Run), config_path))
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    let (command, config_path) = parse_args(std::env::args().skip(1))?;

    // 加载配置
    let config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::from_env(),
    };
    logging::log_startup(command.name(), &config);

    let mut app = App::open(config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，正在取消标注...");
            ctrl_c.cancel();
        }
    });

    match command {
        Command::Ingest => {
            app.ingest().await?;
        }
        Command::Extract => {
            app.extract()?;
        }
        Command::Label => {
            app.label(&cancel).await?;
            app.report()?;
        }
        Command::Run => {
            app.run(&cancel).await?;
        }
        Command::Stats => {
            app.stats()?;
        }
        Command::ResetFailed => {
            app.reset_failed()?;
        }
    }

    Ok(())
}
