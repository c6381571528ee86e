//! 日志工具模块
//!
//! 提供日志初始化和格式化输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::extraction::OrdinalMarkerStats;
use crate::models::{LabelSummary, LabelType};

/// 初始化日志
///
/// 默认级别为 `info`，可通过 `RUST_LOG` 覆盖。重复调用不会报错。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(command: &str, config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 数词标注 ({})", command);
    info!("🗄️ 数据库: {}", config.database_path);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("{}", "=".repeat(60));
}

/// 记录并发配置
///
/// # 参数
/// - `total`: 待标注记录数
/// - `batches`: 批次数
/// - `batch_size`: 每批记录数
/// - `workers`: 最大并发数
pub fn log_dispatch_plan(total: usize, batches: usize, batch_size: usize, workers: usize) {
    info!(
        "🔧 并发配置：总记录={}, 批次数={}, BATCH_SIZE={}, MAX_WORKERS={}",
        total, batches, batch_size, workers
    );
}

/// 打印各标签的统计表
pub fn print_label_report(summary: &LabelSummary) {
    info!("{}", "=".repeat(50));
    info!("📊 数词类型统计:");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(50));
    for label in LabelType::TERMINAL {
        info!(
            "  {:<10}: {:6} 条 ({:5.2}%)",
            label.name(),
            summary.count(label),
            summary.percentage(label)
        );
    }
    if summary.unlabeled > 0 {
        info!("  {:<10}: {:6} 条", LabelType::Unlabeled.name(), summary.unlabeled);
    }
    info!("{}", "=".repeat(50));
}

/// 打印"第 + 数词"统计
pub fn print_ordinal_stats(stats: &OrdinalMarkerStats, sentences: u64) {
    info!("{}", "=".repeat(50));
    info!("📊 含“第”的序数词统计结果");
    info!("{}", "=".repeat(50));
    info!("句子总数             : {}", sentences);
    info!("含“第”的句子数       : {}", stats.sentence_count);
    info!("“第 + 数词”总出现次数 : {}", stats.match_count);
    info!("{}", "=".repeat(50));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_counts_chars() {
        assert_eq!(truncate_text("三楼住着一百人", 3), "三楼住...");
        assert_eq!(truncate_text("三楼", 3), "三楼");
    }

    #[test]
    fn test_init_is_repeatable() {
        init();
        init();
    }
}
