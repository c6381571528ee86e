//! 标注流程 - 编排层
//!
//! ## 职责
//!
//! 1. **入库**：从语料来源逐篇读取文档，分句后保存含数词的句子
//! 2. **抽取**：对已入库句子抽取数词，写入待标注表（只在表为空时执行）
//! 3. **标注**：分批、并发调用大模型，逐批回写
//! 4. **统计**：输出各标签数量与"第"字序数标记统计
//!
//! `App` 独占数据库连接，各阶段按顺序执行。

use std::num::NonZeroUsize;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::extraction::{NumeralExtractor, OrdinalMarkerStats};
use crate::models::{LabelSummary, NewOccurrence};
use crate::orchestrator::batcher::make_batches;
use crate::orchestrator::dispatcher::{DispatchReport, Dispatcher};
use crate::services::{ChatTransport, LlmService, OracleClient, RetryPolicy};
use crate::sources::{DocumentSource, HuggingFaceSource, JsonlSource};
use crate::store::TokenStore;
use crate::utils::logging;

/// 入库统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub sentences: usize,
}

/// 应用主结构
pub struct App {
    config: Config,
    store: TokenStore,
    extractor: NumeralExtractor,
}

impl App {
    /// 校验配置并打开数据库
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        let store = TokenStore::open(&config.database_path)
            .with_context(|| format!("打开数据库失败: {}", config.database_path))?;
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: TokenStore) -> Result<Self> {
        let extractor = NumeralExtractor::new().context("编译数词正则失败")?;
        Ok(Self {
            config,
            store,
            extractor,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// 从配置的来源入库
    ///
    /// 配置了 `jsonl_path` 时读本地文件，否则读 Hugging Face 数据集。
    pub async fn ingest(&mut self) -> Result<IngestReport> {
        match self.config.jsonl_path.clone() {
            Some(path) => {
                info!("📁 读取本地语料: {}", path);
                let mut source = JsonlSource::open(&path)
                    .await
                    .with_context(|| format!("打开语料文件失败: {}", path))?;
                self.ingest_from(&mut source).await
            }
            None => {
                info!(
                    "🌐 读取数据集: {} ({}/{})",
                    self.config.hf_dataset, self.config.hf_config, self.config.hf_split
                );
                let mut source = HuggingFaceSource::new(&self.config);
                self.ingest_from(&mut source).await
            }
        }
    }

    /// 逐篇读取文档，保存含数词的句子
    ///
    /// 每攒够 `commit_interval` 句提交一次；来源读完或出错时结束输入。
    pub async fn ingest_from<S>(&mut self, source: &mut S) -> Result<IngestReport>
    where
        S: DocumentSource + ?Sized,
    {
        let mut report = IngestReport::default();
        let mut pending: Vec<(String, String)> = Vec::new();

        while report.documents < self.config.max_documents {
            let Some(doc) = source.next_document().await else {
                break;
            };
            report.documents += 1;

            if report.documents % 500 == 0 {
                info!(
                    "⏳ 进度: 已处理 {} 篇文档，已保存 {} 个句子",
                    report.documents,
                    report.sentences + pending.len()
                );
            }

            if doc.text.is_empty() {
                continue;
            }

            for sentence in self.extractor.split_sentences(&doc.text) {
                if !self.extractor.contains_numeral(&sentence) {
                    continue;
                }
                pending.push((doc.id.clone(), sentence));

                if pending.len() >= self.config.commit_interval {
                    report.sentences += self.store.append_sentences(&pending)?;
                    info!(
                        "💾 [{}] 已提交 (总数: {}): {}",
                        doc.id,
                        report.sentences,
                        logging::truncate_text(&pending[pending.len() - 1].1, 60)
                    );
                    pending.clear();
                }
            }
        }

        if !pending.is_empty() {
            report.sentences += self.store.append_sentences(&pending)?;
        }

        info!(
            "✅ 入库完成: 文档 {} 篇，含数词句子 {} 个",
            report.documents, report.sentences
        );
        Ok(report)
    }

    /// 抽取数词写入待标注表
    ///
    /// 表中已有记录时不做任何事，返回 0。
    pub fn extract(&mut self) -> Result<usize> {
        let existing = self.store.occurrence_count()?;
        if existing > 0 {
            info!("⏭️ 待标注表已有 {} 条记录，跳过抽取", existing);
            return Ok(0);
        }

        let sentences = self.store.fetch_sentences(self.config.exclude_marker())?;
        info!("🔍 从 {} 个句子中抽取数词", sentences.len());

        let occurrences: Vec<NewOccurrence> = sentences
            .iter()
            .flat_map(|s| {
                self.extractor
                    .extract(&s.content)
                    .into_iter()
                    .map(move |span| NewOccurrence::from_span(s.id, &s.content, span))
            })
            .filter(NewOccurrence::has_valid_span)
            .collect();

        let inserted = self.store.insert_if_absent(&occurrences)?;
        info!("✅ 抽取完成: 写入 {} 条待标注记录", inserted);
        Ok(inserted)
    }

    /// 用配置中的模型标注所有未标注记录
    pub async fn label(&mut self, cancel: &CancellationToken) -> Result<DispatchReport> {
        let transport = LlmService::new(&self.config);
        let client = OracleClient::new(transport, RetryPolicy::from_config(&self.config));
        self.label_with(client, cancel).await
    }

    /// 用给定的标注客户端标注所有未标注记录
    pub async fn label_with<T>(
        &mut self,
        client: OracleClient<T>,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport>
    where
        T: ChatTransport + 'static,
    {
        let records = self.store.fetch_unlabeled()?;
        if records.is_empty() {
            info!("✅ 没有待标注的记录");
            return Ok(DispatchReport::default());
        }

        let batch_size = NonZeroUsize::new(self.config.batch_size)
            .ok_or_else(|| anyhow!("batch_size 必须大于 0"))?;
        let total = records.len();
        let batches = make_batches(records, batch_size);
        logging::log_dispatch_plan(
            total,
            batches.len(),
            batch_size.get(),
            self.config.max_workers,
        );

        let dispatcher = Dispatcher::new(Arc::new(client), self.config.max_workers);
        let report = dispatcher
            .run(&mut self.store, batches, cancel)
            .await
            .context("回写标注结果失败")?;

        if report.failed_batches > 0 {
            warn!(
                "⚠️ {} 个批次整批失败，可使用 reset-failed 重置后重新标注",
                report.failed_batches
            );
        }
        Ok(report)
    }

    /// 输出"第"字序数标记统计和当前标注统计
    pub fn stats(&self) -> Result<OrdinalMarkerStats> {
        let sentences = self.store.fetch_sentences(None)?;
        let ordinal = self
            .extractor
            .ordinal_marker_stats(sentences.iter().map(|s| s.content.as_str()));
        logging::print_ordinal_stats(&ordinal, sentences.len() as u64);
        self.report()?;
        Ok(ordinal)
    }

    /// 把失败记录重置为未标注
    pub fn reset_failed(&mut self) -> Result<usize> {
        let reset = self.store.reset_failed()?;
        info!("🔄 已重置 {} 条失败记录", reset);
        Ok(reset)
    }

    /// 输出各标签统计
    pub fn report(&self) -> Result<LabelSummary> {
        let summary = self.store.label_summary()?;
        logging::print_label_report(&summary);
        Ok(summary)
    }

    /// 完整流程：入库、抽取、标注、统计
    ///
    /// 已有入库句子时不再重复入库。
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LabelSummary> {
        if self.store.sentence_count()? == 0 {
            self.ingest().await?;
        } else {
            info!("⏭️ 句子表已有数据，跳过入库");
        }

        self.extract()?;
        let dispatch = self.label(cancel).await?;
        if dispatch.cancelled {
            warn!("🛑 标注已取消，未完成的记录保持未标注");
        }
        self.report()
    }
}
