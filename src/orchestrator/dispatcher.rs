//! 并发调度器 - 编排层
//!
//! ## 职责
//!
//! 1. **并发请求**：使用 Semaphore 限制同时请求的批次数
//! 2. **按完成顺序收集**：工作任务把结果发到通道，哪个批次先返回就先处理哪个
//! 3. **串行回写**：只有调度循环持有数据库句柄，同一时刻只有一个事务
//! 4. **取消**：收到取消信号后放弃所有进行中的请求，已提交的批次不受影响

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{OracleError, StoreResult};
use crate::models::{LabelSummary, NumeralOccurrence};
use crate::orchestrator::reconciler;
use crate::services::{ChatTransport, OracleClient, OracleVerdicts};
use crate::store::TokenStore;

/// 一个批次的请求结果
struct BatchOutcome {
    index: usize,
    batch: Vec<NumeralOccurrence>,
    result: Result<OracleVerdicts, OracleError>,
}

/// 调度统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 提交给调度器的批次数
    pub batches: usize,
    /// 已回写提交的批次数
    pub committed_batches: usize,
    /// 整批失败的批次数
    pub failed_batches: usize,
    /// 实际写入的各标签数量
    pub applied: LabelSummary,
    /// 是否被取消
    pub cancelled: bool,
}

/// 并发调度器
pub struct Dispatcher<T> {
    client: Arc<OracleClient<T>>,
    workers: usize,
}

impl<T: ChatTransport + 'static> Dispatcher<T> {
    pub fn new(client: Arc<OracleClient<T>>, workers: usize) -> Self {
        Self {
            client,
            workers: workers.max(1),
        }
    }

    /// 运行所有批次直到完成或被取消
    ///
    /// 存储错误会立即终止本次运行，进行中的请求随之放弃；
    /// 之前已提交的批次保持不变。
    pub async fn run(
        &self,
        store: &mut TokenStore,
        batches: Vec<Vec<NumeralOccurrence>>,
        cancel: &CancellationToken,
    ) -> StoreResult<DispatchReport> {
        let mut report = DispatchReport {
            batches: batches.len(),
            ..Default::default()
        };
        let total_records: usize = batches.iter().map(Vec::len).sum();

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let (tx, mut rx) = mpsc::channel(self.workers);

        let handles: Vec<JoinHandle<()>> = batches
            .into_iter()
            .enumerate()
            .map(|(index, batch)| {
                self.spawn_batch(index, batch, Arc::clone(&semaphore), tx.clone())
            })
            .collect();
        drop(tx);

        let collected = collect_outcomes(store, &mut rx, cancel, &mut report, total_records).await;

        // 已结束的任务 abort 无副作用
        for handle in &handles {
            handle.abort();
        }
        collected?;

        if report.cancelled {
            warn!(
                "🛑 已取消，放弃 {} 个未回写的批次",
                report.batches - report.committed_batches
            );
        }

        Ok(report)
    }

    fn spawn_batch(
        &self,
        index: usize,
        batch: Vec<NumeralOccurrence>,
        semaphore: Arc<Semaphore>,
        tx: mpsc::Sender<BatchOutcome>,
    ) -> JoinHandle<()> {
        let client = Arc::clone(&self.client);
        tokio::spawn(async move {
            let Ok(permit) = semaphore.acquire_owned().await else {
                return;
            };

            let ids: Vec<i64> = batch.iter().take(5).map(|r| r.id).collect();
            info!(
                "🚀 处理批次 {}: ids={:?}{} (共{}条)",
                index + 1,
                ids,
                if batch.len() > 5 { "..." } else { "" },
                batch.len()
            );

            let result = AssertUnwindSafe(client.classify(&batch))
                .catch_unwind()
                .await
                .unwrap_or(Err(OracleError::WorkerPanicked));
            drop(permit);

            // 接收端关闭说明本次运行已结束
            let _ = tx
                .send(BatchOutcome {
                    index,
                    batch,
                    result,
                })
                .await;
        })
    }
}

/// 逐个接收完成的批次并回写，直到全部完成或被取消
async fn collect_outcomes(
    store: &mut TokenStore,
    rx: &mut mpsc::Receiver<BatchOutcome>,
    cancel: &CancellationToken,
    report: &mut DispatchReport,
    total_records: usize,
) -> StoreResult<()> {
    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.cancelled = true;
                return Ok(());
            }
            outcome = rx.recv() => outcome,
        };
        let Some(outcome) = outcome else {
            return Ok(());
        };

        if let Err(e) = &outcome.result {
            warn!("⚠️ 批次 {} 失败，整批标记为-1: {}", outcome.index + 1, e);
            report.failed_batches += 1;
        }

        let applied = reconciler::reconcile(store, &outcome.batch, &outcome.result)?;
        report.committed_batches += 1;
        merge(&mut report.applied, &applied);

        info!(
            "💾 批次 {}/{} 完成: 已写入 {}/{}, 失败 {}",
            outcome.index + 1,
            report.batches,
            report.applied.labeled_total(),
            total_records,
            report.applied.failed
        );
    }
}

fn merge(total: &mut LabelSummary, part: &LabelSummary) {
    for label in crate::models::LabelType::TERMINAL {
        total.add(label, part.count(label));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::models::{LabelType, NewOccurrence};
    use crate::orchestrator::batcher::make_batches;
    use crate::services::oracle_client::tests::{connection_error, RecordingSleeper};
    use crate::services::RetryPolicy;
    use futures::future::BoxFuture;
    use std::num::NonZeroUsize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 把每条记录都判为基数的传输层，同时记录最大并发请求数
    ///
    /// 含"坏"字的批次连接失败，含"慢"字的批次延迟返回。
    struct RoutingTransport {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl RoutingTransport {
        fn new(delay: Duration) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
                delay,
            }
        }
    }

    impl ChatTransport for RoutingTransport {
        fn complete<'a>(
            &'a self,
            prompt: &'a str,
        ) -> BoxFuture<'a, Result<String, TransportError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                // 含"慢"字的批次耗时更长
                let delay = if prompt.contains("慢慢") {
                    self.delay * 40
                } else if prompt.contains('慢') {
                    self.delay * 20
                } else {
                    self.delay
                };
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                // 含"坏"字的批次总是连接失败
                if prompt.contains("坏") {
                    return Err(connection_error());
                }
                let ids = extract_ids(prompt);
                let results: Vec<String> = ids
                    .iter()
                    .map(|id| format!(r#"{{"id": {}, "type": 0}}"#, id))
                    .collect();
                Ok(format!(r#"{{"results": [{}]}}"#, results.join(",")))
            }
            .boxed()
        }
    }

    fn extract_ids(prompt: &str) -> Vec<i64> {
        prompt
            .lines()
            .filter_map(|line| line.trim().strip_prefix(r#""id": "#))
            .filter_map(|rest| rest.trim_end_matches(',').parse().ok())
            .collect()
    }

    fn seeded_store(sentences: &[&str]) -> TokenStore {
        let mut store = TokenStore::open_in_memory().unwrap();
        let occurrences: Vec<NewOccurrence> = sentences
            .iter()
            .enumerate()
            .map(|(i, s)| NewOccurrence {
                source_id: i as i64 + 1,
                sentence: s.to_string(),
                number_text: "三".to_string(),
                start: 0,
                end: 1,
            })
            .collect();
        store.insert_if_absent(&occurrences).unwrap();
        store
    }

    fn dispatcher(
        transport: Arc<RoutingTransport>,
        workers: usize,
    ) -> Dispatcher<Arc<RoutingTransport>> {
        let client = OracleClient::with_sleeper(
            transport,
            RetryPolicy::new(2, Duration::from_millis(1), Duration::from_secs(5)),
            Arc::new(RecordingSleeper::default()),
        );
        Dispatcher::new(Arc::new(client), workers)
    }

    #[tokio::test]
    async fn test_every_batched_record_reaches_terminal_state() {
        let sentences: Vec<&str> = std::iter::repeat("三楼住着一百人").take(23).collect();
        let mut store = seeded_store(&sentences);
        let transport = Arc::new(RoutingTransport::new(Duration::from_millis(5)));
        let dispatcher = dispatcher(transport.clone(), 3);

        let batches = make_batches(store.fetch_unlabeled().unwrap(), NonZeroUsize::new(4).unwrap());
        let report = dispatcher
            .run(&mut store, batches, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.batches, 6);
        assert_eq!(report.committed_batches, 6);
        assert_eq!(report.failed_batches, 0);
        assert_eq!(report.applied.cardinal, 23);
        assert!(store.fetch_unlabeled().unwrap().is_empty());
        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_affect_others() {
        let mut store = seeded_store(&["三楼", "三人", "坏三", "三天"]);
        let transport = Arc::new(RoutingTransport::new(Duration::from_millis(1)));
        let dispatcher = dispatcher(transport.clone(), 2);

        let batches = make_batches(store.fetch_unlabeled().unwrap(), NonZeroUsize::new(2).unwrap());
        let report = dispatcher
            .run(&mut store, batches, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.failed_batches, 1);
        assert_eq!(report.applied.failed, 2);
        assert_eq!(report.applied.cardinal, 2);
        assert_eq!(store.fetch_by_id(1).unwrap().unwrap().label, LabelType::Cardinal);
        assert_eq!(store.fetch_by_id(2).unwrap().unwrap().label, LabelType::Cardinal);
        assert_eq!(store.fetch_by_id(3).unwrap().unwrap().label, LabelType::Failed);
        assert_eq!(store.fetch_by_id(4).unwrap().unwrap().label, LabelType::Failed);
        // 失败批次重试 2 次，成功批次 1 次
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_commits_nothing_in_flight() {
        let mut store = seeded_store(&["三楼", "三人"]);
        let transport = Arc::new(RoutingTransport::new(Duration::from_secs(60)));
        let dispatcher = dispatcher(transport, 2);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let batches = make_batches(store.fetch_unlabeled().unwrap(), NonZeroUsize::new(1).unwrap());
        let report = dispatcher.run(&mut store, batches, &cancel).await.unwrap();

        assert!(report.cancelled);
        assert_eq!(report.committed_batches, 0);
        assert_eq!(store.fetch_unlabeled().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_list_is_noop() {
        let mut store = seeded_store(&[]);
        let transport = Arc::new(RoutingTransport::new(Duration::ZERO));
        let dispatcher = dispatcher(transport, 2);

        let report = dispatcher
            .run(&mut store, Vec::new(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report, DispatchReport::default());
    }

    /// 记录每次标签写入的顺序
    fn record_label_order(store: &TokenStore) {
        store
            .connection()
            .execute_batch(
                "CREATE TABLE label_log (seq INTEGER PRIMARY KEY AUTOINCREMENT, occurrence_id INTEGER);
                 CREATE TRIGGER log_label AFTER UPDATE OF number_type ON number_level_analysis
                 BEGIN
                     INSERT INTO label_log (occurrence_id) VALUES (NEW.id);
                 END;",
            )
            .unwrap();
    }

    fn label_order(store: &TokenStore) -> Vec<i64> {
        let conn = store.connection();
        let mut stmt = conn
            .prepare("SELECT occurrence_id FROM label_log ORDER BY seq")
            .unwrap();
        let ids = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<i64>, _>>()
            .unwrap();
        ids
    }

    #[tokio::test]
    async fn test_batches_are_reconciled_in_completion_order() {
        let mut store = seeded_store(&["慢三", "三楼", "三人"]);
        record_label_order(&store);
        let transport = Arc::new(RoutingTransport::new(Duration::from_millis(5)));
        let dispatcher = dispatcher(transport, 3);

        let batches = make_batches(store.fetch_unlabeled().unwrap(), NonZeroUsize::new(1).unwrap());
        let report = dispatcher
            .run(&mut store, batches, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.committed_batches, 3);
        let order = label_order(&store);
        assert_eq!(order.len(), 3);
        // 最先提交的批次最慢，最后回写
        assert_eq!(order[2], 1);
    }

    #[tokio::test]
    async fn test_store_error_stops_run_and_keeps_committed_batches() {
        let mut store = seeded_store(&["三楼", "慢三", "慢慢三"]);
        store
            .connection()
            .execute_batch(
                "CREATE TRIGGER reject_second BEFORE UPDATE ON number_level_analysis
                 WHEN OLD.id = 2
                 BEGIN
                     SELECT RAISE(ABORT, 'disk I/O error');
                 END;",
            )
            .unwrap();
        let transport = Arc::new(RoutingTransport::new(Duration::from_millis(5)));
        let dispatcher = dispatcher(transport, 3);

        let batches = make_batches(store.fetch_unlabeled().unwrap(), NonZeroUsize::new(1).unwrap());
        let result = dispatcher
            .run(&mut store, batches, &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(crate::error::StoreError::Sqlite(_))));
        assert_eq!(store.fetch_by_id(1).unwrap().unwrap().label, LabelType::Cardinal);
        assert_eq!(store.fetch_by_id(2).unwrap().unwrap().label, LabelType::Unlabeled);
        assert_eq!(store.fetch_by_id(3).unwrap().unwrap().label, LabelType::Unlabeled);
    }
}
