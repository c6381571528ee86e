//! 结果回写
//!
//! 把一个批次的模型结果映射回数据库记录：
//! - 整批失败（请求用尽重试 / 返回结构无效）：批次内所有记录标记为失败
//! - 部分成功：按 id 查找，`type` 有效则写入对应标签，否则标记为失败
//!
//! 每个批次只提交一次事务。

use crate::error::{OracleError, StoreResult};
use crate::models::{LabelSummary, LabelType, NumeralOccurrence};
use crate::services::OracleVerdicts;
use crate::store::TokenStore;

/// 计算批次内每条记录应写入的标签
///
/// 按 id 查找，不依赖返回顺序；批次外的 id 被忽略。
pub fn plan_labels(
    batch: &[NumeralOccurrence],
    outcome: &Result<OracleVerdicts, OracleError>,
) -> Vec<(i64, LabelType)> {
    match outcome {
        Err(_) => batch.iter().map(|r| (r.id, LabelType::Failed)).collect(),
        Ok(verdicts) => batch.iter().map(|r| (r.id, verdicts.label_for(r.id))).collect(),
    }
}

/// 在一个事务中写入批次结果并提交
///
/// 返回实际写入的各标签数量；已是终态的记录不会被改写，也不计入。
pub fn reconcile(
    store: &mut TokenStore,
    batch: &[NumeralOccurrence],
    outcome: &Result<OracleVerdicts, OracleError>,
) -> StoreResult<LabelSummary> {
    let plan = plan_labels(batch, outcome);

    let tx = store.begin_labels()?;
    let mut applied = LabelSummary::default();
    for (id, label) in plan {
        if tx.update_label(id, label)? {
            applied.add(label, 1);
        }
    }
    tx.commit()?;

    Ok(applied)
}
