//! 分批
//!
//! 把待标注记录按原顺序切成固定大小的批次，只有最后一批可能不足。

use std::num::NonZeroUsize;

/// 按 `batch_size` 切分，批次之间不重叠，拼接后与输入完全一致
pub fn make_batches<T>(records: Vec<T>, batch_size: NonZeroUsize) -> Vec<Vec<T>> {
    let size = batch_size.get();
    let mut batches = Vec::with_capacity(records.len().div_ceil(size));
    let mut iter = records.into_iter().peekable();

    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }

    batches
}
