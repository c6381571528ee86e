//! 数词记录存储（SQLite）
//!
//! ## 职责
//! - 保存含数词的原始句子（`sentences`）
//! - 保存每个数词的出现记录及其标签状态（`number_level_analysis`）
//! - 事务边界由调用方控制：标签更新通过 [`LabelTransaction`] 按批次提交
//!
//! 存储错误原样返回给调用方，未提交的事务在 drop 时自动回滚。

mod migrations;

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row, Transaction};
use tracing::{error, info};

use crate::error::{StoreError, StoreResult};
use crate::models::{LabelSummary, LabelType, NewOccurrence, NumeralOccurrence, SourceSentence};

use migrations::run_migrations;

const OCCURRENCE_COLUMNS: &str =
    "id, source_id, sentence, number_text, number_start, number_end, number_type, created_at";

/// 数词记录存储
pub struct TokenStore {
    conn: Connection,
}

impl TokenStore {
    /// 打开（或创建）数据库文件
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("启用 WAL 模式失败: {err}");
        }
        Self::init(conn)
    }

    /// 内存数据库，用于测试和试运行
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> StoreResult<Self> {
        run_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    // ========== 句子 ==========

    /// 追加一批句子，在同一个事务中提交
    ///
    /// `sentences` 中每一项为 `(doc_id, content)`。
    pub fn append_sentences(&mut self, sentences: &[(String, String)]) -> StoreResult<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT INTO sentences (doc_id, content) VALUES (?1, ?2)")?;
            for (doc_id, content) in sentences {
                stmt.execute(params![doc_id, content])?;
            }
        }
        tx.commit()?;
        Ok(sentences.len())
    }

    pub fn sentence_count(&self) -> StoreResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM sentences")
    }

    /// 按 id 升序读取句子，可排除含指定标记（如"第"）的句子
    pub fn fetch_sentences(&self, exclude_marker: Option<&str>) -> StoreResult<Vec<SourceSentence>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, doc_id, content FROM sentences
             WHERE ?1 IS NULL OR instr(content, ?1) = 0
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![exclude_marker], |row| {
            Ok(SourceSentence {
                id: row.get(0)?,
                doc_id: row.get(1)?,
                content: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ========== 数词记录 ==========

    pub fn occurrence_count(&self) -> StoreResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM number_level_analysis")
    }

    /// 插入数词记录；表中已有数据时直接跳过
    ///
    /// 返回实际插入的条数。重复执行提取不会产生重复记录。
    pub fn insert_if_absent(&mut self, occurrences: &[NewOccurrence]) -> StoreResult<usize> {
        let existing = self.occurrence_count()?;
        if existing > 0 {
            info!("表中已有 {} 条记录，跳过数词插入", existing);
            return Ok(0);
        }

        let created_at = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO number_level_analysis
                 (source_id, sentence, number_text, number_start, number_end, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for occurrence in occurrences {
                stmt.execute(params![
                    occurrence.source_id,
                    occurrence.sentence,
                    occurrence.number_text,
                    to_i64(occurrence.start)?,
                    to_i64(occurrence.end)?,
                    created_at,
                ])?;
            }
        }
        tx.commit()?;

        Ok(occurrences.len())
    }

    /// 读取所有未标注的记录，按 id 升序
    pub fn fetch_unlabeled(&self) -> StoreResult<Vec<NumeralOccurrence>> {
        let sql = format!(
            "SELECT {OCCURRENCE_COLUMNS} FROM number_level_analysis
             WHERE number_type IS NULL
             ORDER BY id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut occurrences = Vec::new();
        while let Some(row) = rows.next()? {
            occurrences.push(row_to_occurrence(row)?);
        }
        Ok(occurrences)
    }

    pub fn fetch_by_id(&self, id: i64) -> StoreResult<Option<NumeralOccurrence>> {
        let sql = format!("SELECT {OCCURRENCE_COLUMNS} FROM number_level_analysis WHERE id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_occurrence(row)?)),
            None => Ok(None),
        }
    }

    /// 开启一个标签更新事务
    pub fn begin_labels(&mut self) -> StoreResult<LabelTransaction<'_>> {
        Ok(LabelTransaction {
            tx: self.conn.transaction()?,
        })
    }

    /// 将所有失败记录重置为未标注，返回重置条数
    ///
    /// 标注流程本身不会调用，只用于人工重跑。
    pub fn reset_failed(&mut self) -> StoreResult<usize> {
        let failed = LabelType::Failed.code();
        Ok(self.conn.execute(
            "UPDATE number_level_analysis SET number_type = NULL WHERE number_type = ?1",
            params![failed],
        )?)
    }

    /// 统计各标签的记录数
    pub fn label_summary(&self) -> StoreResult<LabelSummary> {
        let mut stmt = self.conn.prepare(
            "SELECT number_type, COUNT(*) FROM number_level_analysis GROUP BY number_type",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = LabelSummary::default();
        for row in rows {
            let (code, n) = row?;
            // CHECK 约束保证编码合法
            if let Some(label) = LabelType::from_code(code) {
                summary.add(label, n.max(0) as u64);
            }
        }
        Ok(summary)
    }
}

/// 一个批次的标签更新事务
///
/// 只有调用 [`LabelTransaction::commit`] 后更新才会落库，drop 时自动回滚。
pub struct LabelTransaction<'a> {
    tx: Transaction<'a>,
}

impl LabelTransaction<'_> {
    /// 将未标注记录更新为终态标签
    ///
    /// 已是终态的记录不会被改写，返回值表示是否实际更新了一行。
    pub fn update_label(&self, id: i64, label: LabelType) -> StoreResult<bool> {
        let Some(code) = label.code() else {
            return Ok(false);
        };
        let updated = self.tx.execute(
            "UPDATE number_level_analysis SET number_type = ?1
             WHERE id = ?2 AND number_type IS NULL",
            params![code, id],
        )?;
        Ok(updated == 1)
    }

    pub fn commit(self) -> StoreResult<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn count(conn: &Connection, sql: &str) -> StoreResult<u64> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(n.max(0) as u64)
}

fn to_i64(value: usize) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange(value.to_string()))
}

fn to_usize(value: i64) -> StoreResult<usize> {
    usize::try_from(value).map_err(|_| StoreError::OutOfRange(value.to_string()))
}

fn row_to_occurrence(row: &Row) -> StoreResult<NumeralOccurrence> {
    let id: i64 = row.get("id")?;
    let code: Option<i64> = row.get("number_type")?;
    let created_at: String = row.get("created_at")?;

    let label = LabelType::from_code(code).ok_or(StoreError::InvalidLabelCode {
        id,
        code: code.unwrap_or_default(),
    })?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StoreError::InvalidTimestamp {
            id,
            value: created_at.clone(),
        })?;

    Ok(NumeralOccurrence {
        id,
        source_id: row.get("source_id")?,
        sentence: row.get("sentence")?,
        number_text: row.get("number_text")?,
        start: to_usize(row.get("number_start")?)?,
        end: to_usize(row.get("number_end")?)?,
        label,
        created_at,
    })
}

#[cfg(test)]
impl TokenStore {
    /// 测试中安装触发器、读取辅助表
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}
