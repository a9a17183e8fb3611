// ==========================================
// 不良品追踪系统 - 报废流程仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 约束: 批量写入 = 一个事务(记录 + 历史),部分写入即错误
// ==========================================

use crate::domain::history::HistoryEntry;
use crate::domain::scrap::ScrapWorkflowRecord;
use crate::domain::types::ScrapTaskState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, params_from_iter, Connection, Row, Transaction};
use std::sync::{Arc, Mutex};

// ==========================================
// ScrapWorkflowRepository - 报废流程仓储
// ==========================================
pub struct ScrapWorkflowRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScrapWorkflowRepository {
    /// 创建新的报废流程仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ScrapWorkflowRecord> {
        let status_code: i32 = row.get("apply_task_status")?;
        let apply_task_status = ScrapTaskState::from_code(status_code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                format!("unknown apply_task_status code: {status_code}").into(),
            )
        })?;

        Ok(ScrapWorkflowRecord {
            serial_number: row.get("serial_number")?,
            apply_task_status,
            task_number: row.get("task_number")?,
            po: row.get("po")?,
            cost: row.get("cost")?,
            remark: row.get("remark")?,
            purpose: row.get("purpose")?,
            category: row.get("category")?,
            created_at: row.get("created_at")?,
            applied_at: row.get("applied_at")?,
            approver_name: row.get("approver_name")?,
            find_board_status: row.get("find_board_status")?,
            revision: row.get("revision")?,
        })
    }

    const SELECT_COLS: &'static str = r#"
        SELECT serial_number, apply_task_status, task_number, po, cost,
               remark, purpose, category, created_at, applied_at,
               approver_name, find_board_status, revision
        FROM scrap_workflow
    "#;

    // ==========================================
    // 读取操作
    // ==========================================

    /// 按序列号查找当前记录(不区分大小写)
    pub fn find_by_serial(&self, serial: &str) -> RepositoryResult<Option<ScrapWorkflowRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE UPPER(serial_number) = UPPER(?1)", Self::SELECT_COLS);
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![serial.trim()], Self::map_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// 按序列号集合查找当前记录(不区分大小写)
    pub fn find_by_serials(
        &self,
        serials: &[String],
    ) -> RepositoryResult<Vec<ScrapWorkflowRecord>> {
        if serials.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["UPPER(?)"; serials.len()].join(", ");
        let sql = format!(
            "{} WHERE UPPER(serial_number) IN ({})",
            Self::SELECT_COLS,
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(serials.iter().map(|s| s.trim())),
            Self::map_row,
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// 按任务号集合反查记录
    pub fn find_by_task_numbers(
        &self,
        task_numbers: &[String],
    ) -> RepositoryResult<Vec<ScrapWorkflowRecord>> {
        if task_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; task_numbers.len()].join(", ");
        let sql = format!(
            "{} WHERE task_number IN ({})",
            Self::SELECT_COLS,
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(task_numbers.iter()), Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// 列出全部记录(报表用)
    pub fn list_all(&self) -> RepositoryResult<Vec<ScrapWorkflowRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY created_at", Self::SELECT_COLS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 原子批量写入: 全部记录 + 全部历史在同一事务内落盘
    ///
    /// # 规则
    /// - 已有行: CAS 更新(WHERE revision = 旧值), 冲突即整体回滚
    /// - 新行: 插入, revision 从 0 起
    ///
    /// # 返回
    /// - Ok(rows): 写入的记录行数
    pub fn apply_batch(
        &self,
        records: &[ScrapWorkflowRecord],
        history: &[HistoryEntry],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for record in records {
            Self::upsert_in_tx(&tx, record)?;
            count += 1;
        }
        for entry in history {
            Self::insert_history_in_tx(&tx, entry)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }

    fn upsert_in_tx(tx: &Transaction<'_>, record: &ScrapWorkflowRecord) -> RepositoryResult<()> {
        let updated = tx.execute(
            r#"
            UPDATE scrap_workflow SET
                apply_task_status = ?2, task_number = ?3, po = ?4, cost = ?5,
                remark = ?6, purpose = ?7, category = ?8, created_at = ?9,
                applied_at = ?10, approver_name = ?11, find_board_status = ?12,
                revision = revision + 1
            WHERE UPPER(serial_number) = UPPER(?1) AND revision = ?13
            "#,
            params![
                record.serial_number,
                record.apply_task_status.to_code(),
                record.task_number,
                record.po,
                record.cost,
                record.remark,
                record.purpose,
                record.category,
                record.created_at,
                record.applied_at,
                record.approver_name,
                record.find_board_status,
                record.revision,
            ],
        )?;
        if updated == 1 {
            return Ok(());
        }

        // 无行命中: 要么是新序列号,要么是版本冲突
        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM scrap_workflow WHERE UPPER(serial_number) = UPPER(?1) LIMIT 1",
                params![record.serial_number],
                |_row| Ok(true),
            )
            .unwrap_or(false);
        if exists {
            return Err(RepositoryError::OptimisticLockFailure {
                entity: "ScrapWorkflowRecord".to_string(),
                serial: record.serial_number.clone(),
                expected: record.revision,
            });
        }

        tx.execute(
            r#"
            INSERT INTO scrap_workflow (
                serial_number, apply_task_status, task_number, po, cost,
                remark, purpose, category, created_at, applied_at,
                approver_name, find_board_status, revision
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)
            "#,
            params![
                record.serial_number,
                record.apply_task_status.to_code(),
                record.task_number,
                record.po,
                record.cost,
                record.remark,
                record.purpose,
                record.category,
                record.created_at,
                record.applied_at,
                record.approver_name,
                record.find_board_status,
            ],
        )?;
        Ok(())
    }

    fn insert_history_in_tx(tx: &Transaction<'_>, entry: &HistoryEntry) -> RepositoryResult<()> {
        tx.execute(
            r#"
            INSERT INTO scrap_history (
                history_id, serial_number, action, actor, action_ts, snapshot_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                entry.history_id,
                entry.serial_number,
                entry.action,
                entry.actor,
                entry.action_ts,
                entry.snapshot_json.to_string(),
            ],
        )?;
        Ok(())
    }
}
