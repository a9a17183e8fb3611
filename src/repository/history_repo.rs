// ==========================================
// 不良品追踪系统 - 审计历史仓储
// ==========================================
// 红线: 只追加;无 UPDATE/DELETE 路径
// 说明: 流程写入时历史随记录同事务落盘(见 ScrapWorkflowRepository::apply_batch),
//       本仓储提供独立追加与审计读取
// ==========================================

use crate::domain::history::HistoryEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// HistoryRepository - 审计历史仓储
// ==========================================
pub struct HistoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryRepository {
    /// 创建新的审计历史仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<HistoryEntry> {
        let snapshot_raw: String = row.get("snapshot_json")?;
        let snapshot_json = serde_json::from_str(&snapshot_raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(HistoryEntry {
            history_id: row.get("history_id")?,
            serial_number: row.get("serial_number")?,
            action: row.get("action")?,
            actor: row.get("actor")?,
            action_ts: row.get("action_ts")?,
            snapshot_json,
        })
    }

    /// 追加一条历史
    pub fn insert(&self, entry: &HistoryEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
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
        Ok(entry.history_id.clone())
    }

    /// 按序列号读取审计轨迹(按时间升序)
    pub fn list_by_serial(&self, serial: &str) -> RepositoryResult<Vec<HistoryEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT history_id, serial_number, action, actor, action_ts, snapshot_json
            FROM scrap_history
            WHERE UPPER(serial_number) = UPPER(?1)
            ORDER BY action_ts, history_id
            "#,
        )?;
        let rows = stmt.query_map(params![serial.trim()], Self::map_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// 历史总条数(测试/巡检用)
    pub fn count_all(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM scrap_history", [], |row| row.get(0))?;
        Ok(count)
    }
}
