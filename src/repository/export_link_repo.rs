// ==========================================
// 不良品追踪系统 - 导出链接仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
// 约束: 行只增不删;对账批量更新走单事务 + CAS
// ==========================================

use crate::domain::export_link::ExportLinkRecord;
use crate::domain::types::LinkState;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ExportLinkRepository - 导出链接仓储
// ==========================================
pub struct ExportLinkRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExportLinkRepository {
    /// 创建新的导出链接仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<ExportLinkRecord> {
        let state_code: i32 = row.get("checking_b36r")?;
        let checking_b36r = LinkState::from_code(state_code).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Integer,
                format!("unknown checking_b36r code: {state_code}").into(),
            )
        })?;

        Ok(ExportLinkRecord {
            row_id: row.get("row_id")?,
            serial_number: row.get("serial_number")?,
            export_date: row.get("export_date")?,
            checking_b36r,
            link_time: row.get("link_time")?,
            kanban_time: row.get("kanban_time")?,
            product_line: row.get("product_line")?,
            model_name: row.get("model_name")?,
            revision: row.get("revision")?,
        })
    }

    const SELECT_COLS: &'static str = r#"
        SELECT row_id, serial_number, export_date, checking_b36r,
               link_time, kanban_time, product_line, model_name, revision
        FROM export_link
    "#;

    // ==========================================
    // 读取操作
    // ==========================================

    /// 列出全部待对账记录 (checking_b36r > 0)
    pub fn list_active(&self) -> RepositoryResult<Vec<ExportLinkRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE checking_b36r > 0 ORDER BY export_date, row_id",
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// 按序列号列出全部导出事件(审计用,含历史行)
    pub fn list_by_serial(&self, serial: &str) -> RepositoryResult<Vec<ExportLinkRecord>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE UPPER(serial_number) = UPPER(?1) ORDER BY export_date, row_id",
            Self::SELECT_COLS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![serial.trim()], Self::map_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入一条新的导出事件行
    ///
    /// # 返回
    /// - Ok(row_id): 数据库分配的自增主键
    pub fn insert(&self, record: &ExportLinkRecord) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO export_link (
                serial_number, export_date, checking_b36r, link_time,
                kanban_time, product_line, model_name, revision
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
            "#,
            params![
                record.serial_number,
                record.export_date,
                record.checking_b36r.to_code(),
                record.link_time,
                record.kanban_time,
                record.product_line,
                record.model_name,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 原子批量更新对账结果(单事务, CAS 校验 revision)
    ///
    /// 任意一行版本冲突即整体回滚,保持幂等重跑安全
    pub fn update_batch(&self, records: &[ExportLinkRecord]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        let mut count = 0;
        for record in records {
            let updated = tx.execute(
                r#"
                UPDATE export_link SET
                    checking_b36r = ?2, link_time = ?3, kanban_time = ?4,
                    revision = revision + 1
                WHERE row_id = ?1 AND revision = ?5
                "#,
                params![
                    record.row_id,
                    record.checking_b36r.to_code(),
                    record.link_time,
                    record.kanban_time,
                    record.revision,
                ],
            )?;
            if updated != 1 {
                return Err(RepositoryError::OptimisticLockFailure {
                    entity: "ExportLinkRecord".to_string(),
                    serial: record.serial_number.clone(),
                    expected: record.revision,
                });
            }
            count += 1;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;
        Ok(count)
    }
}
