// ==========================================
// 不良品追踪系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout,减少并发写入时的偶发 busy 错误
// - 提供本地存储的建表入口
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化本地存储 schema (幂等)
///
/// - scrap_workflow: 每序列号唯一当前记录 (NOCASE 主键,就地更新)
/// - scrap_history: 只追加审计表
/// - export_link: 每次导出一行,只增不删
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS scrap_workflow (
            serial_number     TEXT NOT NULL COLLATE NOCASE PRIMARY KEY,
            apply_task_status INTEGER NOT NULL DEFAULT 0,
            task_number       TEXT,
            po                TEXT,
            cost              REAL,
            remark            TEXT,
            purpose           TEXT,
            category          TEXT,
            created_at        TEXT NOT NULL,
            applied_at        TEXT,
            approver_name     TEXT,
            find_board_status TEXT,
            revision          INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS scrap_history (
            history_id    TEXT NOT NULL PRIMARY KEY,
            serial_number TEXT NOT NULL COLLATE NOCASE,
            action        TEXT NOT NULL,
            actor         TEXT NOT NULL,
            action_ts     TEXT NOT NULL,
            snapshot_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scrap_history_serial
            ON scrap_history (serial_number, action_ts);

        CREATE TABLE IF NOT EXISTS export_link (
            row_id        INTEGER PRIMARY KEY AUTOINCREMENT,
            serial_number TEXT NOT NULL COLLATE NOCASE,
            export_date   TEXT NOT NULL,
            checking_b36r INTEGER NOT NULL DEFAULT 1,
            link_time     TEXT,
            kanban_time   TEXT,
            product_line  TEXT,
            model_name    TEXT,
            revision      INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_export_link_serial
            ON export_link (serial_number, export_date);
        "#,
    )
}
