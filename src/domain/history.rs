// ==========================================
// 不良品追踪系统 - 审计历史
// ==========================================
// 红线: 只追加,不修改,不删除;每次成功变更恰好一条
// 快照: 变更后记录的全字段 JSON
// ==========================================

use crate::domain::scrap::ScrapWorkflowRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// HistoryEntry - 审计历史条目
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub history_id: String,        // UUID v4
    pub serial_number: String,
    pub action: String,            // 操作名(如 REQUEST_TASK_ASSIGNMENT)
    pub actor: String,
    pub action_ts: DateTime<Utc>,
    pub snapshot_json: JsonValue,  // 变更后记录的全字段快照
}

impl HistoryEntry {
    /// 由变更后的报废记录生成一条历史
    pub fn from_record(
        record: &ScrapWorkflowRecord,
        action: &str,
        actor: &str,
        action_ts: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            history_id: Uuid::new_v4().to_string(),
            serial_number: record.serial_number.clone(),
            action: action.to_string(),
            actor: actor.to_string(),
            action_ts,
            snapshot_json: serde_json::to_value(record)?,
        })
    }
}
