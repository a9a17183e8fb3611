// ==========================================
// 不良品追踪系统 - 导出链接记录
// ==========================================
// 职责: 每次导出事件一行,行只增不删,新行按 ExportDate 取代旧行
// 约束: "当前记录" = max(ExportDate), 并列取 max(row_id)
// ==========================================

use crate::domain::fact::normalize_serial;
use crate::domain::types::LinkState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// ExportLinkRecord - 导出链接记录
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportLinkRecord {
    pub row_id: i64, // 数据库自增主键,并列 ExportDate 的决胜键
    pub serial_number: String,
    pub export_date: DateTime<Utc>,
    pub checking_b36r: LinkState,
    pub link_time: Option<DateTime<Utc>>,
    pub kanban_time: Option<DateTime<Utc>>,
    pub product_line: Option<String>,
    pub model_name: Option<String>,
    pub revision: i32,
}

impl ExportLinkRecord {
    /// 创建一条新的导出事件记录(尚未入库, row_id 由数据库分配)
    pub fn new(serial_number: &str, export_date: DateTime<Utc>) -> Self {
        Self {
            row_id: 0,
            serial_number: serial_number.to_string(),
            export_date,
            checking_b36r: LinkState::Unlinked,
            link_time: None,
            kanban_time: None,
            product_line: None,
            model_name: None,
            revision: 0,
        }
    }
}

// ==========================================
// 当前记录选择 (共享查询抽象)
// ==========================================
// 所有组件统一使用同一套决胜规则,禁止各处自行排序

/// 按序列号(不区分大小写)选出每个序列号的"当前记录"
///
/// # 规则
/// - ExportDate 最大者胜
/// - ExportDate 并列时 row_id 最大者胜
pub fn current_rows(records: &[ExportLinkRecord]) -> HashMap<String, &ExportLinkRecord> {
    let mut current: HashMap<String, &ExportLinkRecord> = HashMap::new();
    for record in records {
        let key = normalize_serial(&record.serial_number);
        match current.get(&key) {
            Some(existing)
                if (existing.export_date, existing.row_id)
                    >= (record.export_date, record.row_id) => {}
            _ => {
                current.insert(key, record);
            }
        }
    }
    current
}

/// 判断某行是否为其序列号的当前记录
pub fn is_latest_export(
    record: &ExportLinkRecord,
    current: &HashMap<String, &ExportLinkRecord>,
) -> bool {
    current
        .get(&normalize_serial(&record.serial_number))
        .map(|latest| latest.row_id == record.row_id)
        .unwrap_or(false)
}
