// ==========================================
// 不良品追踪系统 - 报废流程记录
// ==========================================
// 职责: 本地持有的报废审批记录,仅经 ScrapLifecycle 变更
// 约束: 每序列号唯一当前记录(NOCASE 主键保证,就地更新)
// ==========================================

use crate::domain::types::ScrapTaskState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ScrapWorkflowRecord - 报废流程记录
// ==========================================
// revision 为乐观锁版本列,批量写入按 CAS 校验
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapWorkflowRecord {
    pub serial_number: String,
    pub apply_task_status: ScrapTaskState,
    pub task_number: Option<String>,
    pub po: Option<String>,
    pub cost: Option<f64>,
    pub remark: Option<String>,
    pub purpose: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
    pub applied_at: Option<DateTime<Utc>>,
    pub approver_name: Option<String>,
    pub find_board_status: Option<String>,
    pub revision: i32,
}

impl ScrapWorkflowRecord {
    /// 创建新进入流程的记录
    pub fn new(serial_number: &str, state: ScrapTaskState, now: DateTime<Utc>) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            apply_task_status: state,
            task_number: None,
            po: None,
            cost: None,
            remark: None,
            purpose: None,
            category: None,
            created_at: now,
            applied_at: Some(now),
            approver_name: None,
            find_board_status: None,
            revision: 0,
        }
    }

    /// TaskNumber 是否为空(未分配)
    pub fn task_number_empty(&self) -> bool {
        match &self.task_number {
            Some(t) => t.trim().is_empty(),
            None => true,
        }
    }
}

/// 已知的申请目的取值, 之外一律归一为 "Unknown" (软失败策略)
pub const KNOWN_PURPOSES: &[&str] = &["Scrap", "Rework", "Replace", "Analysis"];

/// 归一化申请目的
pub fn normalize_purpose(purpose: &str) -> String {
    let trimmed = purpose.trim();
    for known in KNOWN_PURPOSES {
        if trimmed.eq_ignore_ascii_case(known) {
            return (*known).to_string();
        }
    }
    "Unknown".to_string()
}
