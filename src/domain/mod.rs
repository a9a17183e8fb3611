// ==========================================
// 不良品追踪系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、符号状态、共享选择规则
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod export_link;
pub mod fact;
pub mod history;
pub mod scrap;
pub mod types;

// 重导出核心类型
pub use export_link::{current_rows, is_latest_export, ExportLinkRecord};
pub use fact::{normalize_serial, ExternalFactBundle};
pub use history::HistoryEntry;
pub use scrap::{normalize_purpose, ScrapWorkflowRecord, KNOWN_PURPOSES};
pub use types::{
    AdapterRepairStatus, AgingProfile, BonepileStatus, LinkState, ScrapRemark, ScrapTaskState,
    StartTimeKind,
};
