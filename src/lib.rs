// ==========================================
// 不良品追踪系统 - 核心库
// ==========================================
// 系统定位: 状态对账引擎 (外部事实只读,本地流程可变)
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 本地流程存储
pub mod repository;

// 网关层 - 外部事实源
pub mod gateway;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AdapterRepairStatus, AgingProfile, BonepileStatus, LinkState, ScrapRemark, ScrapTaskState,
    StartTimeKind,
};

// 领域实体
pub use domain::{ExportLinkRecord, ExternalFactBundle, HistoryEntry, ScrapWorkflowRecord};

// 引擎
pub use engine::{
    AgingCalculator, BatchOutcome, LinkReconciler, ScrapLifecycle, SerialRejection,
    StatusDerivationEngine,
};

// 网关
pub use gateway::{ExternalFactSource, FactGateway, GatewayError};

// 仓储
pub use repository::{
    ExportLinkRepository, HistoryRepository, RepositoryError, ScrapWorkflowRepository,
};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "不良品追踪系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
