// ==========================================
// 不良品追踪系统 - 数据仓储层
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod export_link_repo;
pub mod history_repo;
pub mod scrap_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use export_link_repo::ExportLinkRepository;
pub use history_repo::HistoryRepository;
pub use scrap_repo::ScrapWorkflowRepository;
