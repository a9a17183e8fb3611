// ==========================================
// 不良品追踪系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: Engine 不拼 SQL, 所有规则必须输出 reason
// ==========================================

pub mod aging;
pub mod error;
pub mod link_reconciler;
pub mod rule_chain;
pub mod scrap_lifecycle;
pub mod status_derivation;

// 重导出核心引擎
pub use aging::AgingCalculator;
pub use error::{EngineError, EngineResult};
pub use link_reconciler::{LinkAgingRow, LinkReconciler, ReconcileReport};
pub use rule_chain::{RuleChain, RuleHit};
pub use scrap_lifecycle::{
    BatchOutcome, ScrapAgingRow, ScrapLifecycle, SerialRejection,
    ACTION_ADVANCE_TRANSFER_STEP, ACTION_ASSIGN_TASK_NUMBER, ACTION_REQUEST_TASK_ASSIGNMENT,
    ACTION_UPDATE_GENERIC_STATUS,
};
pub use status_derivation::{retain_allowed, StatusDerivationEngine};
