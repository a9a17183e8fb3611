// ==========================================
// 不良品追踪系统 - 外部网关层
// ==========================================
// 职责: 只读对接外部制造记录系统
// 红线: 不落库,不缓存,失败即整体失败
// ==========================================

pub mod fact_gateway;
pub mod fact_source;

// 重导出核心类型
pub use fact_gateway::FactGateway;
pub use fact_source::{ExternalFactSource, GatewayError, GatewayResult};
