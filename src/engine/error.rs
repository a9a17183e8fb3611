// ==========================================
// 不良品追踪系统 - 引擎层错误类型
// ==========================================
// 约定: 前置校验失败是业务结果(BatchOutcome),不在此处
//       此处只承载基础设施错误(外部源/数据库)
// ==========================================

use crate::gateway::GatewayError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
