// ==========================================
// 不良品追踪系统 - 配置层
// ==========================================
// 职责: 引擎与网关的可调参数
// ==========================================

use serde::{Deserialize, Serialize};

/// 外部 IN-list 查询的默认分块上限
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

// ==========================================
// GatewayConfig - 网关配置
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// 单次外部批查询的键数上限
    pub chunk_size: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}
