// ==========================================
// 不良品追踪系统 - 外部事实源接口
// ==========================================
// 职责: 对外部制造记录系统的只读键值批查询抽象
// 约束: 单次调用键数 ≤1000 由 FactGateway 负责,实现方不得缓存
// ==========================================

use crate::domain::fact::ExternalFactBundle;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// 外部事实源错误
///
/// 外部源不可用时整个派生/对账调用失败,不做部分回退与陈旧缓存
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("外部事实源不可用: {0}")]
    SourceUnavailable(String),

    #[error("外部查询失败: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type GatewayResult<T> = Result<T, GatewayError>;

// ==========================================
// ExternalFactSource - 外部事实源
// ==========================================
// 实现方对接真实制造记录系统;测试用 Mock 实现
#[async_trait]
pub trait ExternalFactSource: Send + Sync {
    /// 批查询单板事实包(调用方已按 ≤1000 分块)
    ///
    /// 缺失的序列号直接不出现在结果中,不是错误
    async fn fetch_fact_bundles(
        &self,
        serials: &[String],
    ) -> GatewayResult<Vec<ExternalFactBundle>>;

    /// 批查询看板追踪 WipGroup (kanban tracking 表)
    ///
    /// # 返回
    /// - map: 序列号(外部原始大小写) → WipGroup
    async fn fetch_kanban_wip(&self, serials: &[String])
        -> GatewayResult<HashMap<String, String>>;

    /// 批查询扩展 WipGroup (独立外部表)
    async fn fetch_extended_wip(
        &self,
        serials: &[String],
    ) -> GatewayResult<HashMap<String, String>>;

    /// 批查询返工观测信号中出现的序列号
    async fn fetch_rework_observed(&self, serials: &[String])
        -> GatewayResult<HashSet<String>>;
}
