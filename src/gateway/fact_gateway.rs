// ==========================================
// 不良品追踪系统 - 事实网关
// ==========================================
// 职责: 对外部事实源做分块批查询与合并
// 约束: 外部 IN-list 上限约 1000,所有信号查询统一分块
// 红线: 结果不缓存;块间无顺序保证,合并结果与顺序无关
// ==========================================

use crate::config::GatewayConfig;
use crate::domain::fact::{normalize_serial, ExternalFactBundle};
use crate::gateway::fact_source::{ExternalFactSource, GatewayResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

// ==========================================
// FactGateway - 分块批查询网关
// ==========================================
pub struct FactGateway {
    source: Arc<dyn ExternalFactSource>,
    chunk_size: usize,
}

impl FactGateway {
    /// 创建事实网关(默认块大小 1000)
    pub fn new(source: Arc<dyn ExternalFactSource>) -> Self {
        Self::with_config(source, GatewayConfig::default())
    }

    /// 按配置创建事实网关
    pub fn with_config(source: Arc<dyn ExternalFactSource>, config: GatewayConfig) -> Self {
        Self {
            source,
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// 批查询事实包
    ///
    /// # 规则
    /// - 输入按 chunk_size 分块,逐块查询后合并
    /// - 结果键为归一化(大写)序列号;事实包内保留外部原始大小写
    /// - 重复序列号: 先见先得
    /// - 缺失序列号: 静默缺席,不是错误
    pub async fn batch_fetch(
        &self,
        serials: &HashSet<String>,
    ) -> GatewayResult<HashMap<String, ExternalFactBundle>> {
        let keys: Vec<String> = serials.iter().cloned().collect();
        let mut merged: HashMap<String, ExternalFactBundle> = HashMap::new();

        for chunk in keys.chunks(self.chunk_size) {
            let bundles = self.source.fetch_fact_bundles(chunk).await?;
            for bundle in bundles {
                let key = normalize_serial(&bundle.serial_number);
                merged.entry(key).or_insert(bundle);
            }
        }

        debug!(
            requested = serials.len(),
            found = merged.len(),
            "fact batch fetch complete"
        );
        Ok(merged)
    }

    /// 批查询看板追踪 WipGroup, 键归一化
    pub async fn kanban_wip_map(
        &self,
        serials: &[String],
    ) -> GatewayResult<HashMap<String, String>> {
        let mut merged = HashMap::new();
        for chunk in serials.chunks(self.chunk_size) {
            for (serial, wip) in self.source.fetch_kanban_wip(chunk).await? {
                merged.entry(normalize_serial(&serial)).or_insert(wip);
            }
        }
        Ok(merged)
    }

    /// 批查询扩展 WipGroup, 键归一化
    pub async fn extended_wip_map(
        &self,
        serials: &[String],
    ) -> GatewayResult<HashMap<String, String>> {
        let mut merged = HashMap::new();
        for chunk in serials.chunks(self.chunk_size) {
            for (serial, wip) in self.source.fetch_extended_wip(chunk).await? {
                merged.entry(normalize_serial(&serial)).or_insert(wip);
            }
        }
        Ok(merged)
    }

    /// 批查询返工观测信号命中的序列号集合(归一化)
    pub async fn rework_observed_set(
        &self,
        serials: &[String],
    ) -> GatewayResult<HashSet<String>> {
        let mut merged = HashSet::new();
        for chunk in serials.chunks(self.chunk_size) {
            for serial in self.source.fetch_rework_observed(chunk).await? {
                merged.insert(normalize_serial(&serial));
            }
        }
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::fact_source::GatewayError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // Mock 事实源: 记录调用次数,回显序列号
    struct MockSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl ExternalFactSource for MockSource {
        async fn fetch_fact_bundles(
            &self,
            serials: &[String],
        ) -> GatewayResult<Vec<ExternalFactBundle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GatewayError::SourceUnavailable("mock down".to_string()));
            }
            // 外部系统以小写作为规范形态返回; "MISSING" 不存在
            Ok(serials
                .iter()
                .filter(|s| !s.eq_ignore_ascii_case("MISSING"))
                .map(|s| ExternalFactBundle::empty(&s.to_lowercase()))
                .collect())
        }

        async fn fetch_kanban_wip(
            &self,
            serials: &[String],
        ) -> GatewayResult<HashMap<String, String>> {
            Ok(serials
                .iter()
                .map(|s| (s.clone(), "KANBAN_IN".to_string()))
                .collect())
        }

        async fn fetch_extended_wip(
            &self,
            serials: &[String],
        ) -> GatewayResult<HashMap<String, String>> {
            Ok(serials
                .iter()
                .map(|s| (s.clone(), "B36R".to_string()))
                .collect())
        }

        async fn fetch_rework_observed(
            &self,
            serials: &[String],
        ) -> GatewayResult<HashSet<String>> {
            Ok(serials.iter().cloned().collect())
        }
    }

    fn serial_set(serials: &[&str]) -> HashSet<String> {
        serials.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_fetch_chunks_input() {
        let source = Arc::new(MockSource::new());
        let gateway = FactGateway::with_config(source.clone(), GatewayConfig { chunk_size: 2 });

        let serials = serial_set(&["SN001", "SN002", "SN003", "SN004", "SN005"]);
        let result = gateway.batch_fetch(&serials).await.unwrap();

        assert_eq!(result.len(), 5);
        // 5 个序列号 / 块大小 2 = 3 次外部调用
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_batch_fetch_keys_normalized_casing_preserved() {
        let gateway = FactGateway::new(Arc::new(MockSource::new()));
        let result = gateway.batch_fetch(&serial_set(&["Sn001"])).await.unwrap();

        // 键归一化为大写,包内保留外部系统的原始(小写)形态
        let bundle = result.get("SN001").expect("normalized key");
        assert_eq!(bundle.serial_number, "sn001");
    }

    #[tokio::test]
    async fn test_batch_fetch_absent_serial_silently_missing() {
        let gateway = FactGateway::new(Arc::new(MockSource::new()));
        let result = gateway
            .batch_fetch(&serial_set(&["SN001", "MISSING"]))
            .await
            .unwrap();

        assert_eq!(result.len(), 1);
        assert!(!result.contains_key("MISSING"));
    }

    #[tokio::test]
    async fn test_batch_fetch_source_failure_fails_whole_call() {
        let source = Arc::new(MockSource {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let gateway = FactGateway::new(source);
        let err = gateway.batch_fetch(&serial_set(&["SN001"])).await;
        assert!(err.is_err());
    }
}
