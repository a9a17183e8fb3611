// ==========================================
// 不良品追踪系统 - 链接对账引擎 (批 FSM)
// ==========================================
// 职责: 用外部看板/扩展信号对账导出链接记录
// 红线: 状态只升不降,唯一例外是显式 2→4 回退边
//       同信号重跑幂等 - 已达目标的迁移是 no-op
//       非最新导出行永不被回退规则追改
// ==========================================

use crate::domain::export_link::{current_rows, is_latest_export, ExportLinkRecord};
use crate::domain::fact::normalize_serial;
use crate::domain::types::{AgingProfile, LinkState, StartTimeKind};
use crate::engine::aging::AgingCalculator;
use crate::engine::error::EngineResult;
use crate::gateway::FactGateway;
use crate::repository::ExportLinkRepository;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

// ===== 信号子串 (外部 WipGroup 自由文本契约) =====
const WIP_B36R_TO_SFG: &str = "B36R_TO_SFG";
const WIP_REPAIR_B36R: &str = "REPAIR_B36R";
const WIP_B36R: &str = "B36R";
const WIP_KANBAN_IN: &str = "KANBAN_IN";
const WIP_KANBAN_OUT: &str = "KANBAN_OUT";

/// 对账批次统计
///
/// transitioned 只计状态迁移;仅补时间戳的行计入 stamped
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub transitioned: usize,
    pub reverted: usize,
    pub stamped: usize,
}

/// 链接等待库龄报表行
#[derive(Debug, Clone, Serialize)]
pub struct LinkAgingRow {
    pub serial_number: String,
    pub state: LinkState,
    pub export_date: DateTime<Utc>,
    pub link_time: Option<DateTime<Utc>>,
    pub start_kind: StartTimeKind,
    pub aging_days: f64,
    /// AwaitingEntry 归入独立类别,不参与档位归类
    pub bucket: Option<&'static str>,
}

// ==========================================
// LinkReconciler - 链接对账引擎
// ==========================================
pub struct LinkReconciler {
    link_repo: Arc<ExportLinkRepository>,
    gateway: Arc<FactGateway>,
}

impl LinkReconciler {
    /// 创建链接对账引擎
    pub fn new(link_repo: Arc<ExportLinkRepository>, gateway: Arc<FactGateway>) -> Self {
        Self { link_repo, gateway }
    }

    /// 单遍对账全部活跃记录 (state > 0)
    ///
    /// # 流程
    /// 1. 分块拉取看板 WipGroup 与扩展 WipGroup 两路信号
    /// 2. 按共享决胜规则标记每序列号的最新导出行
    /// 3. 逐行求值迁移;变更行在单事务内 CAS 落盘
    pub async fn reconcile(&self, now: DateTime<Utc>) -> EngineResult<ReconcileReport> {
        let records = self.link_repo.list_active()?;

        let mut seen = HashSet::new();
        let serials: Vec<String> = records
            .iter()
            .filter(|r| seen.insert(normalize_serial(&r.serial_number)))
            .map(|r| r.serial_number.clone())
            .collect();

        // 两路外部信号相互独立,并发拉取
        let (kanban_wip, extended_wip) = futures::try_join!(
            self.gateway.kanban_wip_map(&serials),
            self.gateway.extended_wip_map(&serials)
        )?;

        let current = current_rows(&records);

        let mut changed = Vec::new();
        let mut report = ReconcileReport {
            scanned: records.len(),
            ..Default::default()
        };

        for record in &records {
            let key = normalize_serial(&record.serial_number);
            let kanban = kanban_wip.get(&key).map(String::as_str).unwrap_or("");
            let extended = extended_wip.get(&key).map(String::as_str).unwrap_or("");
            let is_latest = is_latest_export(record, &current);

            if let Some(updated) = Self::evaluate(record, kanban, extended, is_latest, now) {
                if updated.checking_b36r == record.checking_b36r {
                    report.stamped += 1;
                } else if updated.checking_b36r == LinkState::RevertedError {
                    report.reverted += 1;
                } else {
                    report.transitioned += 1;
                }
                changed.push(updated);
            }
        }

        if !changed.is_empty() {
            self.link_repo.update_batch(&changed)?;
        }
        info!(
            scanned = report.scanned,
            transitioned = report.transitioned,
            reverted = report.reverted,
            stamped = report.stamped,
            "link reconcile pass complete"
        );
        Ok(report)
    }

    /// 单行对账求值(纯函数)
    ///
    /// # 返回
    /// - Some(更新行): 本遍需要落盘
    /// - None: 无变化 (幂等重跑落在这里)
    fn evaluate(
        record: &ExportLinkRecord,
        kanban_wip: &str,
        extended_wip: &str,
        is_latest_export: bool,
        now: DateTime<Utc>,
    ) -> Option<ExportLinkRecord> {
        let kanban = kanban_wip.to_uppercase();
        let extended = extended_wip.to_uppercase();

        let mut updated = record.clone();
        let mut changed = false;

        let mut candidate: Option<LinkState> = None;
        if kanban.contains(WIP_B36R_TO_SFG) {
            // 已送出到 SFG: 扩展信号确认返修完成,或完全离开 B36R,视为已链接
            if extended.contains(WIP_REPAIR_B36R) || !extended.contains(WIP_B36R) {
                candidate = Some(LinkState::Linked);
            }
        } else if kanban.contains(WIP_KANBAN_IN) || kanban.contains(WIP_KANBAN_OUT) {
            if updated.kanban_time.is_none() {
                updated.kanban_time = Some(now);
                changed = true;
            }
            changed |= Self::advance(&mut updated, LinkState::KanbanObserved);
        }

        if candidate == Some(LinkState::Linked) {
            if updated.link_time.is_none() {
                updated.link_time = Some(now);
                changed = true;
            }
            changed |= Self::advance(&mut updated, LinkState::Linked);
        }

        // 回退升级: 独立于上面各步,最后求值;只作用于最新导出行
        if updated.checking_b36r == LinkState::Linked
            && kanban.contains(WIP_B36R_TO_SFG)
            && updated.link_time.is_some()
            && extended.contains(WIP_B36R)
            && !extended.contains(WIP_REPAIR_B36R)
            && is_latest_export
        {
            updated.checking_b36r = LinkState::RevertedError;
            changed = true;
        }

        if changed {
            Some(updated)
        } else {
            None
        }
    }

    /// 单调推进: 仅当目标严格大于当前状态时迁移
    fn advance(record: &mut ExportLinkRecord, target: LinkState) -> bool {
        if target > record.checking_b36r {
            record.checking_b36r = target;
            true
        } else {
            false
        }
    }

    // ==========================================
    // 读取路径: 链接等待库龄
    // ==========================================

    /// 时间窗内当前态(1/2)记录的库龄报表
    ///
    /// # 规则
    /// - 仅每序列号的最新导出行参与 (共享决胜: ExportDate 最大, 再 row_id 最大)
    /// - 排序: ExportDate 降序, 再 LinkTime 降序
    /// - 计龄起点: 进站时间 ≥ 导出时间用进站,否则用导出并归入等待类别
    pub async fn link_aging_report(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        profile: AgingProfile,
        now: DateTime<Utc>,
    ) -> EngineResult<Vec<LinkAgingRow>> {
        let records = self.link_repo.list_active()?;
        let current = current_rows(&records);

        let mut selected: Vec<&ExportLinkRecord> = current
            .into_values()
            .filter(|r| {
                matches!(r.checking_b36r, LinkState::Unlinked | LinkState::Linked)
                    && r.export_date >= window_start
                    && r.export_date <= window_end
            })
            .collect();
        selected.sort_by(|a, b| {
            (b.export_date, b.link_time, b.row_id).cmp(&(a.export_date, a.link_time, a.row_id))
        });

        let serials: HashSet<String> = selected
            .iter()
            .map(|r| r.serial_number.clone())
            .collect();
        let facts = self.gateway.batch_fetch(&serials).await?;

        let mut rows = Vec::with_capacity(selected.len());
        for record in selected {
            let in_station = facts
                .get(&normalize_serial(&record.serial_number))
                .and_then(|fact| fact.in_station_time);
            let (start, kind) = AgingCalculator::resolve_start_time(record.export_date, in_station);
            let aging_days = AgingCalculator::elapsed_days(start, now);
            let bucket = match kind {
                StartTimeKind::InStation => Some(AgingCalculator::bucketize(aging_days, profile)),
                StartTimeKind::AwaitingEntry => None,
            };
            rows.push(LinkAgingRow {
                serial_number: record.serial_number.clone(),
                state: record.checking_b36r,
                export_date: record.export_date,
                link_time: record.link_time,
                start_kind: kind,
                aging_days,
                bucket,
            });
        }
        Ok(rows)
    }
}
