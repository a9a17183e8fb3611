// ==========================================
// 不良品追踪系统 - 状态派生引擎
// ==========================================
// 职责: 事实包(+可选本地覆盖)派生唯一生命周期标签
// 红线: 纯函数,无状态,无副作用,无 I/O
// 软失败: 未知 ErrorFlag 落入默认分支,不报错
// ==========================================

use crate::domain::fact::{normalize_serial, ExternalFactBundle};
use crate::domain::scrap::ScrapWorkflowRecord;
use crate::domain::types::{AdapterRepairStatus, BonepileStatus, ScrapTaskState};
use crate::engine::rule_chain::{RuleChain, RuleHit};
use std::collections::{HashMap, HashSet};

// ==========================================
// StatusDerivationEngine - 纯规则派生
// ==========================================
pub struct StatusDerivationEngine;

/// Bonepile 链的求值上下文
struct BonepileContext<'a> {
    fact: &'a ExternalFactBundle,
    scrap_override: Option<&'a ScrapWorkflowRecord>,
}

/// Adapter 维修链的求值上下文
struct AdapterContext<'a> {
    fact: &'a ExternalFactBundle,
    rework_tagged: bool,
    scrap_override: Option<&'a ScrapWorkflowRecord>,
}

impl StatusDerivationEngine {
    /// 派生 Bonepile 状态标签
    ///
    /// # 规则 (首个命中即胜)
    /// 1. 本地报废覆盖存在 → Scrap / WaitingApproveScrap (按 Category)
    /// 2. WipGroup 含 B31M → WaitingLink
    /// 3. ErrorFlag: 7→Repair, 8→CheckOut, 1→CheckIn,
    ///    0→(WipGroup 含 KANBAN_IN ? WaitingKanBanIn : Online), 其他→Repair
    pub fn derive_bonepile_status(
        fact: &ExternalFactBundle,
        scrap_override: Option<&ScrapWorkflowRecord>,
    ) -> BonepileStatus {
        Self::derive_bonepile_status_with_reason(fact, scrap_override).output
    }

    /// 派生 Bonepile 状态标签, 附带命中规则名
    pub fn derive_bonepile_status_with_reason(
        fact: &ExternalFactBundle,
        scrap_override: Option<&ScrapWorkflowRecord>,
    ) -> RuleHit<BonepileStatus> {
        let chain: RuleChain<BonepileContext<'_>, BonepileStatus> = RuleChain::new()
            .rule("SCRAP_OVERRIDE", |ctx: &BonepileContext<'_>| {
                ctx.scrap_override.map(|record| {
                    if record.category.as_deref() == Some("Scrap") {
                        BonepileStatus::Scrap
                    } else {
                        BonepileStatus::WaitingApproveScrap
                    }
                })
            })
            .rule("WIP_B31M", |ctx: &BonepileContext<'_>| {
                if ctx.fact.wip_group_contains("B31M") {
                    Some(BonepileStatus::WaitingLink)
                } else {
                    None
                }
            })
            .rule("ERROR_FLAG", |ctx: &BonepileContext<'_>| {
                Some(match ctx.fact.error_flag.as_deref() {
                    Some("7") => BonepileStatus::Repair,
                    Some("8") => BonepileStatus::CheckOut,
                    Some("1") => BonepileStatus::CheckIn,
                    Some("0") => {
                        if ctx.fact.wip_group_contains("KANBAN_IN") {
                            BonepileStatus::WaitingKanBanIn
                        } else {
                            BonepileStatus::Online
                        }
                    }
                    // 未知错误码的显式默认分支(软失败)
                    _ => BonepileStatus::Repair,
                })
            });

        chain.evaluate_or(
            &BonepileContext {
                fact,
                scrap_override,
            },
            BonepileStatus::Repair,
        )
    }

    /// 派生 Adapter 维修状态标签
    ///
    /// # 规则 (首个命中即胜)
    /// 1. 返工观测集合命中 → ReworkFG
    /// 2. 本地报废覆盖存在 → 按 ApplyTaskStatus 子表
    /// 3. MoNumber 以 "4" 开头 → ReworkFG
    /// 4. ErrorFlag ≠ 8 且 WipGroup 含 B28M/B30M → RepairInRE
    /// 5. ErrorFlag: 7→RepairInRE, 8→WaitingCheckOut, 其他→RepairInPD
    pub fn derive_adapter_repair_status(
        fact: &ExternalFactBundle,
        rework_tag_set: &HashSet<String>,
        scrap_override: Option<&ScrapWorkflowRecord>,
    ) -> AdapterRepairStatus {
        let rework_tagged = rework_tag_set.contains(&normalize_serial(&fact.serial_number));
        Self::derive_adapter_repair_status_with_reason(fact, rework_tagged, scrap_override).output
    }

    /// 派生 Adapter 维修状态标签, 附带命中规则名
    pub fn derive_adapter_repair_status_with_reason(
        fact: &ExternalFactBundle,
        rework_tagged: bool,
        scrap_override: Option<&ScrapWorkflowRecord>,
    ) -> RuleHit<AdapterRepairStatus> {
        let chain: RuleChain<AdapterContext<'_>, AdapterRepairStatus> = RuleChain::new()
            .rule("REWORK_TAG_SET", |ctx: &AdapterContext<'_>| {
                if ctx.rework_tagged {
                    Some(AdapterRepairStatus::ReworkFg)
                } else {
                    None
                }
            })
            .rule("SCRAP_OVERRIDE", |ctx: &AdapterContext<'_>| {
                ctx.scrap_override.map(Self::scrap_override_sub_table)
            })
            .rule("MO_PREFIX_4", |ctx: &AdapterContext<'_>| {
                if ctx.fact.mo_number_starts_with("4") {
                    Some(AdapterRepairStatus::ReworkFg)
                } else {
                    None
                }
            })
            .rule("WIP_RE_STATION", |ctx: &AdapterContext<'_>| {
                let checked_out = ctx.fact.error_flag.as_deref() == Some("8");
                if !checked_out
                    && (ctx.fact.wip_group_contains("B28M") || ctx.fact.wip_group_contains("B30M"))
                {
                    Some(AdapterRepairStatus::RepairInRe)
                } else {
                    None
                }
            })
            .rule("ERROR_FLAG", |ctx: &AdapterContext<'_>| {
                Some(match ctx.fact.error_flag.as_deref() {
                    Some("7") => AdapterRepairStatus::RepairInRe,
                    Some("8") => AdapterRepairStatus::WaitingCheckOut,
                    // 未知错误码的显式默认分支(软失败)
                    _ => AdapterRepairStatus::RepairInPd,
                })
            });

        chain.evaluate_or(
            &AdapterContext {
                fact,
                rework_tagged,
                scrap_override,
            },
            AdapterRepairStatus::RepairInPd,
        )
    }

    /// 报废覆盖子表: 按 ApplyTaskStatus 映射标签
    fn scrap_override_sub_table(record: &ScrapWorkflowRecord) -> AdapterRepairStatus {
        match record.apply_task_status {
            ScrapTaskState::TaskAssigned
            | ScrapTaskState::TransferredAwaitingConfirm
            | ScrapTaskState::ScrapConfirmed => AdapterRepairStatus::ScrapHasTask,
            ScrapTaskState::AwaitingTask => {
                if record.task_number_empty() {
                    AdapterRepairStatus::ScrapLackTask
                } else {
                    AdapterRepairStatus::ScrapHasTask
                }
            }
            ScrapTaskState::PendingScrapApproval => AdapterRepairStatus::WaitingApprovalScrap,
            ScrapTaskState::PendingBgaApproval => AdapterRepairStatus::WaitingApprovalBga,
            ScrapTaskState::CannotRepair => AdapterRepairStatus::CantRepairProcess,
            _ => AdapterRepairStatus::ApprovedBga,
        }
    }
}

// ==========================================
// 调用点后置过滤
// ==========================================
// 每个调用点声明闭合的合法标签集;落在集外的记录整条丢弃。
// 刻意独立于规则链实现,保证链本身可复用。

/// 按允许标签集过滤派生结果
pub fn retain_allowed<K, L>(derived: &mut HashMap<K, L>, allowed: &[L])
where
    K: std::hash::Hash + Eq,
    L: PartialEq,
{
    derived.retain(|_, label| allowed.contains(label));
}
