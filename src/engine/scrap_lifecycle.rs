// ==========================================
// 不良品追踪系统 - 报废流程引擎 (受守卫 FSM)
// ==========================================
// 职责: 对本地报废记录执行批量守卫迁移
// 红线: 整批原子 - 任一前置校验失败则整批拒绝,存储零变更
//       每次成功变更恰好追加一条全字段快照历史
// 约定: 前置失败是业务结果(BatchOutcome::Rejected),不是 Err
// ==========================================

use crate::domain::fact::normalize_serial;
use crate::domain::history::HistoryEntry;
use crate::domain::scrap::{normalize_purpose, ScrapWorkflowRecord};
use crate::domain::types::{AgingProfile, ScrapRemark, ScrapTaskState};
use crate::engine::aging::AgingCalculator;
use crate::engine::error::EngineResult;
use crate::gateway::FactGateway;
use crate::repository::{HistoryRepository, ScrapWorkflowRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

// ===== 历史动作名 =====
pub const ACTION_REQUEST_TASK_ASSIGNMENT: &str = "REQUEST_TASK_ASSIGNMENT";
pub const ACTION_ASSIGN_TASK_NUMBER: &str = "ASSIGN_TASK_NUMBER";
pub const ACTION_ADVANCE_TRANSFER_STEP: &str = "ADVANCE_TRANSFER_STEP";
pub const ACTION_UPDATE_GENERIC_STATUS: &str = "UPDATE_GENERIC_STATUS";

// ==========================================
// 批量结果类型
// ==========================================

/// 单序列号拒绝原因(人类可读)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialRejection {
    pub serial: String,
    pub reason: String,
}

/// 批量操作结果: 要么全部落盘,要么整批拒绝
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchOutcome {
    Applied { serials: Vec<String> },
    Rejected { failures: Vec<SerialRejection> },
}

impl BatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, BatchOutcome::Applied { .. })
    }

    /// 拒绝明细(成功时为空)
    pub fn failures(&self) -> &[SerialRejection] {
        match self {
            BatchOutcome::Applied { .. } => &[],
            BatchOutcome::Rejected { failures } => failures,
        }
    }
}

/// 报废队列库龄报表行
#[derive(Debug, Clone, Serialize)]
pub struct ScrapAgingRow {
    pub serial_number: String,
    pub state: ScrapTaskState,
    pub aging_days: f64,
    pub bucket: &'static str,
}

// ==========================================
// ScrapLifecycle - 报废流程引擎
// ==========================================
pub struct ScrapLifecycle {
    scrap_repo: Arc<ScrapWorkflowRepository>,
    history_repo: Arc<HistoryRepository>,
    gateway: Arc<FactGateway>,
}

impl ScrapLifecycle {
    /// 创建报废流程引擎
    pub fn new(
        scrap_repo: Arc<ScrapWorkflowRepository>,
        history_repo: Arc<HistoryRepository>,
        gateway: Arc<FactGateway>,
    ) -> Self {
        Self {
            scrap_repo,
            history_repo,
            gateway,
        }
    }

    // ==========================================
    // 操作 1: 申请建立任务
    // ==========================================

    /// 批量申请进入报废/BGA 审批
    ///
    /// # 前置校验 (任一失败整批拒绝)
    /// - 批内序列号不重复、非空
    /// - remark 决定外部信号校验:
    ///   BP-10 要求不在返工观测信号;BP-20 要求在;B36R 要求在看板追踪信号
    /// - 本地已有非终态记录的序列号拒绝(每序列号唯一当前记录)
    ///
    /// # 成功效果
    /// - 新序列号插入记录;终态旧记录就地重置复用
    /// - 状态 = PendingBgaApproval (approve_flag) / PendingScrapApproval
    /// - 未知 purpose 归一为 "Unknown" (软失败)
    #[allow(clippy::too_many_arguments)]
    pub async fn request_task_assignment(
        &self,
        serials: &[String],
        requester: &str,
        remark: &str,
        purpose: &str,
        category: &str,
        approve_flag: bool,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchOutcome> {
        let batch = match Self::validate_batch_serials(serials) {
            Ok(batch) => batch,
            Err(failures) => return Ok(Self::rejected(ACTION_REQUEST_TASK_ASSIGNMENT, failures)),
        };
        if batch.is_empty() {
            return Ok(BatchOutcome::Applied {
                serials: Vec::new(),
            });
        }

        let parsed_remark = match ScrapRemark::parse(remark) {
            Some(r) => r,
            None => {
                let failures = batch
                    .iter()
                    .map(|s| SerialRejection {
                        serial: s.clone(),
                        reason: format!("unknown remark: {remark}"),
                    })
                    .collect();
                return Ok(Self::rejected(ACTION_REQUEST_TASK_ASSIGNMENT, failures));
            }
        };

        let mut failures = Vec::new();

        // 本地状态校验: 已有非终态记录 → 拒绝
        let existing = self.load_by_serials(&batch)?;
        for serial in &batch {
            if let Some(record) = existing.get(&normalize_serial(serial)) {
                if !record.apply_task_status.is_terminal() {
                    failures.push(SerialRejection {
                        serial: serial.clone(),
                        reason: format!(
                            "already in scrap workflow (state={})",
                            record.apply_task_status
                        ),
                    });
                }
            }
        }

        // 外部信号校验, 按备注取不同信号源
        match parsed_remark {
            ScrapRemark::Bp10 | ScrapRemark::Bp20 => {
                let observed = self.gateway.rework_observed_set(&batch).await?;
                for serial in &batch {
                    let hit = observed.contains(&normalize_serial(serial));
                    match parsed_remark {
                        ScrapRemark::Bp10 if hit => failures.push(SerialRejection {
                            serial: serial.clone(),
                            reason: "BP-10 requires serial absent from rework observation signal"
                                .to_string(),
                        }),
                        ScrapRemark::Bp20 if !hit => failures.push(SerialRejection {
                            serial: serial.clone(),
                            reason: "BP-20 requires serial present in rework observation signal"
                                .to_string(),
                        }),
                        _ => {}
                    }
                }
            }
            ScrapRemark::B36r => {
                let kanban = self.gateway.kanban_wip_map(&batch).await?;
                for serial in &batch {
                    if !kanban.contains_key(&normalize_serial(serial)) {
                        failures.push(SerialRejection {
                            serial: serial.clone(),
                            reason: "B36R requires serial present in kanban tracking signal"
                                .to_string(),
                        });
                    }
                }
            }
        }

        if !failures.is_empty() {
            return Ok(Self::rejected(ACTION_REQUEST_TASK_ASSIGNMENT, failures));
        }

        let target_state = if approve_flag {
            ScrapTaskState::PendingBgaApproval
        } else {
            ScrapTaskState::PendingScrapApproval
        };
        let normalized_purpose = normalize_purpose(purpose);

        let mut records = Vec::with_capacity(batch.len());
        for serial in &batch {
            let mut record = match existing.get(&normalize_serial(serial)) {
                // 终态旧记录就地复用: 重置为新一轮流程
                Some(old) => {
                    let mut r = ScrapWorkflowRecord::new(&old.serial_number, target_state, now);
                    r.revision = old.revision;
                    r
                }
                None => ScrapWorkflowRecord::new(serial, target_state, now),
            };
            record.remark = Some(remark.trim().to_string());
            record.purpose = Some(normalized_purpose.clone());
            record.category = Some(category.trim().to_string());
            records.push(record);
        }

        self.commit(&records, ACTION_REQUEST_TASK_ASSIGNMENT, requester, now)?;
        Ok(Self::applied(ACTION_REQUEST_TASK_ASSIGNMENT, records))
    }

    // ==========================================
    // 操作 2: 分配任务号
    // ==========================================

    /// 批量分配任务号与 PO, 状态 → TaskAssigned(5)
    ///
    /// 守卫: 批内每个序列号的 TaskNumber 当前为空
    pub fn assign_task_number(
        &self,
        serials: &[String],
        task: &str,
        po: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchOutcome> {
        let batch = match Self::validate_batch_serials(serials) {
            Ok(batch) => batch,
            Err(failures) => return Ok(Self::rejected(ACTION_ASSIGN_TASK_NUMBER, failures)),
        };
        if batch.is_empty() {
            return Ok(BatchOutcome::Applied {
                serials: Vec::new(),
            });
        }
        if task.trim().is_empty() {
            let failures = batch
                .iter()
                .map(|s| SerialRejection {
                    serial: s.clone(),
                    reason: "task number must not be empty".to_string(),
                })
                .collect();
            return Ok(Self::rejected(ACTION_ASSIGN_TASK_NUMBER, failures));
        }

        let existing = self.load_by_serials(&batch)?;
        let mut failures = Vec::new();
        let mut records = Vec::with_capacity(batch.len());

        for serial in &batch {
            match existing.get(&normalize_serial(serial)) {
                None => failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: "no scrap workflow record".to_string(),
                }),
                Some(record) if !record.task_number_empty() => failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: format!(
                        "task number already assigned: {}",
                        record.task_number.as_deref().unwrap_or_default()
                    ),
                }),
                Some(record) => {
                    let mut updated = record.clone();
                    updated.task_number = Some(task.trim().to_string());
                    updated.po = Some(po.trim().to_string());
                    updated.apply_task_status = ScrapTaskState::TaskAssigned;
                    updated.applied_at = Some(now);
                    records.push(updated);
                }
            }
        }

        if !failures.is_empty() {
            return Ok(Self::rejected(ACTION_ASSIGN_TASK_NUMBER, failures));
        }

        self.commit(&records, ACTION_ASSIGN_TASK_NUMBER, actor, now)?;
        Ok(Self::applied(ACTION_ASSIGN_TASK_NUMBER, records))
    }

    // ==========================================
    // 操作 3: 转移单步推进 (5→6→7)
    // ==========================================

    /// 按任务号推进一步
    ///
    /// 守卫: 任务号反查出的序列号集合必须与调用方集合完全一致;
    ///       每条记录沿 5→6→7 恰好前进一步,其他状态拒绝
    pub fn advance_transfer_step(
        &self,
        serials: &[String],
        task_numbers: &[String],
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchOutcome> {
        let batch = match Self::validate_batch_serials(serials) {
            Ok(batch) => batch,
            Err(failures) => return Ok(Self::rejected(ACTION_ADVANCE_TRANSFER_STEP, failures)),
        };

        // 先重校验: 任务号解析出的序列号集合 == 调用方集合
        let resolved = self.scrap_repo.find_by_task_numbers(task_numbers)?;
        let resolved_set: HashSet<String> = resolved
            .iter()
            .map(|r| normalize_serial(&r.serial_number))
            .collect();
        let caller_set: HashSet<String> = batch.iter().map(|s| normalize_serial(s)).collect();

        if resolved_set != caller_set {
            let mut failures = Vec::new();
            for serial in caller_set.difference(&resolved_set) {
                failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: "serial not resolved by supplied task numbers".to_string(),
                });
            }
            for serial in resolved_set.difference(&caller_set) {
                failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: "task numbers resolve to serial outside caller set".to_string(),
                });
            }
            return Ok(Self::rejected(ACTION_ADVANCE_TRANSFER_STEP, failures));
        }

        let mut failures = Vec::new();
        let mut records = Vec::with_capacity(resolved.len());
        for record in resolved {
            let next = match record.apply_task_status {
                ScrapTaskState::TaskAssigned => ScrapTaskState::TransferredAwaitingConfirm,
                ScrapTaskState::TransferredAwaitingConfirm => ScrapTaskState::ScrapConfirmed,
                other => {
                    failures.push(SerialRejection {
                        serial: record.serial_number.clone(),
                        reason: format!("state {other} cannot advance along 5→6→7"),
                    });
                    continue;
                }
            };
            let mut updated = record;
            updated.apply_task_status = next;
            updated.applied_at = Some(now);
            records.push(updated);
        }

        if !failures.is_empty() {
            return Ok(Self::rejected(ACTION_ADVANCE_TRANSFER_STEP, failures));
        }

        self.commit(&records, ACTION_ADVANCE_TRANSFER_STEP, actor, now)?;
        Ok(Self::applied(ACTION_ADVANCE_TRANSFER_STEP, records))
    }

    // ==========================================
    // 操作 4: 通用状态更新 (表驱动守卫)
    // ==========================================

    /// 目标状态 → 必需当前状态 对照表
    ///
    /// 表外目标一律拒绝
    fn required_current(target: ScrapTaskState) -> Option<ScrapTaskState> {
        match target {
            ScrapTaskState::TransferredAwaitingConfirm => Some(ScrapTaskState::TaskAssigned),
            ScrapTaskState::ScrapConfirmed => Some(ScrapTaskState::TransferredAwaitingConfirm),
            ScrapTaskState::TaskAssigned => Some(ScrapTaskState::ScrapConfirmed),
            ScrapTaskState::PendingPmUpdate => Some(ScrapTaskState::AwaitingTask),
            ScrapTaskState::PendingCostUpdate => Some(ScrapTaskState::PendingPmUpdate),
            _ => None,
        }
    }

    /// 批量更新到目标状态
    pub fn update_generic_status(
        &self,
        serials: &[String],
        target: ScrapTaskState,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<BatchOutcome> {
        let batch = match Self::validate_batch_serials(serials) {
            Ok(batch) => batch,
            Err(failures) => return Ok(Self::rejected(ACTION_UPDATE_GENERIC_STATUS, failures)),
        };
        if batch.is_empty() {
            return Ok(BatchOutcome::Applied {
                serials: Vec::new(),
            });
        }

        let required = match Self::required_current(target) {
            Some(required) => required,
            None => {
                let failures = batch
                    .iter()
                    .map(|s| SerialRejection {
                        serial: s.clone(),
                        reason: format!("unsupported target status: {target}"),
                    })
                    .collect();
                return Ok(Self::rejected(ACTION_UPDATE_GENERIC_STATUS, failures));
            }
        };

        let existing = self.load_by_serials(&batch)?;
        let mut failures = Vec::new();
        let mut records = Vec::with_capacity(batch.len());

        for serial in &batch {
            match existing.get(&normalize_serial(serial)) {
                None => failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: "no scrap workflow record".to_string(),
                }),
                Some(record) if record.apply_task_status != required => {
                    failures.push(SerialRejection {
                        serial: serial.clone(),
                        reason: format!(
                            "target {target} requires current state {required}, found {}",
                            record.apply_task_status
                        ),
                    })
                }
                Some(record) => {
                    let mut updated = record.clone();
                    updated.apply_task_status = target;
                    updated.applied_at = Some(now);
                    records.push(updated);
                }
            }
        }

        if !failures.is_empty() {
            return Ok(Self::rejected(ACTION_UPDATE_GENERIC_STATUS, failures));
        }

        self.commit(&records, ACTION_UPDATE_GENERIC_STATUS, actor, now)?;
        Ok(Self::applied(ACTION_UPDATE_GENERIC_STATUS, records))
    }

    // ==========================================
    // 读取路径
    // ==========================================

    /// 按序列号读取审计轨迹
    pub fn history_for_serial(&self, serial: &str) -> EngineResult<Vec<HistoryEntry>> {
        Ok(self.history_repo.list_by_serial(serial)?)
    }

    /// 报废队列库龄报表 (Profile B, 自 CreatedAt 计龄)
    pub fn scrap_aging_report(&self, now: DateTime<Utc>) -> EngineResult<Vec<ScrapAgingRow>> {
        let records = self.scrap_repo.list_all()?;
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            let aging_days = AgingCalculator::elapsed_days(record.created_at, now);
            rows.push(ScrapAgingRow {
                serial_number: record.serial_number,
                state: record.apply_task_status,
                aging_days,
                bucket: AgingCalculator::bucketize(aging_days, AgingProfile::LongTerm),
            });
        }
        Ok(rows)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    /// 批内序列号预校验: 去空白、拒绝空串与重复
    fn validate_batch_serials(serials: &[String]) -> Result<Vec<String>, Vec<SerialRejection>> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut batch = Vec::with_capacity(serials.len());
        let mut failures = Vec::new();

        for raw in serials {
            let serial = raw.trim().to_string();
            if serial.is_empty() {
                failures.push(SerialRejection {
                    serial: raw.clone(),
                    reason: "empty serial number".to_string(),
                });
                continue;
            }
            if !seen.insert(normalize_serial(&serial)) {
                failures.push(SerialRejection {
                    serial: serial.clone(),
                    reason: "duplicate serial in batch".to_string(),
                });
                continue;
            }
            batch.push(serial);
        }

        if failures.is_empty() {
            Ok(batch)
        } else {
            Err(failures)
        }
    }

    fn load_by_serials(
        &self,
        serials: &[String],
    ) -> EngineResult<HashMap<String, ScrapWorkflowRecord>> {
        let records = self.scrap_repo.find_by_serials(serials)?;
        Ok(records
            .into_iter()
            .map(|r| (normalize_serial(&r.serial_number), r))
            .collect())
    }

    /// 单事务落盘: 记录 + 每条记录恰好一条历史
    fn commit(
        &self,
        records: &[ScrapWorkflowRecord],
        action: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut history = Vec::with_capacity(records.len());
        for record in records {
            history.push(HistoryEntry::from_record(record, action, actor, now)?);
        }
        self.scrap_repo.apply_batch(records, &history)?;
        Ok(())
    }

    fn applied(action: &str, records: Vec<ScrapWorkflowRecord>) -> BatchOutcome {
        let serials: Vec<String> = records.into_iter().map(|r| r.serial_number).collect();
        info!(action, count = serials.len(), "scrap batch applied");
        BatchOutcome::Applied { serials }
    }

    fn rejected(action: &str, failures: Vec<SerialRejection>) -> BatchOutcome {
        warn!(action, count = failures.len(), "scrap batch rejected");
        BatchOutcome::Rejected { failures }
    }
}
