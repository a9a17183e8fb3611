// ==========================================
// 不良品追踪系统 - 领域类型定义
// ==========================================
// 职责: 定义报废流程/链接对账的符号状态与派生标签
// 红线: 数值码与数据库一致,标签文本与外部契约一致
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 报废流程状态 (Scrap Task State)
// ==========================================
// 数值码对齐外部任务系统: 0/1 等价(历史数据两种写法)
// 终态: ScrapConfirmed(7), CannotRepair(8)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScrapTaskState {
    AwaitingTask,               // 0/1 待建任务
    PendingScrapApproval,       // 2 报废审批中
    PendingBgaApproval,         // 4 BGA审批中
    TaskAssigned,               // 5 任务已分配
    TransferredAwaitingConfirm, // 6 已转移待确认
    ScrapConfirmed,             // 7 报废确认(终态)
    CannotRepair,               // 8 无法维修(终态)
    PendingPmUpdate,            // 9 待PM更新
    BgaReplaceInProgress,       // 10 BGA更换中
    BgaApproved,                // 19 BGA已批准
    PendingCostUpdate,          // 20 待成本更新
    PendingCustomerGuidance,    // 22 待客户指示
}

impl ScrapTaskState {
    /// 从数值码解析状态
    ///
    /// 0 与 1 历史上混用,统一解析为 AwaitingTask
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 | 1 => Some(ScrapTaskState::AwaitingTask),
            2 => Some(ScrapTaskState::PendingScrapApproval),
            4 => Some(ScrapTaskState::PendingBgaApproval),
            5 => Some(ScrapTaskState::TaskAssigned),
            6 => Some(ScrapTaskState::TransferredAwaitingConfirm),
            7 => Some(ScrapTaskState::ScrapConfirmed),
            8 => Some(ScrapTaskState::CannotRepair),
            9 => Some(ScrapTaskState::PendingPmUpdate),
            10 => Some(ScrapTaskState::BgaReplaceInProgress),
            19 => Some(ScrapTaskState::BgaApproved),
            20 => Some(ScrapTaskState::PendingCostUpdate),
            22 => Some(ScrapTaskState::PendingCustomerGuidance),
            _ => None,
        }
    }

    /// 转换为数据库存储的数值码 (AwaitingTask 规范写回为 0)
    pub fn to_code(&self) -> i32 {
        match self {
            ScrapTaskState::AwaitingTask => 0,
            ScrapTaskState::PendingScrapApproval => 2,
            ScrapTaskState::PendingBgaApproval => 4,
            ScrapTaskState::TaskAssigned => 5,
            ScrapTaskState::TransferredAwaitingConfirm => 6,
            ScrapTaskState::ScrapConfirmed => 7,
            ScrapTaskState::CannotRepair => 8,
            ScrapTaskState::PendingPmUpdate => 9,
            ScrapTaskState::BgaReplaceInProgress => 10,
            ScrapTaskState::BgaApproved => 19,
            ScrapTaskState::PendingCostUpdate => 20,
            ScrapTaskState::PendingCustomerGuidance => 22,
        }
    }

    /// 是否终态 (终态后不再自动迁移)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ScrapTaskState::ScrapConfirmed | ScrapTaskState::CannotRepair
        )
    }
}

impl fmt::Display for ScrapTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScrapTaskState::AwaitingTask => write!(f, "AWAITING_TASK"),
            ScrapTaskState::PendingScrapApproval => write!(f, "PENDING_SCRAP_APPROVAL"),
            ScrapTaskState::PendingBgaApproval => write!(f, "PENDING_BGA_APPROVAL"),
            ScrapTaskState::TaskAssigned => write!(f, "TASK_ASSIGNED"),
            ScrapTaskState::TransferredAwaitingConfirm => {
                write!(f, "TRANSFERRED_AWAITING_CONFIRM")
            }
            ScrapTaskState::ScrapConfirmed => write!(f, "SCRAP_CONFIRMED"),
            ScrapTaskState::CannotRepair => write!(f, "CANNOT_REPAIR"),
            ScrapTaskState::PendingPmUpdate => write!(f, "PENDING_PM_UPDATE"),
            ScrapTaskState::BgaReplaceInProgress => write!(f, "BGA_REPLACE_IN_PROGRESS"),
            ScrapTaskState::BgaApproved => write!(f, "BGA_APPROVED"),
            ScrapTaskState::PendingCostUpdate => write!(f, "PENDING_COST_UPDATE"),
            ScrapTaskState::PendingCustomerGuidance => write!(f, "PENDING_CUSTOMER_GUIDANCE"),
        }
    }
}

// ==========================================
// 链接对账状态 (Link State / CheckingB36R)
// ==========================================
// 顺序: Unlinked < Linked < KanbanObserved
// 唯一允许的回退边: Linked(2) → RevertedError(4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkState {
    Unlinked,       // 1 已导出未链接
    Linked,         // 2 已链接
    KanbanObserved, // 3 已进入看板追踪
    RevertedError,  // 4 链接回退异常
}

impl LinkState {
    /// 从数值码解析状态
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(LinkState::Unlinked),
            2 => Some(LinkState::Linked),
            3 => Some(LinkState::KanbanObserved),
            4 => Some(LinkState::RevertedError),
            _ => None,
        }
    }

    /// 转换为数据库存储的数值码
    pub fn to_code(&self) -> i32 {
        match self {
            LinkState::Unlinked => 1,
            LinkState::Linked => 2,
            LinkState::KanbanObserved => 3,
            LinkState::RevertedError => 4,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Unlinked => write!(f, "UNLINKED"),
            LinkState::Linked => write!(f, "LINKED"),
            LinkState::KanbanObserved => write!(f, "KANBAN_OBSERVED"),
            LinkState::RevertedError => write!(f, "REVERTED_ERROR"),
        }
    }
}

// ==========================================
// Bonepile 派生状态标签
// ==========================================
// 红线: Display 文本是对外契约,逐字符不可改
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonepileStatus {
    Scrap,
    WaitingApproveScrap,
    WaitingLink,
    Repair,
    CheckOut,
    CheckIn,
    WaitingKanBanIn,
    Online,
}

impl fmt::Display for BonepileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BonepileStatus::Scrap => write!(f, "Scrap"),
            BonepileStatus::WaitingApproveScrap => write!(f, "WaitingApproveScrap"),
            BonepileStatus::WaitingLink => write!(f, "WaitingLink"),
            BonepileStatus::Repair => write!(f, "Repair"),
            BonepileStatus::CheckOut => write!(f, "CheckOut"),
            BonepileStatus::CheckIn => write!(f, "CheckIn"),
            BonepileStatus::WaitingKanBanIn => write!(f, "WaitingKanBanIn"),
            BonepileStatus::Online => write!(f, "Online"),
        }
    }
}

// ==========================================
// Adapter 维修派生状态标签
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdapterRepairStatus {
    ReworkFg,
    ScrapHasTask,
    ScrapLackTask,
    WaitingApprovalScrap,
    WaitingApprovalBga,
    CantRepairProcess,
    ApprovedBga,
    RepairInRe,
    WaitingCheckOut,
    RepairInPd,
}

impl fmt::Display for AdapterRepairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterRepairStatus::ReworkFg => write!(f, "ReworkFG"),
            AdapterRepairStatus::ScrapHasTask => write!(f, "ScrapHasTask"),
            AdapterRepairStatus::ScrapLackTask => write!(f, "ScrapLackTask"),
            AdapterRepairStatus::WaitingApprovalScrap => write!(f, "WaitingApprovalScrap"),
            AdapterRepairStatus::WaitingApprovalBga => write!(f, "WaitingApprovalBGA"),
            AdapterRepairStatus::CantRepairProcess => write!(f, "Can'tRepairProcess"),
            AdapterRepairStatus::ApprovedBga => write!(f, "ApprovedBGA"),
            AdapterRepairStatus::RepairInRe => write!(f, "RepairInRE"),
            AdapterRepairStatus::WaitingCheckOut => write!(f, "WaitingCheckOut"),
            AdapterRepairStatus::RepairInPd => write!(f, "RepairInPD"),
        }
    }
}

// ==========================================
// 报废申请备注 (Scrap Remark)
// ==========================================
// 备注决定 request_task_assignment 的前置校验来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrapRemark {
    Bp10, // BP-10: 要求不在返工观测信号中
    Bp20, // BP-20: 要求在返工观测信号中
    B36r, // B36R: 要求在看板追踪信号中
}

impl ScrapRemark {
    /// 从字符串解析备注, 未知备注返回 None (由调用方整批拒绝)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BP-10" => Some(ScrapRemark::Bp10),
            "BP-20" => Some(ScrapRemark::Bp20),
            "B36R" => Some(ScrapRemark::B36r),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ScrapRemark::Bp10 => "BP-10",
            ScrapRemark::Bp20 => "BP-20",
            ScrapRemark::B36r => "B36R",
        }
    }
}

impl fmt::Display for ScrapRemark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 库龄档位配置 (Aging Profile)
// ==========================================
// A: 链接等待报表(天级, 越南语档名)  B: 报废队列报表(45/90天)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgingProfile {
    ShortTerm, // Profile A: <1 / 1-3 / >3 ngày
    LongTerm,  // Profile B: <45 / 45-89 / >=90
}

impl fmt::Display for AgingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgingProfile::ShortTerm => write!(f, "SHORT_TERM"),
            AgingProfile::LongTerm => write!(f, "LONG_TERM"),
        }
    }
}

// ==========================================
// 计龄起点类别 (Start Time Kind)
// ==========================================
// 进站时间早于导出时间时,单位归入独立的"等待进站"类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StartTimeKind {
    InStation,     // 以外部进站时间计龄
    AwaitingEntry, // 以导出时间计龄,单独归类
}

impl fmt::Display for StartTimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartTimeKind::InStation => write!(f, "IN_STATION"),
            StartTimeKind::AwaitingEntry => write!(f, "AWAITING_ENTRY"),
        }
    }
}
