// ==========================================
// 不良品追踪系统 - 外部事实快照
// ==========================================
// 职责: 承载外部制造记录系统返回的单板事实
// 红线: 每次查询新建,不跨调用缓存,本系统不拥有该数据
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// ExternalFactBundle - 单序列号事实包
// ==========================================
// serial_number 保留外部系统原始大小写(规范形态)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalFactBundle {
    pub serial_number: String,
    pub wip_group: Option<String>,    // 自由文本工序组标签
    pub error_flag: Option<String>,   // 外部错误码("0"/"1"/"7"/"8"/其他)
    pub work_flag: Option<String>,
    pub mo_number: Option<String>,    // 制造工单号
    pub test_code: Option<String>,
    pub error_desc: Option<String>,
    pub in_station_time: Option<DateTime<Utc>>,
    pub rework_tag: bool,
}

impl ExternalFactBundle {
    /// 创建仅含序列号的空事实包(测试/缺省场景)
    pub fn empty(serial_number: &str) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            wip_group: None,
            error_flag: None,
            work_flag: None,
            mo_number: None,
            test_code: None,
            error_desc: None,
            in_station_time: None,
            rework_tag: false,
        }
    }

    /// WipGroup 是否包含指定子串(不区分大小写)
    pub fn wip_group_contains(&self, needle: &str) -> bool {
        match &self.wip_group {
            Some(wip) => wip.to_uppercase().contains(&needle.to_uppercase()),
            None => false,
        }
    }

    /// MoNumber 是否以指定前缀开头
    pub fn mo_number_starts_with(&self, prefix: &str) -> bool {
        match &self.mo_number {
            Some(mo) => mo.starts_with(prefix),
            None => false,
        }
    }
}

/// 序列号归一化: 比较一律不区分大小写
pub fn normalize_serial(serial: &str) -> String {
    serial.trim().to_uppercase()
}
