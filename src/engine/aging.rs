// ==========================================
// 不良品追踪系统 - 库龄计算
// ==========================================
// 职责: 经过天数分档 + 计龄起点裁决
// 红线: 无状态、无副作用、无 I/O 操作
// 档位边界逐字对齐外部报表契约:
//   A: [0,1) / [1,3] / (3,∞)   (中档两端闭)
//   B: [0,45) / [45,90) / [90,∞) (半开)
// ==========================================

use crate::domain::types::{AgingProfile, StartTimeKind};
use chrono::{DateTime, Utc};

// ==========================================
// AgingCalculator - 纯函数工具类
// ==========================================
pub struct AgingCalculator;

impl AgingCalculator {
    /// 按档位配置归类经过天数
    pub fn bucketize(elapsed_days: f64, profile: AgingProfile) -> &'static str {
        match profile {
            AgingProfile::ShortTerm => {
                if elapsed_days < 1.0 {
                    "<1 ngày"
                } else if elapsed_days <= 3.0 {
                    "1-3 ngày"
                } else {
                    ">3 ngày"
                }
            }
            AgingProfile::LongTerm => {
                if elapsed_days < 45.0 {
                    "<45"
                } else if elapsed_days < 90.0 {
                    "45-89"
                } else {
                    ">=90"
                }
            }
        }
    }

    /// 裁决计龄起点
    ///
    /// # 规则
    /// - 进站时间存在且 ≥ 导出时间 → 以进站时间计龄 (InStation)
    /// - 否则以导出时间计龄,单位归入独立的"等待进站"类别 (AwaitingEntry)
    pub fn resolve_start_time(
        export_time: DateTime<Utc>,
        in_station_time: Option<DateTime<Utc>>,
    ) -> (DateTime<Utc>, StartTimeKind) {
        match in_station_time {
            Some(in_station) if in_station >= export_time => {
                (in_station, StartTimeKind::InStation)
            }
            _ => (export_time, StartTimeKind::AwaitingEntry),
        }
    }

    /// 经过天数(两位小数)
    pub fn elapsed_days(start: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let millis = now.signed_duration_since(start).num_milliseconds();
        Self::round2(millis as f64 / 86_400_000.0)
    }

    /// 四舍五入到两位小数
    pub fn round2(value: f64) -> f64 {
        (value * 100.0).round() / 100.0
    }
}
