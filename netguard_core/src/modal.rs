//! 仪表盘弹窗
//!
//! 同一时刻最多显示一个弹窗，打开新的会替换旧的。

use crate::types::{Device, ScheduleTimes, UserProfile, UserStats};

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    /// 定时断网，编辑中的时间对随弹窗保存
    Schedule { device: Device, times: ScheduleTimes },
    /// 家长资料，后端资料或统计取不到时只显示会话里的名字
    Profile {
        parent_name: String,
        profile: Option<UserProfile>,
        stats: Option<UserStats>,
    },
    /// 单台设备的浏览历史
    History { device: Device },
}

impl Modal {
    pub fn kind(&self) -> &'static str {
        match self {
            Modal::Schedule { .. } => "schedule",
            Modal::Profile { .. } => "profile",
            Modal::History { .. } => "history",
        }
    }

    /// 弹窗关联的设备
    pub fn device(&self) -> Option<&Device> {
        match self {
            Modal::Schedule { device, .. } | Modal::History { device } => Some(device),
            Modal::Profile { .. } => None,
        }
    }
}
