//! 图表与历史记录的时间窗口

use crate::error::Error;
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

/// 使用时长图表的时间窗口
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UsageWindow {
    #[default]
    Days7,
    Days15,
    Days30,
}

impl UsageWindow {
    pub const ALL: [UsageWindow; 3] = [
        UsageWindow::Days7,
        UsageWindow::Days15,
        UsageWindow::Days30,
    ];

    pub fn days(self) -> u32 {
        match self {
            UsageWindow::Days7 => 7,
            UsageWindow::Days15 => 15,
            UsageWindow::Days30 => 30,
        }
    }

    /// 图表标题，例如 "Hours - Last 7 Days"
    pub fn chart_label(self) -> String {
        format!("Hours - Last {} Days", self.days())
    }
}

/// 浏览历史的时间窗口
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HistoryWindow {
    #[default]
    Day1,
    Days3,
    Days7,
    Days15,
    Days30,
}

impl HistoryWindow {
    pub const ALL: [HistoryWindow; 5] = [
        HistoryWindow::Day1,
        HistoryWindow::Days3,
        HistoryWindow::Days7,
        HistoryWindow::Days15,
        HistoryWindow::Days30,
    ];

    pub fn days(self) -> u32 {
        match self {
            HistoryWindow::Day1 => 1,
            HistoryWindow::Days3 => 3,
            HistoryWindow::Days7 => 7,
            HistoryWindow::Days15 => 15,
            HistoryWindow::Days30 => 30,
        }
    }

    pub fn duration(self) -> Duration {
        Duration::days(i64::from(self.days()))
    }
}

fn parse_days(s: &str) -> Option<u32> {
    s.trim().strip_suffix('d')?.parse().ok()
}

impl FromStr for UsageWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_days(s) {
            Some(7) => Ok(UsageWindow::Days7),
            Some(15) => Ok(UsageWindow::Days15),
            Some(30) => Ok(UsageWindow::Days30),
            _ => Err(Error::InvalidParam(format!(
                "usage window must be one of 7d, 15d, 30d (got {:?})",
                s
            ))),
        }
    }
}

impl FromStr for HistoryWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match parse_days(s) {
            Some(1) => Ok(HistoryWindow::Day1),
            Some(3) => Ok(HistoryWindow::Days3),
            Some(7) => Ok(HistoryWindow::Days7),
            Some(15) => Ok(HistoryWindow::Days15),
            Some(30) => Ok(HistoryWindow::Days30),
            _ => Err(Error::InvalidParam(format!(
                "history window must be one of 1d, 3d, 7d, 15d, 30d (got {:?})",
                s
            ))),
        }
    }
}

impl fmt::Display for UsageWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

impl fmt::Display for HistoryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}
