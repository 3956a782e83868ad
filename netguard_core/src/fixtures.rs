//! 演示用样例数据
//!
//! 后端不可用时仪表盘用这套固定数据渲染。访问记录的时间戳相对于
//! 传入的 `now` 生成，因此时间窗口过滤结果是确定的。

use crate::types::*;
use chrono::{DateTime, Duration, Utc};

/// 样例设备
#[rustfmt::skip]
pub fn devices() -> Vec<Device> {
    vec![
        device(1, "Raiyan's iPhone", DeviceType::Mobile, DeviceStatus::Online, "Raiyan Islam", "192.168.1.10", false, Some(85), 2.4),
        device(2, "Al's Gaming PC", DeviceType::Desktop, DeviceStatus::Online, "Al Imam Uddin", "192.168.1.12", false, None, 15.2),
        device(3, "Mihi's iPad Pro", DeviceType::Tablet, DeviceStatus::Offline, "Rukaiya Jahan", "192.168.1.15", true, Some(42), 1.8),
        device(4, "Living Room TV", DeviceType::Tv, DeviceStatus::Online, "Family", "192.168.1.20", false, None, 8.7),
        device(5, "Dad's Laptop", DeviceType::Laptop, DeviceStatus::Online, "Father", "192.168.1.25", false, Some(67), 4.3),
    ]
}

#[allow(clippy::too_many_arguments)]
fn device(
    id: i64,
    name: &str,
    device_type: DeviceType,
    status: DeviceStatus,
    user: &str,
    ip: &str,
    blocked: bool,
    battery: Option<u8>,
    data_usage: f64,
) -> Device {
    Device {
        id,
        name: name.to_string(),
        device_type,
        status,
        blocked,
        user: user.to_string(),
        ip: ip.to_string(),
        battery,
        data_usage: Some(data_usage),
    }
}

/// 样例访问记录，按时间倒序
pub fn activity_log(now: DateTime<Utc>) -> Vec<ActivityLogEntry> {
    // (设备, 站点, 分类, 距今分钟数)
    const ROWS: &[(i64, &str, &str, i64)] = &[
        (2, "youtube.com/watch?v=tech_review", "Entertainment", 2),
        (1, "instagram.com", "Social", 5),
        (4, "netflix.com/movie/action", "Streaming", 10),
        (2, "github.com", "Work", 12),
        (1, "facebook.com", "Social", 20),
        (3, "blocked-site.com", "Entertainment", 30),
        (5, "github.com/project/dashboard", "Work", 45),
        (2, "discord.com/gaming-channel", "Social", 3 * 60),
        (3, "khanacademy.org", "Education", 26 * 60),
        (1, "tiktok.com", "Entertainment", 2 * 24 * 60),
        (3, "roblox.com", "Gaming", 4 * 24 * 60),
        (4, "youtube.com/kids", "Entertainment", 5 * 24 * 60),
        (3, "wikipedia.org", "Education", 6 * 24 * 60),
        (3, "netflix.com/kids", "Streaming", 9 * 24 * 60),
        (2, "steampowered.com", "Gaming", 12 * 24 * 60),
        (3, "minecraft.net", "Gaming", 20 * 24 * 60),
        (1, "stackoverflow.com", "Education", 25 * 24 * 60),
        (3, "google.com", "Education", 40 * 24 * 60),
    ];

    let names = devices();
    ROWS.iter()
        .map(|&(device_id, site, category, minutes_ago)| ActivityLogEntry {
            device_id,
            device_name: names
                .iter()
                .find(|d| d.id == device_id)
                .map(|d| d.name.clone())
                .unwrap_or_default(),
            site: site.to_string(),
            timestamp: now - Duration::minutes(minutes_ago),
            category: category.to_string(),
        })
        .collect()
}

/// 样例使用时长
pub fn usage_report() -> UsageReport {
    let labels: Vec<String> = ["YouTube", "Gaming", "Netflix", "Social Media", "Work", "Education"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let series = |data: [f64; 6]| UsageSeries {
        labels: labels.clone(),
        data: data.to_vec(),
    };
    UsageReport {
        last_7_days: series([15.0, 12.0, 9.0, 7.0, 5.0, 3.0]),
        last_15_days: series([35.0, 28.0, 22.0, 18.0, 10.0, 8.0]),
        last_30_days: series([70.0, 60.0, 45.0, 30.0, 25.0, 15.0]),
    }
}

/// 样例网络概况
pub fn network_stats() -> NetworkStats {
    NetworkStats {
        total_bandwidth: 100.0,
        used_bandwidth: 67.0,
        peak_hours: "8:00 PM - 10:00 PM".to_string(),
        average_speed: "85.2 Mbps".to_string(),
    }
}
