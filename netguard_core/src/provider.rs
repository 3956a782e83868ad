//! 仪表盘数据源
//!
//! `LiveApiProvider` 访问真实后端，`FixtureProvider` 在模拟延迟后
//! 返回样例数据，用于没有后端的演示环境。

use crate::client::{unwrap_data, BearerClient, ClientConfig};
use crate::error::{Error, Result};
use crate::fixtures;
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// 样例数据的默认模拟延迟
pub const FIXTURE_DELAY: Duration = Duration::from_millis(1200);

/// 仪表盘数据源
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataProvider: Send + Sync {
    async fn fetch_devices(&self) -> Result<Vec<Device>>;

    async fn fetch_activity_log(&self) -> Result<Vec<ActivityLogEntry>>;

    async fn fetch_usage_report(&self) -> Result<UsageReport>;

    async fn fetch_network_stats(&self) -> Result<NetworkStats>;

    /// 下发断网/恢复命令
    async fn set_device_blocked(
        &self,
        device_id: i64,
        blocked: bool,
    ) -> Result<DeviceActionResult>;

    /// 保存定时断网计划
    async fn save_schedule(&self, device_id: i64, times: ScheduleTimes) -> Result<()>;
}

/// 样例数据源
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    delay: Duration,
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self {
            delay: FIXTURE_DELAY,
        }
    }
}

impl FixtureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定模拟延迟（测试中通常为零）
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl DataProvider for FixtureProvider {
    async fn fetch_devices(&self) -> Result<Vec<Device>> {
        self.simulate_latency().await;
        Ok(fixtures::devices())
    }

    async fn fetch_activity_log(&self) -> Result<Vec<ActivityLogEntry>> {
        Ok(fixtures::activity_log(Utc::now()))
    }

    async fn fetch_usage_report(&self) -> Result<UsageReport> {
        Ok(fixtures::usage_report())
    }

    async fn fetch_network_stats(&self) -> Result<NetworkStats> {
        Ok(fixtures::network_stats())
    }

    async fn set_device_blocked(
        &self,
        device_id: i64,
        blocked: bool,
    ) -> Result<DeviceActionResult> {
        info!("Toggling block for device {} -> {} (simulated)", device_id, blocked);
        Ok(DeviceActionResult {
            success: true,
            message: Some("Simulated".to_string()),
            device_id,
            action: block_action(blocked).to_string(),
            previous_blocked: !blocked,
            new_blocked: blocked,
        })
    }

    async fn save_schedule(&self, device_id: i64, times: ScheduleTimes) -> Result<()> {
        info!(
            "Saving schedule for device {}: Block from {} to {} (simulated)",
            device_id,
            times.block.format("%H:%M"),
            times.unblock.format("%H:%M")
        );
        Ok(())
    }
}

fn block_action(blocked: bool) -> &'static str {
    if blocked {
        "BLOCK"
    } else {
        "UNBLOCK"
    }
}

/// 后端数据源，请求携带会话令牌
pub struct LiveApiProvider {
    client: BearerClient,
}

#[derive(Serialize)]
struct BlockRequest {
    blocked: bool,
}

impl LiveApiProvider {
    pub fn new(config: ClientConfig, session: &Session) -> Result<Self> {
        Ok(Self {
            client: BearerClient::new(config, session)?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        unwrap_data(self.client.get(path).await?)
    }
}

#[async_trait]
impl DataProvider for LiveApiProvider {
    async fn fetch_devices(&self) -> Result<Vec<Device>> {
        self.get("/api/devices").await
    }

    async fn fetch_activity_log(&self) -> Result<Vec<ActivityLogEntry>> {
        self.get("/api/activity-log").await
    }

    async fn fetch_usage_report(&self) -> Result<UsageReport> {
        self.get("/api/usage").await
    }

    async fn fetch_network_stats(&self) -> Result<NetworkStats> {
        self.get("/api/network/stats").await
    }

    async fn set_device_blocked(
        &self,
        device_id: i64,
        blocked: bool,
    ) -> Result<DeviceActionResult> {
        let path = format!("/api/devices/{}/block", device_id);
        let result: DeviceActionResult =
            unwrap_data(self.client.post(&path, &BlockRequest { blocked }).await?)?;
        if !result.success {
            return Err(Error::Rejected(result.message));
        }
        Ok(result)
    }

    async fn save_schedule(&self, device_id: i64, times: ScheduleTimes) -> Result<()> {
        let path = format!("/api/devices/{}/schedule", device_id);
        let resp: ApiResponse<serde_json::Value> = self.client.post(&path, &times).await?;
        if !resp.success {
            return Err(Error::Rejected(resp.message));
        }
        Ok(())
    }
}
