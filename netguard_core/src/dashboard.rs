//! 设备监控仪表盘
//!
//! 数据在 `fetch_data` 时整体替换，不做增量合并。筛选条件只是本地状态，
//! 切换时从已加载的数据重新计算，不会发请求。

use crate::error::{Error, Result};
use crate::filters::{HistoryWindow, UsageWindow};
use crate::modal::Modal;
use crate::profile::ProfileApi;
use crate::provider::{DataProvider, FixtureProvider};
use crate::types::*;
use chrono::{DateTime, NaiveTime, Utc};
use tracing::{info, warn};

/// 断网切换的结果
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// 外部系统已确认
    Confirmed { blocked: bool },
    /// 命令失败，本地状态已回滚
    Reverted { blocked: bool, reason: String },
}

/// 顶部统计卡片
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardSummary {
    pub total_devices: usize,
    pub online: usize,
    pub blocked: usize,
    /// GB
    pub data_usage: f64,
}

/// 使用时长图表
#[derive(Debug, Clone, PartialEq)]
pub struct UsageChart {
    pub label: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
    pub total_hours: f64,
}

/// 已加载的全部数据
struct Snapshot {
    devices: Vec<Device>,
    activity: Vec<ActivityLogEntry>,
    usage: UsageReport,
    network: NetworkStats,
}

pub struct Dashboard {
    provider: Box<dyn DataProvider>,
    fallback: Option<FixtureProvider>,
    /// 最近一次数据由样例数据源提供，之后的命令也发给它
    using_fallback: bool,
    profile_api: Option<Box<dyn ProfileApi>>,
    session: Session,
    loading: bool,
    devices: Vec<Device>,
    activity: Vec<ActivityLogEntry>,
    usage: Option<UsageReport>,
    network: Option<NetworkStats>,
    usage_filter: UsageWindow,
    historical_filter: HistoryWindow,
    modal: Option<Modal>,
}

impl Dashboard {
    pub fn new(provider: Box<dyn DataProvider>, session: Session) -> Self {
        Self {
            provider,
            fallback: None,
            using_fallback: false,
            profile_api: None,
            session,
            loading: false,
            devices: Vec::new(),
            activity: Vec::new(),
            usage: None,
            network: None,
            usage_filter: UsageWindow::default(),
            historical_filter: HistoryWindow::default(),
            modal: None,
        }
    }

    /// 数据源失败时改用样例数据
    pub fn with_fallback(mut self, fallback: FixtureProvider) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// 打开资料弹窗时从该服务拉取资料和统计
    pub fn with_profile_api(mut self, api: Box<dyn ProfileApi>) -> Self {
        self.profile_api = Some(api);
        self
    }

    /// 当前展示的是否为样例数据
    pub fn is_using_sample_data(&self) -> bool {
        self.using_fallback
    }

    /// 断网和定时命令的目标，与提供当前数据的数据源一致
    fn commands(&self) -> &dyn DataProvider {
        match (&self.fallback, self.using_fallback) {
            (Some(fixtures), true) => fixtures,
            _ => self.provider.as_ref(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn parent_name(&self) -> &str {
        &self.session.parent_display_name
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, device_id: i64) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    pub fn activity_log(&self) -> &[ActivityLogEntry] {
        &self.activity
    }

    pub fn network_stats(&self) -> Option<&NetworkStats> {
        self.network.as_ref()
    }

    /// 拉取设备、访问记录、使用报告和网络概况
    pub async fn fetch_data(&mut self) -> Result<()> {
        self.loading = true;
        let result = match load(self.provider.as_ref()).await {
            Ok(snapshot) => Ok((snapshot, false)),
            Err(e) => match &self.fallback {
                Some(fixtures) => {
                    warn!("Data source failed ({}), using sample data", e);
                    load(fixtures).await.map(|snapshot| (snapshot, true))
                }
                None => Err(e),
            },
        };
        self.loading = false;

        let (snapshot, using_fallback) = result?;
        self.using_fallback = using_fallback;
        info!(
            "Loaded {} devices and {} activity entries",
            snapshot.devices.len(),
            snapshot.activity.len()
        );
        self.devices = snapshot.devices;
        self.activity = snapshot.activity;
        self.usage = Some(snapshot.usage);
        self.network = Some(snapshot.network);
        Ok(())
    }

    /// 乐观切换断网状态，命令失败时回滚
    pub async fn toggle_device_block(&mut self, device_id: i64) -> Result<BlockOutcome> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .ok_or_else(|| Error::InvalidParam(format!("unknown device id {}", device_id)))?;
        let previous = device.blocked;
        device.blocked = !previous;
        let target = device.blocked;
        info!("Toggling block for device {} -> {}", device_id, target);

        match self.commands().set_device_blocked(device_id, target).await {
            Ok(_) => Ok(BlockOutcome::Confirmed { blocked: target }),
            Err(e) => {
                warn!("Block command for device {} failed, reverting: {}", device_id, e);
                if let Some(device) = self.devices.iter_mut().find(|d| d.id == device_id) {
                    device.blocked = previous;
                }
                Ok(BlockOutcome::Reverted {
                    blocked: previous,
                    reason: e.to_string(),
                })
            }
        }
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            total_devices: self.devices.len(),
            online: self.devices.iter().filter(|d| d.is_online()).count(),
            blocked: self.devices.iter().filter(|d| d.blocked).count(),
            data_usage: self.devices.iter().filter_map(|d| d.data_usage).sum(),
        }
    }

    // ---- 图表 ----

    pub fn usage_filter(&self) -> UsageWindow {
        self.usage_filter
    }

    pub fn set_usage_filter(&mut self, window: UsageWindow) {
        self.usage_filter = window;
    }

    /// 当前窗口的使用时长，未加载时为 None
    pub fn usage_chart(&self) -> Option<UsageChart> {
        let usage = self.usage.as_ref()?;
        let series = match self.usage_filter {
            UsageWindow::Days7 => &usage.last_7_days,
            UsageWindow::Days15 => &usage.last_15_days,
            UsageWindow::Days30 => &usage.last_30_days,
        };
        Some(UsageChart {
            label: self.usage_filter.chart_label(),
            labels: series.labels.clone(),
            data: series.data.clone(),
            total_hours: series.total_hours(),
        })
    }

    // ---- 浏览历史 ----

    pub fn historical_filter(&self) -> HistoryWindow {
        self.historical_filter
    }

    pub fn set_historical_filter(&mut self, window: HistoryWindow) {
        self.historical_filter = window;
    }

    pub fn history_for(&self, device_id: i64) -> Vec<&ActivityLogEntry> {
        self.history_at(device_id, Utc::now())
    }

    /// 指定设备在窗口内的记录，最新的在前
    pub fn history_at(&self, device_id: i64, now: DateTime<Utc>) -> Vec<&ActivityLogEntry> {
        let window = self.historical_filter.duration();
        let mut entries: Vec<&ActivityLogEntry> = self
            .activity
            .iter()
            .filter(|e| e.device_id == device_id && now - e.timestamp < window)
            .collect();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        entries
    }

    // ---- 弹窗 ----

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn close_modal(&mut self) {
        self.modal = None;
    }

    fn require_device(&self, device_id: i64) -> Result<Device> {
        self.device(device_id)
            .cloned()
            .ok_or_else(|| Error::InvalidParam(format!("unknown device id {}", device_id)))
    }

    pub fn open_schedule(&mut self, device_id: i64) -> Result<()> {
        let device = self.require_device(device_id)?;
        self.modal = Some(Modal::Schedule {
            device,
            times: ScheduleTimes::default(),
        });
        Ok(())
    }

    pub fn open_history(&mut self, device_id: i64) -> Result<()> {
        let device = self.require_device(device_id)?;
        self.modal = Some(Modal::History { device });
        Ok(())
    }

    /// 打开资料弹窗，资料或统计拉取失败不影响弹窗本身
    pub async fn open_profile(&mut self) {
        let (profile, stats) = match &self.profile_api {
            Some(api) => {
                let profile = api
                    .fetch_profile()
                    .await
                    .map_err(|e| warn!("Failed to fetch profile: {}", e))
                    .ok();
                let stats = api
                    .fetch_stats()
                    .await
                    .map_err(|e| warn!("Failed to fetch user statistics: {}", e))
                    .ok();
                (profile, stats)
            }
            None => (None, None),
        };
        self.modal = Some(Modal::Profile {
            parent_name: self.session.parent_display_name.clone(),
            profile,
            stats,
        });
    }

    fn require_profile_api(&self) -> Result<&dyn ProfileApi> {
        self.profile_api
            .as_deref()
            .ok_or_else(|| Error::InvalidState("profile service is not available".to_string()))
    }

    /// 更新资料，改名后同步会话显示名和已打开的资料弹窗
    pub async fn update_profile(
        &mut self,
        request: &UpdateProfileRequest,
    ) -> Result<UserProfile> {
        let updated = self.require_profile_api()?.update_profile(request).await?;
        if !updated.name.trim().is_empty() {
            self.session.parent_display_name = updated.name.trim().to_string();
        }
        if let Some(Modal::Profile {
            parent_name,
            profile,
            ..
        }) = &mut self.modal
        {
            *parent_name = self.session.parent_display_name.clone();
            *profile = Some(updated.clone());
        }
        info!("Profile updated for {}", self.session.parent_display_name);
        Ok(updated)
    }

    /// 修改密码，返回要显示的提示
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<String> {
        let message = self.require_profile_api()?.change_password(request).await?;
        Ok(message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Password changed successfully".to_string()))
    }

    /// 历史弹窗当前展示的记录
    pub fn modal_history(&self) -> Option<Vec<&ActivityLogEntry>> {
        match &self.modal {
            Some(modal @ Modal::History { .. }) => {
                modal.device().map(|d| self.history_for(d.id))
            }
            _ => None,
        }
    }

    /// 修改定时弹窗中的时间，格式 HH:MM
    pub fn set_schedule_times(&mut self, block: &str, unblock: &str) -> Result<()> {
        let block = parse_hhmm(block)?;
        let unblock = parse_hhmm(unblock)?;
        match &mut self.modal {
            Some(Modal::Schedule { times, .. }) => {
                *times = ScheduleTimes { block, unblock };
                Ok(())
            }
            _ => Err(Error::InvalidState("schedule modal is not open".to_string())),
        }
    }

    /// 保存定时计划并关闭弹窗，失败时弹窗保持打开
    pub async fn save_schedule(&mut self) -> Result<ScheduleTimes> {
        let (device_id, times) = match &self.modal {
            Some(Modal::Schedule { device, times }) => (device.id, *times),
            _ => return Err(Error::InvalidState("schedule modal is not open".to_string())),
        };
        self.commands().save_schedule(device_id, times).await?;
        self.modal = None;
        Ok(times)
    }

    /// 登出：丢弃仪表盘状态，返回被销毁的会话供调用方清理持久化数据
    pub fn logout(self) -> Session {
        info!("Logging out {}", self.session.parent_display_name);
        self.session
    }
}

async fn load(provider: &dyn DataProvider) -> Result<Snapshot> {
    Ok(Snapshot {
        devices: provider.fetch_devices().await?,
        activity: provider.fetch_activity_log().await?,
        usage: provider.fetch_usage_report().await?,
        network: provider.fetch_network_stats().await?,
    })
}

fn parse_hhmm(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| Error::InvalidParam(format!("expected HH:MM, got {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::profile::MockProfileApi;
    use crate::provider::MockDataProvider;
    use std::time::Duration;

    fn session() -> Session {
        Session {
            token: "t".into(),
            parent_display_name: "John Smith".into(),
        }
    }

    fn fixture_dashboard() -> Dashboard {
        Dashboard::new(
            Box::new(FixtureProvider::with_delay(Duration::ZERO)),
            session(),
        )
    }

    /// 每类数据恰好拉取一次的 mock
    fn loaded_mock() -> MockDataProvider {
        let mut mock = MockDataProvider::new();
        mock.expect_fetch_devices()
            .times(1)
            .returning(|| Ok(fixtures::devices()));
        mock.expect_fetch_activity_log()
            .times(1)
            .returning(|| Ok(fixtures::activity_log(Utc::now())));
        mock.expect_fetch_usage_report()
            .times(1)
            .returning(|| Ok(fixtures::usage_report()));
        mock.expect_fetch_network_stats()
            .times(1)
            .returning(|| Ok(fixtures::network_stats()));
        mock
    }

    #[tokio::test]
    async fn test_fetch_replaces_collections() {
        let mut dash = fixture_dashboard();
        assert!(dash.devices().is_empty());
        dash.fetch_data().await.unwrap();
        assert!(!dash.is_loading());
        assert_eq!(dash.devices().len(), 5);

        let summary = dash.summary();
        assert_eq!(summary.total_devices, 5);
        assert_eq!(summary.online, 4);
        assert_eq!(summary.blocked, 1);
        assert!((summary.data_usage - 32.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_samples() {
        let mut mock = MockDataProvider::new();
        mock.expect_fetch_devices()
            .returning(|| Err(Error::Network("connection refused".into())));
        let mut dash = Dashboard::new(Box::new(mock), session())
            .with_fallback(FixtureProvider::with_delay(Duration::ZERO));
        dash.fetch_data().await.unwrap();
        assert_eq!(dash.devices().len(), 5);
        assert!(dash.network_stats().is_some());
    }

    #[tokio::test]
    async fn test_commands_follow_sample_data() {
        let mut mock = MockDataProvider::new();
        mock.expect_fetch_devices()
            .returning(|| Err(Error::Network("connection refused".into())));
        mock.expect_set_device_blocked().never();
        mock.expect_save_schedule().never();
        let mut dash = Dashboard::new(Box::new(mock), session())
            .with_fallback(FixtureProvider::with_delay(Duration::ZERO));
        dash.fetch_data().await.unwrap();
        assert!(dash.is_using_sample_data());

        let outcome = dash.toggle_device_block(2).await.unwrap();
        assert_eq!(outcome, BlockOutcome::Confirmed { blocked: true });
        assert!(dash.device(2).unwrap().blocked);

        dash.open_schedule(4).unwrap();
        dash.set_schedule_times("22:00", "07:00").unwrap();
        assert!(dash.save_schedule().await.is_ok());
        assert!(dash.modal().is_none());
    }

    #[tokio::test]
    async fn test_primary_success_keeps_commands_on_primary() {
        let mut mock = loaded_mock();
        mock.expect_set_device_blocked()
            .times(1)
            .returning(|id, blocked| {
                Ok(DeviceActionResult {
                    success: true,
                    message: None,
                    device_id: id,
                    action: "BLOCK".into(),
                    previous_blocked: !blocked,
                    new_blocked: blocked,
                })
            });
        let mut dash = Dashboard::new(Box::new(mock), session())
            .with_fallback(FixtureProvider::with_delay(Duration::ZERO));
        dash.fetch_data().await.unwrap();
        assert!(!dash.is_using_sample_data());
        assert_eq!(
            dash.toggle_device_block(2).await.unwrap(),
            BlockOutcome::Confirmed { blocked: true }
        );
    }

    #[tokio::test]
    async fn test_fetch_without_fallback_reports_error() {
        let mut mock = MockDataProvider::new();
        mock.expect_fetch_devices()
            .returning(|| Err(Error::Network("connection refused".into())));
        let mut dash = Dashboard::new(Box::new(mock), session());
        assert!(dash.fetch_data().await.is_err());
        assert!(!dash.is_loading());
        assert!(dash.devices().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_flips_only_target_and_double_toggle_restores() {
        let mut dash = fixture_dashboard();
        dash.fetch_data().await.unwrap();
        let before: Vec<bool> = dash.devices().iter().map(|d| d.blocked).collect();

        let outcome = dash.toggle_device_block(2).await.unwrap();
        assert_eq!(outcome, BlockOutcome::Confirmed { blocked: true });
        for (device, was) in dash.devices().iter().zip(&before) {
            if device.id == 2 {
                assert_ne!(device.blocked, *was);
            } else {
                assert_eq!(device.blocked, *was);
            }
        }

        dash.toggle_device_block(2).await.unwrap();
        let after: Vec<bool> = dash.devices().iter().map(|d| d.blocked).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_toggle_reverts_on_command_failure() {
        let mut mock = loaded_mock();
        mock.expect_set_device_blocked()
            .withf(|id, blocked| *id == 3 && !*blocked)
            .times(1)
            .returning(|_, _| Err(Error::Timeout));
        let mut dash = Dashboard::new(Box::new(mock), session());
        dash.fetch_data().await.unwrap();

        let outcome = dash.toggle_device_block(3).await.unwrap();
        assert!(matches!(outcome, BlockOutcome::Reverted { blocked: true, .. }));
        assert!(dash.device(3).unwrap().blocked);
    }

    #[tokio::test]
    async fn test_toggle_unknown_device() {
        let mut dash = fixture_dashboard();
        dash.fetch_data().await.unwrap();
        assert!(matches!(
            dash.toggle_device_block(99).await,
            Err(Error::InvalidParam(_))
        ));
    }

    #[tokio::test]
    async fn test_usage_filter_is_local() {
        // loaded_mock 限定每类数据只拉取一次
        let mut dash = Dashboard::new(Box::new(loaded_mock()), session());
        assert!(dash.usage_chart().is_none());
        dash.fetch_data().await.unwrap();

        dash.set_usage_filter(UsageWindow::Days30);
        let chart = dash.usage_chart().unwrap();
        assert_eq!(chart.label, "Hours - Last 30 Days");
        assert_eq!(chart.data, fixtures::usage_report().last_30_days.data);
        let expected: f64 = chart.data.iter().sum();
        assert!((chart.total_hours - expected).abs() < 1e-9);

        dash.set_usage_filter(UsageWindow::Days7);
        assert_eq!(
            dash.usage_chart().unwrap().data,
            fixtures::usage_report().last_7_days.data
        );
    }

    #[tokio::test]
    async fn test_modal_slot_replaces_and_closes() {
        let mut dash = fixture_dashboard();
        dash.fetch_data().await.unwrap();

        dash.open_schedule(1).unwrap();
        assert_eq!(dash.modal().unwrap().kind(), "schedule");
        dash.open_history(1).unwrap();
        assert_eq!(dash.modal().unwrap().kind(), "history");
        dash.open_profile().await;
        assert_eq!(
            dash.modal(),
            Some(&Modal::Profile {
                parent_name: "John Smith".into(),
                profile: None,
                stats: None,
            })
        );
        dash.close_modal();
        assert!(dash.modal().is_none());
        assert!(dash.open_history(42).is_err());
    }

    #[tokio::test]
    async fn test_schedule_edit_and_save() {
        let mut mock = loaded_mock();
        mock.expect_save_schedule()
            .withf(|id, times| {
                *id == 4 && times.block.format("%H:%M").to_string() == "21:30"
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let mut dash = Dashboard::new(Box::new(mock), session());
        dash.fetch_data().await.unwrap();

        assert!(dash.set_schedule_times("21:30", "06:00").is_err());
        dash.open_schedule(4).unwrap();
        assert!(dash.set_schedule_times("25:00", "06:00").is_err());
        dash.set_schedule_times("21:30", "06:00").unwrap();
        let saved = dash.save_schedule().await.unwrap();
        assert_eq!(saved.unblock.format("%H:%M").to_string(), "06:00");
        assert!(dash.modal().is_none());
    }

    #[tokio::test]
    async fn test_logout_returns_session() {
        let dash = fixture_dashboard();
        assert_eq!(dash.logout(), session());
    }

    fn profile_mock() -> MockProfileApi {
        let mut api = MockProfileApi::new();
        api.expect_fetch_profile().returning(|| {
            Ok(UserProfile {
                name: "John Smith".into(),
                email: "john@example.com".into(),
                email_verified: Some(true),
                ..UserProfile::default()
            })
        });
        api.expect_fetch_stats()
            .returning(|| Err(Error::Rejected(Some("Failed to fetch user statistics".into()))));
        api
    }

    #[tokio::test]
    async fn test_open_profile_loads_account_details() {
        let mut dash = fixture_dashboard().with_profile_api(Box::new(profile_mock()));
        dash.open_profile().await;
        match dash.modal() {
            Some(Modal::Profile {
                parent_name,
                profile,
                stats,
            }) => {
                assert_eq!(parent_name, "John Smith");
                assert_eq!(profile.as_ref().unwrap().email, "john@example.com");
                assert!(stats.is_none());
            }
            other => panic!("unexpected modal {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_profile_renames_session() {
        let mut api = profile_mock();
        api.expect_update_profile()
            .withf(|req| req.name.as_deref() == Some("Johnny"))
            .times(1)
            .returning(|_| {
                Ok(UserProfile {
                    name: "Johnny".into(),
                    ..UserProfile::default()
                })
            });
        let mut dash = fixture_dashboard().with_profile_api(Box::new(api));
        dash.open_profile().await;

        let request = UpdateProfileRequest {
            name: Some("Johnny".into()),
            ..UpdateProfileRequest::default()
        };
        dash.update_profile(&request).await.unwrap();
        assert_eq!(dash.parent_name(), "Johnny");
        assert!(matches!(
            dash.modal(),
            Some(Modal::Profile { parent_name, .. }) if parent_name == "Johnny"
        ));
    }

    #[tokio::test]
    async fn test_change_password_messages() {
        let request = ChangePasswordRequest {
            current_password: "old1".into(),
            new_password: "new1".into(),
            confirm_password: "new1".into(),
        };
        assert!(matches!(
            fixture_dashboard().change_password(&request).await,
            Err(Error::InvalidState(_))
        ));

        let mut api = MockProfileApi::new();
        api.expect_change_password()
            .times(1)
            .returning(|_| Ok(None));
        let dash = fixture_dashboard().with_profile_api(Box::new(api));
        assert_eq!(
            dash.change_password(&request).await.unwrap(),
            "Password changed successfully"
        );
    }
}
