//! 集成测试 - 不依赖后台服务的端到端场景

use chrono::{Duration, Utc};
use netguard_core::auth_flow::{DEMO_PASSWORD, DEMO_TOKEN, DEMO_USERNAME};
use netguard_core::{
    AuthClient, AuthFlow, AuthMode, ClientConfig, Dashboard, DataProvider, Error,
    FixtureProvider, HistoryWindow, LiveApiProvider, StateStore,
};

/// 指向一个没有服务监听的端口
fn unreachable_config() -> ClientConfig {
    ClientConfig {
        server_url: "http://127.0.0.1:9".to_string(),
        timeout: 5,
        verify_tls: false,
        demo_mode: true,
    }
}

fn fixture_provider() -> FixtureProvider {
    FixtureProvider::with_delay(std::time::Duration::ZERO)
}

#[tokio::test]
async fn test_demo_login_then_dashboard_with_fallback() {
    let config = unreachable_config();
    let client = AuthClient::new(config.clone()).expect("Failed to create client");
    let mut flow = AuthFlow::new(client).with_demo_mode(config.demo_mode);
    flow.set_login(DEMO_USERNAME, DEMO_PASSWORD);

    let session = flow.submit_login().await.expect("demo login");
    assert_eq!(session.token, DEMO_TOKEN);

    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path());
    store.save_session(&session).unwrap();

    let live = LiveApiProvider::new(config, &session).unwrap();
    let mut dashboard = Dashboard::new(Box::new(live), session).with_fallback(fixture_provider());
    dashboard.fetch_data().await.unwrap();
    assert_eq!(dashboard.summary().total_devices, 5);
    assert_eq!(dashboard.parent_name(), DEMO_USERNAME);

    let ended = dashboard.logout();
    assert_eq!(ended.token, DEMO_TOKEN);
    store.clear_session().unwrap();
    assert!(store.load_session().unwrap().is_none());
}

#[tokio::test]
async fn test_wrong_credentials_fail_without_backend() {
    let client = AuthClient::new(unreachable_config()).unwrap();
    let mut flow = AuthFlow::new(client).with_demo_mode(true);
    flow.set_login(DEMO_USERNAME, "wrong");
    assert!(flow.submit_login().await.is_err());
    assert_eq!(
        flow.error(),
        Some("Login failed. Invalid username or password.")
    );
}

#[tokio::test]
async fn test_registration_reports_network_error() {
    let client = AuthClient::new(unreachable_config()).unwrap();
    let mut flow = AuthFlow::new(client);
    flow.show_register();
    flow.edit_registration(|d| {
        d.name = "Jane".into();
        d.email = "jane@example.com".into();
        d.phone = "01712345678".into();
        d.age = "30".into();
        d.password = "secret1".into();
        d.accept_terms = true;
        d.accept_privacy = true;
    });

    let err = flow.submit_registration().await.unwrap_err();
    assert!(err.is_unreachable());
    assert_eq!(
        flow.error(),
        Some("Network error. Please check your internet connection and try again.")
    );
    assert_eq!(flow.mode(), AuthMode::Register);
}

#[tokio::test]
async fn test_history_for_device_three_last_seven_days() {
    let provider = fixture_provider();
    let session = netguard_core::Session {
        token: "t".into(),
        parent_display_name: "John Smith".into(),
    };
    let mut dashboard = Dashboard::new(Box::new(provider.clone()), session);
    dashboard.fetch_data().await.unwrap();

    dashboard.open_history(3).unwrap();
    dashboard.set_historical_filter(HistoryWindow::Days7);

    let now = Utc::now();
    let entries = dashboard.history_at(3, now);
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.device_id == 3));
    assert!(entries.iter().all(|e| now - e.timestamp < Duration::days(7)));
    assert!(entries.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    // 窗口外的记录确实存在，只是被过滤掉
    let all_for_device = provider
        .fetch_activity_log()
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.device_id == 3)
        .count();
    assert!(all_for_device > entries.len());

    let shown = dashboard.modal_history().expect("history modal open");
    assert_eq!(shown.len(), entries.len());
}

#[tokio::test]
async fn test_demo_commands_use_sample_data() {
    let config = unreachable_config();
    let session = netguard_core::Session {
        token: "t".into(),
        parent_display_name: "p".into(),
    };
    let live = LiveApiProvider::new(config, &session).unwrap();
    let mut dashboard =
        Dashboard::new(Box::new(live), session).with_fallback(fixture_provider());
    dashboard.fetch_data().await.unwrap();
    assert!(dashboard.is_using_sample_data());

    let before = dashboard.device(1).unwrap().blocked;
    let outcome = dashboard.toggle_device_block(1).await.unwrap();
    assert_eq!(
        outcome,
        netguard_core::BlockOutcome::Confirmed { blocked: !before }
    );
    assert_eq!(dashboard.device(1).unwrap().blocked, !before);

    dashboard.open_schedule(4).unwrap();
    dashboard.set_schedule_times("21:00", "06:30").unwrap();
    let saved = dashboard.save_schedule().await.unwrap();
    assert_eq!(saved.block.format("%H:%M").to_string(), "21:00");
    assert!(dashboard.modal().is_none());

    assert!(matches!(
        dashboard.toggle_device_block(404).await,
        Err(Error::InvalidParam(_))
    ));
}
