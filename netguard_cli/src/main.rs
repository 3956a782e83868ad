//! NetGuard 家长控制 CLI 工具

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use netguard_core::error::change_password_failure_message;
use netguard_core::legal::LegalDocument;
use netguard_core::types::category_icon;
use netguard_core::{
    AuthApi, AuthClient, AuthFlow, AuthMode, BlockOutcome, ChangePasswordRequest, ClientConfig,
    Dashboard, Error, FixtureProvider, HistoryWindow, LiveApiProvider, Modal, ProfileClient,
    ProfileImage, RegistrationDraft, ResetStep, Session, StateStore, ThemePreference,
    UpdateProfileRequest, UsageWindow,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netguard")]
#[command(about = "NetGuard 家长控制客户端工具", long_about = None)]
struct Cli {
    /// 服务器地址
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// 请求超时（秒）
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// 不校验 TLS 证书
    #[arg(long)]
    insecure: bool,

    /// 演示模式：后端不可达时使用演示账号和样例数据
    #[arg(long)]
    demo: bool,

    /// 本地状态目录
    #[arg(long, default_value = ".")]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 家长登录
    Login {
        /// 用户名（邮箱）
        #[arg(short, long)]
        username: String,
        /// 密码
        #[arg(short, long)]
        password: String,
    },
    /// 注册家长账号
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        age: String,
        #[arg(long)]
        password: String,
        /// 头像文件
        #[arg(long)]
        image: Option<PathBuf>,
        /// 同意服务条款
        #[arg(long)]
        accept_terms: bool,
        /// 同意隐私政策
        #[arg(long)]
        accept_privacy: bool,
    },
    /// 找回密码（交互式：邮箱 → OTP → 新密码）
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// 用邮件中的令牌验证邮箱
    VerifyEmail { token: String },
    /// 重发验证邮件
    ResendVerification {
        #[arg(short, long)]
        email: String,
    },
    /// 登出
    Logout,
    /// 仪表盘概览
    Dashboard {
        /// 使用时长窗口：7d / 15d / 30d
        #[arg(short, long, default_value = "7d")]
        window: UsageWindow,
    },
    /// 设备列表
    Devices,
    /// 切换设备断网状态
    Block {
        #[arg(short, long)]
        device: i64,
    },
    /// 设置定时断网
    Schedule {
        #[arg(short, long)]
        device: i64,
        /// 断网时间 HH:MM
        #[arg(long, default_value = "23:00")]
        block: String,
        /// 恢复时间 HH:MM
        #[arg(long, default_value = "07:00")]
        unblock: String,
    },
    /// 设备浏览历史
    History {
        #[arg(short, long)]
        device: i64,
        /// 时间窗口：1d / 3d / 7d / 15d / 30d
        #[arg(short, long, default_value = "1d")]
        window: HistoryWindow,
    },
    /// 家长资料
    Profile,
    /// 修改资料，只提交给出的字段
    EditProfile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        timezone: Option<String>,
    },
    /// 修改密码（交互式输入）
    ChangePassword,
    /// 主题：light / dark / toggle，不带参数时显示当前主题
    Theme { value: Option<String> },
    /// 服务条款
    Terms,
    /// 隐私政策
    Privacy,
    /// 健康检查
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let config = ClientConfig {
        server_url: cli.server.clone(),
        timeout: cli.timeout,
        verify_tls: !cli.insecure,
        demo_mode: cli.demo,
    };
    let store = StateStore::new(&cli.state_dir);

    match cli.command {
        Commands::Login { username, password } => {
            do_login(&config, &store, &username, &password).await?;
        }
        Commands::Register {
            name,
            email,
            phone,
            age,
            password,
            image,
            accept_terms,
            accept_privacy,
        } => {
            let image = image.map(|p| ProfileImage::from_path(&p)).transpose()?;
            let draft = RegistrationDraft {
                name,
                email,
                phone,
                age,
                password,
                profile_image: image,
                accept_terms,
                accept_privacy,
            };
            do_register(&config, draft).await?;
        }
        Commands::ForgotPassword { email } => {
            do_forgot_password(&config, &email).await?;
        }
        Commands::VerifyEmail { token } => {
            do_verify_email(&config, &token).await?;
        }
        Commands::ResendVerification { email } => {
            do_resend_verification(&config, &email).await?;
        }
        Commands::Logout => {
            do_logout(&store)?;
        }
        Commands::Dashboard { window } => {
            do_dashboard(&config, &store, window).await?;
        }
        Commands::Devices => {
            do_devices(&config, &store).await?;
        }
        Commands::Block { device } => {
            do_block(&config, &store, device).await?;
        }
        Commands::Schedule {
            device,
            block,
            unblock,
        } => {
            do_schedule(&config, &store, device, &block, &unblock).await?;
        }
        Commands::History { device, window } => {
            do_history(&config, &store, device, window).await?;
        }
        Commands::Profile => {
            do_profile(&config, &store).await?;
        }
        Commands::EditProfile {
            name,
            phone,
            age,
            bio,
            location,
            timezone,
        } => {
            let request = UpdateProfileRequest {
                name,
                phone,
                age,
                bio,
                location,
                timezone,
            };
            do_edit_profile(&config, &store, request).await?;
        }
        Commands::ChangePassword => {
            do_change_password(&config, &store).await?;
        }
        Commands::Theme { value } => {
            do_theme(&store, value.as_deref())?;
        }
        Commands::Terms => print!("{}", LegalDocument::Terms.render()),
        Commands::Privacy => print!("{}", LegalDocument::Privacy.render()),
        Commands::Health => {
            do_health(&config).await?;
        }
    }

    Ok(())
}

fn auth_flow(config: &ClientConfig) -> anyhow::Result<AuthFlow<AuthClient>> {
    let client = AuthClient::new(config.clone())?;
    Ok(AuthFlow::new(client).with_demo_mode(config.demo_mode))
}

/// 表单失败时返回状态机给出的提示
fn form_error<A: AuthApi>(flow: &AuthFlow<A>, err: Error) -> anyhow::Error {
    match flow.error() {
        Some(msg) => anyhow!("{}", msg),
        None => err.into(),
    }
}

async fn do_login(
    config: &ClientConfig,
    store: &StateStore,
    username: &str,
    password: &str,
) -> anyhow::Result<()> {
    println!("正在登录: {}", username);

    let mut flow = auth_flow(config)?;
    flow.set_login(username, password);
    let session = match flow.submit_login().await {
        Ok(session) => session,
        Err(e) => return Err(form_error(&flow, e)),
    };

    store.save_session(&session)?;
    println!("登录成功! 欢迎, {}", session.parent_display_name);
    println!("会话已保存到 {}", store.dir().display());

    Ok(())
}

async fn do_register(
    config: &ClientConfig,
    draft: RegistrationDraft,
) -> anyhow::Result<()> {
    println!("正在注册: {}", draft.email);

    let mut flow = auth_flow(config)?;
    flow.show_register();
    flow.edit_registration(|d| *d = draft);
    if let Err(e) = flow.submit_registration().await {
        return Err(form_error(&flow, e));
    }

    println!("{}", flow.message().unwrap_or("注册成功!"));

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

async fn do_forgot_password(config: &ClientConfig, email: &str) -> anyhow::Result<()> {
    let mut flow = auth_flow(config)?;
    flow.show_forgot_password();
    flow.set_reset_email(email);

    println!("正在发送验证码到: {}", email);
    if let Err(e) = flow.request_otp().await {
        return Err(form_error(&flow, e));
    }
    if let Some(msg) = flow.message() {
        println!("{}", msg);
    }

    loop {
        match flow.mode() {
            AuthMode::ForgotPassword(ResetStep::OtpInput) => {
                let otp = prompt("验证码（输入 back 返回上一步）")?;
                if otp == "back" {
                    bail!("已取消");
                }
                flow.set_otp(&otp);
                if flow.submit_otp().is_err() {
                    println!("{}", flow.error().unwrap_or("验证码格式错误"));
                }
            }
            AuthMode::ForgotPassword(ResetStep::NewPasswordInput) => {
                let new_password = prompt("新密码（输入 back 重新输入验证码）")?;
                if new_password == "back" {
                    flow.back_to_otp()?;
                    continue;
                }
                let confirm = prompt("确认新密码")?;
                flow.set_new_password(&new_password, &confirm);
                if let Err(e) = flow.reset_password().await {
                    if matches!(e, Error::Validation(_)) {
                        println!("{}", flow.error().unwrap_or("两次密码不一致"));
                        continue;
                    }
                    return Err(form_error(&flow, e));
                }
            }
            AuthMode::Login => break,
            other => bail!("unexpected form state: {:?}", other),
        }
    }

    println!("{}", flow.message().unwrap_or("密码已重置"));

    Ok(())
}

async fn do_verify_email(config: &ClientConfig, token: &str) -> anyhow::Result<()> {
    let mut flow = auth_flow(config)?;
    if let Err(e) = flow.verify_email(token).await {
        return Err(form_error(&flow, e));
    }
    println!("{}", flow.message().unwrap_or("邮箱已验证"));
    Ok(())
}

async fn do_resend_verification(config: &ClientConfig, email: &str) -> anyhow::Result<()> {
    let mut flow = auth_flow(config)?;
    if let Err(e) = flow.resend_verification(email).await {
        return Err(form_error(&flow, e));
    }
    println!("{}", flow.message().unwrap_or("验证邮件已发送"));
    Ok(())
}

fn do_logout(store: &StateStore) -> anyhow::Result<()> {
    println!("正在登出...");

    // 会话只在本地，登出即删除本地副本
    store.clear_session()?;

    println!("登出成功!");

    Ok(())
}

fn require_session(store: &StateStore) -> anyhow::Result<Session> {
    store
        .load_session()?
        .ok_or_else(|| anyhow!("请先登录（未找到会话）"))
}

async fn open_dashboard(config: &ClientConfig, store: &StateStore) -> anyhow::Result<Dashboard> {
    let session = require_session(store)?;
    debug!("Opening dashboard against {}", config.server_url);
    let live = LiveApiProvider::new(config.clone(), &session)?;
    let profile = ProfileClient::new(config.clone(), &session)?;
    let mut dashboard =
        Dashboard::new(Box::new(live), session).with_profile_api(Box::new(profile));
    if config.demo_mode {
        dashboard = dashboard.with_fallback(FixtureProvider::new());
    }

    println!("正在加载仪表盘...");
    dashboard.fetch_data().await?;
    if dashboard.is_using_sample_data() {
        println!("后端不可用，显示样例数据");
    }
    Ok(dashboard)
}

fn print_devices(dashboard: &Dashboard) {
    for device in dashboard.devices() {
        let battery = device
            .battery
            .map(|b| format!(" 🔋{}%", b))
            .unwrap_or_default();
        println!(
            "  [{}] {} {:<18} {:<8} {:<14} {:<15} {}{}",
            device.id,
            device.device_type.icon(),
            device.name,
            device.status,
            device.user,
            device.ip,
            if device.blocked { "🚫 已断网" } else { "✅ 正常" },
            battery
        );
    }
}

async fn do_dashboard(
    config: &ClientConfig,
    store: &StateStore,
    window: UsageWindow,
) -> anyhow::Result<()> {
    let mut dashboard = open_dashboard(config, store).await?;
    dashboard.set_usage_filter(window);

    let summary = dashboard.summary();
    println!("欢迎, {}", dashboard.parent_name());
    println!(
        "设备总数: {}  在线: {}  已断网: {}  流量: {:.1} GB",
        summary.total_devices, summary.online, summary.blocked, summary.data_usage
    );

    if let Some(stats) = dashboard.network_stats() {
        println!(
            "带宽占用: {:.0}%  高峰时段: {}  平均速度: {}",
            stats.utilization(),
            stats.peak_hours,
            stats.average_speed
        );
    }

    println!("\n设备:");
    print_devices(&dashboard);

    if let Some(chart) = dashboard.usage_chart() {
        println!("\n{}:", chart.label);
        let max = chart.data.iter().cloned().fold(0.0_f64, f64::max);
        for (label, hours) in chart.labels.iter().zip(&chart.data) {
            let width = if max > 0.0 { (hours / max * 30.0).round() as usize } else { 0 };
            println!("  {:<14} {:>5.1} {}", label, hours, "█".repeat(width));
        }
        println!("  合计 {:.1} 小时", chart.total_hours);
    }

    println!("\n最近活动:");
    for entry in dashboard.activity_log().iter().take(5) {
        println!(
            "  {} {:<18} {} ({})",
            category_icon(&entry.category),
            entry.device_name,
            entry.site,
            entry.timestamp.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

async fn do_devices(config: &ClientConfig, store: &StateStore) -> anyhow::Result<()> {
    let dashboard = open_dashboard(config, store).await?;
    print_devices(&dashboard);
    Ok(())
}

async fn do_block(
    config: &ClientConfig,
    store: &StateStore,
    device_id: i64,
) -> anyhow::Result<()> {
    let mut dashboard = open_dashboard(config, store).await?;
    match dashboard.toggle_device_block(device_id).await? {
        BlockOutcome::Confirmed { blocked } => {
            let state = if blocked { "已断网" } else { "已恢复" };
            println!("设备 {} {}", device_id, state);
        }
        BlockOutcome::Reverted { blocked, reason } => {
            let state = if blocked { "断网" } else { "正常" };
            bail!("操作失败，设备 {} 保持{}：{}", device_id, state, reason);
        }
    }
    Ok(())
}

async fn do_schedule(
    config: &ClientConfig,
    store: &StateStore,
    device_id: i64,
    block: &str,
    unblock: &str,
) -> anyhow::Result<()> {
    let mut dashboard = open_dashboard(config, store).await?;
    dashboard.open_schedule(device_id)?;
    if let Some(device) = dashboard.modal().and_then(Modal::device) {
        println!("定时断网 - {}", device.name);
    }
    dashboard.set_schedule_times(block, unblock)?;
    let times = dashboard.save_schedule().await?;
    println!(
        "已保存: {} 断网, {} 恢复",
        times.block.format("%H:%M"),
        times.unblock.format("%H:%M")
    );
    Ok(())
}

async fn do_history(
    config: &ClientConfig,
    store: &StateStore,
    device_id: i64,
    window: HistoryWindow,
) -> anyhow::Result<()> {
    let mut dashboard = open_dashboard(config, store).await?;
    dashboard.set_historical_filter(window);
    dashboard.open_history(device_id)?;

    if let Some(device) = dashboard.modal().and_then(Modal::device) {
        println!("浏览历史: {} (最近 {})", device.name, window);
    }
    let entries = dashboard.modal_history().unwrap_or_default();
    if entries.is_empty() {
        println!("  该时间段内没有浏览记录");
    }
    for entry in entries {
        println!(
            "  {} {} {}",
            entry.timestamp.format("%Y-%m-%d %H:%M"),
            category_icon(&entry.category),
            entry.site
        );
    }
    Ok(())
}

async fn do_profile(config: &ClientConfig, store: &StateStore) -> anyhow::Result<()> {
    let mut dashboard = open_dashboard(config, store).await?;
    dashboard.open_profile().await;
    let Some(Modal::Profile {
        parent_name,
        profile,
        stats,
    }) = dashboard.modal()
    else {
        return Ok(());
    };

    println!("家长: {}", parent_name);
    if let Some(profile) = profile {
        println!("邮箱: {}", profile.email);
        if let Some(phone) = &profile.phone {
            println!("电话: {}", phone);
        }
        if let Some(location) = &profile.location {
            println!("地区: {}", location);
        }
        let verified = profile.email_verified.unwrap_or(false);
        println!("邮箱验证: {}", if verified { "已验证" } else { "未验证" });
    }
    if let Some(stats) = stats {
        if let Some(days) = stats.days_since_registration {
            println!("注册天数: {}", days);
        }
        if let Some(completeness) = stats.profile_completeness {
            println!("资料完整度: {}%", completeness);
        }
    }
    println!("受管设备: {}", dashboard.summary().total_devices);
    Ok(())
}

async fn do_edit_profile(
    config: &ClientConfig,
    store: &StateStore,
    request: UpdateProfileRequest,
) -> anyhow::Result<()> {
    if request == UpdateProfileRequest::default() {
        bail!("没有需要修改的字段");
    }
    let mut dashboard = open_dashboard(config, store).await?;
    let updated = dashboard.update_profile(&request).await?;
    // 显示名随资料一起更新
    store.save_session(dashboard.session())?;
    println!("资料已更新: {}", updated.name);
    Ok(())
}

async fn do_change_password(config: &ClientConfig, store: &StateStore) -> anyhow::Result<()> {
    let dashboard = open_dashboard(config, store).await?;
    let request = ChangePasswordRequest {
        current_password: prompt("当前密码")?,
        new_password: prompt("新密码")?,
        confirm_password: prompt("确认新密码")?,
    };
    match dashboard.change_password(&request).await {
        Ok(message) => {
            println!("{}", message);
            Ok(())
        }
        Err(e) => bail!("{}", change_password_failure_message(&e)),
    }
}

fn do_theme(store: &StateStore, value: Option<&str>) -> anyhow::Result<()> {
    let current = store.theme()?;
    let next = match value {
        None => {
            println!("当前主题: {}", current.as_str());
            return Ok(());
        }
        Some("toggle") => current.toggled(),
        Some(raw) => raw.parse::<ThemePreference>()?,
    };
    store.save_theme(next)?;
    println!("主题已切换为: {}", next.as_str());
    Ok(())
}

async fn do_health(config: &ClientConfig) -> anyhow::Result<()> {
    let client = AuthClient::new(config.clone())?;
    let healthy = client.health_check().await?;

    if healthy {
        println!("服务状态: 正常");
    } else {
        println!("服务状态: 异常");
    }

    Ok(())
}
