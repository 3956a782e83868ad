//! 数据类型定义

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 会话信息（登录时创建，登出时销毁）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub parent_display_name: String,
}

/// 统一 API 响应
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 构造成功响应
    pub fn ok(message: Option<&str>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.map(str::to_string),
            data,
        }
    }

    /// 构造失败响应
    pub fn failed(message: Option<&str>) -> Self {
        Self {
            success: false,
            message: message.map(str::to_string),
            data: None,
        }
    }
}

/// 非 2xx 时服务端返回的错误体
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl ServerErrorBody {
    /// 依次取 message、error、errors 拼接
    pub fn resolve(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error.filter(|e| !e.is_empty()))
            .or_else(|| {
                self.errors
                    .filter(|errs| !errs.is_empty())
                    .map(|errs| errs.join(", "))
            })
    }
}

/// 登录请求
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// 登录响应数据
#[derive(Debug, Clone, Deserialize)]
pub struct LoginData {
    pub token: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// 注册请求（multipart 中名为 `request` 的 JSON 部分）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub age: u32,
    pub password: String,
    pub accept_terms: bool,
    pub accept_privacy: bool,
}

/// 头像文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// 注册负载：JSON 部分加可选头像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationPayload {
    pub request: RegisterRequest,
    pub image: Option<ProfileImage>,
}

/// 忘记密码请求
#[derive(Debug, Clone, Serialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// 重置密码请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// 邮箱验证请求
#[derive(Debug, Clone, Serialize)]
pub struct EmailVerificationRequest {
    pub token: String,
}

/// 重发验证邮件请求
#[derive(Debug, Clone, Serialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// 家长资料（GET /api/profile）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub age: Option<u32>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub profile_image_url: Option<String>,
    pub email_verified: Option<bool>,
    pub active: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub last_login_at: Option<NaiveDateTime>,
    pub member_since: Option<String>,
    pub notification_preferences: Option<String>,
}

/// 账号统计（GET /api/profile/stats）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStats {
    pub days_since_registration: Option<i64>,
    /// 从未登录时为空
    pub days_since_last_login: Option<i64>,
    pub email_verified: Option<bool>,
    /// 百分比
    pub profile_completeness: Option<u32>,
    pub last_password_update: Option<NaiveDateTime>,
    pub account_status: Option<String>,
    pub total_logins: Option<u32>,
    pub managed_devices: Option<u32>,
    pub sites_monitored: Option<u32>,
    pub protection_rate: Option<u32>,
}

/// 资料修改（PUT /api/profile），未设置的字段不发送
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// 修改密码（PUT /api/profile/password）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// 设备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Desktop,
    Tablet,
    Tv,
    Laptop,
    #[serde(other)]
    Other,
}

impl DeviceType {
    pub fn icon(self) -> &'static str {
        match self {
            DeviceType::Mobile => "📱",
            DeviceType::Desktop => "🖥️",
            DeviceType::Tablet => "📟",
            DeviceType::Tv => "📺",
            DeviceType::Laptop => "💻",
            DeviceType::Other => "🔌",
        }
    }
}

/// 设备在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Online,
    Offline,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceStatus::Online => f.pad("online"),
            DeviceStatus::Offline => f.pad("offline"),
        }
    }
}

/// 受管设备（只读展示副本，权威状态在外部系统）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub blocked: bool,
    pub user: String,
    pub ip: String,
    /// 电量百分比
    #[serde(default)]
    pub battery: Option<u8>,
    /// 流量，单位 GB
    #[serde(default)]
    pub data_usage: Option<f64>,
}

impl Device {
    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }
}

/// 访问记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogEntry {
    pub device_id: i64,
    pub device_name: String,
    pub site: String,
    pub timestamp: DateTime<Utc>,
    pub category: String,
}

/// 访问分类对应的图标
pub fn category_icon(category: &str) -> &'static str {
    match category {
        "Entertainment" => "🎬",
        "Social" => "💬",
        "Streaming" => "📺",
        "Work" => "💼",
        "Education" => "📚",
        "Gaming" => "🎮",
        _ => "🌐",
    }
}

/// 单个时间窗口的使用时长序列（单位：小时）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl UsageSeries {
    pub fn total_hours(&self) -> f64 {
        self.data.iter().sum()
    }
}

/// 按窗口聚合的使用报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    #[serde(rename = "7d")]
    pub last_7_days: UsageSeries,
    #[serde(rename = "15d")]
    pub last_15_days: UsageSeries,
    #[serde(rename = "30d")]
    pub last_30_days: UsageSeries,
}

/// 网络概况
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    /// Mbps
    pub total_bandwidth: f64,
    pub used_bandwidth: f64,
    pub peak_hours: String,
    pub average_speed: String,
}

impl NetworkStats {
    /// 带宽占用百分比
    pub fn utilization(&self) -> f64 {
        if self.total_bandwidth <= 0.0 {
            return 0.0;
        }
        (self.used_bandwidth / self.total_bandwidth * 100.0).clamp(0.0, 100.0)
    }
}

/// 定时断网时间对
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTimes {
    #[serde(with = "hhmm")]
    pub block: NaiveTime,
    #[serde(with = "hhmm")]
    pub unblock: NaiveTime,
}

impl Default for ScheduleTimes {
    fn default() -> Self {
        Self {
            block: NaiveTime::from_hms_opt(23, 0, 0).unwrap_or_default(),
            unblock: NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default(),
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// 设备操作结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceActionResult {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub device_id: i64,
    pub action: String,
    pub previous_blocked: bool,
    pub new_blocked: bool,
}

/// 主题偏好
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThemePreference {
    #[default]
    Light,
    Dark,
}

impl ThemePreference {
    pub fn toggled(self) -> Self {
        match self {
            ThemePreference::Light => ThemePreference::Dark,
            ThemePreference::Dark => ThemePreference::Light,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemePreference::Light => "light",
            ThemePreference::Dark => "dark",
        }
    }
}

impl std::str::FromStr for ThemePreference {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim() {
            "light" => Ok(ThemePreference::Light),
            "dark" => Ok(ThemePreference::Dark),
            other => Err(crate::Error::InvalidParam(format!("unknown theme: {}", other))),
        }
    }
}
