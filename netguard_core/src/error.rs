//! 错误类型定义
//!
//! 所有失败最终都在当前表单里显示为一行可读文本，
//! 各操作的文案映射见 `*_failure_message` 系列函数。

use thiserror::Error;

/// 错误类型
#[derive(Debug, Error)]
pub enum Error {
    /// 本地校验失败（不会发往服务端）
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 网络错误（未收到响应）
    #[error("Network error: {0}")]
    Network(String),

    /// 请求超时
    #[error("Request timed out")]
    Timeout,

    /// 服务端以非 2xx 状态码拒绝请求
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status { status: u16, message: Option<String> },

    /// 服务端返回 2xx 但 success=false
    #[error("Request rejected: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    /// 参数错误
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// 状态错误
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 编解码错误
    #[error("Encoding/Decoding error: {0}")]
    Encoding(String),

    /// 未认证错误
    #[error("Not authenticated")]
    NotAuthenticated,

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 结果类型
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else if e.is_decode() {
            Error::Encoding(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Encoding(e.to_string())
    }
}

impl Error {
    /// 服务端给出的提示（若有）
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Error::Status { message, .. } | Error::Rejected(message) => message.as_deref(),
            _ => None,
        }
    }

    /// 是否根本没有拿到服务端响应
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Timeout)
    }
}

/// 登录失败时显示的文案
pub fn login_failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        Error::Rejected(msg) => msg
            .clone()
            .unwrap_or_else(|| "Login failed. Please try again.".to_string()),
        other => other
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| "Login failed. Invalid username or password.".to_string()),
    }
}

/// 注册失败时显示的文案，按 HTTP 状态码区分
pub fn registration_failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        Error::Status { status: 400, message } => message
            .clone()
            .unwrap_or_else(|| "Registration failed due to invalid data.".to_string()),
        Error::Status { status: 409, .. } => {
            "An account with this email or phone number already exists.".to_string()
        }
        Error::Status { status, .. } if *status >= 500 => {
            "Server error occurred. Please try again later.".to_string()
        }
        Error::Status { status, message } => message
            .clone()
            .unwrap_or_else(|| format!("Registration failed (Error {})", status)),
        Error::Rejected(msg) => msg.clone().unwrap_or_else(|| {
            "Registration failed. Please check your information and try again.".to_string()
        }),
        Error::Network(_) => {
            "Network error. Please check your internet connection and try again.".to_string()
        }
        Error::Timeout => "Request timed out. Please try again.".to_string(),
        _ => "An unexpected error occurred. Please try again.".to_string(),
    }
}

/// 发送 OTP 失败时显示的文案
pub fn otp_failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        other => other.server_message().map(str::to_string).unwrap_or_else(|| {
            "Failed to send OTP. Please check your email and try again.".to_string()
        }),
    }
}

/// 重置密码失败时显示的文案
pub fn reset_failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        other => other.server_message().map(str::to_string).unwrap_or_else(|| {
            "Failed to reset password. Please check your OTP or try again.".to_string()
        }),
    }
}

/// 邮箱验证失败时显示的文案
pub fn verification_failure_message(err: &Error) -> String {
    fallback_message(err, "Invalid or expired verification token")
}

/// 重发验证邮件失败时显示的文案
pub fn resend_failure_message(err: &Error) -> String {
    fallback_message(err, "Unable to resend verification email")
}

/// 修改密码失败时显示的文案
pub fn change_password_failure_message(err: &Error) -> String {
    fallback_message(err, "Failed to change password")
}

/// 本地校验原样显示，其余优先服务端提示，没有响应时给出网络提示
fn fallback_message(err: &Error, default: &str) -> String {
    match err {
        Error::Validation(msg) => msg.clone(),
        Error::Network(_) => {
            "Network error. Please check your internet connection and try again.".to_string()
        }
        Error::Timeout => "Request timed out. Please try again.".to_string(),
        other => other
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| default.to_string()),
    }
}
