//! 注册与重置密码的本地校验
//!
//! 规则按顺序检查，遇到第一条不满足的立即返回，
//! 校验失败的请求不会发往服务端。

use crate::error::{Error, Result};
use crate::types::{ChangePasswordRequest, ProfileImage, RegisterRequest, RegistrationPayload};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// 年龄下限
pub const MIN_AGE: u32 = 18;
/// 年龄上限
pub const MAX_AGE: u32 = 120;
/// 密码最短长度
pub const MIN_PASSWORD_LEN: usize = 6;
/// 修改密码时新密码的长度范围
pub const CHANGE_PASSWORD_LEN: std::ops::RangeInclusive<usize> = 4..=12;
/// 头像大小上限（5MB）
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// 允许的头像类型
pub const ALLOWED_IMAGE_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];
/// OTP 位数
pub const OTP_LEN: usize = 6;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"))
}

/// 基本邮箱格式检查
pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_match(email)
}

/// 注册表单草稿（只在注册表单存活期间存在）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    /// 原样保存用户输入，提交时再解析
    pub age: String,
    pub password: String,
    pub profile_image: Option<ProfileImage>,
    pub accept_terms: bool,
    pub accept_privacy: bool,
}

impl RegistrationDraft {
    /// 按顺序校验，成功后生成提交负载
    pub fn validate(&self) -> Result<RegistrationPayload> {
        let required = [
            &self.name,
            &self.email,
            &self.phone,
            &self.age,
            &self.password,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err(invalid("Please fill in all required fields."));
        }

        if !self.accept_terms {
            return Err(invalid(
                "You must accept the Terms of Service to create an account.",
            ));
        }

        if !self.accept_privacy {
            return Err(invalid(
                "You must accept the Privacy Policy to create an account.",
            ));
        }

        let age = parse_age(&self.age)
            .filter(|age| (MIN_AGE..=MAX_AGE).contains(age))
            .ok_or_else(|| invalid("Please enter a valid age between 18 and 120."))?;

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(invalid("Password must be at least 6 characters long."));
        }

        if !is_valid_email(self.email.trim()) {
            return Err(invalid("Please enter a valid email address."));
        }

        if let Some(image) = &self.profile_image {
            validate_image(image)?;
        }

        Ok(RegistrationPayload {
            request: RegisterRequest {
                name: self.name.trim().to_string(),
                email: self.email.trim().to_lowercase(),
                phone: self.phone.trim().to_string(),
                age,
                password: self.password.clone(),
                accept_terms: self.accept_terms,
                accept_privacy: self.accept_privacy,
            },
            image: self.profile_image.clone(),
        })
    }
}

/// 解析年龄：取开头的数字部分，例如 "42 years" 视为 42
fn parse_age(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    u32::try_from(sign * value).ok()
}

fn validate_image(image: &ProfileImage) -> Result<()> {
    if image.bytes.len() > MAX_IMAGE_BYTES {
        return Err(invalid("Profile image must be smaller than 5MB."));
    }
    if !ALLOWED_IMAGE_TYPES.contains(&image.content_type.as_str()) {
        return Err(invalid(
            "Profile image must be a valid image file (JPEG, PNG, GIF, or WebP).",
        ));
    }
    Ok(())
}

impl ProfileImage {
    /// 从文件扩展名推断类型，无法识别时为 application/octet-stream
    pub fn guess_content_type(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("gif") => "image/gif",
            Some("webp") => "image/webp",
            _ => "application/octet-stream",
        }
    }

    /// 读取本地文件
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("profile")
            .to_string();
        Ok(Self {
            file_name,
            content_type: Self::guess_content_type(path).to_string(),
            bytes,
        })
    }
}

/// 新密码与确认密码必须一致
pub fn passwords_match(new_password: &str, confirm: &str) -> Result<()> {
    if new_password != confirm {
        return Err(invalid("New password and confirm password do not match."));
    }
    Ok(())
}

impl ChangePasswordRequest {
    /// 修改密码的本地检查，顺序与服务端一致
    pub fn validate(&self) -> Result<()> {
        if self.current_password.trim().is_empty() {
            return Err(invalid("Current password is required"));
        }
        if self.new_password.trim().is_empty() {
            return Err(invalid("New password is required"));
        }
        if !CHANGE_PASSWORD_LEN.contains(&self.new_password.chars().count()) {
            return Err(invalid("New password must be between 4 and 12 characters"));
        }
        if self.confirm_password.trim().is_empty() {
            return Err(invalid("Password confirmation is required"));
        }
        passwords_match(&self.new_password, &self.confirm_password)?;
        if self.new_password == self.current_password {
            return Err(invalid(
                "New password must be different from current password",
            ));
        }
        Ok(())
    }
}

/// OTP 必须是六位数字
pub fn validate_otp(otp: &str) -> Result<()> {
    let otp = otp.trim();
    if otp.len() != OTP_LEN || !otp.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("Please enter the 6-digit code sent to your email."));
    }
    Ok(())
}

fn invalid(msg: &str) -> Error {
    Error::Validation(msg.to_string())
}
