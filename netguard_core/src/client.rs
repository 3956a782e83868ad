//! 认证服务 HTTP 客户端

use crate::error::{Error, Result};
use crate::types::*;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 注册请求单独使用的超时（秒）
pub const REGISTER_TIMEOUT_SECS: u64 = 30;

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 服务器 URL
    pub server_url: String,
    /// 请求超时（秒）
    pub timeout: u64,
    /// 是否验证 TLS 证书
    pub verify_tls: bool,
    /// 演示模式：后端不可达时允许演示账号登录、仪表盘使用样例数据
    pub demo_mode: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            timeout: 30,
            verify_tls: true,
            demo_mode: false,
        }
    }
}

impl ClientConfig {
    /// 构建带超时和 TLS 设置的 reqwest 客户端
    pub fn build_http_client(&self) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .danger_accept_invalid_certs(!self.verify_tls)
            .build()
            .map_err(|e| Error::Network(e.to_string()))
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url.trim_end_matches('/'), path)
    }
}

/// 外部认证服务
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// POST /api/auth/login
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>>;

    /// POST /api/auth/register（multipart）
    async fn register(&self, payload: &RegistrationPayload) -> Result<ApiResponse<()>>;

    /// POST /api/auth/forgot-password
    async fn forgot_password(&self, email: &str) -> Result<ApiResponse<()>>;

    /// POST /api/auth/reset-password
    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiResponse<()>>;

    /// POST /api/auth/verify-email
    async fn verify_email(&self, token: &str) -> Result<ApiResponse<()>>;

    /// POST /api/auth/resend-verification
    async fn resend_verification(&self, email: &str) -> Result<ApiResponse<()>>;
}

/// 基于 reqwest 的认证客户端
pub struct AuthClient {
    config: ClientConfig,
    http_client: Client,
}

impl AuthClient {
    /// 创建新的客户端实例
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = config.build_http_client()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// 使用默认配置创建客户端
    pub fn with_server_url(server_url: &str) -> Result<Self> {
        let config = ClientConfig {
            server_url: server_url.to_string(),
            ..ClientConfig::default()
        };
        Self::new(config)
    }

    /// 健康检查
    pub async fn health_check(&self) -> Result<bool> {
        let url = self.config.url("/api/analytics/health");
        let response = self.http_client.get(&url).send().await?;
        Ok(response.status().is_success())
    }
}

/// 解析响应：非 2xx 转为 `Error::Status`，其余按 `ApiResponse<T>` 解码
pub(crate) async fn read_api_response<T: DeserializeOwned>(
    response: Response,
    url: &str,
) -> Result<ApiResponse<T>> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ServerErrorBody>(&body)
            .ok()
            .and_then(ServerErrorBody::resolve);
        warn!("HTTP {} from {}", status, url);
        return Err(Error::Status {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<ApiResponse<T>>()
        .await
        .map_err(|e| Error::Encoding(format!("Failed to parse response from {}: {}", url, e)))
}

/// 携带会话令牌的请求封装，供需要认证的接口共用
pub(crate) struct BearerClient {
    config: ClientConfig,
    http_client: Client,
    token: String,
}

impl BearerClient {
    pub(crate) fn new(config: ClientConfig, session: &Session) -> Result<Self> {
        let http_client = config.build_http_client()?;
        Ok(Self {
            config,
            http_client,
            token: session.token.clone(),
        })
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<ApiResponse<T>> {
        let url = self.config.url(path);
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        read_api_response(response, &url).await
    }

    pub(crate) async fn post<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        read_api_response(response, &url).await
    }

    pub(crate) async fn put<B, T>(&self, path: &str, body: &B) -> Result<ApiResponse<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.url(path);
        debug!("PUT {}", url);
        let response = self
            .http_client
            .put(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        read_api_response(response, &url).await
    }
}

/// `success=false` 转为 `Rejected`，缺少 data 视为状态错误
pub(crate) fn unwrap_data<T>(resp: ApiResponse<T>) -> Result<T> {
    if !resp.success {
        return Err(Error::Rejected(resp.message));
    }
    resp.data
        .ok_or_else(|| Error::InvalidState("No data in response".to_string()))
}

#[async_trait]
impl AuthApi for AuthClient {
    async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>> {
        info!("Logging in user: {}", request.username);

        let url = self.config.url("/api/auth/login");
        let response = self.http_client.post(&url).json(request).send().await?;
        read_api_response(response, &url).await
    }

    async fn register(&self, payload: &RegistrationPayload) -> Result<ApiResponse<()>> {
        info!("Registering user: {}", payload.request.email);

        let json = serde_json::to_vec(&payload.request)?;
        let mut form = Form::new();
        if let Some(image) = &payload.image {
            debug!("Attaching profile image of {} bytes", image.bytes.len());
            let part = Part::bytes(image.bytes.clone())
                .file_name(image.file_name.clone())
                .mime_str(&image.content_type)
                .map_err(|e| Error::InvalidParam(e.to_string()))?;
            form = form.part("profileImage", part);
        }
        let request_part = Part::bytes(json)
            .file_name("request.json")
            .mime_str("application/json")
            .map_err(|e| Error::InvalidParam(e.to_string()))?;
        form = form.part("request", request_part);

        let url = self.config.url("/api/auth/register");
        let response = self
            .http_client
            .post(&url)
            .timeout(Duration::from_secs(REGISTER_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await?;
        read_api_response(response, &url).await
    }

    async fn forgot_password(&self, email: &str) -> Result<ApiResponse<()>> {
        info!("Requesting password reset OTP for: {}", email);

        let url = self.config.url("/api/auth/forgot-password");
        let body = ForgotPasswordRequest {
            email: email.to_string(),
        };
        let response = self.http_client.post(&url).json(&body).send().await?;
        read_api_response(response, &url).await
    }

    async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<ApiResponse<()>> {
        info!("Resetting password for: {}", request.email);

        let url = self.config.url("/api/auth/reset-password");
        let response = self.http_client.post(&url).json(request).send().await?;
        read_api_response(response, &url).await
    }

    async fn verify_email(&self, token: &str) -> Result<ApiResponse<()>> {
        info!("Verifying email address");

        let url = self.config.url("/api/auth/verify-email");
        let body = EmailVerificationRequest {
            token: token.to_string(),
        };
        let response = self.http_client.post(&url).json(&body).send().await?;
        read_api_response(response, &url).await
    }

    async fn resend_verification(&self, email: &str) -> Result<ApiResponse<()>> {
        info!("Resending verification email to: {}", email);

        let url = self.config.url("/api/auth/resend-verification");
        let body = ResendVerificationRequest {
            email: email.to_string(),
        };
        let response = self.http_client.post(&url).json(&body).send().await?;
        read_api_response(response, &url).await
    }
}
