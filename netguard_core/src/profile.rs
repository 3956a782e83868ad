//! 家长账户资料接口
//!
//! 资料、账户统计和修改密码都需要会话令牌。

use crate::client::{unwrap_data, BearerClient, ClientConfig};
use crate::error::{Error, Result};
use crate::types::*;
use async_trait::async_trait;
use tracing::info;

/// 账户资料服务
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileApi: Send + Sync {
    /// 当前账户资料
    async fn fetch_profile(&self) -> Result<UserProfile>;

    /// 注册天数、资料完整度等统计
    async fn fetch_stats(&self) -> Result<UserStats>;

    /// 只提交设置了的字段，返回更新后的资料
    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile>;

    /// 成功时返回服务端提示
    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Option<String>>;
}

/// 访问后端 `/api/profile` 的客户端
pub struct ProfileClient {
    client: BearerClient,
}

impl ProfileClient {
    pub fn new(config: ClientConfig, session: &Session) -> Result<Self> {
        Ok(Self {
            client: BearerClient::new(config, session)?,
        })
    }
}

#[async_trait]
impl ProfileApi for ProfileClient {
    async fn fetch_profile(&self) -> Result<UserProfile> {
        unwrap_data(self.client.get("/api/profile").await?)
    }

    async fn fetch_stats(&self) -> Result<UserStats> {
        unwrap_data(self.client.get("/api/profile/stats").await?)
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<UserProfile> {
        info!("Updating profile");
        unwrap_data(self.client.put("/api/profile", request).await?)
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Option<String>> {
        request.validate()?;
        info!("Changing password");
        let resp: ApiResponse<serde_json::Value> =
            self.client.put("/api/profile/password", request).await?;
        if !resp.success {
            return Err(Error::Rejected(resp.message));
        }
        Ok(resp.message)
    }
}
