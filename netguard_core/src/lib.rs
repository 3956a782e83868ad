//! NetGuard 家长控制客户端核心库
//!
//! 提供：
//! - 登录 / 注册 / 三步找回密码的表单状态机
//! - 认证服务 HTTP 客户端
//! - 设备监控仪表盘（真实后端或样例数据）
//! - 账户资料、统计与修改密码
//! - 客户端本地状态（令牌、显示名、主题）

pub mod auth_flow;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod filters;
pub mod fixtures;
pub mod legal;
pub mod modal;
pub mod profile;
pub mod provider;
pub mod store;
pub mod types;
pub mod validation;

pub use auth_flow::{AuthFlow, AuthMode, ResetStep};
pub use client::{AuthApi, AuthClient, ClientConfig};
pub use dashboard::{BlockOutcome, Dashboard, DashboardSummary, UsageChart};
pub use error::{Error, Result};
pub use filters::{HistoryWindow, UsageWindow};
pub use modal::Modal;
pub use profile::{ProfileApi, ProfileClient};
pub use provider::{DataProvider, FixtureProvider, LiveApiProvider};
pub use store::StateStore;
pub use types::*;
pub use validation::RegistrationDraft;
