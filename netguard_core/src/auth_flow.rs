//! 登录 / 注册 / 找回密码表单状态机
//!
//! 模式切换只由用户触发，每次切换都会清空当前的错误和提示。
//! 找回密码分三步：输入邮箱 → 输入 OTP → 设置新密码，
//! 只有 OTP 发送成功后才能从第一步前进。

use crate::client::AuthApi;
use crate::error::{
    login_failure_message, otp_failure_message, registration_failure_message,
    resend_failure_message, reset_failure_message, verification_failure_message, Error, Result,
};
use crate::types::{LoginRequest, ResetPasswordRequest, Session};
use crate::validation::{is_valid_email, passwords_match, validate_otp, RegistrationDraft};
use tracing::{info, warn};

/// 演示账号（仅在演示模式下、后端不可达时生效）
pub const DEMO_USERNAME: &str = "parent";
pub const DEMO_PASSWORD: &str = "123";
pub const DEMO_TOKEN: &str = "mock_token_123";

/// 找回密码的子步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    EmailInput,
    OtpInput,
    NewPasswordInput,
}

/// 当前显示的表单
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
    ForgotPassword(ResetStep),
}

/// 找回密码流程的字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswordResetForm {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub confirm_new_password: String,
}

/// 认证表单状态机
pub struct AuthFlow<A: AuthApi> {
    api: A,
    demo_mode: bool,
    mode: AuthMode,
    login: LoginRequest,
    registration: RegistrationDraft,
    reset: PasswordResetForm,
    loading: bool,
    error: Option<String>,
    message: Option<String>,
    session: Option<Session>,
}

impl<A: AuthApi> AuthFlow<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            demo_mode: false,
            mode: AuthMode::Login,
            login: LoginRequest::default(),
            registration: RegistrationDraft::default(),
            reset: PasswordResetForm::default(),
            loading: false,
            error: None,
            message: None,
            session: None,
        }
    }

    /// 开启演示账号回退
    pub fn with_demo_mode(mut self, enabled: bool) -> Self {
        self.demo_mode = enabled;
        self
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// 取走登录成功后创建的会话
    pub fn take_session(&mut self) -> Option<Session> {
        self.session.take()
    }

    pub fn registration(&self) -> &RegistrationDraft {
        &self.registration
    }

    pub fn reset_form(&self) -> &PasswordResetForm {
        &self.reset
    }

    fn clear_feedback(&mut self) {
        self.error = None;
        self.message = None;
    }

    // ---- 模式切换 ----

    pub fn show_login(&mut self) {
        self.clear_feedback();
        self.leave_reset_flow();
        self.mode = AuthMode::Login;
    }

    pub fn show_register(&mut self) {
        self.clear_feedback();
        self.leave_reset_flow();
        self.mode = AuthMode::Register;
    }

    pub fn show_forgot_password(&mut self) {
        self.clear_feedback();
        self.reset.email.clear();
        self.mode = AuthMode::ForgotPassword(ResetStep::EmailInput);
    }

    /// OTP 步骤返回邮箱输入
    pub fn back_to_email(&mut self) -> Result<()> {
        self.step_back(ResetStep::OtpInput, ResetStep::EmailInput)
    }

    /// 新密码步骤返回 OTP 输入
    pub fn back_to_otp(&mut self) -> Result<()> {
        self.step_back(ResetStep::NewPasswordInput, ResetStep::OtpInput)
    }

    fn step_back(&mut self, from: ResetStep, to: ResetStep) -> Result<()> {
        if self.mode != AuthMode::ForgotPassword(from) {
            return Err(Error::InvalidState(format!(
                "cannot go back to {:?} from {:?}",
                to, self.mode
            )));
        }
        self.clear_feedback();
        self.mode = AuthMode::ForgotPassword(to);
        Ok(())
    }

    fn leave_reset_flow(&mut self) {
        if matches!(self.mode, AuthMode::ForgotPassword(_)) {
            self.reset = PasswordResetForm::default();
        }
    }

    fn expect_mode(&self, expected: AuthMode) -> Result<()> {
        if self.mode != expected {
            return Err(Error::InvalidState(format!(
                "expected {:?}, current form is {:?}",
                expected, self.mode
            )));
        }
        Ok(())
    }

    // ---- 表单编辑（输入时清空提示） ----

    pub fn set_login(&mut self, username: &str, password: &str) {
        self.clear_feedback();
        self.login = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
    }

    pub fn edit_registration(&mut self, edit: impl FnOnce(&mut RegistrationDraft)) {
        self.clear_feedback();
        edit(&mut self.registration);
    }

    pub fn set_reset_email(&mut self, email: &str) {
        self.clear_feedback();
        self.reset.email = email.to_string();
    }

    pub fn set_otp(&mut self, otp: &str) {
        self.clear_feedback();
        self.reset.otp = otp.to_string();
    }

    pub fn set_new_password(&mut self, new_password: &str, confirm: &str) {
        self.clear_feedback();
        self.reset.new_password = new_password.to_string();
        self.reset.confirm_new_password = confirm.to_string();
    }

    // ---- 提交 ----

    /// 提交登录，成功时创建会话
    pub async fn submit_login(&mut self) -> Result<Session> {
        self.expect_mode(AuthMode::Login)?;
        self.clear_feedback();
        self.loading = true;
        let result = self.api.login(&self.login).await;
        self.loading = false;

        let outcome = match result {
            Ok(resp) if resp.success => match resp.data {
                Some(data) => Ok(Session {
                    token: data.token,
                    parent_display_name: data
                        .name
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| self.login.username.clone()),
                }),
                None => Err(Error::Rejected(resp.message)),
            },
            Ok(resp) => Err(Error::Rejected(resp.message)),
            Err(e) if e.is_unreachable() && self.demo_mode && self.is_demo_login() => {
                warn!("Auth service unreachable, using demo session: {}", e);
                Ok(Session {
                    token: DEMO_TOKEN.to_string(),
                    parent_display_name: self.login.username.clone(),
                })
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(session) => {
                info!("Login succeeded for {}", session.parent_display_name);
                self.message = Some("Login successful!".to_string());
                self.session = Some(session.clone());
                Ok(session)
            }
            Err(e) => {
                self.error = Some(login_failure_message(&e));
                Err(e)
            }
        }
    }

    fn is_demo_login(&self) -> bool {
        self.login.username == DEMO_USERNAME && self.login.password == DEMO_PASSWORD
    }

    /// 校验并提交注册，成功后回到登录表单
    pub async fn submit_registration(&mut self) -> Result<()> {
        self.expect_mode(AuthMode::Register)?;
        self.clear_feedback();

        let payload = match self.registration.validate() {
            Ok(payload) => payload,
            Err(e) => {
                self.error = Some(registration_failure_message(&e));
                return Err(e);
            }
        };

        self.loading = true;
        let result = self.api.register(&payload).await;
        self.loading = false;

        let outcome = match result {
            Ok(resp) if resp.success => Ok(resp.message),
            Ok(resp) => Err(Error::Rejected(resp.message)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(message) => {
                info!("Registration succeeded for {}", payload.request.email);
                self.registration = RegistrationDraft::default();
                self.mode = AuthMode::Login;
                self.message = Some(message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    "Registration successful! Please login with your credentials.".to_string()
                }));
                Ok(())
            }
            Err(e) => {
                self.error = Some(registration_failure_message(&e));
                Err(e)
            }
        }
    }

    /// 第一步：发送 OTP，成功后进入 OTP 输入
    pub async fn request_otp(&mut self) -> Result<()> {
        self.expect_mode(AuthMode::ForgotPassword(ResetStep::EmailInput))?;
        self.clear_feedback();
        self.loading = true;
        let result = self.api.forgot_password(self.reset.email.trim()).await;
        self.loading = false;

        match result {
            Ok(resp) if resp.success => {
                self.message = Some(resp.message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    "OTP sent to your email. Please check your inbox.".to_string()
                }));
                self.mode = AuthMode::ForgotPassword(ResetStep::OtpInput);
                Ok(())
            }
            Ok(resp) => {
                let e = Error::Rejected(resp.message);
                self.error = Some(otp_failure_message(&e));
                Err(e)
            }
            Err(e) => {
                self.error = Some(otp_failure_message(&e));
                Err(e)
            }
        }
    }

    /// 第二步：本地检查 OTP 格式后进入新密码输入
    pub fn submit_otp(&mut self) -> Result<()> {
        self.expect_mode(AuthMode::ForgotPassword(ResetStep::OtpInput))?;
        self.clear_feedback();
        if let Err(e) = validate_otp(&self.reset.otp) {
            self.error = Some(reset_failure_message(&e));
            return Err(e);
        }
        self.mode = AuthMode::ForgotPassword(ResetStep::NewPasswordInput);
        Ok(())
    }

    /// 第三步：两次密码一致才发请求，成功后清空流程并回到登录
    pub async fn reset_password(&mut self) -> Result<()> {
        self.expect_mode(AuthMode::ForgotPassword(ResetStep::NewPasswordInput))?;
        self.clear_feedback();

        if let Err(e) = passwords_match(&self.reset.new_password, &self.reset.confirm_new_password)
        {
            self.error = Some(reset_failure_message(&e));
            return Err(e);
        }

        let request = ResetPasswordRequest {
            email: self.reset.email.trim().to_string(),
            otp: self.reset.otp.trim().to_string(),
            new_password: self.reset.new_password.clone(),
        };

        self.loading = true;
        let result = self.api.reset_password(&request).await;
        self.loading = false;

        let outcome = match result {
            Ok(resp) if resp.success => Ok(resp.message),
            Ok(resp) => Err(Error::Rejected(resp.message)),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(message) => {
                info!("Password reset for {}", request.email);
                self.reset = PasswordResetForm::default();
                self.mode = AuthMode::Login;
                self.message = Some(message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    "Password reset successfully! You can now log in with your new password."
                        .to_string()
                }));
                Ok(())
            }
            Err(e) => {
                self.error = Some(reset_failure_message(&e));
                Err(e)
            }
        }
    }

    /// 用邮件里的令牌验证邮箱，不改变当前表单
    pub async fn verify_email(&mut self, token: &str) -> Result<()> {
        self.clear_feedback();
        let token = token.trim();
        if token.is_empty() {
            let e = Error::Validation("Verification token is required".to_string());
            self.error = Some(verification_failure_message(&e));
            return Err(e);
        }

        self.loading = true;
        let result = self.api.verify_email(token).await;
        self.loading = false;

        match result {
            Ok(resp) if resp.success => {
                info!("Email verified");
                self.message = Some(resp.message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    "Email verified successfully! You can now log in.".to_string()
                }));
                Ok(())
            }
            Ok(resp) => {
                let e = Error::Rejected(resp.message);
                self.error = Some(verification_failure_message(&e));
                Err(e)
            }
            Err(e) => {
                self.error = Some(verification_failure_message(&e));
                Err(e)
            }
        }
    }

    /// 重发验证邮件
    pub async fn resend_verification(&mut self, email: &str) -> Result<()> {
        self.clear_feedback();
        let email = email.trim();
        if !is_valid_email(email) {
            let e = Error::Validation("Please enter a valid email address.".to_string());
            self.error = Some(resend_failure_message(&e));
            return Err(e);
        }

        self.loading = true;
        let result = self.api.resend_verification(email).await;
        self.loading = false;

        match result {
            Ok(resp) if resp.success => {
                self.message = Some(resp.message.filter(|m| !m.is_empty()).unwrap_or_else(|| {
                    "If your email is registered, a verification link will be sent.".to_string()
                }));
                Ok(())
            }
            Ok(resp) => {
                let e = Error::Rejected(resp.message);
                self.error = Some(resend_failure_message(&e));
                Err(e)
            }
            Err(e) => {
                self.error = Some(resend_failure_message(&e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockAuthApi;
    use crate::types::{ApiResponse, LoginData};

    fn fill_valid_registration(flow: &mut AuthFlow<MockAuthApi>) {
        flow.edit_registration(|d| {
            d.name = "Jane".into();
            d.email = "jane@example.com".into();
            d.phone = "01712345678".into();
            d.age = "40".into();
            d.password = "secret1".into();
            d.accept_terms = true;
            d.accept_privacy = true;
        });
    }

    #[tokio::test]
    async fn test_login_success_creates_session() {
        let mut api = MockAuthApi::new();
        api.expect_login().times(1).returning(|_| {
            Ok(ApiResponse::ok(
                Some("Welcome"),
                Some(LoginData {
                    token: "jwt".into(),
                    name: Some("John Smith".into()),
                }),
            ))
        });

        let mut flow = AuthFlow::new(api);
        flow.set_login("john@example.com", "pw");
        let session = flow.submit_login().await.unwrap();
        assert_eq!(session.token, "jwt");
        assert_eq!(session.parent_display_name, "John Smith");
        assert_eq!(flow.take_session(), Some(session));
        assert!(flow.error().is_none());
    }

    #[tokio::test]
    async fn test_login_name_defaults_to_username() {
        let mut api = MockAuthApi::new();
        api.expect_login().returning(|_| {
            Ok(ApiResponse::ok(
                None,
                Some(LoginData {
                    token: "jwt".into(),
                    name: None,
                }),
            ))
        });
        let mut flow = AuthFlow::new(api);
        flow.set_login("john@example.com", "pw");
        let session = flow.submit_login().await.unwrap();
        assert_eq!(session.parent_display_name, "john@example.com");
    }

    #[tokio::test]
    async fn test_login_failure_surfaces_server_message() {
        let mut api = MockAuthApi::new();
        api.expect_login().times(1).returning(|_| {
            Err(Error::Status {
                status: 401,
                message: Some("Invalid email or password".into()),
            })
        });
        let mut flow = AuthFlow::new(api);
        flow.set_login("x", "y");
        assert!(flow.submit_login().await.is_err());
        assert_eq!(flow.error(), Some("Invalid email or password"));
        assert!(flow.session().is_none());
        assert!(!flow.is_loading());
    }

    #[tokio::test]
    async fn test_demo_login_when_backend_unreachable() {
        let mut api = MockAuthApi::new();
        api.expect_login()
            .returning(|_| Err(Error::Network("connection refused".into())));
        let mut flow = AuthFlow::new(api).with_demo_mode(true);
        flow.set_login(DEMO_USERNAME, DEMO_PASSWORD);
        let session = flow.submit_login().await.unwrap();
        assert_eq!(session.token, DEMO_TOKEN);
        assert_eq!(session.parent_display_name, DEMO_USERNAME);
    }

    #[tokio::test]
    async fn test_demo_login_disabled_by_default() {
        let mut api = MockAuthApi::new();
        api.expect_login()
            .returning(|_| Err(Error::Network("connection refused".into())));
        let mut flow = AuthFlow::new(api);
        flow.set_login(DEMO_USERNAME, DEMO_PASSWORD);
        assert!(flow.submit_login().await.is_err());
        assert_eq!(
            flow.error(),
            Some("Login failed. Invalid username or password.")
        );
    }

    #[tokio::test]
    async fn test_registration_validation_never_calls_api() {
        let mut api = MockAuthApi::new();
        api.expect_register().never();
        let mut flow = AuthFlow::new(api);
        flow.show_register();
        fill_valid_registration(&mut flow);
        flow.edit_registration(|d| d.age = "17".into());

        let err = flow.submit_registration().await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            flow.error(),
            Some("Please enter a valid age between 18 and 120.")
        );
        assert_eq!(flow.mode(), AuthMode::Register);
    }

    #[tokio::test]
    async fn test_registration_success_returns_to_login() {
        let mut api = MockAuthApi::new();
        api.expect_register()
            .withf(|p| p.request.email == "jane@example.com" && p.request.age == 40)
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(None, None)));
        let mut flow = AuthFlow::new(api);
        flow.show_register();
        fill_valid_registration(&mut flow);

        flow.submit_registration().await.unwrap();
        assert_eq!(flow.mode(), AuthMode::Login);
        assert_eq!(
            flow.message(),
            Some("Registration successful! Please login with your credentials.")
        );
        assert_eq!(flow.registration(), &RegistrationDraft::default());
    }

    #[tokio::test]
    async fn test_registration_conflict_keeps_draft() {
        let mut api = MockAuthApi::new();
        api.expect_register().returning(|_| {
            Err(Error::Status {
                status: 409,
                message: None,
            })
        });
        let mut flow = AuthFlow::new(api);
        flow.show_register();
        fill_valid_registration(&mut flow);

        assert!(flow.submit_registration().await.is_err());
        assert_eq!(
            flow.error(),
            Some("An account with this email or phone number already exists.")
        );
        assert_eq!(flow.registration().name, "Jane");
        assert_eq!(flow.mode(), AuthMode::Register);
    }

    #[tokio::test]
    async fn test_otp_step_requires_successful_send() {
        let mut api = MockAuthApi::new();
        api.expect_forgot_password()
            .times(1)
            .returning(|_| Ok(ApiResponse::failed(Some("No account for that email"))));
        let mut flow = AuthFlow::new(api);
        flow.show_forgot_password();
        flow.set_reset_email("nobody@example.com");

        assert!(flow.request_otp().await.is_err());
        assert_eq!(flow.mode(), AuthMode::ForgotPassword(ResetStep::EmailInput));
        assert_eq!(flow.error(), Some("No account for that email"));
        assert!(flow.submit_otp().is_err());
    }

    #[tokio::test]
    async fn test_full_reset_flow() {
        let mut api = MockAuthApi::new();
        api.expect_forgot_password()
            .withf(|email| email == "jane@example.com")
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(Some("OTP sent"), None)));
        api.expect_reset_password()
            .withf(|r| r.otp == "123456" && r.new_password == "newpass")
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(None, None)));

        let mut flow = AuthFlow::new(api);
        flow.show_forgot_password();
        flow.set_reset_email(" jane@example.com ");
        flow.request_otp().await.unwrap();
        assert_eq!(flow.message(), Some("OTP sent"));
        assert_eq!(flow.mode(), AuthMode::ForgotPassword(ResetStep::OtpInput));

        flow.set_otp("123456");
        flow.submit_otp().unwrap();
        assert_eq!(
            flow.mode(),
            AuthMode::ForgotPassword(ResetStep::NewPasswordInput)
        );

        flow.set_new_password("newpass", "newpass");
        flow.reset_password().await.unwrap();
        assert_eq!(flow.mode(), AuthMode::Login);
        assert_eq!(flow.reset_form(), &PasswordResetForm::default());
    }

    #[tokio::test]
    async fn test_reset_mismatch_never_calls_api() {
        let mut api = MockAuthApi::new();
        api.expect_forgot_password()
            .returning(|_| Ok(ApiResponse::ok(None, None)));
        api.expect_reset_password().never();

        let mut flow = AuthFlow::new(api);
        flow.show_forgot_password();
        flow.set_reset_email("jane@example.com");
        flow.request_otp().await.unwrap();
        flow.set_otp("654321");
        flow.submit_otp().unwrap();
        flow.set_new_password("newpass", "newpasS");

        assert!(flow.reset_password().await.is_err());
        assert_eq!(
            flow.error(),
            Some("New password and confirm password do not match.")
        );
        assert_eq!(
            flow.mode(),
            AuthMode::ForgotPassword(ResetStep::NewPasswordInput)
        );
    }

    #[tokio::test]
    async fn test_back_navigation_and_mode_switch_clear_feedback() {
        let mut api = MockAuthApi::new();
        api.expect_forgot_password()
            .returning(|_| Ok(ApiResponse::ok(None, None)));
        let mut flow = AuthFlow::new(api);
        flow.show_forgot_password();
        flow.set_reset_email("jane@example.com");
        flow.request_otp().await.unwrap();
        assert!(flow.message().is_some());

        flow.back_to_email().unwrap();
        assert!(flow.message().is_none());
        assert_eq!(flow.mode(), AuthMode::ForgotPassword(ResetStep::EmailInput));
        assert!(flow.back_to_otp().is_err());

        flow.show_login();
        assert_eq!(flow.mode(), AuthMode::Login);
        assert!(flow.reset_form().email.is_empty());
    }

    #[tokio::test]
    async fn test_submit_in_wrong_mode_is_rejected() {
        let mut api = MockAuthApi::new();
        api.expect_register().never();
        let mut flow = AuthFlow::new(api);
        fill_valid_registration(&mut flow);
        assert!(matches!(
            flow.submit_registration().await,
            Err(Error::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_verify_email_success_and_rejection() {
        let mut api = MockAuthApi::new();
        api.expect_verify_email()
            .withf(|token| token == "good")
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(None, None)));
        api.expect_verify_email()
            .withf(|token| token == "stale")
            .times(1)
            .returning(|_| Ok(ApiResponse::failed(None)));
        let mut flow = AuthFlow::new(api);

        flow.verify_email(" good ").await.unwrap();
        assert_eq!(
            flow.message(),
            Some("Email verified successfully! You can now log in.")
        );
        assert_eq!(flow.mode(), AuthMode::Login);

        assert!(flow.verify_email("stale").await.is_err());
        assert_eq!(flow.error(), Some("Invalid or expired verification token"));
        assert!(flow.message().is_none());

        assert!(matches!(
            flow.verify_email("  ").await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_resend_verification() {
        let mut api = MockAuthApi::new();
        api.expect_resend_verification()
            .withf(|email| email == "jane@example.com")
            .times(1)
            .returning(|_| {
                Err(Error::Status {
                    status: 400,
                    message: Some("Email is already verified".into()),
                })
            });
        let mut flow = AuthFlow::new(api);

        assert!(flow.resend_verification("not-an-email").await.is_err());
        assert_eq!(flow.error(), Some("Please enter a valid email address."));

        assert!(flow.resend_verification("jane@example.com").await.is_err());
        assert_eq!(flow.error(), Some("Email is already verified"));
        assert!(!flow.is_loading());
    }
}
