//! 注册页展示的服务条款与隐私政策

/// 文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalDocument {
    Terms,
    Privacy,
}

impl LegalDocument {
    pub fn title(self) -> &'static str {
        match self {
            LegalDocument::Terms => "Terms of Service",
            LegalDocument::Privacy => "Privacy Policy",
        }
    }

    /// (标题, 正文) 列表
    pub fn sections(self) -> &'static [(&'static str, &'static str)] {
        match self {
            LegalDocument::Terms => TERMS,
            LegalDocument::Privacy => PRIVACY,
        }
    }

    /// 渲染为纯文本
    pub fn render(self) -> String {
        let mut out = format!("{}\n\n", self.title());
        for (i, (heading, body)) in self.sections().iter().enumerate() {
            out.push_str(&format!("{}. {}\n{}\n\n", i + 1, heading, body));
        }
        out
    }
}

#[rustfmt::skip]
const TERMS: &[(&str, &str)] = &[
    ("Acceptance of Terms", "By accessing and using NetGuard, you accept and agree to be bound by the terms and provision of this agreement."),
    ("Service Description", "NetGuard is a smart parental internet control system that helps parents manage their children's internet usage and screen time."),
    ("User Responsibilities", "- Provide accurate and complete information during registration\n- Maintain the confidentiality of your account credentials\n- Use the service only for lawful parental control purposes\n- Respect the privacy and rights of all family members"),
    ("Service Limitations", "While NetGuard strives to provide reliable service, we cannot guarantee 100% effectiveness in all network environments or against all bypass attempts."),
    ("Account Termination", "We reserve the right to terminate accounts that violate these terms or engage in abusive behavior."),
    ("Updates to Terms", "These terms may be updated periodically. Continued use of the service constitutes acceptance of any changes."),
];

#[rustfmt::skip]
const PRIVACY: &[(&str, &str)] = &[
    ("Information We Collect", "We collect information you provide directly, such as account details and device information necessary for parental controls."),
    ("How We Use Information", "- Provide and maintain our parental control services\n- Monitor and analyze usage patterns for service improvement\n- Communicate with you about your account and service updates\n- Ensure the security and integrity of our service"),
    ("Information Sharing", "We do not sell, trade, or share your personal information with third parties except as described in this policy or with your consent."),
    ("Data Security", "We implement appropriate security measures to protect your personal information against unauthorized access, alteration, disclosure, or destruction."),
    ("Children's Privacy", "Our service is designed for parents to monitor their minor children's internet usage. We collect minimal data necessary for this purpose."),
    ("Your Rights", "You have the right to access, update, or delete your personal information. Contact us for assistance with these requests."),
    ("Contact Information", "For privacy-related questions, contact us at privacy@netguard.com"),
];
