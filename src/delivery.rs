use async_trait::async_trait;
use tracing::info;

/// Outbound mail collaborator. The core only decides that a message with
/// this content goes to this address; transport is someone else's problem.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
}

/// Outbound SMS collaborator.
#[async_trait]
pub trait SmsSender: Send + Sync {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()>;
}

/// Log-backed mail transport for development deployments.
#[derive(Clone, Debug)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        info!(to_email = %to, reset_url = %reset_url, "password reset email dispatched");
        Ok(())
    }
}

/// Log-backed SMS transport for development deployments.
#[derive(Clone, Debug)]
pub struct LogSms;

#[async_trait]
impl SmsSender for LogSms {
    async fn send_otp(&self, to: &str, code: &str) -> anyhow::Result<()> {
        info!(to_phone = %to, code = %code, "otp sms dispatched");
        Ok(())
    }
}

/// Dial-prefix normalization applied at dispatch time only; stored phone
/// numbers keep whatever shape the user registered with. Bare ten-digit
/// numbers are assumed to be Indian.
pub fn normalize_sms_number(phone: &str) -> String {
    if phone.starts_with('+') {
        phone.to_string()
    } else if phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit()) {
        format!("+91{phone}")
    } else {
        format!("+{phone}")
    }
}
