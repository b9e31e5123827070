use rand::{rngs::OsRng, Rng, RngCore};
use time::{Duration, OffsetDateTime};

use crate::store::UserStore;
use crate::users::{TimedSecret, User};

/// 256 bits of entropy for reset tokens, hex-encoded.
const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// The OTP is a 6-digit code: a deliberately small space, balanced by the
/// short expiry window. Its entropy must not be weakened further.
const OTP_TTL: Duration = Duration::minutes(10);

pub fn new_reset_secret() -> TimedSecret {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    TimedSecret {
        value: hex::encode(bytes),
        expires_at: OffsetDateTime::now_utc() + RESET_TOKEN_TTL,
    }
}

pub fn new_otp_secret() -> TimedSecret {
    let code = rand::thread_rng().gen_range(100_000..1_000_000);
    TimedSecret {
        value: code.to_string(),
        expires_at: OffsetDateTime::now_utc() + OTP_TTL,
    }
}

/// Issues a reset token for the user, overwriting any live one, and persists
/// it. Returns the token value for delivery.
pub async fn issue_reset(store: &dyn UserStore, user: &mut User) -> anyhow::Result<String> {
    let secret = new_reset_secret();
    let token = secret.value.clone();
    user.reset_secret = Some(secret);
    store.save(user).await?;
    Ok(token)
}

/// Issues an OTP code for the user, overwriting any live one, and persists
/// it. Returns the code for delivery.
pub async fn issue_otp(store: &dyn UserStore, user: &mut User) -> anyhow::Result<String> {
    let secret = new_otp_secret();
    let code = secret.value.clone();
    user.otp_secret = Some(secret);
    store.save(user).await?;
    Ok(code)
}
