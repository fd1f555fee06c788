use std::fmt;

use chrono_tz::Tz;

use crate::{
    daily::{parse_timezone, DailyOtp},
    Digits, Otp, OtpError,
};

pub const SECRET_ENV: &str = "SECRET";
pub const DEFAULT_TIMEZONE: &str = "Europe/Istanbul";

/// Validated inputs for a single run.
#[derive(Clone)]
pub struct Config {
    key: Vec<u8>,
    digits: Digits,
    timezone: Tz,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("digits", &self.digits)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Checks the digit count, then that the secret is present and decodes,
    /// then the timezone.
    pub fn from_parts(
        secret: Option<String>,
        digits: u32,
        timezone: &str,
    ) -> Result<Self, OtpError> {
        let digits = Digits::try_from(digits)?;

        let secret = match secret {
            Some(secret) if !secret.is_empty() => secret,
            _ => return Err(OtpError::MissingSecret),
        };

        let key = DailyOtp::decode_secret(&secret)?;

        Ok(Self {
            key,
            digits,
            timezone: parse_timezone(timezone)?,
        })
    }

    /// Reads the secret from the `SECRET` environment variable
    pub fn secret_from_env() -> Option<String> {
        std::env::var(SECRET_ENV).ok()
    }

    pub fn digits(&self) -> Digits {
        self.digits
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn generator(&self) -> DailyOtp {
        DailyOtp::from_key(self.key.clone(), self.digits, self.timezone)
    }
}
