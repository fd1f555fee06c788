//! Codes that roll over at local midnight instead of every 30 seconds.
//!
//! The counter is the index of the local calendar day: the current unix time
//! shifted by the zone's UTC offset, divided by one day. The offset is sampled
//! once per call, at the same instant the counter is derived from, so a DST
//! change in the middle of the day does not move the counter.

use std::{fmt, time::Duration};

use chrono::{DateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

use crate::{Digits, Otp, OtpCode, OtpError};

pub const DAY_IN_SECONDS: i64 = 86_400;

/// A generated code together with the day it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyCode {
    pub code: OtpCode,
    /// Local day index used as the HMAC message
    pub counter: u64,
    /// Time left until the next local midnight
    pub remaining: Duration,
}

#[derive(Clone, PartialEq)]
pub struct DailyOtp {
    key: Vec<u8>,
    digits: Digits,
    timezone: Tz,
}

impl Otp for DailyOtp {
    fn key(&self) -> &[u8] {
        &self.key
    }

    fn digits(&self) -> Digits {
        self.digits
    }
}

impl fmt::Debug for DailyOtp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DailyOtp")
            .field("digits", &self.digits)
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

// Local day derived from a single sample of the zone offset
struct LocalDay {
    now: DateTime<Utc>,
    local: DateTime<Tz>,
    shifted: i64,
}

impl LocalDay {
    fn counter(&self) -> u64 {
        self.shifted.div_euclid(DAY_IN_SECONDS) as u64
    }

    fn next_midnight(&self) -> DateTime<Utc> {
        let midnight = self
            .local
            .date_naive()
            .succ_opt()
            .and_then(|day| day.and_hms_opt(0, 0, 0))
            .and_then(|midnight| self.local.timezone().from_local_datetime(&midnight).earliest());

        match midnight {
            Some(midnight) => midnight.with_timezone(&Utc),
            None => {
                // midnight falls in a DST gap
                let left = DAY_IN_SECONDS - self.shifted.rem_euclid(DAY_IN_SECONDS);
                warn!(
                    "Local midnight after {} does not exist in {}, using the fixed-offset boundary",
                    self.local,
                    self.local.timezone()
                );
                self.now + chrono::Duration::seconds(left)
            }
        }
    }

    fn remaining(&self) -> Result<Duration, OtpError> {
        (self.next_midnight() - self.now)
            .to_std()
            .map_err(|_| OtpError::DurationOutOfRange)
    }
}

impl DailyOtp {
    /// Creates a generator for the given RFC4648 base32 encoded secret whose
    /// codes stay valid for the whole calendar day in `timezone`.
    pub fn new(secret: &str, digits: Digits, timezone: Tz) -> Result<Self, OtpError> {
        Ok(Self::from_key(Self::decode_secret(secret)?, digits, timezone))
    }

    pub(crate) fn from_key(key: Vec<u8>, digits: Digits, timezone: Tz) -> Self {
        Self {
            key,
            digits,
            timezone,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    fn local_day(&self, now: DateTime<Utc>) -> LocalDay {
        let local = now.with_timezone(&self.timezone);
        let offset = local.offset().fix().local_minus_utc();

        LocalDay {
            now,
            local,
            shifted: now.timestamp() + i64::from(offset),
        }
    }

    /// Day index for `now` in the configured timezone
    pub fn counter_at(&self, now: DateTime<Utc>) -> u64 {
        self.local_day(now).counter()
    }

    /// Time from `now` until the next local midnight
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Result<Duration, OtpError> {
        self.local_day(now).remaining()
    }

    /// Generates the code for the local day containing `now`
    pub fn generate_at(&self, now: DateTime<Utc>) -> Result<DailyCode, OtpError> {
        let day = self.local_day(now);
        let counter = day.counter();
        let remaining = day.remaining()?;

        debug!(
            "Local time {} in {}, day counter {counter}",
            day.local, self.timezone
        );

        Ok(DailyCode {
            code: self.code_for_counter(counter)?,
            counter,
            remaining,
        })
    }

    /// Generates the code for the current local day
    pub fn generate(&self) -> Result<DailyCode, OtpError> {
        self.generate_at(Utc::now())
    }

    /// Validates a code against the day containing `now` and the given number
    /// of days around it.
    /// Returns the day counter that matched, or None if the code is invalid.
    pub fn validate_window(
        &self,
        otp_to_validate: &str,
        now: DateTime<Utc>,
        past_days: u64,
        future_days: u64,
    ) -> Result<Option<u64>, OtpError> {
        let otp_to_validate = otp_to_validate.trim();
        let today = self.counter_at(now);

        let mut days = vec![today];
        days.extend((1..=past_days).map_while(|i| today.checked_sub(i)));
        days.extend((1..=future_days).map_while(|i| today.checked_add(i)));

        for day in days {
            if self.code_for_counter(day)?.to_string() == otp_to_validate {
                return Ok(Some(day));
            }
        }

        Ok(None)
    }
}

pub fn parse_timezone(name: &str) -> Result<Tz, OtpError> {
    name.parse::<Tz>()
        .map_err(|_| OtpError::InvalidTimezone(name.to_string()))
}

/// Generates the code for `secret` valid until the next midnight in `timezone`.
pub fn generate(secret: &str, digits: u32, timezone: &str) -> Result<DailyCode, OtpError> {
    generate_at(secret, digits, timezone, Utc::now())
}

/// Same as [`generate`], with the current instant supplied by the caller.
pub fn generate_at(
    secret: &str,
    digits: u32,
    timezone: &str,
    now: DateTime<Utc>,
) -> Result<DailyCode, OtpError> {
    let digits = Digits::try_from(digits)?;
    let key = DailyOtp::decode_secret(secret)?;
    let timezone = parse_timezone(timezone)?;

    DailyOtp::from_key(key, digits, timezone).generate_at(now)
}

/// Renders a duration rounded to whole seconds as `1h2m3s`, omitting leading
/// zero units (`5m0s`, `42s`, `0s`).
pub fn format_duration(duration: Duration) -> String {
    let total = (duration.as_millis() + 500) / 1000;
    let (hours, minutes, seconds) = (total / 3600, total / 60 % 60, total % 60);

    if hours > 0 {
        format!("{hours}h{minutes}m{seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m{seconds}s")
    } else {
        format!("{seconds}s")
    }
}
