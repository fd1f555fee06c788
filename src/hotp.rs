use std::fmt;

use crate::{Digits, Otp, OtpCode, OtpError};

/// Counter-based code generator over HMAC-SHA512.
#[derive(Clone, PartialEq)]
pub struct Hotp {
    key: Vec<u8>,
    // How many digits to generate
    digits: Digits,
}

impl Otp for Hotp {
    fn key(&self) -> &[u8] {
        &self.key
    }

    fn digits(&self) -> Digits {
        self.digits
    }
}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("digits", &self.digits)
            .finish_non_exhaustive()
    }
}

impl Hotp {
    /// Creates the config for the [HMAC-based One-time Password Algorithm](http://en.wikipedia.org/wiki/HMAC-based_One-time_Password_Algorithm)
    /// (HOTP) given an RFC4648 base32 encoded secret
    ///
    /// Obs.: This method defaults to a 6-digit code.
    pub fn new(secret: &str) -> Result<Self, OtpError> {
        Ok(Self {
            key: Self::decode_secret(secret)?,
            digits: Digits::DEFAULT,
        })
    }

    ///  Sets the number of digits to generate
    pub fn with_digits(&mut self, digits: Digits) -> &mut Self {
        self.digits = digits;

        self
    }

    /// Generates a code from the provided counter
    /// truncated to the configured number of digits
    pub fn generate(&self, counter: u64) -> Result<OtpCode, OtpError> {
        self.code_for_counter(counter)
    }
}
