pub mod config;
pub mod daily;
pub mod hotp;

use std::fmt::Display;

use hmac::{Hmac, Mac};
use sha2::Sha512;

pub use config::Config;
pub use daily::{generate, generate_at, DailyCode, DailyOtp};
pub use hotp::Hotp;

// RFC 4648 base32 alphabet
const BASE32_SYMBOLS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("SECRET environment variable is not set")]
    MissingSecret,
    #[error("Secret is empty")]
    EmptySecret,
    #[error("Invalid base32 alphabet: {0}")]
    SecretEncoding(data_encoding::SpecificationError),
    #[error("Invalid base32 secret: {0}")]
    SecretDecode(data_encoding::DecodeError),
    #[error("Invalid timezone, found {0}")]
    InvalidTimezone(String),
    #[error("Digit length must be between {} and {}, found {0}", Digits::MIN, Digits::MAX)]
    InvalidDigits(u32),
    #[error("Invalid HMAC key length")]
    InvalidKeyLength,
    #[error("Invalid digest")]
    InvalidDigest(Vec<u8>),
    #[error("Remaining validity does not fit in a duration")]
    DurationOutOfRange,
}

/// Number of decimal digits in a generated code, always within
/// [`Digits::MIN`]..=[`Digits::MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Digits(u32);

impl Digits {
    pub const MIN: u32 = 4;
    pub const MAX: u32 = 9;
    pub const DEFAULT: Digits = Digits(6);

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl Default for Digits {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Digits {
    type Error = OtpError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(OtpError::InvalidDigits(value))
        }
    }
}

impl Display for Digits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtpCode {
    code: u32,
    digits: Digits,
}

impl OtpCode {
    pub fn integer(&self) -> u32 {
        self.code
    }

    pub fn digits(&self) -> Digits {
        self.digits
    }
}

impl Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:0padding$}",
            self.code,
            padding = (self.digits.get() as usize)
        )
    }
}

pub trait Otp {
    /// The decoded key bytes
    fn key(&self) -> &[u8];

    fn digits(&self) -> Digits;

    /// Decodes a secret (given as an RFC4648 base32-encoded ASCII string)
    /// into a byte string.
    ///
    /// Spaces are dropped and the input is uppercased first, so
    /// `"abcd efgh"` and `"ABCDEFGH"` decode to the same key. Line breaks
    /// are skipped and unused trailing bits are not checked; padding is
    /// rejected.
    fn decode_secret(secret: &str) -> Result<Vec<u8>, OtpError> {
        let normalized = secret.replace(' ', "").to_uppercase();
        if normalized.is_empty() {
            return Err(OtpError::EmptySecret);
        }

        let mut spec = data_encoding::Specification::new();
        spec.symbols.push_str(BASE32_SYMBOLS);
        spec.check_trailing_bits = false;
        spec.ignore.push_str("\r\n");
        let encoding = spec.encoding().map_err(OtpError::SecretEncoding)?;

        encoding
            .decode(normalized.as_bytes())
            .map_err(OtpError::SecretDecode)
    }

    /// Calculates the HMAC-SHA512 digest of the big-endian counter.
    fn calc_digest(&self, data: u64) -> Result<Vec<u8>, OtpError> {
        let mut mac =
            Hmac::<Sha512>::new_from_slice(self.key()).map_err(|_| OtpError::InvalidKeyLength)?;
        mac.update(&data.to_be_bytes());

        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Encodes the HMAC digest into a truncated integer.
    fn encode_digest_truncated(digest: &[u8], target_digits: Digits) -> Result<u32, OtpError> {
        // The last byte tells us the offset for any digest size
        let offset = match digest.last() {
            Some(x) => *x & 0xf,
            None => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        } as usize;

        // Gets the 4 bytes that will compose the code
        let code_bytes: [u8; 4] = match digest.get(offset..offset + 4).map(<[u8; 4]>::try_from) {
            Some(Ok(x)) => x,
            _ => return Err(OtpError::InvalidDigest(Vec::from(digest))),
        };

        let code = u32::from_be_bytes(code_bytes);
        let truncation_factor = u32::pow(10, target_digits.get());

        Ok((code & 0x7fffffff) % truncation_factor)
    }

    /// Generates the code for an explicit counter value
    fn code_for_counter(&self, counter: u64) -> Result<OtpCode, OtpError> {
        let digest = self.calc_digest(counter)?;
        let code = Self::encode_digest_truncated(digest.as_ref(), self.digits())?;

        Ok(OtpCode {
            code,
            digits: self.digits(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::{Digits, Otp, OtpError};

    struct Fixed(Vec<u8>);

    impl Otp for Fixed {
        fn key(&self) -> &[u8] {
            &self.0
        }

        fn digits(&self) -> Digits {
            Digits::DEFAULT
        }
    }

    #[rstest]
    #[case(4)]
    #[case(6)]
    #[case(9)]
    fn digits_in_range(#[case] value: u32) {
        assert_eq!(Digits::try_from(value).unwrap().get(), value);
    }

    #[rstest]
    #[case(0)]
    #[case(3)]
    #[case(10)]
    fn digits_out_of_range(#[case] value: u32) {
        let err = Digits::try_from(value).unwrap_err();
        assert!(matches!(err, OtpError::InvalidDigits(v) if v == value));
        assert_eq!(
            format!("Digit length must be between 4 and 9, found {value}"),
            err.to_string()
        );
    }

    #[test]
    fn digits_default_is_six() {
        assert_eq!(Digits::default().get(), 6);
    }

    #[rstest]
    #[case("AAAAAAAAAAAAAAAA", "AAAAAAAAAAAAAAAA")]
    #[case("aaaa aaaa aaaa aaaa", "AAAAAAAAAAAAAAAA")]
    #[case("abcd efgh ijkl mnop", "ABCDEFGHIJKLMNOP")]
    fn decode_secret_normalizes(#[case] input: &str, #[case] canonical: &str) {
        assert_eq!(
            Fixed::decode_secret(canonical).unwrap(),
            Fixed::decode_secret(input).unwrap()
        );
    }

    #[rstest]
    #[case("AAAAAAAAAAAAAAAA", vec![0u8; 10])]
    #[case("AAAAAAAA\nAAAAAAAA", vec![0u8; 10])]
    #[case("AAAAAAAA\r\nAAAAAAAA\n", vec![0u8; 10])]
    #[case("AB", vec![0x00])]
    #[case("ab", vec![0x00])]
    #[case("MZXW6", b"foo".to_vec())]
    fn decode_secret_lenient(#[case] input: &str, #[case] expected: Vec<u8>) {
        assert_eq!(expected, Fixed::decode_secret(input).unwrap());
    }

    #[rstest]
    #[case("ABCD0189")]
    #[case("A")]
    #[case("AAA")]
    #[case("AAAAAA")]
    #[case("AAAAAAAA=")]
    #[case("AA==")]
    #[case("not-base32!")]
    fn decode_secret_rejects_malformed(#[case] input: &str) {
        assert!(matches!(
            Fixed::decode_secret(input),
            Err(OtpError::SecretDecode(_))
        ));
    }

    #[rstest]
    #[case("")]
    #[case("    ")]
    fn decode_secret_rejects_blank(#[case] input: &str) {
        assert!(matches!(
            Fixed::decode_secret(input),
            Err(OtpError::EmptySecret)
        ));
        assert_eq!(
            "Secret is empty",
            Fixed::decode_secret(input).unwrap_err().to_string()
        );
    }

    #[test]
    fn digest_is_sha512_sized() {
        let otp = Fixed(vec![0u8; 10]);
        assert_eq!(64, otp.calc_digest(0).unwrap().len());
    }

    #[test]
    fn truncation_uses_trailing_nibble() {
        let mut digest = [0u8; 64];
        // offset 2, window 0xff 0x00 0x01 0x02 masked to 31 bits
        digest[63] = 0x02;
        digest[2..6].copy_from_slice(&[0xff, 0x00, 0x01, 0x02]);

        let code = Fixed::encode_digest_truncated(&digest, Digits::try_from(9).unwrap()).unwrap();
        assert_eq!(0x7f00_0102 % 1_000_000_000, code);
    }

    #[test]
    fn truncation_rejects_empty_digest() {
        assert!(matches!(
            Fixed::encode_digest_truncated(&[], Digits::DEFAULT),
            Err(OtpError::InvalidDigest(_))
        ));
    }

    #[test]
    fn code_is_zero_padded() {
        let otp = Fixed(vec![0u8; 10]);
        // 674061 for counter 0, shorter codes keep their leading zeros
        let code = otp.code_for_counter(0).unwrap();
        assert_eq!("674061", code.to_string());
        assert_eq!(674061, code.integer());

        let padded = crate::OtpCode {
            code: 42,
            digits: Digits::try_from(6).unwrap(),
        };
        assert_eq!("000042", padded.to_string());
    }
}
