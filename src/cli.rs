use std::{ffi::OsString, process::ExitCode};

use clap::Parser;
use dailyotp::{config::DEFAULT_TIMEZONE, daily::format_duration, DailyCode, Digits};

/// Prints a one-time code that stays valid until local midnight.
///
/// The base32 secret is read from the SECRET environment variable.
#[derive(Parser, Debug)]
#[command(name = "dailyotp")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Number of digits in the code
    #[arg(short = 'd', long = "digits", default_value_t = Digits::DEFAULT.get())]
    pub digits: u32,

    /// The timezone location you are in
    #[arg(long = "tz", visible_alias = "timezone", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    /// Verify CODE against today's code instead of printing it
    #[arg(long, value_name = "CODE")]
    pub check: Option<String>,

    /// Days before and after today that --check also accepts
    #[arg(long, value_name = "DAYS", default_value_t = 0, requires = "check")]
    pub skew: u64,
}

/// Rewrites the single-dash `-tz` spelling to `--tz` so clap can parse it.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut options_done = false;

    args.into_iter()
        .map(|arg| {
            if options_done {
                return arg;
            }

            match arg.to_str() {
                Some("--") => {
                    options_done = true;
                    arg
                }
                Some("-tz") => OsString::from("--tz"),
                Some(s) if s.starts_with("-tz=") => OsString::from(format!("-{s}")),
                _ => arg,
            }
        })
        .collect()
}

/// The two lines printed for a generated code
pub fn render_code(daily: &DailyCode) -> String {
    format!(
        "Your code: {}\nValid for: {}\n",
        daily.code,
        format_duration(daily.remaining)
    )
}

/// Fatal diagnostic written to stderr, with the whole context chain
pub fn render_error(err: &anyhow::Error) -> String {
    format!("Error: {err:#}")
}

/// Result of `--check`, built from the matching day counter if any
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Valid(u64),
    Invalid,
}

impl From<Option<u64>> for CheckOutcome {
    fn from(matched: Option<u64>) -> Self {
        matched.map_or(Self::Invalid, Self::Valid)
    }
}

impl CheckOutcome {
    pub fn message(self) -> &'static str {
        match self {
            Self::Valid(_) => "Code is valid",
            Self::Invalid => "Code is not valid",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn exit_code(self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
