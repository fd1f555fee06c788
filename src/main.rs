mod cli;

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use log::debug;

use cli::{Args, CheckOutcome};
use dailyotp::Config;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse_from(cli::normalize_args(std::env::args_os()));

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            // reported regardless of RUST_LOG
            eprintln!("{}", cli::render_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let config = Config::from_parts(Config::secret_from_env(), args.digits, &args.timezone)
        .context("Invalid configuration")?;
    debug!("Running with {config:?}");

    let generator = config.generator();
    let now = Utc::now();

    if let Some(code) = args.check.as_deref() {
        let matched = generator
            .validate_window(code, now, args.skew, args.skew)
            .context("Error validating OTP")?;
        let outcome = CheckOutcome::from(matched);

        if let CheckOutcome::Valid(day) = outcome {
            debug!("Code matched day counter {day}");
        }
        println!("{}", outcome.message());

        return Ok(outcome.exit_code());
    }

    let daily = generator.generate_at(now).context("Error generating OTP")?;
    print!("{}", cli::render_code(&daily));

    Ok(ExitCode::SUCCESS)
}
