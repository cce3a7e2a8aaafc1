use std::path::PathBuf;

/// Options for one `bake-runner` invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchArgs {
    pub baseline: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Allowed slowdown of the mean bake time, in percent.
    pub regression_threshold: f64,
    pub repeats: u32,
    pub preset: String,
}

impl Default for BenchArgs {
    fn default() -> Self {
        Self {
            baseline: None,
            output: None,
            regression_threshold: 10.0,
            repeats: 5,
            preset: String::from("low"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(BenchArgs),
    Help,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ArgsError {
    #[error("{0} expects a value")]
    MissingValue(String),
    #[error("invalid value '{value}' for {flag}")]
    InvalidValue { flag: String, value: String },
    #[error("unknown argument: {0}")]
    Unknown(String),
}

pub fn usage() -> String {
    format!(
        "Usage: bake-runner [OPTIONS]\n\
         \x20 --baseline <path>              Compare against a saved JSON baseline\n\
         \x20 --output <path>                Save this run as a JSON baseline\n\
         \x20 --regression-threshold <pct>   Allowed bake time increase (default: 10)\n\
         \x20 --repeats <n>                  Bakes per scene (default: 5)\n\
         \x20 --preset <name>                Quality preset: {} (default: low)",
        bakeao_config::PRESET_NAMES.join(", ")
    )
}

/// Parse argv, skipping the program name in `args[0]`.
pub fn parse_args(args: &[String]) -> Result<Command, ArgsError> {
    let mut parsed = BenchArgs::default();
    let mut rest = args.iter().skip(1);

    while let Some(flag) = rest.next() {
        let mut value = || {
            rest.next()
                .map(String::as_str)
                .ok_or_else(|| ArgsError::MissingValue(flag.clone()))
        };
        match flag.as_str() {
            "--baseline" => parsed.baseline = Some(PathBuf::from(value()?)),
            "--output" => parsed.output = Some(PathBuf::from(value()?)),
            "--regression-threshold" => {
                let raw = value()?;
                parsed.regression_threshold = raw
                    .parse::<f64>()
                    .ok()
                    .filter(|pct| pct.is_finite() && *pct >= 0.0)
                    .ok_or_else(|| invalid(flag, raw))?;
            }
            "--repeats" => {
                let raw = value()?;
                parsed.repeats = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| invalid(flag, raw))?;
            }
            "--preset" => parsed.preset = value()?.to_string(),
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(ArgsError::Unknown(other.to_string())),
        }
    }
    Ok(Command::Run(parsed))
}

fn invalid(flag: &str, value: &str) -> ArgsError {
    ArgsError::InvalidValue {
        flag: flag.to_string(),
        value: value.to_string(),
    }
}
