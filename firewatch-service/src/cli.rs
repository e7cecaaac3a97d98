//! Command-line argument parsing for the `firewatch` binary.

use std::path::PathBuf;
use std::time::Duration;

pub const USAGE: &str = "usage: firewatch <lat> <lon> [--config <path>] [--deadline-ms <n>]";

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub lat: f64,
    pub lon: f64,
    pub config: Option<PathBuf>,
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CliError {
    #[error("missing value for {flag}\n{}", USAGE)]
    MissingValue { flag: String },

    #[error("unknown flag {flag}\n{}", USAGE)]
    UnknownFlag { flag: String },

    #[error("invalid {what} {value:?}\n{}", USAGE)]
    InvalidNumber { what: &'static str, value: String },

    #[error("expected exactly two coordinates\n{}", USAGE)]
    WrongArity,
}

impl CliArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// Range checks on the coordinates are left to the service so that the
    /// CLI reports exactly what a library caller would see.
    pub fn parse<I, S>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut positional = Vec::new();
        let mut config = None;
        let mut deadline = None;
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let value = args.next().ok_or_else(|| CliError::MissingValue {
                        flag: arg.clone(),
                    })?;
                    config = Some(PathBuf::from(value));
                }
                "--deadline-ms" => {
                    let value = args.next().ok_or_else(|| CliError::MissingValue {
                        flag: arg.clone(),
                    })?;
                    let ms: u64 = value.parse().map_err(|_| CliError::InvalidNumber {
                        what: "deadline",
                        value: value.clone(),
                    })?;
                    deadline = Some(Duration::from_millis(ms));
                }
                flag if flag.starts_with("--") => {
                    return Err(CliError::UnknownFlag {
                        flag: flag.to_string(),
                    })
                }
                _ => positional.push(arg),
            }
        }

        let [lat, lon] = positional.as_slice() else {
            return Err(CliError::WrongArity);
        };
        Ok(Self {
            lat: parse_coordinate("latitude", lat)?,
            lon: parse_coordinate("longitude", lon)?,
            config,
            deadline,
        })
    }
}

fn parse_coordinate(what: &'static str, value: &str) -> Result<f64, CliError> {
    value.trim().parse().map_err(|_| CliError::InvalidNumber {
        what,
        value: value.to_string(),
    })
}
