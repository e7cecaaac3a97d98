//! FIREWATCH CLI entry point.
//!
//! Resolves the fire risk for one coordinate and prints it as JSON.

use std::process::ExitCode;

use firewatch_core::FirewatchConfig;
use firewatch_service::cli::CliArgs;
use firewatch_service::logging::{init_logging, LogFormat};
use firewatch_service::FireRiskService;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_logging(LogFormat::from_env()) {
        eprintln!("{}", e);
    }

    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let config = match FirewatchConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let service = match FireRiskService::from_config(&config) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = service
        .get_current_with_deadline(args.lat, args.lon, args.deadline)
        .await;
    service.flush_write_backs().await;

    match result {
        Ok(risk) => match serde_json::to_string_pretty(&risk) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Failed to encode result: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(2)
        }
    }
}
