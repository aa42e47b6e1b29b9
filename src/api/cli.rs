use std::fs;
use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use super::{ServerConfig, projection_request_from_json};
use crate::core::DEFAULT_LIFE_EXPECTANCY;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Multi-account retirement projection engine and HTTP API"
)]
pub struct Cli {
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the projection HTTP API.
    Serve(ServeArgs),
    /// Run one projection from a JSON request and print the result.
    Project(ProjectArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        default_value_t = DEFAULT_LIFE_EXPECTANCY,
        help = "Projection horizon age used when a request does not set one"
    )]
    pub life_expectancy: u32,
}

impl From<ServeArgs> for ServerConfig {
    fn from(args: ServeArgs) -> Self {
        ServerConfig {
            addr: SocketAddr::new(args.host, args.port),
            default_life_expectancy: args.life_expectancy,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[arg(long, help = "Path to a JSON request, or - for stdin")]
    pub input: PathBuf,
    #[arg(long, help = "Calendar year of the first projected year; defaults to this year")]
    pub start_year: Option<i32>,
    #[arg(long, help = "Overrides the request's life expectancy")]
    pub life_expectancy: Option<u32>,
    #[arg(long)]
    pub pretty: bool,
}

pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init(),
    }
}

/// Runs the `project` subcommand and returns the rendered result.
pub fn run_project_command(args: &ProjectArgs) -> anyhow::Result<String> {
    let raw = read_input(&args.input)?;
    let mut request = projection_request_from_json(&raw, DEFAULT_LIFE_EXPECTANCY)?;
    if let Some(year) = args.start_year {
        request.options.start_year = year;
    }
    if let Some(age) = args.life_expectancy {
        request.options.life_expectancy = age;
    }

    let result = request.run()?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    Ok(rendered)
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults_bind_all_interfaces() {
        let cli = Cli::try_parse_from(["nestegg", "serve"]).expect("valid args");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        let config = ServerConfig::from(args);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn serve_accepts_host_port_and_log_format() {
        let cli = Cli::try_parse_from([
            "nestegg",
            "--log-format",
            "json",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--life-expectancy",
            "100",
        ])
        .expect("valid args");
        assert_eq!(cli.log_format, LogFormat::Json);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve subcommand");
        };
        let config = ServerConfig::from(args);
        assert_eq!(config.addr, SocketAddr::from(([127, 0, 0, 1], 9000)));
        assert_eq!(config.default_life_expectancy, 100);
    }

    #[test]
    fn project_requires_input() {
        assert!(Cli::try_parse_from(["nestegg", "project"]).is_err());
    }

    #[test]
    fn project_command_reads_file_and_applies_overrides() {
        let path =
            std::env::temp_dir().join(format!("nestegg-project-{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{
              "assumptions": {
                "annualSpendingTarget": 1000, "inflationRate": 0.0, "retirementTaxRate": 0.0,
                "withdrawalRate": 0.04, "retirementGrowthRate": 0.03, "investmentFeeRate": 0.0,
                "currentAge": 60
              },
              "accounts": [{
                "id": "ira", "name": "IRA", "accountType": "ROTH_IRA",
                "currentBalance": 100000, "annualReturnRate": 0.05
              }]
            }"#,
        )
        .expect("write request");

        let args = ProjectArgs {
            input: path.clone(),
            start_year: Some(2030),
            life_expectancy: Some(62),
            pretty: false,
        };
        let rendered = run_project_command(&args).expect("projection runs");
        fs::remove_file(&path).ok();

        let json: serde_json::Value = serde_json::from_str(&rendered).expect("json output");
        assert_eq!(json["retirementYear"], 2030);
        assert_eq!(json["retirementAge"], 60);
        assert_eq!(json["feasible"], true);
        assert_eq!(json["yearByYearProjections"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn project_command_reports_missing_file() {
        let args = ProjectArgs {
            input: PathBuf::from("/nonexistent/nestegg-request.json"),
            start_year: None,
            life_expectancy: None,
            pretty: true,
        };
        let err = run_project_command(&args).expect_err("must fail");
        assert!(err.to_string().contains("failed to read"));
    }
}
