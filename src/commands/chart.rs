use std::io::Read;

use crate::models::ChartType;
use crate::services::payload_service::{self, StyleOverrides};
use crate::services::chart_service;
use crate::utils::errors::ChartError;

pub const USAGE: &str = "\
Usage: wallet-chart <json_data|-> [dark_mode] [compact_mode] [chart_type]

  json_data     '[{\"label\": \"Jan 1\", \"value\": 1.2}, ...]' or
                '{\"chart_type\": \"pnl\", \"data\": [{\"timestamp\": \"2024-03-01T00:00:00Z\", \"y\": 1.5}, ...]}'
                Use '-' to read the payload from stdin.
  dark_mode     true|false (default false)
  compact_mode  true|false (default false)
  chart_type    balance|pnl (default balance)

Options may also be given as key=value, e.g. dark_mode=true chart_type=pnl.
Prints the chart as base64-encoded PNG on stdout.";

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Help,
    Render { payload: String, overrides: StyleOverrides },
}

const POSITIONAL_KEYS: [&str; 3] = ["dark_mode", "compact_mode", "chart_type"];

/// Parse arguments (program name excluded)
pub fn parse_args(args: &[String]) -> Result<Invocation, ChartError> {
    let Some(payload) = args.first() else {
        return Err(ChartError::Usage("Missing required argument: json_data".to_string()));
    };
    if payload == "-h" || payload == "--help" {
        return Ok(Invocation::Help);
    }

    let mut overrides = StyleOverrides::default();
    let mut positional = 0;

    for arg in &args[1..] {
        let (key, value) = match arg.split_once('=') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => {
                let Some(key) = POSITIONAL_KEYS.get(positional) else {
                    return Err(ChartError::Usage(format!("Unexpected argument: '{}'", arg)));
                };
                positional += 1;
                (*key, arg.trim())
            }
        };

        match key {
            "dark_mode" => overrides.dark_mode = Some(parse_bool(key, value)?),
            "compact_mode" => overrides.compact_mode = Some(parse_bool(key, value)?),
            "chart_type" => {
                overrides.chart_type = Some(value.parse::<ChartType>().map_err(ChartError::Usage)?)
            }
            other => return Err(ChartError::Usage(format!("Unknown option: '{}'", other))),
        }
    }

    Ok(Invocation::Render {
        payload: payload.clone(),
        overrides,
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ChartError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ChartError::Usage(format!(
            "Invalid value for {}: '{}'. Use true or false",
            key, value
        ))),
    }
}

/// Resolve the payload argument, reading stdin for `-`
fn read_payload<R: Read>(arg: &str, mut stdin: R) -> Result<String, ChartError> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut raw = String::new();
    stdin.read_to_string(&mut raw)?;
    tracing::debug!("Read {} bytes of payload from stdin", raw.len());
    Ok(raw)
}

/// Run the chart command and return the text for stdout
pub fn execute<R: Read>(args: &[String], stdin: R) -> Result<String, ChartError> {
    tracing::info!("🎨 Chart command called with {} argument(s)", args.len());

    let (payload, overrides) = match parse_args(args)? {
        Invocation::Help => return Ok(USAGE.to_string()),
        Invocation::Render { payload, overrides } => (payload, overrides),
    };

    let raw = read_payload(&payload, stdin)?;
    let request = payload_service::parse_payload(&raw, &overrides)?;
    tracing::info!(
        "Rendering {} chart with {} point(s)",
        request.style.chart_type,
        request.series.len()
    );

    Ok(chart_service::render_base64(request.series, &request.style))
}
