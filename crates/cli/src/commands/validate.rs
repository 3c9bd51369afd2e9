//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use config_loader::ConfigLoader;
use contracts::PipelineBlueprint;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
    version: String,
    driver: String,
    driver_policy: &'static str,
    follower_count: usize,
    deadline_ms: Option<u64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            error: Some(format!("File not found: {config_path}")),
            config_path,
            warnings: Vec::new(),
            summary: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: ConfigLoader::warnings(&blueprint),
            summary: Some(summarize(&blueprint)),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

fn summarize(blueprint: &PipelineBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        driver: blueprint.sync.driver.to_string(),
        driver_policy: blueprint
            .driver_stream()
            .map(|s| s.captor.policy.name())
            .unwrap_or("-"),
        follower_count: blueprint.follower_streams().count(),
        deadline_ms: blueprint.sync.deadline_ms,
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Driver: {} ({})", summary.driver, summary.driver_policy);
            println!("  Followers: {}", summary.follower_count);
            match summary.deadline_ms {
                Some(ms) => println!("  Capture deadline: {ms} ms"),
                None => println!("  Capture deadline: none"),
            }
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config_reports_summary() {
        let file = write_config(
            ".json",
            r#"{
                "sync": { "driver": "cam", "deadline_ms": 5 },
                "streams": [
                    { "id": "cam", "captor": { "capacity": 4, "policy": { "kind": "chunk", "duration": 10 } } },
                    { "id": "imu", "captor": { "capacity": 32, "policy": { "kind": "before" } } }
                ]
            }"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.driver, "cam");
        assert_eq!(summary.driver_policy, "chunk");
        assert_eq!(summary.follower_count, 1);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config(
            ".toml",
            r#"
[sync]
driver = "cam"

[[streams]]
id = "cam"
captor = { capacity = 4, policy = { kind = "ranged" } }
"#,
        );
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("driver policy"));
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: PathBuf::from("/nonexistent/pipeline.toml"),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
