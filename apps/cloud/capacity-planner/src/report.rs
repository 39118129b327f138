//! JSON input and report output

use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::info;

/// Envelope around every report the planner prints
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub kind: &'static str,
    pub generated_at: DateTime<Utc>,
    pub planner_version: &'static str,
    pub data: T,
}

impl<T: Serialize> Report<T> {
    pub fn new(kind: &'static str, data: T) -> Self {
        Self {
            kind,
            generated_at: Utc::now(),
            planner_version: env!("CARGO_PKG_VERSION"),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).wrap_err("Failed to serialize report")
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).wrap_err_with(|| format!("Failed to parse {}", path.display()))
}

/// Write to `output` when given, stdout otherwise
pub fn write_output(body: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, body).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = body.len(), "Report written");
        }
        None => println!("{body}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_sizing::SizingInput;

    #[test]
    fn test_report_envelope() {
        let json = Report::new("distributions", vec!["openshift"]).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "distributions");
        assert_eq!(value["data"][0], "openshift");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_read_missing_file_names_path() {
        let err = read_json::<SizingInput>(Path::new("/nonexistent/sizing.json")).unwrap_err();
        assert!(format!("{err}").contains("/nonexistent/sizing.json"));
    }

    #[test]
    fn test_write_then_read_file() {
        let path =
            std::env::temp_dir().join(format!("capacity-planner-{}.json", std::process::id()));
        write_output(r#"{"enabled_environments": ["prod"]}"#, Some(&path)).unwrap();
        let input: SizingInput = read_json(&path).unwrap();
        assert_eq!(input.enabled_environments.len(), 1);
        let _ = fs::remove_file(&path);
    }
}
