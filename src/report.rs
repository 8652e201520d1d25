//! Structured result documents written to a caller-chosen destination.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// `.yaml`/`.yml` select YAML, everything else JSON
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("yaml") | Some("yml") => DocumentFormat::Yaml,
            _ => DocumentFormat::Json,
        }
    }
}

pub fn render<T: Serialize>(value: &T, format: DocumentFormat) -> Result<String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(value).context("Failed to serialize JSON document"),
        DocumentFormat::Yaml => serde_yaml::to_string(value).context("Failed to serialize YAML document"),
    }
}

pub async fn write_document<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = render(value, DocumentFormat::for_path(path))?;
    write_text(path, &body).await
}

pub async fn write_text(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{CoolingConditions, CoolingSimulator};

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::for_path(Path::new("out/result.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path(Path::new("result.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path(Path::new("result.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::for_path(Path::new("result")), DocumentFormat::Json);
    }

    #[tokio::test]
    async fn test_written_document_parses_back() {
        let result = CoolingSimulator::default().simulate(&CoolingConditions::default());
        let path = std::env::temp_dir().join(format!("stc-report-{}.json", std::process::id()));

        write_document(&path, &result).await.unwrap();
        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["baseline_temp"], 97.5);
        assert!((value["water_saved"].as_f64().unwrap() - 15.0).abs() < 1e-9);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[test]
    fn test_yaml_rendering() {
        let result = CoolingSimulator::default().simulate(&CoolingConditions::default());
        let yaml = render(&result, DocumentFormat::Yaml).unwrap();
        assert!(yaml.contains("baseline_temp: 97.5"));
    }
}
