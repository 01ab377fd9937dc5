use super::Config;
use crate::FIELD_DELIMITER;
use anyhow::{Context, Result};
use std::path::Path;

pub fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config_str(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse TOML config")?;

    // Validate and return validation errors directly without wrapping
    validate_config(&config)?;
    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<()> {
    let name = config.audit.manifest_name.as_str();
    if name.is_empty() || name == "." || name == ".." {
        anyhow::bail!("Manifest name must be a plain file name, got '{name}'");
    }
    if name.contains(['/', '\\']) {
        anyhow::bail!("Manifest name cannot contain path separators: '{name}'");
    }
    if name.contains(FIELD_DELIMITER) || name.contains(['\n', '\r']) {
        anyhow::bail!("Manifest name cannot contain '*' or line breaks: '{name}'");
    }

    if config.audit.chunk_size == 0 {
        anyhow::bail!("Chunk size must be at least 1 byte");
    }

    if let Some(bad) = config.audit.excluded_dirs.iter().find(|d| d.is_empty()) {
        anyhow::bail!("Excluded directory names cannot be empty: {bad:?}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportSink;
    use rstest::rstest;

    #[test]
    fn test_partial_sections_use_defaults() -> Result<()> {
        let config = parse_config_str(
            r#"
            [report]
            sink = "log-file"
            "#,
        )?;
        assert_eq!(config.report.sink, ReportSink::LogFile);
        assert_eq!(config.audit.manifest_name, ".chksum");
        assert_eq!(config.audit.excluded_dirs.len(), 4);
        Ok(())
    }

    #[test]
    fn test_custom_exclusions_replace_defaults() -> Result<()> {
        let config = parse_config_str(
            r#"
            [audit]
            excluded_dirs = [".git", "target"]
            "#,
        )?;
        assert_eq!(config.audit.excluded_dirs, vec![".git", "target"]);
        Ok(())
    }

    #[rstest]
    #[case::empty_name("[audit]\nmanifest_name = \"\"")]
    #[case::dot_name("[audit]\nmanifest_name = \"..\"")]
    #[case::separator("[audit]\nmanifest_name = \"sub/.chksum\"")]
    #[case::delimiter("[audit]\nmanifest_name = \"a*b\"")]
    #[case::zero_chunk("[audit]\nchunk_size = 0")]
    #[case::empty_exclusion("[audit]\nexcluded_dirs = [\"\"]")]
    #[case::unknown_sink("[report]\nsink = \"syslog\"")]
    #[case::not_toml("this is = = not toml")]
    fn test_invalid_configs(#[case] content: &str) {
        assert!(parse_config_str(content).is_err());
    }
}
