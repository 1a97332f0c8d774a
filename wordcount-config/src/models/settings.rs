use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use wordcount_core::OrchestratorConfig;
use wordcount_model::DocumentKey;

use crate::validation::SettingsError;

pub const CONFIG_PATH_VAR: &str = "WORDCOUNT_CONFIG_PATH";
pub const CONFIG_JSON_VAR: &str = "WORDCOUNT_CONFIG_JSON";

/// Everything needed to run one word count job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WordCounterSettings {
    /// Absolute URIs of the documents to count.
    pub document_uris: Vec<String>,
    pub orchestrator: OrchestratorConfig,
}

/// Where the settings were loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsSource {
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
    Default,
}

impl WordCounterSettings {
    /// Load settings using environment variables.
    /// Evaluation order:
    /// 1) `$WORDCOUNT_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$WORDCOUNT_CONFIG_JSON` (inline JSON),
    /// 3) the first default file found in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, SettingsSource)> {
        Self::load_with(|name| env::var(name).ok(), Path::new("."))
    }

    /// Same as [`WordCounterSettings::load_from_env`] with an explicit
    /// variable lookup and base directory for the default files.
    pub fn load_with<F>(lookup: F, base_dir: &Path) -> anyhow::Result<(Self, SettingsSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_VAR)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_VAR)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw).context("failed to parse WORDCOUNT_CONFIG_JSON")?;
            return Ok((parsed, SettingsSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, SettingsSource::File(path)));
        }

        Ok((Self::default(), SettingsSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read wordcount config from {}", path.display()))?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                Self::parse_json(&contents).with_context(|| format!("invalid wordcount config {}", path.display()))
            }
            Some("toml") => toml::from_str(&contents)
                .map_err(|err| anyhow!("invalid wordcount config {}: {}", path.display(), err)),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse wordcount config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw).map_err(|err| anyhow!("invalid wordcount config json: {err}"))
    }

    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut problems = Vec::new();

        if self.document_uris.is_empty() {
            problems.push("at least one document URI is required".to_string());
        }
        for (index, uri) in self.document_uris.iter().enumerate() {
            if let Err(err) = DocumentKey::parse(uri) {
                problems.push(format!("document_uris[{index}]: {err}"));
            }
        }
        if let Err(err) = self.orchestrator.validate() {
            problems.push(err.to_string());
        }

        SettingsError::from_problems(problems)
    }

    /// Parsed document keys in configured order.
    pub fn document_keys(&self) -> Result<Vec<DocumentKey>, SettingsError> {
        let mut keys = Vec::with_capacity(self.document_uris.len());
        let mut problems = Vec::new();
        for (index, uri) in self.document_uris.iter().enumerate() {
            match DocumentKey::parse(uri) {
                Ok(key) => keys.push(key),
                Err(err) => problems.push(format!("document_uris[{index}]: {err}")),
            }
        }
        SettingsError::from_problems(problems)?;
        Ok(keys)
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &["wordcount.toml", "wordcount.json", "config/wordcount.toml"];

        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wordcount.toml");
        fs::write(
            &path,
            r#"
document_uris = ["https://example.com/a"]

[orchestrator.parser]
worker_count = 2

[orchestrator.job]
deadline_ms = 1000
"#,
        )
        .unwrap();

        let settings = WordCounterSettings::load_from_file(&path).unwrap();
        assert_eq!(settings.document_uris, vec!["https://example.com/a"]);
        assert_eq!(settings.orchestrator.parser.worker_count, 2);
        assert_eq!(settings.orchestrator.parser.chunk_size, 20);
        assert_eq!(settings.orchestrator.job.deadline_ms, 1000);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn parse_from_str_accepts_json() {
        let settings = WordCounterSettings::parse_from_str(
            r#"{ "document_uris": ["http://example.com/"], "orchestrator": { "aggregator": { "idle_timeout_ms": 10 } } }"#,
            "inline",
        )
        .unwrap();
        assert_eq!(settings.orchestrator.aggregator.idle_timeout_ms, 10);
    }

    #[test]
    fn parse_from_str_reports_both_errors() {
        let err = WordCounterSettings::parse_from_str("document_uris = [", "broken")
            .unwrap_err()
            .to_string();
        assert!(err.contains("toml error"));
        assert!(err.contains("json error"));
    }

    #[test]
    fn env_path_takes_precedence_over_inline_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{ "document_uris": ["http://from-file.test/"] }"#).unwrap();

        let vars = HashMap::from([
            (CONFIG_PATH_VAR, path.display().to_string()),
            (CONFIG_JSON_VAR, r#"{ "document_uris": ["http://inline.test/"] }"#.to_string()),
        ]);
        let (settings, source) =
            WordCounterSettings::load_with(|name| vars.get(name).cloned(), dir.path()).unwrap();

        assert_eq!(source, SettingsSource::EnvPath(path));
        assert_eq!(settings.document_uris, vec!["http://from-file.test/"]);
    }

    #[test]
    fn inline_json_is_used_without_a_path() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, source) = WordCounterSettings::load_with(
            |name| (name == CONFIG_JSON_VAR).then(|| r#"{ "document_uris": ["http://inline.test/"] }"#.into()),
            dir.path(),
        )
        .unwrap();

        assert_eq!(source, SettingsSource::EnvInline);
        assert_eq!(settings.document_uris, vec!["http://inline.test/"]);
    }

    #[test]
    fn default_file_candidates_are_searched() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("config")).unwrap();
        let path = dir.path().join("config/wordcount.toml");
        fs::write(&path, "document_uris = [\"http://nested.test/\"]\n").unwrap();

        let (settings, source) = WordCounterSettings::load_with(no_env, dir.path()).unwrap();
        assert_eq!(source, SettingsSource::File(path));
        assert_eq!(settings.document_uris, vec!["http://nested.test/"]);
    }

    #[test]
    fn falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, source) = WordCounterSettings::load_with(no_env, dir.path()).unwrap();
        assert_eq!(source, SettingsSource::Default);
        assert_eq!(settings, WordCounterSettings::default());
    }

    #[test]
    fn validate_collects_every_problem() {
        let mut settings = WordCounterSettings {
            document_uris: vec!["relative/path".into(), "http://ok.test/".into()],
            ..Default::default()
        };
        settings.orchestrator.parser.chunk_size = 0;

        let err = settings.validate().unwrap_err();
        let problems = err.problems();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("document_uris[0]"));
        assert!(problems[1].contains("parser.chunk_size"));
    }

    #[test]
    fn empty_uri_list_is_rejected() {
        let err = WordCounterSettings::default().validate().unwrap_err();
        assert!(err.to_string().contains("at least one document URI"));
    }
}
