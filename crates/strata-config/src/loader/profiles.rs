//! Discovery and parsing of active profile documents.

use crate::ConfigError;
use log::debug;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// File format used for profile documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigFormat {
    /// YAML profiles, `<profile>.yaml` or `<profile>.yml`.
    #[default]
    Yaml,
    /// JSON profiles, `<profile>.json`.
    Json,
}

impl ConfigFormat {
    /// File extensions probed for this format, in order.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            ConfigFormat::Yaml => &["yaml", "yml"],
            ConfigFormat::Json => &["json"],
        }
    }

    fn parse(&self, contents: &str) -> Result<Value, crate::error::HookError> {
        let value: Value = match self {
            ConfigFormat::Yaml => serde_yaml::from_str(contents)?,
            ConfigFormat::Json => serde_json::from_str(contents)?,
        };
        Ok(value)
    }
}

/// Locate and parse one active profile along the search paths.
///
/// Paths are probed in order; the first existing file wins. A profile absent
/// from every path is a skip, not an error, and yields `None`. Read and
/// parse failures are fatal.
pub(crate) fn load_profile(
    profile: &str,
    config_paths: &[PathBuf],
    format: ConfigFormat,
) -> Result<Option<Value>, ConfigError> {
    let Some(file) = find_profile_file(profile, config_paths, format) else {
        debug!(
            "profile [{profile}] not found in paths [{}], skipping",
            display_paths(config_paths)
        );
        return Ok(None);
    };

    debug!("loading profile [{profile}] from {}", file.display());
    let document = read_profile(&file, format).map_err(|source| ConfigError::ProfileLoad {
        profile: profile.to_string(),
        paths: display_paths(config_paths),
        source,
    })?;
    match document {
        Value::Object(_) => Ok(Some(document)),
        // An empty document is a valid, contentless profile.
        Value::Null => Ok(Some(Value::Object(serde_json::Map::new()))),
        other => Err(ConfigError::ProfileLoad {
            profile: profile.to_string(),
            paths: display_paths(config_paths),
            source: format!("profile root must be a mapping, got {other}").into(),
        }),
    }
}

fn read_profile(file: &Path, format: ConfigFormat) -> Result<Value, crate::error::HookError> {
    let contents = fs::read_to_string(file)?;
    format.parse(&contents)
}

fn find_profile_file(
    profile: &str,
    config_paths: &[PathBuf],
    format: ConfigFormat,
) -> Option<PathBuf> {
    for path in config_paths {
        for extension in format.extensions() {
            let candidate = path.join(format!("{profile}.{extension}"));
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }
    None
}

pub(crate) fn display_paths(config_paths: &[PathBuf]) -> String {
    config_paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_profile_is_skipped() {
        let tmp = TempDir::new().expect("tmp");
        let loaded = load_profile("absent", &[tmp.path().to_path_buf()], ConfigFormat::Yaml)
            .expect("load");
        assert!(loaded.is_none());
    }

    #[test]
    fn first_matching_path_wins() {
        let first = TempDir::new().expect("tmp");
        let second = TempDir::new().expect("tmp");
        fs::write(first.path().join("local.yaml"), "db:\n  host: first\n").expect("write");
        fs::write(second.path().join("local.yaml"), "db:\n  host: second\n").expect("write");

        let paths = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let loaded = load_profile("local", &paths, ConfigFormat::Yaml)
            .expect("load")
            .expect("document");
        assert_eq!(loaded, json!({"db": {"host": "first"}}));
    }

    #[test]
    fn yml_extension_is_probed() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("local.yml"), "port: 8080\n").expect("write");
        let loaded = load_profile("local", &[tmp.path().to_path_buf()], ConfigFormat::Yaml)
            .expect("load")
            .expect("document");
        assert_eq!(loaded, json!({"port": 8080}));
    }

    #[test]
    fn json_profiles_parse() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("local.json"), r#"{"db": {"port": 5432}}"#).expect("write");
        let loaded = load_profile("local", &[tmp.path().to_path_buf()], ConfigFormat::Json)
            .expect("load")
            .expect("document");
        assert_eq!(loaded, json!({"db": {"port": 5432}}));
    }

    #[test]
    fn empty_profile_is_contentless() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("local.yaml"), "").expect("write");
        let loaded = load_profile("local", &[tmp.path().to_path_buf()], ConfigFormat::Yaml)
            .expect("load")
            .expect("document");
        assert_eq!(loaded, json!({}));
    }

    #[test]
    fn scalar_root_is_fatal() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("local.yaml"), "just-a-string\n").expect("write");
        let err = load_profile("local", &[tmp.path().to_path_buf()], ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ProfileLoad { .. }));
    }

    #[test]
    fn malformed_profile_is_fatal() {
        let tmp = TempDir::new().expect("tmp");
        fs::write(tmp.path().join("local.yaml"), "db: [unclosed\n").expect("write");
        let err = load_profile("local", &[tmp.path().to_path_buf()], ConfigFormat::Yaml)
            .unwrap_err();
        match err {
            ConfigError::ProfileLoad { profile, paths, .. } => {
                assert_eq!(profile, "local");
                assert!(paths.contains(&tmp.path().display().to_string()));
            }
            other => panic!("expected ProfileLoad, got {other:?}"),
        }
    }
}
