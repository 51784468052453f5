use std::collections::HashMap;
use std::env::current_exe;
use std::path::{Path, PathBuf};

use anyhow::Context;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed ini line {line}: {content:?}")]
    MalformedLine {
        line: usize,
        content: String,
    },

    #[error("Malformed value for [{section}] {key}: {value:?}")]
    MalformedValue {
        section: String,
        key: String,
        value: String,
    },
}

/// Plain ini configuration file, read once at engine startup.
///
/// Sections are introduced with `[name]`, keys are `key = value` pairs.
/// Lines starting with `;` or `#` are comments.
pub struct IniFile {
    sections: HashMap<String, HashMap<String, String>>,
}

impl IniFile {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open ini file: {}", path.display()))?;

        Ok(Self::parse(&content)?)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
        let mut current_section = String::new();

        for (line_idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                if !line.ends_with(']') {
                    return Err(ConfigError::MalformedLine {
                        line: line_idx + 1,
                        content: line.to_owned(),
                    });
                }

                current_section = line[1..line.len() - 1].trim().to_owned();
                sections.entry(current_section.clone()).or_default();
                continue;
            }

            let (key, value) = line.split_once('=')
                .ok_or_else(|| ConfigError::MalformedLine {
                    line: line_idx + 1,
                    content: line.to_owned(),
                })?;

            sections.entry(current_section.clone())
                .or_default()
                .insert(key.trim().to_owned(), value.trim().to_owned());
        }

        Ok(Self {
            sections,
        })
    }

    pub fn get_str(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)
            .and_then(|keys| keys.get(key))
            .map(|value| value.as_str())
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, ConfigError> {
        self.get_parsed(section, key)
    }

    pub fn get_float(&self, section: &str, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get_parsed(section, key)
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        match self.get_str(section, key) {
            Some("1") | Some("true") | Some("True") => Ok(Some(true)),
            Some("0") | Some("false") | Some("False") => Ok(Some(false)),
            Some(other) => Err(ConfigError::MalformedValue {
                section: section.to_owned(),
                key: key.to_owned(),
                value: other.to_owned(),
            }),
            None => Ok(None),
        }
    }

    fn get_parsed<T: std::str::FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get_str(section, key) {
            Some(value) => value.parse::<T>()
                .map(Some)
                .map_err(|_| ConfigError::MalformedValue {
                    section: section.to_owned(),
                    key: key.to_owned(),
                    value: value.to_owned(),
                }),
            None => Ok(None),
        }
    }
}

/// Absolute path of a configuration file living alongside the executable.
pub fn exe_adjacent_path(file_name: &str) -> anyhow::Result<PathBuf> {
    let exe_path = current_exe().context("Failed to fetch valid exe path!")?;
    let exe_dir = exe_path.parent()
        .context("Executable has no parent directory!")?;

    Ok(exe_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
; engine settings
[Render]
FrameRateLimit = 144
SwapchainWidth = 1280
SwapchainHeight = 720
EnableVSync = true

[Log]
Level = info
"#;

    #[test]
    fn parse_sections_and_keys() {
        let ini = IniFile::parse(SAMPLE).unwrap();

        assert_eq!(ini.get_str("Log", "Level"), Some("info"));
        assert_eq!(ini.get_int("Render", "SwapchainWidth").unwrap(), Some(1280));
        assert_eq!(ini.get_float("Render", "FrameRateLimit").unwrap(), Some(144.0));
        assert_eq!(ini.get_bool("Render", "EnableVSync").unwrap(), Some(true));
        assert_eq!(ini.get_str("Render", "Missing"), None);
        assert_eq!(ini.get_str("Missing", "Missing"), None);
    }

    #[test]
    fn malformed_line_is_rejected() {
        assert!(IniFile::parse("[Render]\nno equals sign").is_err());
    }

    #[test]
    fn malformed_value_is_rejected() {
        let ini = IniFile::parse("[Render]\nFrameRateLimit = fast").unwrap();
        assert!(ini.get_int("Render", "FrameRateLimit").is_err());
    }
}
