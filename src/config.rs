//! Persisted YAML configuration: the connection config file and the
//! separate prompt-template file.
//!
//! Both loaders share the same discipline: a fixed on-disk path relative to
//! the install directory, an exact required key set, and a rejection of
//! empty string values.

use crate::error::{AioptimError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

fn install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe()
        .map_err(|e| AioptimError::ConfigError(format!("could not resolve install directory: {e}")))?;
    Ok(exe
        .parent()
        .map(|p| p.join("config"))
        .unwrap_or_else(|| PathBuf::from("config")))
}

fn read_yaml_mapping(path: &PathBuf) -> Result<HashMap<String, String>> {
    if !path.is_file() {
        return Err(AioptimError::ConfigError(format!(
            "{} does not exist, run setup",
            path.display()
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    let map: HashMap<String, String> = serde_yaml::from_str(&contents)?;
    Ok(map)
}

fn validate_exact_keys(map: &HashMap<String, String>, required: &[&str], kind: &str) -> Result<()> {
    let required_set: std::collections::HashSet<&str> = required.iter().copied().collect();
    let actual_set: std::collections::HashSet<&str> = map.keys().map(String::as_str).collect();
    if required_set != actual_set {
        return Err(AioptimError::ConfigError(format!(
            "{kind} file is incorrectly formatted, run setup"
        )));
    }
    if map.values().any(|v| v.is_empty()) {
        return Err(AioptimError::ConfigError(format!(
            "{kind} contains empty values, run setup"
        )));
    }
    Ok(())
}

/// The nine required configuration keys, exactly as named in the
/// external-interfaces contract.
pub const CONFIG_KEYS: &[&str] = &[
    "IBM_Tenant",
    "IBM_Unit",
    "IBM_Key",
    "IBM_Label",
    "GitHub",
    "Repository",
    "Branch",
    "Model",
    "ModelPath",
];

/// The connection configuration: IBM/Instana credentials, repo-host
/// credentials, and model backend location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "IBM_Tenant")]
    pub ibm_tenant: String,
    #[serde(rename = "IBM_Unit")]
    pub ibm_unit: String,
    #[serde(rename = "IBM_Key")]
    pub ibm_key: String,
    #[serde(rename = "IBM_Label")]
    pub ibm_label: String,
    #[serde(rename = "GitHub")]
    pub github: String,
    #[serde(rename = "Repository")]
    pub repository: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "ModelPath")]
    pub model_path: String,
}

impl Config {
    fn path() -> Result<PathBuf> {
        Ok(install_dir()?.join("config.yml"))
    }

    /// Ensures the config file exists, is exactly-keyed, and has no empty
    /// values. Returns a `ConfigError` naming the problem otherwise.
    pub fn validate() -> Result<()> {
        let map = read_yaml_mapping(&Self::path()?)?;
        validate_exact_keys(&map, CONFIG_KEYS, "YAML config")
    }

    /// Load the validated config file into a typed `Config`.
    pub fn load() -> Result<Self> {
        Self::validate()?;
        let contents = std::fs::read_to_string(Self::path()?)?;
        Ok(serde_yaml::from_str(&contents)?)
    }

    /// Write this config to disk, creating the `config/` directory if
    /// necessary. Used by the `setup` CLI subcommand.
    pub fn store(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = serde_yaml::to_string(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}

/// The four required prompt-template keys, exactly as named in the
/// external-interfaces contract.
pub const PROMPT_KEYS: &[&str] = &[
    "code_generation",
    "codejudge_analyse",
    "codejudge_summarise",
    "description_generation",
];

/// The four prompt templates driving the Regenerator, each containing the
/// literal `$...$` placeholders documented in spec §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompts {
    pub code_generation: String,
    pub codejudge_analyse: String,
    pub codejudge_summarise: String,
    pub description_generation: String,
}

impl Prompts {
    fn path() -> Result<PathBuf> {
        Ok(install_dir()?.join("prompt.yml"))
    }

    /// Write the shipped default prompt templates if no prompt file exists
    /// yet. Called by the `setup` subcommand; a user-edited prompt file is
    /// never overwritten.
    pub fn ensure_default() -> Result<()> {
        let path = Self::path()?;
        if path.is_file() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let defaults = Prompts {
            code_generation: "Rewrite the following $LANGUAGE$ method with signature \
                $SIGNATURE$ to be faster, while preserving its behavior:\n\n$CODE$"
                .to_string(),
            codejudge_analyse: "Here is a description of a performance problem in a \
                $LANGUAGE$ method:\n$PROBLEM$\n\nHere is a proposed rewrite:\n$CODE$\n\n\
                Analyse whether the rewrite preserves behavior while addressing the \
                problem described above."
                .to_string(),
            codejudge_summarise: "Given this analysis:\n$ANALYSIS$\nanswer yes or no: does \
                the rewrite preserve behavior while improving performance?"
                .to_string(),
            description_generation: "Describe the performance problem in this $LANGUAGE$ \
                method:\n$CODE$"
                .to_string(),
        };
        std::fs::write(path, serde_yaml::to_string(&defaults)?)?;
        Ok(())
    }

    pub fn validate() -> Result<()> {
        let map = read_yaml_mapping(&Self::path()?)?;
        validate_exact_keys(&map, PROMPT_KEYS, "YAML prompt")
    }

    pub fn load() -> Result<Self> {
        Self::validate()?;
        let contents = std::fs::read_to_string(Self::path()?)?;
        Ok(serde_yaml::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_exact_keys_rejects_missing_key() {
        let mut map = HashMap::new();
        for key in &CONFIG_KEYS[..CONFIG_KEYS.len() - 1] {
            map.insert(key.to_string(), "value".to_string());
        }
        assert!(validate_exact_keys(&map, CONFIG_KEYS, "YAML config").is_err());
    }

    #[test]
    fn validate_exact_keys_rejects_extra_key() {
        let mut map = HashMap::new();
        for key in CONFIG_KEYS {
            map.insert(key.to_string(), "value".to_string());
        }
        map.insert("Extra".to_string(), "oops".to_string());
        assert!(validate_exact_keys(&map, CONFIG_KEYS, "YAML config").is_err());
    }

    #[test]
    fn validate_exact_keys_rejects_empty_value() {
        let mut map = HashMap::new();
        for key in CONFIG_KEYS {
            map.insert(key.to_string(), "value".to_string());
        }
        map.insert("Model".to_string(), "".to_string());
        assert!(validate_exact_keys(&map, CONFIG_KEYS, "YAML config").is_err());
    }

    #[test]
    fn validate_exact_keys_accepts_well_formed_map() {
        let mut map = HashMap::new();
        for key in CONFIG_KEYS {
            map.insert(key.to_string(), "value".to_string());
        }
        assert!(validate_exact_keys(&map, CONFIG_KEYS, "YAML config").is_ok());
    }

    #[test]
    fn prompt_keys_has_four_entries() {
        assert_eq!(PROMPT_KEYS.len(), 4);
    }
}
