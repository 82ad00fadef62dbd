use crate::core::assistant::DEFAULT_CONTEXT;
use crate::core::{Category, ConfigProvider};
use crate::utils::error::{HsseError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub anon_key: String,
    pub access_token: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub dry_run: bool,
    /// Category every sheet is imported as, skipping detection.
    pub default_category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub endpoint: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_timeout() -> u64 {
    30
}

/// A `${VAR}` left in place means the variable was not set.
fn is_unresolved(value: &str) -> bool {
    value.starts_with("${") && value.ends_with('}')
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${SUPABASE_ANON_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| HsseError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn default_category(&self) -> Result<Option<Category>> {
        match self.import.default_category.as_deref() {
            None | Some("") | Some("auto") => Ok(None),
            Some(value) => value
                .parse::<Category>()
                .map(Some)
                .map_err(|e| HsseError::InvalidConfigValueError {
                    field: "import.default_category".to_string(),
                    value: value.to_string(),
                    reason: e.to_string(),
                }),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn backend_url(&self) -> &str {
        &self.backend.url
    }

    fn anon_key(&self) -> &str {
        &self.backend.anon_key
    }

    fn access_token(&self) -> Option<&str> {
        self.backend
            .access_token
            .as_deref()
            .filter(|t| !t.is_empty() && !is_unresolved(t))
    }

    fn timeout_seconds(&self) -> u64 {
        self.backend.timeout_seconds
    }

    fn assistant_endpoint(&self) -> Option<&str> {
        self.assistant.endpoint.as_deref().filter(|e| !e.is_empty())
    }

    fn assistant_context(&self) -> &str {
        self.assistant.context.as_deref().unwrap_or(DEFAULT_CONTEXT)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_url("backend.url", &self.backend.url)?;
        validate_non_empty_string("backend.anon_key", &self.backend.anon_key)?;
        if is_unresolved(&self.backend.anon_key) {
            return Err(HsseError::MissingConfigError {
                field: format!("backend.anon_key (environment variable {} is not set)", self.backend.anon_key),
            });
        }
        validate_range("backend.timeout_seconds", self.backend.timeout_seconds, 1, 600)?;
        if let Some(endpoint) = self.assistant_endpoint() {
            validate_url("assistant.endpoint", endpoint)?;
        }
        self.default_category()?;
        Ok(())
    }
}
