use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// One keyword-ads API credential as configured on disk.
#[derive(Clone, Deserialize)]
pub struct SearchAdCredentialConfig {
    pub label: String,
    pub api_key: String,
    pub secret_key: String,
    pub customer_id: String,
}

/// One document-search API credential as configured on disk.
#[derive(Clone, Deserialize)]
pub struct DocCountCredentialConfig {
    pub label: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for SearchAdCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchAdCredentialConfig")
            .field("label", &self.label)
            .field("customer_id", &self.customer_id)
            .field("api_key", &"[redacted]")
            .field("secret_key", &"[redacted]")
            .finish()
    }
}

impl std::fmt::Debug for DocCountCredentialConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocCountCredentialConfig")
            .field("label", &self.label)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsFile {
    pub search_ad: Vec<SearchAdCredentialConfig>,
    #[serde(default)]
    pub document_search: Vec<DocCountCredentialConfig>,
}

/// Load and validate API credentials from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_credentials(path: &Path) -> Result<CredentialsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CredentialsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_credentials(&content)
}

fn parse_credentials(content: &str) -> Result<CredentialsFile, ConfigError> {
    let file: CredentialsFile = serde_yaml::from_str(content)?;
    validate_credentials(&file)?;
    Ok(file)
}

fn validate_credentials(file: &CredentialsFile) -> Result<(), ConfigError> {
    if file.search_ad.is_empty() {
        return Err(ConfigError::Validation(
            "at least one search_ad credential is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for cred in &file.search_ad {
        let fields = [
            ("label", &cred.label),
            ("api_key", &cred.api_key),
            ("secret_key", &cred.secret_key),
            ("customer_id", &cred.customer_id),
        ];
        require_non_empty("search_ad", &cred.label, &fields)?;
        if !seen.insert(cred.label.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate search_ad label: '{}'",
                cred.label
            )));
        }
    }

    let mut seen = HashSet::new();
    for cred in &file.document_search {
        let fields = [
            ("label", &cred.label),
            ("client_id", &cred.client_id),
            ("client_secret", &cred.client_secret),
        ];
        require_non_empty("document_search", &cred.label, &fields)?;
        if !seen.insert(cred.label.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate document_search label: '{}'",
                cred.label
            )));
        }
    }

    Ok(())
}

fn require_non_empty(
    family: &str,
    label: &str,
    fields: &[(&str, &String)],
) -> Result<(), ConfigError> {
    for (name, value) in fields {
        if value.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{family} credential '{label}' has an empty {name}"
            )));
        }
    }
    Ok(())
}
