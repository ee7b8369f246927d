//! Reference records maintained on the admin screens.

use serde::{Deserialize, Serialize};

use crate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentType {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestGroup {
    pub id: i64,
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    #[serde(default)]
    pub organizational_unit: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A language model the backend can answer with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiModel {
    pub id: i64,
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

/// Create-request body shared by document types and interest groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogDraft {
    pub name: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CatalogDraft {
    pub fn new(name: &str, code: &str, description: Option<&str>) -> Self {
        Self {
            name: name.trim().to_string(),
            code: code.trim().to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        }
    }

    /// Check required fields and that `code` is not used by any of `existing_codes`.
    ///
    /// Codes compare trimmed and case-insensitively.
    pub fn validate<'a>(
        &self,
        existing_codes: impl IntoIterator<Item = &'a str>,
    ) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        let code = self.code.trim();
        if code.is_empty() {
            return Err(ValidationError::EmptyField("code"));
        }
        if existing_codes
            .into_iter()
            .any(|existing| existing.trim().eq_ignore_ascii_case(code))
        {
            return Err(ValidationError::DuplicateCode(code.to_string()));
        }
        Ok(())
    }
}
