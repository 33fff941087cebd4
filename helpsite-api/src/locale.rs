//! Labels and category metadata.
//!
//! A locale ships as two files, `labels.json` (label name → text) and
//! `categories.json` (list of [`CategoryMetadata`]). The KM app data can
//! override both at runtime; see [`LanguageManager::with_overrides`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

const EMBEDDED_LANG: &str = "en";
const EMBEDDED_LABELS: &str = include_str!("../locale/en/labels.json");
const EMBEDDED_CATEGORIES: &str = include_str!("../locale/en/categories.json");

/// Page title, description and introduction of a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMetadata {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub introduction: String,
}

impl CategoryMetadata {
    /// Metadata of a category nobody wrote metadata for: its name everywhere.
    pub fn fallback(name: &str) -> Self {
        Self {
            name: name.to_string(),
            title: name.to_string(),
            description: name.to_string(),
            introduction: name.to_string(),
        }
    }
}

/// Labels and category metadata loaded from the locale files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleBundle {
    pub lang: String,
    pub labels: BTreeMap<String, String>,
    pub categories: Vec<CategoryMetadata>,
}

impl LocaleBundle {
    /// Load `lang` from `dir`, or the bundled English locale when no
    /// directory is configured.
    pub fn load(lang: &str, dir: Option<&Path>) -> ApiResult<Self> {
        let (labels, categories) = match dir {
            Some(dir) => {
                let lang_dir = dir.join(lang);
                (
                    read_locale_file(&lang_dir.join("labels.json"))?,
                    read_locale_file(&lang_dir.join("categories.json"))?,
                )
            }
            None if lang == EMBEDDED_LANG => {
                (EMBEDDED_LABELS.to_string(), EMBEDDED_CATEGORIES.to_string())
            }
            None => {
                return Err(ApiError::internal_error(format!(
                    "Could not load labels for language \"{}\": no locale directory configured",
                    lang
                )))
            }
        };
        Self::parse(lang, &labels, &categories)
    }

    pub fn parse(lang: &str, labels: &str, categories: &str) -> ApiResult<Self> {
        let bad_format = |e: serde_json::Error| {
            ApiError::internal_error(format!("Could not load labels for {}: bad files format ({})", lang, e))
        };
        Ok(Self {
            lang: lang.to_string(),
            labels: serde_json::from_str(labels).map_err(bad_format)?,
            categories: serde_json::from_str(categories).map_err(bad_format)?,
        })
    }
}

fn read_locale_file(path: &Path) -> ApiResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        ApiError::internal_error(format!("Could not read locale file {}: {}", path.display(), e))
    })
}

/// Labels from an app data document: `results[0].value.labels`, a list of
/// `{name, value}` pairs.
pub fn labels_from_app_data(document: &Value) -> BTreeMap<String, String> {
    document
        .pointer("/results/0/value/labels")
        .and_then(Value::as_array)
        .map(|labels| {
            labels
                .iter()
                .filter_map(|label| {
                    let name = label.get("name")?.as_str()?;
                    let value = label.get("value")?.as_str()?;
                    Some((name.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Category metadata from an app data document:
/// `results[0].value.categories_metadata`.
pub fn categories_metadata_from_app_data(document: &Value) -> Vec<CategoryMetadata> {
    document
        .pointer("/results/0/value/categories_metadata")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Labels and metadata for the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageManager {
    lang: String,
    labels: BTreeMap<String, String>,
    categories: Vec<CategoryMetadata>,
}

impl LanguageManager {
    pub fn new(bundle: &LocaleBundle) -> Self {
        Self {
            lang: bundle.lang.clone(),
            labels: bundle.labels.clone(),
            categories: bundle.categories.clone(),
        }
    }

    /// Layer app data values over the file values. On conflict the app data
    /// wins, for labels and category metadata alike.
    pub fn with_overrides(
        mut self,
        labels: BTreeMap<String, String>,
        categories: Vec<CategoryMetadata>,
    ) -> Self {
        self.labels.extend(labels);
        let mut merged = categories;
        merged.append(&mut self.categories);
        self.categories = merged;
        self
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Text of `label`, or the label name itself when it is not defined.
    pub fn translate(&self, label: &str) -> String {
        self.labels
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    pub fn category_metadata(&self, name: &str) -> CategoryMetadata {
        self.categories
            .iter()
            .find(|metadata| metadata.name == name)
            .cloned()
            .unwrap_or_else(|| CategoryMetadata::fallback(name))
    }
}
