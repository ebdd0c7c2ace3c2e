//! Role-keyed message templates, loaded from a role,body CSV.

use std::collections::HashMap;
use std::path::Path;

use offerwatch_core::{OfferwatchError, Result};

/// Role key of the fallback template.
pub const DEFAULT_ROLE: &str = "default";

const ROLE_ALIASES: &[&str] = &["role", "emp type"];
const BODY_ALIASES: &[&str] = &["template", "body", "email template"];

/// Template store — exact role match with `default` fallback.
///
/// Resolution fails closed: a role with neither its own entry nor a
/// `default` is a per-candidate `TemplateNotFound`, never a silent no-op.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: HashMap<String, String>,
}

impl TemplateStore {
    /// Build a store from in-memory pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            templates: pairs
                .into_iter()
                .map(|(role, body)| (role.into(), body.into()))
                .collect(),
        }
    }

    /// Load templates from a role,body CSV file.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| OfferwatchError::SourceRead(format!("{}: {e}", path.display())))?;

        let header = reader
            .headers()
            .map_err(|e| OfferwatchError::SourceRead(format!("{}: {e}", path.display())))?
            .clone();
        let lower: Vec<String> = header.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |aliases: &[&str]| lower.iter().position(|h| aliases.contains(&h.as_str()));
        let (Some(role_col), Some(body_col)) = (find(ROLE_ALIASES), find(BODY_ALIASES)) else {
            return Err(OfferwatchError::Schema(format!(
                "{}: template file needs 'role' and 'template' columns",
                path.display()
            )));
        };

        let mut templates = HashMap::new();
        for (i, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                OfferwatchError::SourceRead(format!("{} row {}: {e}", path.display(), i + 1))
            })?;
            let role = record.get(role_col).unwrap_or("").trim();
            let body = record.get(body_col).unwrap_or("");
            if role.is_empty() {
                continue;
            }
            templates.insert(role.to_string(), body.to_string());
        }

        tracing::debug!("📑 Loaded {} template(s) from {}", templates.len(), path.display());
        Ok(Self { templates })
    }

    /// Resolve the template body for a role.
    ///
    /// Lookup is exact and case-sensitive; `default` is the fallback.
    pub fn resolve(&self, role: &str) -> Result<&str> {
        self.templates
            .get(role)
            .or_else(|| self.templates.get(DEFAULT_ROLE))
            .map(String::as_str)
            .ok_or_else(|| OfferwatchError::TemplateNotFound(role.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
