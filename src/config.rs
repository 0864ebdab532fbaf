use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::QueryError;

/// When pending session changes are written out before a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushMode {
    Manual,
    Commit,
    #[default]
    Auto,
    Always,
}

/// Engine-wide settings, fixed once the query engine is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Pad multi-valued IN-list bindings up to the next power of two.
    pub in_clause_parameter_padding: bool,
    pub default_catalog: Option<String>,
    pub default_schema: Option<String>,
    /// Bootstrapped through the standard persistence API, which changes the AUTO flush rule.
    pub jpa_bootstrap: bool,
    pub query_plan_cache_enabled: bool,
    pub parameter_interpretation_cache_enabled: bool,
    /// Mode sessions start in. Queries read the live mode from their session.
    pub flush_mode: FlushMode,
    /// Prefix statements with the query comment, when one is set.
    pub use_sql_comments: bool,
    /// First JDBC position handed to the driver.
    pub jdbc_start_position: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            in_clause_parameter_padding: false,
            default_catalog: None,
            default_schema: None,
            jpa_bootstrap: false,
            query_plan_cache_enabled: true,
            parameter_interpretation_cache_enabled: true,
            flush_mode: FlushMode::Auto,
            use_sql_comments: false,
            jdbc_start_position: 1,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_padding(mut self, enabled: bool) -> Self {
        self.in_clause_parameter_padding = enabled;
        self
    }

    pub fn with_default_catalog(mut self, catalog: &str) -> Self {
        self.default_catalog = Some(catalog.to_string());
        self
    }

    pub fn with_default_schema(mut self, schema: &str) -> Self {
        self.default_schema = Some(schema.to_string());
        self
    }

    pub fn with_jpa_bootstrap(mut self, jpa: bool) -> Self {
        self.jpa_bootstrap = jpa;
        self
    }

    pub fn with_flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    pub fn with_plan_cache(mut self, enabled: bool) -> Self {
        self.query_plan_cache_enabled = enabled;
        self
    }

    pub fn with_interpretation_cache(mut self, enabled: bool) -> Self {
        self.parameter_interpretation_cache_enabled = enabled;
        self
    }

    pub fn with_sql_comments(mut self, enabled: bool) -> Self {
        self.use_sql_comments = enabled;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, QueryError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, QueryError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    fn validate(&self) -> Result<(), QueryError> {
        if self.jdbc_start_position == 0 {
            return Err(QueryError::Config(
                "jdbc_start_position must be 1 or greater".to_string(),
            ));
        }
        for (key, value) in [
            ("default_catalog", &self.default_catalog),
            ("default_schema", &self.default_schema),
        ] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(QueryError::Config(format!("{key} must not be blank")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::config::{FlushMode, Settings};
    use crate::QueryError;

    #[test]
    pub fn test_settings_defaults() {
        let settings = Settings::new();

        assert!(!settings.in_clause_parameter_padding);
        assert!(settings.query_plan_cache_enabled);
        assert_eq!(settings.flush_mode, FlushMode::Auto);
        assert_eq!(settings.jdbc_start_position, 1);
    }

    #[test]
    pub fn test_settings_from_json_partial() {
        let settings = Settings::from_json_str(
            r#"{ "in_clause_parameter_padding": true, "default_schema": "app", "flush_mode": "always" }"#,
        )
        .unwrap();

        assert!(settings.in_clause_parameter_padding);
        assert_eq!(settings.default_schema.as_deref(), Some("app"));
        assert_eq!(settings.default_catalog, None);
        assert_eq!(settings.flush_mode, FlushMode::Always);
    }

    #[test]
    pub fn test_settings_rejects_blank_schema() {
        let result = Settings::from_json_str(r#"{ "default_schema": "  " }"#);

        assert!(matches!(result, Err(QueryError::Config(_))));
    }

    #[test]
    pub fn test_settings_rejects_bad_json() {
        let result = Settings::from_json_str("{ nope");

        assert!(matches!(result, Err(QueryError::Json(_))));
    }

    #[test]
    pub fn test_settings_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_catalog": "main", "jpa_bootstrap": true }}"#).unwrap();

        let settings = Settings::from_file(file.path()).unwrap();

        assert_eq!(settings.default_catalog.as_deref(), Some("main"));
        assert!(settings.jpa_bootstrap);
    }

    #[test]
    pub fn test_settings_from_missing_file() {
        let result = Settings::from_file("/definitely/not/here.json");

        assert!(matches!(result, Err(QueryError::Io(_))));
    }
}
