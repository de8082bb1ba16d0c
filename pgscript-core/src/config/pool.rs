//! Connection pool tuning options.

use crate::error::PgScriptError;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Pool options supplied on the command line.
///
/// Every field is optional: an option the user did not pass stays `None` so
/// the driver applies its own default.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoolOptions {
    /// Maximum number of pooled connections (`--sql-max`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
    /// Idle connection timeout in seconds, 0 meaning never (`--sql-idle-timeout`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
    /// Connection establishment timeout in seconds (`--sql-connect-timeout`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Whether statements are prepared and cached automatically (`--sql-prepare`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_prepare: Option<bool>,
    /// Named connection parameters (`--sql-var key=value`)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub named_parameters: BTreeMap<String, Value>,
}

impl PoolOptions {
    /// Whether no pool option was supplied at all.
    pub fn is_empty(&self) -> bool {
        self.max_connections.is_none()
            && self.idle_timeout_secs.is_none()
            && self.connect_timeout_secs.is_none()
            && self.auto_prepare.is_none()
            && self.named_parameters.is_empty()
    }

    /// Validates the supplied values.
    ///
    /// # Errors
    /// Returns error if `max_connections` is zero
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == Some(0) {
            return Err(PgScriptError::configuration(
                "--sql-max must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Named parameters as text pairs: strings verbatim, other JSON values
    /// rendered as JSON.
    pub fn parameter_pairs(&self) -> impl Iterator<Item = (&str, String)> + '_ {
        self.named_parameters
            .iter()
            .map(|(key, value)| (key.as_str(), parameter_text(value)))
    }

    /// Named parameters in libpq `PGOPTIONS` form (`-c key=value ...`).
    ///
    /// Returns `None` when no parameter was given.
    pub fn libpq_options(&self) -> Option<String> {
        if self.named_parameters.is_empty() {
            return None;
        }

        let options: Vec<String> = self
            .parameter_pairs()
            .map(|(key, value)| format!("-c {}={}", escape_option(key), escape_option(&value)))
            .collect();
        Some(options.join(" "))
    }
}

fn parameter_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape_option(text: &str) -> String {
    text.replace('\\', "\\\\").replace(' ', "\\ ")
}

/// Parses `key=value` entries into named parameters.
///
/// The value is everything after the first `=`. It is decoded as JSON when
/// it parses (numbers, booleans, objects...), otherwise kept as a string.
/// Later entries overwrite earlier ones with the same key.
///
/// # Errors
/// Returns error if an entry has no `=` or an empty key
pub fn parse_named_parameters<'a, I>(entries: I) -> crate::Result<BTreeMap<String, Value>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut parameters = BTreeMap::new();

    for entry in entries {
        let (key, raw_value) = entry.split_once('=').ok_or_else(|| {
            PgScriptError::configuration(format!(
                "--sql-var expects key=value, got '{}'",
                entry
            ))
        })?;

        let key = key.trim();
        if key.is_empty() {
            return Err(PgScriptError::configuration(format!(
                "--sql-var has an empty key in '{}'",
                entry
            )));
        }

        let value = serde_json::from_str(raw_value)
            .unwrap_or_else(|_| Value::String(raw_value.to_string()));
        parameters.insert(key.to_string(), value);
    }

    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_named_parameters_number_and_string() {
        let parsed = parse_named_parameters(["a=2", "b=hello"]).unwrap();

        assert_eq!(parsed.get("a"), Some(&json!(2)));
        assert_eq!(parsed.get("b"), Some(&json!("hello")));
    }

    #[test]
    fn test_named_parameters_structured_values() {
        let parsed =
            parse_named_parameters(["flag=true", r#"obj={"x":1}"#, r#"quoted="hi""#]).unwrap();

        assert_eq!(parsed.get("flag"), Some(&json!(true)));
        assert_eq!(parsed.get("obj"), Some(&json!({"x": 1})));
        assert_eq!(parsed.get("quoted"), Some(&json!("hi")));
    }

    #[test]
    fn test_named_parameters_later_entries_win() {
        let parsed = parse_named_parameters(["a=1", "a=2"]).unwrap();
        assert_eq!(parsed.get("a"), Some(&json!(2)));
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_named_parameters_value_keeps_inner_equals() {
        let parsed = parse_named_parameters(["search_path=a=b"]).unwrap();
        assert_eq!(parsed.get("search_path"), Some(&json!("a=b")));
    }

    #[test]
    fn test_named_parameters_rejects_missing_separator() {
        assert!(parse_named_parameters(["novalue"]).is_err());
        assert!(parse_named_parameters(["=1"]).is_err());
    }

    #[test]
    fn test_pool_options_validation() {
        let options = PoolOptions {
            max_connections: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        assert!(PoolOptions::default().validate().is_ok());
        assert!(PoolOptions::default().is_empty());
    }

    #[test]
    fn test_libpq_options_rendering() {
        assert_eq!(PoolOptions::default().libpq_options(), None);

        let options = PoolOptions {
            named_parameters: parse_named_parameters([
                "statement_timeout=5000",
                "application_name=nightly job",
            ])
            .unwrap(),
            ..Default::default()
        };
        assert_eq!(
            options.libpq_options().as_deref(),
            Some(r"-c application_name=nightly\ job -c statement_timeout=5000")
        );
    }

    #[test]
    fn test_parameter_pairs_render_json_as_text() {
        let options = PoolOptions {
            named_parameters: parse_named_parameters(["a=true", "b=audit"]).unwrap(),
            ..Default::default()
        };
        let pairs: Vec<(&str, String)> = options.parameter_pairs().collect();
        assert_eq!(
            pairs,
            vec![("a", "true".to_string()), ("b", "audit".to_string())]
        );
    }
}
