//! Tokenized command-line input and the environment snapshot.

use serde::Serialize;
use std::collections::BTreeMap;

/// Value of a single command-line flag as produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    /// Presence flag (`--begin`) or explicit boolean
    Bool(bool),
    /// Single string value (`--ssl=prefer`)
    Str(String),
    /// Repeated flag (`--sql-var a=1 --sql-var b=2`)
    List(Vec<String>),
}

impl FlagValue {
    /// Whether the flag counts as "set".
    ///
    /// Strings are truthy unless empty; lists unless empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(value) => *value,
            Self::Str(value) => !value.is_empty(),
            Self::List(values) => !values.is_empty(),
        }
    }

    /// Returns the effective string value. A repeated flag yields its last
    /// occurrence; booleans have no string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Bool(_) => None,
            Self::Str(value) => Some(value),
            Self::List(values) => values.last().map(String::as_str),
        }
    }

    /// Returns every string value carried by the flag, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Bool(_) => Vec::new(),
            Self::Str(value) => vec![value.as_str()],
            Self::List(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Positional arguments plus a flag map, before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawArguments {
    /// Positional values in command-line order
    pub positionals: Vec<String>,
    /// Flags keyed by long name without leading dashes
    pub flags: BTreeMap<String, FlagValue>,
}

impl RawArguments {
    /// Creates raw arguments from positional values with no flags.
    pub fn new(positionals: Vec<String>) -> Self {
        Self {
            positionals,
            flags: BTreeMap::new(),
        }
    }

    /// Builder method to add a flag.
    pub fn with_flag(mut self, name: impl Into<String>, value: FlagValue) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    /// Sets a flag in place, replacing any previous value.
    pub fn set_flag(&mut self, name: impl Into<String>, value: FlagValue) {
        self.flags.insert(name.into(), value);
    }

    /// Removes and returns a recognized flag.
    pub(crate) fn take_flag(&mut self, name: &str) -> Option<FlagValue> {
        self.flags.remove(name)
    }
}

/// Flags the launcher did not recognize, forwarded to the script runners.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PassthroughOptions(BTreeMap<String, FlagValue>);

impl PassthroughOptions {
    /// Returns the raw value of a forwarded flag.
    pub fn get(&self, name: &str) -> Option<&FlagValue> {
        self.0.get(name)
    }

    /// Whether a forwarded flag is present and truthy.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.0.get(name).is_some_and(FlagValue::is_truthy)
    }

    /// Returns the string value of a forwarded flag.
    pub fn string(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(FlagValue::as_str)
    }

    /// Number of forwarded flags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no flags were forwarded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, FlagValue>> for PassthroughOptions {
    fn from(flags: BTreeMap<String, FlagValue>) -> Self {
        Self(flags)
    }
}

/// Read-only snapshot of environment variables consulted during resolution.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: BTreeMap<String, String>,
}

impl Environment {
    /// Snapshots the current process environment.
    pub fn from_process() -> Self {
        std::env::vars().collect()
    }

    /// Looks up a variable. Empty values are treated as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl<K, V> FromIterator<(K, V)> for Environment
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_value_truthiness() {
        assert!(FlagValue::Bool(true).is_truthy());
        assert!(!FlagValue::Bool(false).is_truthy());
        assert!(FlagValue::Str("prefer".to_string()).is_truthy());
        assert!(!FlagValue::Str(String::new()).is_truthy());
        assert!(!FlagValue::List(Vec::new()).is_truthy());
    }

    #[test]
    fn test_repeated_flag_uses_last_value() {
        let value = FlagValue::List(vec!["5".to_string(), "7".to_string()]);
        assert_eq!(value.as_str(), Some("7"));
        assert_eq!(value.values(), vec!["5", "7"]);
    }

    #[test]
    fn test_environment_treats_empty_as_unset() {
        let env: Environment = [("PGHOST", ""), ("PGUSER", "app")].into_iter().collect();
        assert_eq!(env.get("PGHOST"), None);
        assert_eq!(env.get("PGUSER"), Some("app"));
        assert_eq!(env.get("PGPORT"), None);
    }

    #[test]
    fn test_environment_from_process() {
        temp_env::with_vars(
            [("PGSCRIPT_TEST_MARKER", Some("present"))],
            || {
                let env = Environment::from_process();
                assert_eq!(env.get("PGSCRIPT_TEST_MARKER"), Some("present"));
            },
        );
    }

    #[test]
    fn test_passthrough_accessors() {
        let mut flags = BTreeMap::new();
        flags.insert("quiet".to_string(), FlagValue::Bool(true));
        flags.insert("shell".to_string(), FlagValue::Str("zsh".to_string()));
        let options = PassthroughOptions::from(flags);

        assert!(options.is_enabled("quiet"));
        assert!(!options.is_enabled("prefix"));
        assert_eq!(options.string("shell"), Some("zsh"));
        assert_eq!(options.len(), 2);
    }
}
