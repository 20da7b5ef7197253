// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One logical remote-operation invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Operation name (e.g. `"DescribeThings"`).
    pub name: String,
    /// Operation parameters.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Command {
    /// Create a command with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter, replacing any previous value under the same key.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter.
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn params_accumulate() {
        let cmd = Command::new("foo")
            .with_param("Bucket", "b")
            .with_param("MaxKeys", 10)
            .with_param("Filter", json!({"prefix": "logs/"}))
            .with_param("Bucket", "c");
        assert_eq!(
            Value::Object(cmd.params.clone()),
            json!({"Bucket": "c", "MaxKeys": 10, "Filter": {"prefix": "logs/"}})
        );
        assert_eq!(cmd.param("MaxKeys"), Some(&json!(10)));
        assert_eq!(cmd.param("Missing"), None);
    }

    #[test]
    fn missing_params_deserialise_as_empty() {
        let cmd: Command = serde_json::from_value(json!({"name": "Ping"})).unwrap();
        assert!(cmd.params.is_empty());
        assert!(serde_json::from_value::<Command>(json!({"name": "Ping", "params": [1]})).is_err());
    }
}
