//! Configuration for Nestbox.

use std::path::Path;

use nestbox_shared::constants::envs;
use nestbox_shared::errors::{NestboxError, NestboxResult};
use serde::{Deserialize, Serialize};

use crate::component::InitPolicy;

/// Runtime options.
///
/// Sources, lowest to highest precedence: defaults, a JSON document
/// (`from_json` / `load`), environment variables (`with_env`), then
/// whatever the caller sets afterwards.
///
/// ```json
/// { "init_policy": "strict", "allocation_budget": 4 }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NestboxOptions {
    /// What configuration mutators do before init.
    ///
    /// Default: permissive (silently discard)
    #[serde(default)]
    pub init_policy: InitPolicy,

    /// Maximum number of live heap allocations.
    ///
    /// - None: unlimited (process heap)
    /// - Some(n): the n+1-th concurrent allocation fails
    #[serde(default)]
    pub allocation_budget: Option<usize>,
}

impl NestboxOptions {
    pub fn from_json(json: &str) -> NestboxResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read options from a JSON file.
    pub fn load(path: &Path) -> NestboxResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            NestboxError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Apply `NESTBOX_INIT_POLICY` and `NESTBOX_ALLOCATION_BUDGET`.
    pub fn with_env(self) -> NestboxResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    pub fn with_vars(mut self, lookup: impl Fn(&str) -> Option<String>) -> NestboxResult<Self> {
        if let Some(value) = lookup(envs::INIT_POLICY) {
            self.init_policy = value
                .parse()
                .map_err(|e| NestboxError::Config(format!("{}: {}", envs::INIT_POLICY, e)))?;
        }

        if let Some(value) = lookup(envs::ALLOCATION_BUDGET) {
            let budget = value.trim().parse::<usize>().map_err(|e| {
                NestboxError::Config(format!(
                    "{}: '{}' is not a count: {}",
                    envs::ALLOCATION_BUDGET,
                    value,
                    e
                ))
            })?;
            self.allocation_budget = Some(budget);
        }

        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let options = NestboxOptions::default();
        assert_eq!(options.init_policy, InitPolicy::Permissive);
        assert_eq!(options.allocation_budget, None);
    }

    #[test]
    fn test_from_json_partial() {
        let options = NestboxOptions::from_json(r#"{"init_policy": "strict"}"#).unwrap();
        assert_eq!(options.init_policy, InitPolicy::Strict);
        assert_eq!(options.allocation_budget, None);

        let options = NestboxOptions::from_json("{}").unwrap();
        assert_eq!(options, NestboxOptions::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let err = NestboxOptions::from_json(r#"{"policy": "strict"}"#).unwrap_err();
        assert!(matches!(err, NestboxError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"allocation_budget": 3}}"#).unwrap();

        let options = NestboxOptions::load(file.path()).unwrap();
        assert_eq!(options.allocation_budget, Some(3));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NestboxOptions::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_vars_override() {
        let options = NestboxOptions::default()
            .with_vars(vars(&[
                (envs::INIT_POLICY, "strict"),
                (envs::ALLOCATION_BUDGET, " 2 "),
            ]))
            .unwrap();
        assert_eq!(options.init_policy, InitPolicy::Strict);
        assert_eq!(options.allocation_budget, Some(2));
    }

    #[test]
    fn test_vars_absent_keep_values() {
        let base = NestboxOptions {
            init_policy: InitPolicy::Strict,
            allocation_budget: Some(9),
        };
        let options = base.clone().with_vars(vars(&[])).unwrap();
        assert_eq!(options, base);
    }

    #[test]
    fn test_vars_invalid_values() {
        let err = NestboxOptions::default()
            .with_vars(vars(&[(envs::INIT_POLICY, "lenient")]))
            .unwrap_err();
        assert!(err.to_string().contains(envs::INIT_POLICY));

        let err = NestboxOptions::default()
            .with_vars(vars(&[(envs::ALLOCATION_BUDGET, "many")]))
            .unwrap_err();
        assert!(matches!(err, NestboxError::Config(_)));
    }
}
