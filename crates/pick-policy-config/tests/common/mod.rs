// crates/pick-policy-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for pick-policy-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::path::PathBuf;

use pick_policy_config::ConfigError;
use pick_policy_config::PickPolicyConfig;
use tempfile::TempDir;

/// Result type used by config tests.
pub type TestResult = Result<(), String>;

/// Parses a TOML string into a `PickPolicyConfig` without validation.
pub fn config_from_toml(toml_str: &str) -> Result<PickPolicyConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Returns a minimal config with all defaults applied.
pub fn minimal_config() -> Result<PickPolicyConfig, toml::de::Error> {
    config_from_toml("")
}

/// Writes `content` to a config file inside `dir` and returns its path.
pub fn write_config(dir: &TempDir, content: &[u8]) -> Result<PathBuf, String> {
    let path = dir.path().join("pick-policy.toml");
    std::fs::write(&path, content).map_err(|err| err.to_string())?;
    Ok(path)
}

/// Asserts that `result` is an invalid-config error mentioning `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}
