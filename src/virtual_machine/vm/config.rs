use crate::warn;
use std::env;

/// Environment variable enabling per-instruction trace output.
pub const TRACE_ENV: &str = "OCTET_TRACE";
/// Environment variable holding the maximum number of executed instructions.
pub const STEP_LIMIT_ENV: &str = "OCTET_STEP_LIMIT";

/// Run configuration for the engine.
///
/// The default traces nothing and never stops a run on its own.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct VmConfig {
    /// Log each executed instruction at debug level.
    pub trace: bool,
    /// Fail with `StepLimitExceeded` after this many instructions.
    pub step_limit: Option<u64>,
}

impl VmConfig {
    /// Reads `OCTET_TRACE` and `OCTET_STEP_LIMIT`.
    ///
    /// Malformed values are reported as warnings and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(TRACE_ENV) {
            match parse_flag(&raw) {
                Some(trace) => config.trace = trace,
                None => warn!("Ignoring {TRACE_ENV}={raw}: expected 1, 0, true or false"),
            }
        }

        if let Some(raw) = lookup(STEP_LIMIT_ENV) {
            match parse_step_limit(&raw) {
                Some(limit) => config.step_limit = Some(limit),
                None => warn!("Ignoring {STEP_LIMIT_ENV}={raw}: expected a positive integer"),
            }
        }

        config
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" => Some(true),
        "0" | "false" | "" => Some(false),
        _ => None,
    }
}

/// Parses a positive instruction count.
pub fn parse_step_limit(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> VmConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        VmConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn default_is_untraced_and_unlimited() {
        assert_eq!(config_from(&[]), VmConfig::default());
        assert!(!VmConfig::default().trace);
        assert_eq!(VmConfig::default().step_limit, None);
    }

    #[test]
    fn reads_both_variables() {
        let config = config_from(&[(TRACE_ENV, "true"), (STEP_LIMIT_ENV, "500")]);
        assert!(config.trace);
        assert_eq!(config.step_limit, Some(500));
    }

    #[test]
    fn malformed_values_are_ignored() {
        let config = config_from(&[(TRACE_ENV, "loud"), (STEP_LIMIT_ENV, "-3")]);
        assert_eq!(config, VmConfig::default());
        assert_eq!(parse_step_limit("0"), None);
        assert_eq!(parse_step_limit(" 12 "), Some(12));
    }
}
