use crate::error::AppError;
use std::env;

/// Read an environment variable with dev-friendly defaults.
///
/// In production every variable without a value is a hard error; in dev
/// the provided default is used when the variable is unset.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

/// Load `.env` for local runs. No-op when the file is absent.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_default_in_dev() {
        let val = get_env("TRUST_TEST_UNSET_VAR", Some("fallback"), false).unwrap();
        assert_eq!(val, "fallback");
    }

    #[test]
    fn test_get_env_required_in_prod() {
        let err = get_env("TRUST_TEST_UNSET_VAR", Some("fallback"), true);
        assert!(err.is_err());
    }

    #[test]
    fn test_get_env_set_wins() {
        env::set_var("TRUST_TEST_SET_VAR", "value");
        let val = get_env("TRUST_TEST_SET_VAR", Some("fallback"), true).unwrap();
        assert_eq!(val, "value");
        env::remove_var("TRUST_TEST_SET_VAR");
    }
}
