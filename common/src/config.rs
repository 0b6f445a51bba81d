//! Process-wide configuration for the grading engine and its service layer.
//!
//! Values come from an optional `.env` file and the process environment. Every
//! field has a default so a bare environment still yields a usable config.

use once_cell::sync::OnceCell;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    /// Minimum number of labeled submissions before evaluation metrics are reported.
    pub evaluation_min_labeled: usize,
    /// Total penalty above which a submission is flagged.
    pub flag_penalty_threshold: f64,
    /// Total penalty above which a submission is sent for review.
    pub review_penalty_threshold: f64,
    /// Characters a student must add on top of the starter code before any credit is possible.
    pub min_code_growth: usize,
    /// Fraction of a question's points awarded for plausible but unconfirmed output.
    pub partial_credit: f64,
}

static CONFIG: OnceCell<Config> = OnceCell::new();

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: "info".into(),
            log_file: "grader.log".into(),
            log_to_stdout: false,
            evaluation_min_labeled: 10,
            flag_penalty_threshold: 30.0,
            review_penalty_threshold: 15.0,
            min_code_growth: 20,
            partial_credit: 0.5,
        }
    }
}

impl Config {
    /// Reads the environment without touching the cached instance.
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_file: env::var("LOG_FILE").unwrap_or(defaults.log_file),
            log_to_stdout: env::var("LOG_TO_STDOUT")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.log_to_stdout),
            evaluation_min_labeled: parse_or(
                "EVALUATION_MIN_LABELED",
                defaults.evaluation_min_labeled,
            ),
            flag_penalty_threshold: parse_or(
                "FLAG_PENALTY_THRESHOLD",
                defaults.flag_penalty_threshold,
            ),
            review_penalty_threshold: parse_or(
                "REVIEW_PENALTY_THRESHOLD",
                defaults.review_penalty_threshold,
            ),
            min_code_growth: parse_or("MIN_CODE_GROWTH", defaults.min_code_growth),
            partial_credit: parse_or("PARTIAL_CREDIT", defaults.partial_credit),
        }
    }

    /// Loads `env_path` (if it exists) and caches the resulting config.
    ///
    /// Later calls return the first cached value.
    pub fn init(env_path: &str) -> &'static Self {
        dotenvy::from_filename(env_path).ok();
        CONFIG.get_or_init(Config::from_env)
    }

    /// Returns the cached config, initialising it from the environment on first use.
    pub fn get() -> &'static Self {
        CONFIG.get_or_init(Config::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const KEYS: [&str; 5] = [
        "EVALUATION_MIN_LABELED",
        "FLAG_PENALTY_THRESHOLD",
        "REVIEW_PENALTY_THRESHOLD",
        "MIN_CODE_GROWTH",
        "PARTIAL_CREDIT",
    ];

    fn clear() {
        for key in KEYS {
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear();
        let cfg = Config::from_env();
        assert_eq!(cfg.evaluation_min_labeled, 10);
        assert_eq!(cfg.flag_penalty_threshold, 30.0);
        assert_eq!(cfg.review_penalty_threshold, 15.0);
        assert_eq!(cfg.min_code_growth, 20);
        assert_eq!(cfg.partial_credit, 0.5);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_bad_values() {
        clear();
        unsafe {
            env::set_var("EVALUATION_MIN_LABELED", "25");
            env::set_var("FLAG_PENALTY_THRESHOLD", "not-a-number");
        }
        let cfg = Config::from_env();
        assert_eq!(cfg.evaluation_min_labeled, 25);
        assert_eq!(cfg.flag_penalty_threshold, 30.0);
        clear();
    }

    #[test]
    #[serial]
    fn test_dotenv_file_is_loaded() {
        clear();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MIN_CODE_GROWTH=42").unwrap();
        dotenvy::from_filename(file.path()).unwrap();
        assert_eq!(Config::from_env().min_code_growth, 42);
        clear();
    }
}
