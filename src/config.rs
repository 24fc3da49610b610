use anyhow::{Context, bail};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::ClockPolicy;
use crate::engine::identity::FacePolicy;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,
    pub log_dir: String,

    // Rate limiting
    pub rate_verify_per_min: u32,
    pub rate_clock_per_min: u32,
    pub rate_admin_per_min: u32,

    // Face matching
    pub face_match_threshold: f64,
    pub face_ambiguity_epsilon: f64,
    pub face_vector_len: usize,
    pub face_cache_ttl_secs: u64,

    // Clock-out evaluation
    pub early_departure_margin_minutes: u32,
    pub shift_completion_ratio: f64,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} must be set", key))
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value {:?}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            rate_verify_per_min: parsed("RATE_VERIFY_PER_MIN", 120)?,
            rate_clock_per_min: parsed("RATE_CLOCK_PER_MIN", 60)?,
            rate_admin_per_min: parsed("RATE_ADMIN_PER_MIN", 600)?,

            face_match_threshold: parsed("FACE_MATCH_THRESHOLD", 0.6)?,
            face_ambiguity_epsilon: parsed("FACE_AMBIGUITY_EPSILON", 0.05)?,
            face_vector_len: parsed("FACE_VECTOR_LEN", 128)?,
            face_cache_ttl_secs: parsed("FACE_CACHE_TTL_SECS", 300)?,

            early_departure_margin_minutes: parsed("EARLY_DEPARTURE_MARGIN_MINUTES", 0)?,
            shift_completion_ratio: parsed("SHIFT_COMPLETION_RATIO", 0.9)?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.rate_verify_per_min == 0 || self.rate_clock_per_min == 0 || self.rate_admin_per_min == 0
        {
            bail!("RATE_*_PER_MIN values must be greater than zero");
        }
        if !(self.face_match_threshold > 0.0 && self.face_match_threshold.is_finite()) {
            bail!("FACE_MATCH_THRESHOLD must be a positive number");
        }
        if !(self.face_ambiguity_epsilon >= 0.0 && self.face_ambiguity_epsilon.is_finite()) {
            bail!("FACE_AMBIGUITY_EPSILON must not be negative");
        }
        if self.face_vector_len == 0 {
            bail!("FACE_VECTOR_LEN must be greater than zero");
        }
        if !(0.0..=1.0).contains(&self.shift_completion_ratio) {
            bail!("SHIFT_COMPLETION_RATIO must be between 0 and 1");
        }
        if !self.api_prefix.starts_with('/') {
            bail!("API_PREFIX must start with '/'");
        }
        Ok(())
    }

    pub fn face_policy(&self) -> FacePolicy {
        FacePolicy {
            threshold: self.face_match_threshold,
            epsilon: self.face_ambiguity_epsilon,
            dimensions: self.face_vector_len,
        }
    }

    pub fn clock_policy(&self) -> ClockPolicy {
        ClockPolicy {
            early_departure_margin_minutes: self.early_departure_margin_minutes,
            completion_ratio: self.shift_completion_ratio,
        }
    }

    pub fn face_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.face_cache_ttl_secs)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "mysql://localhost/attendance_test".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            api_prefix: "/api".to_string(),
            log_dir: "logs".to_string(),
            rate_verify_per_min: 1000,
            rate_clock_per_min: 1000,
            rate_admin_per_min: 1000,
            face_match_threshold: 0.6,
            face_ambiguity_epsilon: 0.05,
            face_vector_len: 128,
            face_cache_ttl_secs: 300,
            early_departure_margin_minutes: 0,
            shift_completion_ratio: 0.9,
        }
    }
}
