//! Configuration for lock sets.
//!
//! Goals:
//! - One place for the knobs callers would otherwise hard-code per call site.
//! - `LockConfig::from_env()` lets operators change behaviour without a rebuild.
//!
//! Defaults:
//! - delete_on_release = false (lock files are left behind, empty and reusable)
//! - wait = true (block until every path is locked)
//! - wait_msg = None (no notice while blocked)

use std::fmt;

use crate::consts::{ENV_DELETE_ON_RELEASE, ENV_WAIT, ENV_WAIT_MSG};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockConfig {
    /// Unlink lock files (marking them stale) when a lock set is released.
    /// Env: STORELOCK_DELETE_ON_RELEASE (default false; "1|true|on|yes" => true)
    pub delete_on_release: bool,

    /// Block on contended paths instead of giving up.
    /// Env: STORELOCK_WAIT (default true)
    pub wait: bool,

    /// Notice logged once per contended path before blocking.
    /// Env: STORELOCK_WAIT_MSG (empty => none)
    pub wait_msg: Option<String>,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            delete_on_release: false,
            wait: true,
            wait_msg: None,
        }
    }
}

fn parse_flag(v: &str) -> bool {
    let s = v.trim().to_ascii_lowercase();
    s == "1" || s == "true" || s == "yes" || s == "on"
}

impl LockConfig {
    /// Load configuration from environment variables on top of the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup(ENV_DELETE_ON_RELEASE) {
            cfg.delete_on_release = parse_flag(&v);
        }

        if let Some(v) = lookup(ENV_WAIT) {
            cfg.wait = parse_flag(&v);
        }

        if let Some(v) = lookup(ENV_WAIT_MSG) {
            let s = v.trim();
            if !s.is_empty() {
                cfg.wait_msg = Some(s.to_string());
            }
        }

        cfg
    }

    // Fluent setters (builder-style) to override specific fields.

    pub fn with_delete_on_release(mut self, on: bool) -> Self {
        self.delete_on_release = on;
        self
    }

    pub fn with_wait(mut self, on: bool) -> Self {
        self.wait = on;
        self
    }

    pub fn with_wait_msg<S: Into<String>>(mut self, msg: Option<S>) -> Self {
        self.wait_msg = msg.map(Into::into);
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }
}

impl fmt::Display for LockConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LockConfig {{ delete_on_release: {}, wait: {}, wait_msg: {} }}",
            self.delete_on_release,
            self.wait,
            self.wait_msg.as_deref().unwrap_or("none"),
        )
    }
}
