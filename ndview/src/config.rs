/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Configuration for ndview.
//!
//! Settings are read once from environment variables into a global
//! [`Config`], which tests can temporarily override through
//! [`global::lock`].

use std::env;

use serde::Deserialize;
use serde::Serialize;

/// Environment variable overriding [`Config::max_ndim`].
pub const MAX_NDIM_ENV: &str = "NDVIEW_MAX_NDIM";

/// Process-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Most dimensions a descriptor may have. Defaults to 64, the
    /// buffer protocol's limit.
    pub max_ndim: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { max_ndim: 64 }
    }
}

/// Load configuration from environment variables
pub fn from_env() -> Config {
    from_lookup(|key| env::var(key).ok())
}

/// Load configuration through `lookup`, which maps variable names to
/// values. Unparsable values are ignored.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Config {
    let mut config = Config::default();

    if let Some(val) = lookup(MAX_NDIM_ENV) {
        match val.parse::<usize>() {
            Ok(parsed) => config.max_ndim = parsed,
            Err(err) => tracing::warn!("ignoring {}={:?}: {}", MAX_NDIM_ENV, val, err),
        }
    }

    config
}

/// Global configuration functions
pub mod global {
    use std::sync::Arc;
    use std::sync::LazyLock;
    use std::sync::Mutex;
    use std::sync::MutexGuard;
    use std::sync::PoisonError;
    use std::sync::RwLock;

    use super::*;

    /// Global configuration instance, initialized from environment variables.
    static CONFIG: LazyLock<Arc<RwLock<Config>>> =
        LazyLock::new(|| Arc::new(RwLock::new(from_env())));

    // Serializes tests that modify the global configuration.
    static LOCK: Mutex<()> = Mutex::new(());

    /// Get the global configuration.
    pub fn get() -> Config {
        *CONFIG.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the global configuration to defaults (for testing only)
    pub fn reset_to_defaults() {
        set(Config::default());
    }

    fn set(config: Config) {
        *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Acquire the global configuration lock for testing.
    pub fn lock() -> ConfigLock {
        ConfigLock {
            _guard: LOCK.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Exclusive access to the global configuration.
    pub struct ConfigLock {
        _guard: MutexGuard<'static, ()>,
    }

    impl ConfigLock {
        /// Replace the global configuration until the returned guard
        /// is dropped.
        pub fn override_config(&self, config: Config) -> ConfigOverride<'_> {
            let previous = get();
            set(config);
            ConfigOverride {
                previous,
                _lock: self,
            }
        }
    }

    /// Restores the previous configuration on drop.
    pub struct ConfigOverride<'a> {
        previous: Config,
        _lock: &'a ConfigLock,
    }

    impl Drop for ConfigOverride<'_> {
        fn drop(&mut self) {
            set(self.previous);
        }
    }
}
