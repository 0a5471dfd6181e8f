//! Auto-offline policy configuration.
//!
//! [`PolicyConfig`] serves an immutable [`PolicySnapshot`] that is replaced
//! wholesale on [`PolicyConfig::reconfigure`]. Readers clone the current
//! `Arc` and never observe a half-applied update. The compiled pattern lives
//! inside the snapshot, so a new pattern always comes with a new cache.

pub mod store;

use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{PatternError, Result, StoreError};
use crate::obs;
use crate::severity::ResultSeverity;

pub use store::{ConfigStore, FsConfigStore, MemoryConfigStore};

/// Upper bound on the compiled size of a machine pattern.
pub const PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// The persisted policy record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicySettings {
    /// Master switch.
    pub enabled: bool,
    /// Regular expression searched for in machine names.
    pub pattern: Option<String>,
    /// Raw threshold name; see [`ResultSeverity::parse_lenient`].
    pub worse_than: Option<String>,
}

impl PolicySettings {
    pub fn new(enabled: bool, pattern: Option<&str>, worse_than: Option<&str>) -> Self {
        Self {
            enabled,
            pattern: pattern.map(str::to_string),
            worse_than: worse_than.map(str::to_string),
        }
        .normalized()
    }

    /// Blank patterns mean "no pattern".
    pub fn normalized(mut self) -> Self {
        if self.pattern.as_deref().is_some_and(|p| p.trim().is_empty()) {
            self.pattern = None;
        }
        self
    }

    pub fn threshold(&self) -> ResultSeverity {
        ResultSeverity::parse_lenient(self.worse_than.as_deref())
    }
}

/// Compile a machine-name pattern.
pub fn compile_pattern(pattern: &str) -> std::result::Result<Regex, PatternError> {
    RegexBuilder::new(pattern)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map_err(|source| PatternError {
            pattern: pattern.to_string(),
            source,
        })
}

/// One immutable generation of the policy.
#[derive(Debug)]
pub struct PolicySnapshot {
    settings: PolicySettings,
    compiled: OnceLock<std::result::Result<Regex, PatternError>>,
}

impl PolicySnapshot {
    /// Snapshot whose pattern is compiled on first use.
    pub fn new(settings: PolicySettings) -> Self {
        Self {
            settings: settings.normalized(),
            compiled: OnceLock::new(),
        }
    }

    fn precompiled(settings: PolicySettings, regex: Option<Regex>) -> Self {
        let snapshot = Self::new(settings);
        if let Some(regex) = regex {
            let _ = snapshot.compiled.set(Ok(regex));
        }
        snapshot
    }

    pub fn settings(&self) -> &PolicySettings {
        &self.settings
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn threshold(&self) -> ResultSeverity {
        self.settings.threshold()
    }

    /// The compiled pattern, `Ok(None)` when none is configured.
    ///
    /// Concurrent first callers may race on the cell; whichever wins, the
    /// result is the same.
    pub fn compiled_pattern(&self) -> std::result::Result<Option<&Regex>, PatternError> {
        let Some(pattern) = self.settings.pattern.as_deref() else {
            return Ok(None);
        };
        match self.compiled.get_or_init(|| compile_pattern(pattern)) {
            Ok(regex) => Ok(Some(regex)),
            Err(e) => Err(e.clone()),
        }
    }
}

/// Process-wide auto-offline policy.
pub struct PolicyConfig {
    current: RwLock<Arc<PolicySnapshot>>,
    writer: tokio::sync::Mutex<()>,
    store: Arc<dyn ConfigStore>,
}

impl PolicyConfig {
    /// Build from explicit settings without touching the store.
    pub fn new(settings: PolicySettings, store: Arc<dyn ConfigStore>) -> Self {
        Self {
            current: RwLock::new(Arc::new(PolicySnapshot::new(settings))),
            writer: tokio::sync::Mutex::new(()),
            store,
        }
    }

    /// Build from the store's persisted record; disabled when none exists.
    ///
    /// A persisted pattern is not validated here. If it fails to compile it
    /// surfaces at evaluation time instead.
    pub async fn load(store: Arc<dyn ConfigStore>) -> std::result::Result<Self, StoreError> {
        let settings = store.load().await?.unwrap_or_default();
        obs::emit_policy_loaded(&settings);
        Ok(Self::new(settings, store))
    }

    /// The current snapshot. Hold it for the duration of one decision.
    pub fn snapshot(&self) -> Arc<PolicySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn settings(&self) -> PolicySettings {
        self.snapshot().settings().clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.snapshot().is_enabled()
    }

    pub fn threshold(&self) -> ResultSeverity {
        self.snapshot().threshold()
    }

    pub fn compiled_pattern(&self) -> std::result::Result<Option<Regex>, PatternError> {
        self.snapshot().compiled_pattern().map(|r| r.cloned())
    }

    /// Replace the whole policy.
    ///
    /// The pattern is compiled before anything else happens; a bad pattern
    /// returns [`crate::AutokillError::Configuration`] and nothing changes. The
    /// new record is persisted before it becomes visible, so a store failure
    /// also leaves the running policy untouched.
    pub async fn reconfigure(
        &self,
        enabled: bool,
        pattern: Option<&str>,
        worse_than: Option<&str>,
    ) -> Result<()> {
        let _guard = self.writer.lock().await;

        let settings = PolicySettings::new(enabled, pattern, worse_than);
        let compiled = match settings.pattern.as_deref().map(compile_pattern).transpose() {
            Ok(compiled) => compiled,
            Err(e) => {
                obs::emit_reconfigure_rejected(&e);
                return Err(e.into());
            }
        };

        self.store.save(&settings).await?;

        let snapshot = Arc::new(PolicySnapshot::precompiled(settings, compiled));
        obs::emit_policy_reconfigured(snapshot.settings());
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        Ok(())
    }
}

impl std::fmt::Debug for PolicyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyConfig")
            .field("current", &self.snapshot())
            .finish_non_exhaustive()
    }
}
