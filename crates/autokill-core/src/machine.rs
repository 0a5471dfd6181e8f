//! Build machines as seen by the policy: a name and an offline switch.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::severity::ResultSeverity;

/// Why a machine was taken out of service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfflineCause {
    /// Full reason text, as logged.
    pub message: String,
    /// Display name of the job that triggered the transition.
    pub job: String,
    /// Result of that job.
    pub result: ResultSeverity,
    pub at: DateTime<Utc>,
}

impl OfflineCause {
    pub fn new(message: impl Into<String>, job: impl Into<String>, result: ResultSeverity) -> Self {
        Self {
            message: message.into(),
            job: job.into(),
            result,
            at: Utc::now(),
        }
    }
}

impl fmt::Display for OfflineCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "taken offline by autokill after {} ({})", self.job, self.result)
    }
}

/// Availability of a machine. The only transition is `Online` to `Offline`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MachineState {
    Online,
    Offline { cause: OfflineCause },
}

/// The registry's handle on one machine.
pub trait Machine: Send + Sync {
    /// Registry name; `None` if the machine has no identity.
    fn name(&self) -> Option<String>;

    /// Take the machine out of service. Must tolerate repeated calls.
    fn set_offline(&self, cause: OfflineCause);

    fn is_offline(&self) -> bool;
}

/// In-memory machine handle.
#[derive(Debug)]
pub struct FleetMachine {
    name: Option<String>,
    state: Mutex<MachineState>,
    offline_requests: AtomicU32,
}

impl FleetMachine {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_name(Some(name.into()))
    }

    /// A machine the registry cannot name.
    pub fn unnamed() -> Self {
        Self::with_name(None)
    }

    fn with_name(name: Option<String>) -> Self {
        Self {
            name,
            state: Mutex::new(MachineState::Online),
            offline_requests: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> MachineState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// How many times `set_offline` was called, including no-op repeats.
    pub fn offline_requests(&self) -> u32 {
        self.offline_requests.load(Ordering::SeqCst)
    }
}

impl Machine for FleetMachine {
    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn set_offline(&self, cause: OfflineCause) {
        self.offline_requests.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // First cause wins.
        if *state == MachineState::Online {
            *state = MachineState::Offline { cause };
        }
    }

    fn is_offline(&self) -> bool {
        matches!(self.state(), MachineState::Offline { .. })
    }
}
