//! Autokill Core Library
//!
//! Decides, after a job completes, whether the machine that ran it should be
//! taken out of service, and if so takes it offline with a traceable reason.
//!
//! - [`severity`]  — `ResultSeverity`, ordered best to worst
//! - [`config`]    — `PolicyConfig` snapshots, `ConfigStore` backends
//! - [`machine`]   — `Machine` handle, `OfflineCause`, `FleetMachine`
//! - [`event`]     — `CompletionEvent`, `JobListener`
//! - [`evaluator`] — `CompletionEvaluator`, `evaluate()`
//! - [`obs`]       — structured tracing events

pub mod config;
pub mod error;
pub mod evaluator;
pub mod event;
pub mod machine;
pub mod obs;
pub mod severity;
pub mod telemetry;

pub use config::{
    compile_pattern, ConfigStore, FsConfigStore, MemoryConfigStore, PolicyConfig, PolicySettings,
    PolicySnapshot,
};
pub use error::{AutokillError, PatternError, Result, StoreError, UnknownSeverity};
pub use evaluator::{evaluate, evaluate_snapshot, CompletionEvaluator, Evaluation, SkipReason};
pub use event::{CompletionEvent, JobListener, RecordingListener};
pub use machine::{FleetMachine, Machine, MachineState, OfflineCause};
pub use severity::ResultSeverity;
pub use telemetry::init_tracing;
