//! Application service layer for the co-simulation adapters.
//!
//! Provides the adapter registry and scripted session replay used by the CLI.

pub mod error;
pub mod registry;
pub mod session;

pub use error::{AppError, AppResult};
pub use registry::{ADAPTERS, AdapterInfo, adapter_schema, build_adapter, list_adapters};
pub use session::{
    CreateCall, SessionReport, SessionScript, StepCall, StepRecord, load_script, run_session,
    run_session_with, validate_script,
};
