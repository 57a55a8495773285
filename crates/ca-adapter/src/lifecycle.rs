//! Adapter lifecycle phases and the operations each one admits.

use core::fmt;

use crate::error::{AdapterError, AdapterResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    Initialized,
    Populated,
    Ready,
    Stepping,
    Finalized,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::Populated => "populated",
            Self::Ready => "ready",
            Self::Stepping => "stepping",
            Self::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

pub(crate) const INIT: &[Phase] = &[Phase::Uninitialized];
pub(crate) const CREATE: &[Phase] = &[Phase::Initialized, Phase::Populated];
pub(crate) const SETUP_DONE: &[Phase] = &[Phase::Initialized, Phase::Populated];
pub(crate) const QUERY: &[Phase] = &[
    Phase::Initialized,
    Phase::Populated,
    Phase::Ready,
    Phase::Stepping,
];
pub(crate) const FINALIZE: &[Phase] = &[
    Phase::Uninitialized,
    Phase::Initialized,
    Phase::Populated,
    Phase::Ready,
    Phase::Stepping,
];

#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Fail unless the current phase is one of `allowed`.
    pub fn require(&self, op: &'static str, allowed: &[Phase]) -> AdapterResult<()> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(AdapterError::Lifecycle {
                op,
                phase: self.phase,
            })
        }
    }

    pub fn enter(&mut self, phase: Phase) {
        self.phase = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_phase() {
        let mut lc = Lifecycle::default();
        assert!(lc.require("init", INIT).is_ok());
        let err = lc.require("create", CREATE).unwrap_err();
        assert_eq!(err.to_string(), "Cannot create while the adapter is uninitialized");

        lc.enter(Phase::Finalized);
        assert!(lc.require("finalize", FINALIZE).is_err());
        assert!(lc.require("get_data", QUERY).is_err());
    }
}
