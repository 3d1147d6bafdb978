use std::fmt;
use std::process::ExitCode;

use crate::error::AppError;

/// Final verdict of a run, mapped onto the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Passed,
    ThresholdsFailed,
    SetupFailed,
    /// A threshold with `abort_on_fail` stopped the run early.
    Aborted,
}

impl RunStatus {
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::SetupFailed => 2,
            RunStatus::Aborted => 98,
            RunStatus::ThresholdsFailed => 99,
        }
    }

    /// Status for a run that ended in an error, if the error has one.
    #[must_use]
    pub const fn from_error(err: &AppError) -> Option<Self> {
        if err.is_setup() {
            Some(RunStatus::SetupFailed)
        } else {
            None
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.exit_code())
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Passed => "passed",
            RunStatus::ThresholdsFailed => "thresholds failed",
            RunStatus::SetupFailed => "setup failed",
            RunStatus::Aborted => "aborted by threshold",
        };
        f.write_str(label)
    }
}
