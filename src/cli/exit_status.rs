use std::process::ExitCode;

/// Exit status for the CLI, following common conventions for sync tools.
///
/// - `Success` (0): the job ran and every file is up to date.
/// - `Failure` (1): the job ran but raised warnings (malformed TS blocks,
///   dropped strings, etc. — spec §7).
/// - `Error` (2): the job failed outright (configuration error, I/O error).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}
