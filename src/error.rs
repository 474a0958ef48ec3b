use super::*;

/// Failures reported by the host runtime through the [`Host`] boundary.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum HostError {
  /// The host has no information of the requested kind (for example a
  /// class compiled without a source file attribute).
  #[error("host has no information for the request")]
  AbsentInformation,
  #[error("host call `{call}` failed with code {code}")]
  Call { call: &'static str, code: i32 },
  #[error("invalid {kind} handle")]
  InvalidHandle { kind: &'static str },
  #[error("host runtime is no longer live")]
  Dead,
}

/// Errors that can occur when writing drained rows to an output.
#[derive(Debug, Error)]
pub enum ReportError {
  #[error("i/o error during report export: {0}")]
  Io(#[from] io::Error),
  #[error("failed to encode report row as json: {0}")]
  Json(#[from] serde_json::Error),
}

/// A command code the agent does not understand.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[error("unknown agent command {0}")]
pub struct UnknownCommand(pub i64);
