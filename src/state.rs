use super::*;

/// Where a tracing session stands.
///
/// The discriminants are the values published to the host-visible state
/// field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(i64)]
pub enum TracingState {
  Passive = 0,
  /// Start requested; waiting for the start marker.
  Starting = 10,
  Active = 11,
  /// Stop requested; waiting for the stop marker.
  Stopping = 15,
  /// Stop marker sampled; waiting for it to be reclaimed.
  Flushing = 16,
  Flushed = 17,
}

impl TracingState {
  #[must_use]
  pub fn code(self) -> i64 {
    self as i64
  }

  #[must_use]
  pub fn from_code(code: i64) -> Option<Self> {
    match code {
      0 => Some(Self::Passive),
      10 => Some(Self::Starting),
      11 => Some(Self::Active),
      15 => Some(Self::Stopping),
      16 => Some(Self::Flushing),
      17 => Some(Self::Flushed),
      _ => None,
    }
  }
}

impl Display for TracingState {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::Passive => "passive",
      Self::Starting => "starting",
      Self::Active => "active",
      Self::Stopping => "stopping",
      Self::Flushing => "flushing",
      Self::Flushed => "flushed",
    };
    f.write_str(name)
  }
}

/// The authoritative copy of the tracing state.
///
/// Reads are lock-free. Transitions that depend on the record store are
/// made while the caller holds the store lock.
#[derive(Debug)]
pub struct StateCell {
  code: AtomicI64,
}

impl Default for StateCell {
  fn default() -> Self {
    Self::new(TracingState::Passive)
  }
}

impl StateCell {
  #[must_use]
  pub fn get(&self) -> TracingState {
    // Only valid codes are ever stored.
    TracingState::from_code(self.code.load(Ordering::Acquire))
      .unwrap_or(TracingState::Passive)
  }

  #[must_use]
  pub fn new(state: TracingState) -> Self {
    Self {
      code: AtomicI64::new(state.code()),
    }
  }

  /// Store `state`, returning the previous one.
  pub fn replace(&self, state: TracingState) -> TracingState {
    TracingState::from_code(self.code.swap(state.code(), Ordering::AcqRel))
      .unwrap_or(TracingState::Passive)
  }
}
