use super::*;

/// Commands the embedding application sends through the agent's command
/// channel. The discriminants are the wire codes.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
#[repr(i64)]
pub enum Command {
  Ping = 0,
  SyncState = 1,
  StartAllocationTracing = 10,
  StopAllocationTracing = 11,
  ReportAllocationTracing = 12,
}

impl TryFrom<i64> for Command {
  type Error = UnknownCommand;

  fn try_from(code: i64) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(Self::Ping),
      1 => Ok(Self::SyncState),
      10 => Ok(Self::StartAllocationTracing),
      11 => Ok(Self::StopAllocationTracing),
      12 => Ok(Self::ReportAllocationTracing),
      other => Err(UnknownCommand(other)),
    }
  }
}

impl<H: Host> Tracer<H> {
  /// Entry point for raw command codes arriving from the host.
  pub fn command(&self, code: i64) {
    match Command::try_from(code) {
      Ok(command) => self.dispatch(command),
      Err(error) => warn!(message = "Ignoring command.", %error),
    }
  }

  pub fn dispatch(&self, command: Command) {
    trace!(message = "Dispatching command.", ?command, state = %self.state());
    match command {
      Command::Ping => self.ping(),
      Command::SyncState => self.sync_state(),
      Command::StartAllocationTracing => self.start(),
      Command::StopAllocationTracing => self.stop(),
      Command::ReportAllocationTracing => self.report(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_wire_codes() {
    assert_eq!(Command::try_from(0_i64), Ok(Command::Ping));
    assert_eq!(Command::try_from(12_i64), Ok(Command::ReportAllocationTracing));
    assert_eq!(Command::try_from(2_i64), Err(UnknownCommand(2)));
  }

  #[test]
  fn raw_codes_drive_the_state_machine() {
    let tracer = Tracer::new(SimulatedHost::new());

    tracer.command(10);
    assert_eq!(tracer.state(), TracingState::Starting);

    tracer.command(11);
    assert_eq!(tracer.state(), TracingState::Stopping);

    tracer.command(1);
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Stopping));
  }

  #[test]
  fn unknown_codes_are_ignored() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.command(99);

    assert_eq!(tracer.state(), TracingState::Passive);
    assert!(tracer.host().messages().is_empty());
  }

  #[test]
  fn report_while_passive_publishes_nothing() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.dispatch(Command::ReportAllocationTracing);

    assert_eq!(tracer.state(), TracingState::Passive);
    assert!(tracer.host().published_rows().is_empty());
  }
}
