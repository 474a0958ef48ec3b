//! The boundary between the tracing engine and the managed runtime it is
//! attached to.
//!
//! Object, class and thread handles are associated types so that a real
//! binding can hand out scope-bound references whose `Drop` releases the
//! underlying runtime handle at the end of the callback that produced them.
//! The engine only ever borrows these handles and never stores one past the
//! callback. Tags are the only correlation the engine keeps between an
//! object and its record, and they never own the object.

use super::*;

/// Opaque identifier of a method inside the host runtime.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct MethodId(pub u64);

/// Opaque integer correlating a live host object with its record.
///
/// The host reserves `0` to mean "untagged".
pub type Tag = u64;

/// Tag value that clears an object's tag.
pub const NO_TAG: Tag = 0;

/// A single captured stack frame: the executing method and the bytecode
/// location within it.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Frame {
  pub location: i64,
  pub method: MethodId,
}

impl Frame {
  #[must_use]
  pub fn new(method: MethodId, location: i64) -> Self {
    Self { location, method }
  }
}

/// One entry of a method's line-number table.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LineEntry {
  pub line_number: i64,
  pub start_location: i64,
}

impl LineEntry {
  #[must_use]
  pub fn new(start_location: i64, line_number: i64) -> Self {
    Self {
      line_number,
      start_location,
    }
  }
}

/// Event streams the engine switches on and off.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum HostEvent {
  ObjectFree,
  SampledObjectAlloc,
}

/// Capabilities the engine consumes from the host runtime.
pub trait Host: Send + Sync {
  type Class;
  type Object;
  type Thread;

  /// Type signature of `class`, e.g. `Ljava/lang/String;`.
  fn class_signature(&self, class: &Self::Class) -> Result<String, HostError>;

  /// Type signature of the class declaring `method`.
  fn method_declaring_type(&self, method: MethodId)
  -> Result<String, HostError>;

  fn method_name(&self, method: MethodId) -> Result<String, HostError>;

  /// Line-number table for `method`.
  ///
  /// Returns [`HostError::AbsentInformation`] when the method carries no
  /// line information.
  fn line_number_table(
    &self,
    method: MethodId,
  ) -> Result<Vec<LineEntry>, HostError>;

  /// Source file of the class declaring `method`, `None` when the class has
  /// no source attribute.
  fn source_file(&self, method: MethodId) -> Result<Option<String>, HostError>;

  /// Capture at most `max_depth` frames of `thread`, innermost first.
  fn stack_trace(
    &self,
    thread: &Self::Thread,
    max_depth: usize,
  ) -> Result<Vec<Frame>, HostError>;

  fn thread_id(&self, thread: &Self::Thread) -> Result<i64, HostError>;

  /// Associate `tag` with `object`; [`NO_TAG`] clears it.
  fn set_tag(&self, object: &Self::Object, tag: Tag) -> Result<(), HostError>;

  /// Live objects carrying any of `tags`. Objects that were already
  /// reclaimed are simply missing from the result.
  fn objects_with_tags(
    &self,
    tags: &[Tag],
  ) -> Result<Vec<Self::Object>, HostError>;

  fn set_event_enabled(
    &self,
    event: HostEvent,
    enabled: bool,
  ) -> Result<(), HostError>;

  fn set_heap_sampling_interval(&self, bytes: u32) -> Result<(), HostError>;

  /// Publish the tracing state into the host-visible field.
  fn mirror_state(&self, state: TracingState) -> Result<(), HostError>;

  /// Deliver one drained record to the embedding application.
  fn publish_record(&self, row: &ReportRow) -> Result<(), HostError>;

  /// Deliver a free-form message (the `ping` reply) to the embedding
  /// application.
  fn publish_message(&self, message: &str) -> Result<(), HostError>;
}
