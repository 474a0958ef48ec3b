//! A deterministic, in-memory [`Host`] used by the demo binary and the unit
//! tests.
//!
//! It models just enough of a managed runtime for the engine: a method
//! table with line information, threads with fixed stacks, live objects
//! with tags, event switches, the host-visible state field and the data
//! channel to the embedding application. Any host call can be made to fail
//! a given number of times with [`SimulatedHost::fail_next`].

use super::*;

/// Error code reported by injected failures.
pub const INJECTED_FAILURE_CODE: i32 = 113;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct SimObject(u64);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimClass {
  signature: Option<String>,
}

impl SimClass {
  #[must_use]
  pub fn named(signature: impl Into<String>) -> Self {
    Self {
      signature: Some(signature.into()),
    }
  }

  /// A class whose signature the host refuses to resolve.
  #[must_use]
  pub fn unresolvable() -> Self {
    Self { signature: None }
  }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SimThread {
  id: i64,
  stack: Vec<Frame>,
}

impl SimThread {
  #[must_use]
  pub fn id(&self) -> i64 {
    self.id
  }
}

#[derive(Debug)]
struct SimMethod {
  declaring_type: String,
  line_table: Option<Vec<LineEntry>>,
  name: String,
  source_file: Option<String>,
}

#[derive(Debug, Default)]
struct SimState {
  enabled_events: HashSet<HostEvent>,
  failures: HashMap<&'static str, usize>,
  messages: Vec<String>,
  methods: HashMap<MethodId, SimMethod>,
  mirrored_state: Option<TracingState>,
  next_method: u64,
  next_object: u64,
  /// Live objects and their tag, `NO_TAG` when untagged.
  objects: HashMap<SimObject, Tag>,
  rows: Vec<ReportRow>,
  sampling_interval: Option<u32>,
}

impl SimState {
  fn check(&mut self, call: &'static str) -> Result<(), HostError> {
    match self.failures.get_mut(call) {
      Some(remaining) if *remaining > 0 => {
        *remaining -= 1;
        Err(HostError::Call {
          call,
          code: INJECTED_FAILURE_CODE,
        })
      }
      _ => Ok(()),
    }
  }

  fn method(&self, method: MethodId) -> Result<&SimMethod, HostError> {
    self
      .methods
      .get(&method)
      .ok_or(HostError::InvalidHandle { kind: "method" })
  }
}

#[derive(Debug, Default)]
pub struct SimulatedHost {
  inner: Mutex<SimState>,
}

impl SimulatedHost {
  /// Create a new, untagged live object.
  pub fn allocate(&self) -> SimObject {
    let mut inner = self.lock_inner();
    inner.next_object += 1;
    let object = SimObject(inner.next_object);
    inner.objects.insert(object, NO_TAG);
    object
  }

  pub fn define_method(
    &self,
    declaring_type: &str,
    name: &str,
    source_file: Option<&str>,
    line_table: Option<Vec<LineEntry>>,
  ) -> MethodId {
    let mut inner = self.lock_inner();
    inner.next_method += 1;
    let id = MethodId(inner.next_method);
    inner.methods.insert(
      id,
      SimMethod {
        declaring_type: declaring_type.to_string(),
        line_table,
        name: name.to_string(),
        source_file: source_file.map(str::to_string),
      },
    );
    id
  }

  #[must_use]
  pub fn event_enabled(&self, event: HostEvent) -> bool {
    self.lock_inner().enabled_events.contains(&event)
  }

  /// Make the next `times` calls named `call` fail.
  pub fn fail_next(&self, call: &'static str, times: usize) {
    self.lock_inner().failures.insert(call, times);
  }

  fn lock_inner(&self) -> MutexGuard<'_, SimState> {
    match self.inner.lock() {
      Ok(guard) => guard,
      Err(err) => err.into_inner(),
    }
  }

  #[must_use]
  pub fn messages(&self) -> Vec<String> {
    self.lock_inner().messages.clone()
  }

  #[must_use]
  pub fn mirrored_state(&self) -> Option<TracingState> {
    self.lock_inner().mirrored_state
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn published_rows(&self) -> Vec<ReportRow> {
    self.lock_inner().rows.clone()
  }

  /// Garbage-collect `object`, returning its tag when it carried one. The
  /// caller forwards that tag to the free handler.
  pub fn reclaim(&self, object: SimObject) -> Option<Tag> {
    self
      .lock_inner()
      .objects
      .remove(&object)
      .filter(|tag| *tag != NO_TAG)
  }

  #[must_use]
  pub fn sampling_interval(&self) -> Option<u32> {
    self.lock_inner().sampling_interval
  }

  #[must_use]
  pub fn spawn_thread(&self, id: i64, stack: Vec<Frame>) -> SimThread {
    SimThread { id, stack }
  }

  /// Current tag of a live object.
  #[must_use]
  pub fn tag_of(&self, object: SimObject) -> Option<Tag> {
    self
      .lock_inner()
      .objects
      .get(&object)
      .copied()
      .filter(|tag| *tag != NO_TAG)
  }

  /// Number of live objects that still carry a tag.
  #[must_use]
  pub fn tagged_objects(&self) -> usize {
    self
      .lock_inner()
      .objects
      .values()
      .filter(|tag| **tag != NO_TAG)
      .count()
  }
}

impl Host for SimulatedHost {
  type Class = SimClass;
  type Object = SimObject;
  type Thread = SimThread;

  fn class_signature(&self, class: &SimClass) -> Result<String, HostError> {
    self.lock_inner().check("class_signature")?;
    class
      .signature
      .clone()
      .ok_or(HostError::InvalidHandle { kind: "class" })
  }

  fn method_declaring_type(
    &self,
    method: MethodId,
  ) -> Result<String, HostError> {
    let mut inner = self.lock_inner();
    inner.check("method_declaring_type")?;
    Ok(inner.method(method)?.declaring_type.clone())
  }

  fn method_name(&self, method: MethodId) -> Result<String, HostError> {
    let mut inner = self.lock_inner();
    inner.check("method_name")?;
    Ok(inner.method(method)?.name.clone())
  }

  fn line_number_table(
    &self,
    method: MethodId,
  ) -> Result<Vec<LineEntry>, HostError> {
    let mut inner = self.lock_inner();
    inner.check("line_number_table")?;
    inner
      .method(method)?
      .line_table
      .clone()
      .ok_or(HostError::AbsentInformation)
  }

  fn source_file(&self, method: MethodId) -> Result<Option<String>, HostError> {
    let mut inner = self.lock_inner();
    inner.check("source_file")?;
    Ok(inner.method(method)?.source_file.clone())
  }

  fn stack_trace(
    &self,
    thread: &SimThread,
    max_depth: usize,
  ) -> Result<Vec<Frame>, HostError> {
    self.lock_inner().check("stack_trace")?;
    Ok(thread.stack.iter().take(max_depth).copied().collect())
  }

  fn thread_id(&self, thread: &SimThread) -> Result<i64, HostError> {
    self.lock_inner().check("thread_id")?;
    Ok(thread.id)
  }

  fn set_tag(&self, object: &SimObject, tag: Tag) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("set_tag")?;
    let slot = inner
      .objects
      .get_mut(object)
      .ok_or(HostError::InvalidHandle { kind: "object" })?;
    *slot = tag;
    Ok(())
  }

  fn objects_with_tags(
    &self,
    tags: &[Tag],
  ) -> Result<Vec<SimObject>, HostError> {
    let mut inner = self.lock_inner();
    inner.check("objects_with_tags")?;
    let wanted = tags
      .iter()
      .copied()
      .filter(|tag| *tag != NO_TAG)
      .collect::<HashSet<_>>();
    Ok(
      inner
        .objects
        .iter()
        .filter(|(_, tag)| wanted.contains(*tag))
        .map(|(object, _)| *object)
        .collect(),
    )
  }

  fn set_event_enabled(
    &self,
    event: HostEvent,
    enabled: bool,
  ) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("set_event_enabled")?;
    if enabled {
      inner.enabled_events.insert(event);
    } else {
      inner.enabled_events.remove(&event);
    }
    Ok(())
  }

  fn set_heap_sampling_interval(&self, bytes: u32) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("set_heap_sampling_interval")?;
    inner.sampling_interval = Some(bytes);
    Ok(())
  }

  fn mirror_state(&self, state: TracingState) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("mirror_state")?;
    inner.mirrored_state = Some(state);
    Ok(())
  }

  fn publish_record(&self, row: &ReportRow) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("publish_record")?;
    inner.rows.push(row.clone());
    Ok(())
  }

  fn publish_message(&self, message: &str) -> Result<(), HostError> {
    let mut inner = self.lock_inner();
    inner.check("publish_message")?;
    inner.messages.push(message.to_string());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reclaim_yields_tag_only_for_tagged_objects() {
    let host = SimulatedHost::new();
    let tagged = host.allocate();
    let plain = host.allocate();
    host.set_tag(&tagged, 5).unwrap();

    assert_eq!(host.reclaim(tagged), Some(5));
    assert_eq!(host.reclaim(plain), None);
    assert!(host.set_tag(&tagged, 6).is_err());
  }

  #[test]
  fn injected_failures_run_out() {
    let host = SimulatedHost::new();
    host.fail_next("thread_id", 1);
    let thread = host.spawn_thread(3, Vec::new());

    assert!(matches!(
      host.thread_id(&thread),
      Err(HostError::Call { call: "thread_id", .. })
    ));
    assert_eq!(host.thread_id(&thread), Ok(3));
  }

  #[test]
  fn objects_with_tags_skips_reclaimed_objects() {
    let host = SimulatedHost::new();
    let kept = host.allocate();
    let gone = host.allocate();
    host.set_tag(&kept, 1).unwrap();
    host.set_tag(&gone, 2).unwrap();
    let _ = host.reclaim(gone);

    assert_eq!(host.objects_with_tags(&[1, 2]).unwrap(), vec![kept]);
  }
}
