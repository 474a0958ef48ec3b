use super::*;

/// Thin builder that customizes `TracerConfig` before attaching to a host.
pub struct TracerBuilder<H: Host> {
  config: TracerConfig,
  host: H,
}

impl<H: Host> TracerBuilder<H> {
  #[must_use]
  pub fn finish(self) -> Tracer<H> {
    Tracer::with_config(self.host, self.config)
  }

  #[must_use]
  pub fn infrastructure_prefixes<I, S>(mut self, prefixes: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.config.infrastructure_prefixes =
      prefixes.into_iter().map(Into::into).collect();
    self
  }

  #[must_use]
  pub fn markers(
    mut self,
    start: impl Into<String>,
    stop: impl Into<String>,
  ) -> Self {
    self.config.start_marker = start.into();
    self.config.stop_marker = stop.into();
    self
  }

  #[must_use]
  pub fn max_stack_depth(mut self, depth: usize) -> Self {
    self.config.max_stack_depth = depth;
    self
  }

  #[must_use]
  pub fn new(host: H) -> Self {
    Self {
      config: TracerConfig::default(),
      host,
    }
  }

  #[must_use]
  pub fn sampling_interval(mut self, bytes: u32) -> Self {
    self.config.sampling_interval = bytes;
    self
  }

  #[must_use]
  pub fn with_config(mut self, config: TracerConfig) -> Self {
    self.config = config;
    self
  }
}

pub(crate) struct TracerInner<H: Host> {
  pub(crate) config: TracerConfig,
  live: AtomicBool,
  pub(crate) host: H,
  mirror: Mutex<()>,
  pub(crate) state: StateCell,
  store: Mutex<AllocationStore>,
  pub(crate) tags: TagAllocator,
}

/// The engine context shared by every host callback.
///
/// One tracer is created when the agent attaches and lives until the host
/// reports its shutdown. Cloning is cheap and every clone observes the same
/// session.
pub struct Tracer<H: Host> {
  pub(crate) inner: Arc<TracerInner<H>>,
}

impl<H: Host> Clone for Tracer<H> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<H: Host> fmt::Debug for Tracer<H> {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Tracer")
      .field("config", &self.inner.config)
      .field("live", &self.is_live())
      .field("state", &self.state())
      .finish_non_exhaustive()
  }
}

impl<H: Host> Tracer<H> {
  /// Attach to `host` using the option string the agent was loaded with.
  ///
  /// Applies the heap sampling interval and publishes the initial
  /// `passive` state.
  #[must_use]
  pub fn attach(host: H, options: Option<&str>) -> Self {
    let tracer =
      Self::with_config(host, TracerConfig::from_agent_options(options));
    tracer.apply_sampling_interval();
    tracer.sync_state();
    debug!(
      message = "Allocation tracer attached.",
      sampling_interval = tracer.config().sampling_interval
    );
    tracer
  }

  fn apply_sampling_interval(&self) {
    let interval = self.config().sampling_interval;
    if let Err(error) = self.host().set_heap_sampling_interval(interval) {
      warn!(
        message = "Failed to set heap sampling interval.",
        interval,
        %error
      );
    }
  }

  #[must_use]
  pub fn builder(host: H) -> TracerBuilder<H> {
    TracerBuilder::new(host)
  }

  #[must_use]
  pub fn config(&self) -> &TracerConfig {
    &self.inner.config
  }

  #[must_use]
  pub fn host(&self) -> &H {
    &self.inner.host
  }

  /// Whether the host runtime is still alive.
  #[must_use]
  pub fn is_live(&self) -> bool {
    self.inner.live.load(Ordering::Acquire)
  }

  pub(crate) fn lock_store(&self) -> MutexGuard<'_, AllocationStore> {
    match self.inner.store.lock() {
      Ok(guard) => guard,
      Err(err) => err.into_inner(),
    }
  }

  #[must_use]
  pub fn new(host: H) -> Self {
    Self::with_config(host, TracerConfig::default())
  }

  /// Host shutdown notification.
  ///
  /// Every later callback is ignored and a later report discards records
  /// without calling back into the runtime.
  pub fn on_vm_death(&self) {
    self.inner.live.store(false, Ordering::Release);
    debug!(message = "Host runtime shut down.", pending = self.pending());
  }

  /// Number of records currently held.
  #[must_use]
  pub fn pending(&self) -> usize {
    self.lock_store().len()
  }

  /// Reply to a liveness probe from the embedding application.
  pub fn ping(&self) {
    if !self.is_live() {
      return;
    }
    if let Err(error) = self.host().publish_message("Alive") {
      warn!(message = "Failed to answer ping.", %error);
    }
  }

  /// Best-effort publication of the current state into the host-visible
  /// field.
  ///
  /// The state is read under the mirror lock, so the last write to reach
  /// the host always carries the latest transition.
  pub(crate) fn publish_state(&self) {
    if !self.is_live() {
      return;
    }
    let _mirror = match self.inner.mirror.lock() {
      Ok(guard) => guard,
      Err(err) => err.into_inner(),
    };
    let state = self.state();
    if let Err(error) = self.host().mirror_state(state) {
      warn!(message = "Failed to mirror tracing state.", %state, %error);
    }
  }

  /// Copy of every record currently held, in insertion order.
  #[must_use]
  pub fn records(&self) -> Vec<AllocationRecord> {
    self.lock_store().records().to_vec()
  }

  pub(crate) fn set_event(&self, event: HostEvent, enabled: bool) {
    if !self.is_live() {
      return;
    }
    if let Err(error) = self.host().set_event_enabled(event, enabled) {
      error!(
        message = "Failed to change event notification mode.",
        ?event,
        enabled,
        %error
      );
    }
  }

  /// Begin a session: reset the store, move to `starting` and switch on
  /// both event streams. Sampling becomes `active` once the start marker is
  /// observed.
  pub fn start(&self) {
    if !self.is_live() {
      return;
    }

    let previous = {
      let mut store = self.lock_store();
      store.clear();
      self.inner.state.replace(TracingState::Starting)
    };
    if !matches!(previous, TracingState::Passive | TracingState::Flushed) {
      debug!(message = "Restarting allocation tracing.", %previous);
    }
    self.publish_state();

    self.apply_sampling_interval();
    self.set_event(HostEvent::SampledObjectAlloc, true);
    self.set_event(HostEvent::ObjectFree, true);
  }

  #[must_use]
  pub fn state(&self) -> TracingState {
    self.inner.state.get()
  }

  /// Request the end of a session. Sampling continues until the stop marker
  /// is observed.
  pub fn stop(&self) {
    if !self.is_live() {
      return;
    }

    let previous = {
      let _store = self.lock_store();
      self.inner.state.replace(TracingState::Stopping)
    };
    if previous != TracingState::Active {
      debug!(message = "Stop requested outside an active session.", %previous);
    }
    self.publish_state();
  }

  /// Re-publish the current state, e.g. after a transition made from a
  /// context where the host field could not be written.
  pub fn sync_state(&self) {
    self.publish_state();
  }

  #[must_use]
  pub fn with_config(host: H, config: TracerConfig) -> Self {
    let inner = TracerInner {
      config,
      live: AtomicBool::new(true),
      host,
      mirror: Mutex::new(()),
      state: StateCell::default(),
      store: Mutex::new(AllocationStore::new()),
      tags: TagAllocator::new(),
    };

    Self {
      inner: Arc::new(inner),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn attach_applies_options_and_publishes_passive() {
    let tracer = Tracer::attach(SimulatedHost::new(), Some("2048"));

    assert_eq!(tracer.config().sampling_interval, 2048);
    assert_eq!(tracer.host().sampling_interval(), Some(2048));
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Passive));
    assert_eq!(tracer.state(), TracingState::Passive);
  }

  #[test]
  fn start_enables_events_and_waits_for_marker() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.start();

    assert_eq!(tracer.state(), TracingState::Starting);
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Starting));
    assert!(tracer.host().event_enabled(HostEvent::SampledObjectAlloc));
    assert!(tracer.host().event_enabled(HostEvent::ObjectFree));
    assert_eq!(tracer.host().sampling_interval(), Some(0));
  }

  #[test]
  fn stop_moves_to_stopping() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.start();
    tracer.stop();

    assert_eq!(tracer.state(), TracingState::Stopping);
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Stopping));
  }

  #[test]
  fn mirror_failure_still_updates_local_state() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.host().fail_next("mirror_state", 1);
    tracer.start();

    assert_eq!(tracer.state(), TracingState::Starting);
    assert_eq!(tracer.host().mirrored_state(), None);

    tracer.sync_state();
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Starting));
  }

  #[test]
  fn ping_replies_with_liveness_token() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.ping();
    assert_eq!(tracer.host().messages(), vec!["Alive".to_string()]);
  }

  #[test]
  fn builder_overrides_configuration() {
    let tracer = Tracer::builder(SimulatedHost::new())
      .max_stack_depth(8)
      .sampling_interval(64)
      .infrastructure_prefixes(["Lframework/"])
      .markers("Lapp/Begin;", "Lapp/End;")
      .finish();

    let config = tracer.config();
    assert_eq!(config.max_stack_depth, 8);
    assert_eq!(config.sampling_interval, 64);
    assert_eq!(config.infrastructure_prefixes, vec!["Lframework/"]);
    assert_eq!(config.start_marker, "Lapp/Begin;");
    assert_eq!(config.stop_marker, "Lapp/End;");
  }

  #[test]
  fn dead_host_receives_no_calls() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.on_vm_death();
    tracer.start();
    tracer.stop();
    tracer.ping();

    assert!(!tracer.is_live());
    assert_eq!(tracer.state(), TracingState::Passive);
    assert!(tracer.host().messages().is_empty());
    assert!(!tracer.host().event_enabled(HostEvent::SampledObjectAlloc));
  }

  #[test]
  fn full_session_reaches_flushed_and_drains() {
    let host = SimulatedHost::new();
    let method = host.define_method(
      "Lapp/Main;",
      "main",
      Some("Main.java"),
      Some(vec![LineEntry::new(0, 3)]),
    );
    let thread = host.spawn_thread(5, vec![Frame::new(method, 0)]);
    let tracer = Tracer::attach(host, Some("1024"));
    let allocate = |signature: &str| {
      let object = tracer.host().allocate();
      tracer.on_sampled_object_alloc(
        &thread,
        &object,
        &SimClass::named(signature),
        48,
      );
      object
    };

    tracer.start();
    allocate(tracer.config().start_marker.as_str());
    assert_eq!(tracer.state(), TracingState::Active);

    let kept = allocate("Lapp/Kept;");
    let dropped = allocate("Lapp/Dropped;");
    let tag = tracer.host().reclaim(dropped).unwrap();
    tracer.on_object_free(tag);

    tracer.stop();
    let sentinel = allocate(tracer.config().stop_marker.as_str());
    let tag = tracer.host().reclaim(sentinel).unwrap();
    tracer.on_object_free(tag);
    assert_eq!(tracer.state(), TracingState::Flushed);

    tracer.report();

    let rows = tracer.host().published_rows();
    let summary = rows
      .iter()
      .map(|row| (row.object_type.as_ref(), row.freed))
      .collect::<Vec<_>>();
    assert_eq!(summary, vec![("Lapp/Kept;", false), ("Lapp/Dropped;", true)]);
    assert_eq!(tracer.host().sampling_interval(), Some(1024));
    assert_eq!(tracer.host().tag_of(kept), None);
    assert_eq!(tracer.pending(), 0);
  }

  #[test]
  fn stop_before_start_marker_wins() {
    let host = SimulatedHost::new();
    let method = host.define_method("Lapp/Main;", "main", None, None);
    let thread = host.spawn_thread(1, vec![Frame::new(method, 0)]);
    let tracer = Tracer::new(host);

    tracer.start();
    tracer.stop();
    let marker = tracer.host().allocate();
    tracer.on_sampled_object_alloc(
      &thread,
      &marker,
      &SimClass::named(tracer.config().start_marker.as_str()),
      0,
    );

    assert_eq!(tracer.state(), TracingState::Stopping);
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Stopping));
  }

  #[test]
  fn mirror_carries_latest_state() {
    let tracer = Tracer::new(SimulatedHost::new());
    tracer.inner.state.replace(TracingState::Flushing);
    tracer.inner.state.replace(TracingState::Flushed);

    tracer.publish_state();
    assert_eq!(tracer.host().mirrored_state(), Some(TracingState::Flushed));
  }
}
