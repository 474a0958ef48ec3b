use super::*;

impl<H: Host> Tracer<H> {
  /// Object-free callback, invoked by the host with the tag of a reclaimed
  /// object.
  ///
  /// Tags with no record (objects untagged by a report, or never sampled)
  /// are ignored. Reclaiming the stop sentinel while `flushing` completes
  /// the session.
  pub fn on_object_free(&self, tag: Tag) {
    let flushed = {
      let mut store = self.lock_store();
      let Some(record) = store.lookup_mut(tag) else {
        return;
      };

      record.mark_freed();
      let flushed = record.disables_sampling_on_free()
        && self.inner.state.get() == TracingState::Flushing;
      if flushed {
        self.inner.state.replace(TracingState::Flushed);
      }
      flushed
    };

    if flushed {
      debug!(message = "Stop sentinel reclaimed, tracing flushed.", tag);
      self.set_event(HostEvent::ObjectFree, false);
      self.publish_state();
    }
  }
}
