use super::*;

impl<H: Host> Tracer<H> {
  /// Sampled-allocation callback, invoked by the host once per sampled
  /// object on the allocating thread.
  ///
  /// While `starting` with an empty store, allocations are barrier
  /// candidates: the start marker activates the session and nothing is
  /// recorded. Every other allocation is recorded and its object tagged so
  /// that its reclamation can be attributed. Host failures drop the sample.
  pub fn on_sampled_object_alloc(
    &self,
    thread: &H::Thread,
    object: &H::Object,
    class: &H::Class,
    size: i64,
  ) {
    if !self.is_live() {
      return;
    }

    let object_type = match self.host().class_signature(class) {
      Ok(signature) => signature,
      Err(error) => {
        error!(message = "Failed to resolve class of sampled object.", %error);
        return;
      }
    };

    if self.try_confirm_start(&object_type) {
      return;
    }

    let Some(mut record) = self.build_record(thread, object_type, size) else {
      return;
    };
    let tag = record.tag();

    if let Err(error) = self.host().set_tag(object, tag) {
      error!(message = "Failed to tag sampled object.", tag, %error);
      return;
    }

    let is_stop_marker =
      &*record.object_type == self.config().stop_marker.as_str();

    let flushing = {
      let mut store = self.lock_store();
      let flushing =
        is_stop_marker && self.inner.state.get() == TracingState::Stopping;
      if flushing {
        record.mark_as_stop_sentinel();
        self.inner.state.replace(TracingState::Flushing);
      }
      store.insert(record);
      flushing
    };

    if flushing {
      debug!(message = "Stop marker sampled, flushing.", tag);
      self.set_event(HostEvent::SampledObjectAlloc, false);
      self.publish_state();
    }
  }

  /// Capture provenance and issue a tag. The tag is taken before the store
  /// lock so the two locks never nest.
  fn build_record(
    &self,
    thread: &H::Thread,
    object_type: String,
    size: i64,
  ) -> Option<AllocationRecord> {
    let sites = match StackCollector::new(self.host(), self.config())
      .capture(thread)
    {
      Ok(sites) => sites,
      Err(error) => {
        error!(message = "Failed to resolve allocation stack.", %error);
        return None;
      }
    };

    let thread_id = match self.host().thread_id(thread) {
      Ok(id) => id,
      Err(error) => {
        error!(message = "Failed to read allocating thread id.", %error);
        return None;
      }
    };

    let tag = self.inner.tags.next_tag();
    Some(AllocationRecord::new(object_type, size, sites, thread_id, tag))
  }

  /// Returns whether the allocation was consumed by the start barrier.
  fn try_confirm_start(&self, object_type: &str) -> bool {
    let confirmed = {
      let store = self.lock_store();
      if !store.is_empty() || self.inner.state.get() != TracingState::Starting
      {
        return false;
      }

      let confirmed = object_type == self.config().start_marker;
      if confirmed {
        self.inner.state.replace(TracingState::Active);
      }
      confirmed
    };

    if confirmed {
      debug!(message = "Start marker sampled, tracing active.");
      self.publish_state();
    } else {
      trace!(
        message = "Discarding allocation ahead of the start marker.",
        object_type
      );
    }
    true
  }
}
