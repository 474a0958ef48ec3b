use super::*;

/// Everything known about one sampled object that is still being tracked.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AllocationRecord {
  pub allocation_site: FrameInfo,
  pub calling_site: FrameInfo,
  disables_sampling_on_free: bool,
  freed: bool,
  pub object_size: i64,
  pub object_type: Arc<str>,
  tag: Tag,
  pub thread_id: i64,
}

impl AllocationRecord {
  #[must_use]
  pub fn disables_sampling_on_free(&self) -> bool {
    self.disables_sampling_on_free
  }

  #[must_use]
  pub fn is_freed(&self) -> bool {
    self.freed
  }

  /// Flag the record as the stop sentinel whose reclamation completes the
  /// session.
  pub(crate) fn mark_as_stop_sentinel(&mut self) {
    self.disables_sampling_on_free = true;
  }

  /// Returns whether the flag changed.
  pub(crate) fn mark_freed(&mut self) -> bool {
    !std::mem::replace(&mut self.freed, true)
  }

  #[must_use]
  pub fn new(
    object_type: impl Into<Arc<str>>,
    object_size: i64,
    sites: CallSites,
    thread_id: i64,
    tag: Tag,
  ) -> Self {
    Self {
      allocation_site: sites.allocation,
      calling_site: sites.calling,
      disables_sampling_on_free: false,
      freed: false,
      object_size,
      object_type: object_type.into(),
      tag,
      thread_id,
    }
  }

  #[must_use]
  pub fn tag(&self) -> Tag {
    self.tag
  }
}
