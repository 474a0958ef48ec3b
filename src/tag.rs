use super::*;

/// Issues the tags that correlate sampled objects with their records.
///
/// The counter sits behind its own lock so tag issuance never waits on the
/// record store. It is never rewound: clearing the store leaves old tags
/// meaningless rather than recycled.
#[derive(Debug)]
pub struct TagAllocator {
  next: Mutex<Tag>,
}

impl Default for TagAllocator {
  fn default() -> Self {
    Self {
      next: Mutex::new(NO_TAG + 1),
    }
  }
}

impl TagAllocator {
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  pub fn next_tag(&self) -> Tag {
    let mut next = match self.next.lock() {
      Ok(guard) => guard,
      Err(err) => err.into_inner(),
    };
    let tag = *next;
    *next = next.wrapping_add(1);
    tag
  }
}
