use super::*;

/// Records of every sampled object still being tracked, in arrival order,
/// with a tag index for free-event lookup.
///
/// Records are only ever removed all at once, so positions in `records`
/// stay valid for the lifetime of the index.
#[derive(Debug, Default)]
pub struct AllocationStore {
  by_tag: HashMap<Tag, usize, BuildNoHashHasher<Tag>>,
  records: Vec<AllocationRecord>,
}

impl AllocationStore {
  pub fn clear(&mut self) {
    self.records.clear();
    self.by_tag.clear();
  }

  /// Take every record out in insertion order, leaving the store empty.
  #[must_use]
  pub fn drain(&mut self) -> Vec<AllocationRecord> {
    self.by_tag.clear();
    std::mem::take(&mut self.records)
  }

  pub fn insert(&mut self, record: AllocationRecord) {
    let index = self.records.len();
    if self.by_tag.insert(record.tag(), index).is_some() {
      warn!(message = "Tag issued twice within a session.", tag = record.tag());
    }
    self.records.push(record);
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  #[must_use]
  pub fn len(&self) -> usize {
    self.records.len()
  }

  #[must_use]
  pub fn lookup(&self, tag: Tag) -> Option<&AllocationRecord> {
    let index = *self.by_tag.get(&tag)?;
    self.records.get(index)
  }

  pub fn lookup_mut(&mut self, tag: Tag) -> Option<&mut AllocationRecord> {
    let index = *self.by_tag.get(&tag)?;
    self.records.get_mut(index)
  }

  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  #[must_use]
  pub fn records(&self) -> &[AllocationRecord] {
    &self.records
  }
}
