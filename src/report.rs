use super::*;

/// The representation of one drained record handed to the embedding
/// application. Field order is the order consumers receive them in.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct ReportRow {
  pub object_type: Arc<str>,
  pub object_size: i64,
  pub call_type: Arc<str>,
  pub call_method: Arc<str>,
  pub call_file: Arc<str>,
  pub call_line: i64,
  pub alloc_type: Arc<str>,
  pub alloc_method: Arc<str>,
  pub alloc_file: Arc<str>,
  pub alloc_line: i64,
  pub thread_id: i64,
  pub freed: bool,
}

impl From<&AllocationRecord> for ReportRow {
  fn from(record: &AllocationRecord) -> Self {
    let call = &record.calling_site;
    let alloc = &record.allocation_site;
    Self {
      object_type: Arc::clone(&record.object_type),
      object_size: record.object_size,
      call_type: Arc::clone(&call.type_name),
      call_method: Arc::clone(&call.method),
      call_file: Arc::clone(&call.source_file),
      call_line: call.line,
      alloc_type: Arc::clone(&alloc.type_name),
      alloc_method: Arc::clone(&alloc.method),
      alloc_file: Arc::clone(&alloc.source_file),
      alloc_line: alloc.line,
      thread_id: record.thread_id,
      freed: record.is_freed(),
    }
  }
}

/// Streaming interface for report consumers.
pub trait ReportWriter {
  /// # Errors
  ///
  /// Returns a `ReportError` if the row cannot be serialized or if the
  /// underlying writer fails to persist the data.
  fn write_row(&mut self, row: &ReportRow) -> Result<(), ReportError>;
}

/// JSON lines exporter that writes one JSON object per row.
pub struct JsonLinesWriter<W: Write> {
  writer: W,
}

impl<W: Write> ReportWriter for JsonLinesWriter<W> {
  fn write_row(&mut self, row: &ReportRow) -> Result<(), ReportError> {
    serde_json::to_writer(&mut self.writer, row)?;
    self.writer.write_all(b"\n")?;
    Ok(())
  }
}

impl<W: Write> JsonLinesWriter<W> {
  pub fn into_inner(self) -> W {
    self.writer
  }

  pub fn new(writer: W) -> Self {
    Self { writer }
  }
}

impl<H: Host> Tracer<H> {
  /// Drain every record to the embedding application in insertion order,
  /// then untag the objects that are still alive.
  ///
  /// The store is emptied in one step before anything is published, so
  /// samples arriving meanwhile start a fresh batch. Marker allocations are
  /// untagged but never published. A record the host refuses to accept is
  /// skipped.
  pub fn report(&self) {
    let records = self.lock_store().drain();

    if !self.is_live() {
      debug!(
        message = "Discarding records after host shutdown.",
        count = records.len()
      );
      return;
    }

    let mut published = 0_usize;
    for record in &records {
      if self.config().is_marker(&record.object_type) {
        continue;
      }
      match self.host().publish_record(&ReportRow::from(record)) {
        Ok(()) => published += 1,
        Err(error) => {
          warn!(
            message = "Failed to publish allocation record.",
            tag = record.tag(),
            %error
          );
        }
      }
    }
    debug!(
      message = "Allocation report drained.",
      published,
      total = records.len()
    );

    self.untag(&records);
  }

  fn untag(&self, records: &[AllocationRecord]) {
    if records.is_empty() {
      return;
    }

    let tags = records
      .iter()
      .map(AllocationRecord::tag)
      .collect::<Vec<_>>();

    let objects = match self.host().objects_with_tags(&tags) {
      Ok(objects) => objects,
      Err(error) => {
        warn!(message = "Failed to look up tagged objects.", %error);
        return;
      }
    };

    trace!(
      message = "Untagging live objects.",
      requested = tags.len(),
      found = objects.len()
    );
    for object in &objects {
      if let Err(error) = self.host().set_tag(object, NO_TAG) {
        warn!(message = "Failed to untag object.", %error);
      }
    }
  }
}
