use super::*;

/// Placeholder recorded when the host cannot name a frame's source file.
pub const NO_SOURCE_FILE: &str = "NO_SOURCE";

/// Line reported when a method carries no line-number table.
pub const UNKNOWN_LINE: i64 = -1;

/// Resolved provenance of a single stack frame.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FrameInfo {
  pub line: i64,
  pub method: Arc<str>,
  pub source_file: Arc<str>,
  pub type_name: Arc<str>,
}

impl FrameInfo {
  #[must_use]
  pub fn new(
    type_name: impl Into<String>,
    method: impl Into<String>,
    source_file: Option<String>,
    line: i64,
  ) -> Self {
    Self {
      line,
      method: Arc::<str>::from(method.into()),
      source_file: Arc::<str>::from(
        source_file.unwrap_or_else(|| NO_SOURCE_FILE.to_string()),
      ),
      type_name: Arc::<str>::from(type_name.into()),
    }
  }

  /// Stand-in used when the host hands back an empty stack.
  #[must_use]
  pub fn unknown() -> Self {
    Self::new("<unknown>", "<unknown>", None, UNKNOWN_LINE)
  }
}

/// Map a bytecode location to a source line using a method's line table.
///
/// Starts from the first entry and advances while the next entry begins at
/// or before `location`.
#[must_use]
pub fn line_for_location(table: &[LineEntry], location: i64) -> i64 {
  let Some((first, rest)) = table.split_first() else {
    return UNKNOWN_LINE;
  };

  let mut line = first.line_number;
  for entry in rest {
    if location < entry.start_location {
      break;
    }
    line = entry.line_number;
  }
  line
}

/// Turns raw host frames into [`FrameInfo`] and locates calling sites.
pub struct StackResolver<'a, H: Host> {
  host: &'a H,
  infrastructure_prefixes: &'a [String],
}

impl<'a, H: Host> StackResolver<'a, H> {
  /// Index of the first frame, innermost first, whose declaring type is not
  /// runtime infrastructure.
  ///
  /// Frames whose declaring type cannot be resolved are skipped. When every
  /// frame is infrastructure the innermost frame (index 0) is returned.
  #[must_use]
  pub fn find_calling_frame(&self, frames: &[Frame]) -> usize {
    for (index, frame) in frames.iter().enumerate() {
      match self.host.method_declaring_type(frame.method) {
        Ok(type_name) if !self.is_infrastructure(&type_name) => return index,
        Ok(_) => {}
        Err(error) => {
          warn!(
            message = "Failed to resolve declaring type of frame.",
            frame = index,
            %error
          );
        }
      }
    }
    0
  }

  #[must_use]
  pub fn is_infrastructure(&self, type_name: &str) -> bool {
    self
      .infrastructure_prefixes
      .iter()
      .any(|prefix| type_name.starts_with(prefix.as_str()))
  }

  #[must_use]
  pub fn new(host: &'a H, infrastructure_prefixes: &'a [String]) -> Self {
    Self {
      host,
      infrastructure_prefixes,
    }
  }

  /// Resolve the declaring type, method name, source file and line of
  /// `frame`.
  ///
  /// # Errors
  ///
  /// Returns an error if the host cannot name the declaring type or the
  /// method. Missing line tables and source files are not errors.
  pub fn resolve_frame(&self, frame: &Frame) -> Result<FrameInfo, HostError> {
    let type_name = self.host.method_declaring_type(frame.method)?;
    let method = self.host.method_name(frame.method)?;

    let line = match self.host.line_number_table(frame.method) {
      Ok(table) => line_for_location(&table, frame.location),
      Err(HostError::AbsentInformation) => UNKNOWN_LINE,
      Err(error) => {
        debug!(message = "Line number table unavailable.", %error);
        UNKNOWN_LINE
      }
    };

    let source_file = match self.host.source_file(frame.method) {
      Ok(source_file) => source_file,
      Err(HostError::AbsentInformation) => None,
      Err(error) => {
        warn!(message = "Failed to get source file name.", %error);
        None
      }
    };

    Ok(FrameInfo::new(type_name, method, source_file, line))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn prefixes() -> Vec<String> {
    TracerConfig::default().infrastructure_prefixes
  }

  #[test]
  fn line_lookup_picks_last_entry_not_past_location() {
    let table = [
      LineEntry::new(0, 10),
      LineEntry::new(4, 11),
      LineEntry::new(9, 14),
    ];
    assert_eq!(line_for_location(&table, 0), 10);
    assert_eq!(line_for_location(&table, 3), 10);
    assert_eq!(line_for_location(&table, 4), 11);
    assert_eq!(line_for_location(&table, 8), 11);
    assert_eq!(line_for_location(&table, 40), 14);
  }

  #[test]
  fn line_lookup_without_table_is_unknown() {
    assert_eq!(line_for_location(&[], 3), UNKNOWN_LINE);
  }

  #[test]
  fn resolves_frame_details() {
    let host = SimulatedHost::new();
    let method = host.define_method(
      "Lapp/Foo;",
      "<init>",
      Some("Foo.java"),
      Some(vec![LineEntry::new(0, 5), LineEntry::new(6, 7)]),
    );
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    let info = resolver.resolve_frame(&Frame::new(method, 6)).unwrap();
    assert_eq!(info.type_name.as_ref(), "Lapp/Foo;");
    assert_eq!(info.method.as_ref(), "<init>");
    assert_eq!(info.source_file.as_ref(), "Foo.java");
    assert_eq!(info.line, 7);
  }

  #[test]
  fn missing_source_and_lines_use_placeholders() {
    let host = SimulatedHost::new();
    let method = host.define_method("Lapp/Gen;", "make", None, None);
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    let info = resolver.resolve_frame(&Frame::new(method, 2)).unwrap();
    assert_eq!(info.source_file.as_ref(), NO_SOURCE_FILE);
    assert_eq!(info.line, UNKNOWN_LINE);
  }

  #[test]
  fn unresolvable_method_is_an_error() {
    let host = SimulatedHost::new();
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    let result = resolver.resolve_frame(&Frame::new(MethodId(404), 0));
    assert!(matches!(result, Err(HostError::InvalidHandle { .. })));
  }

  #[test]
  fn calling_frame_skips_infrastructure() {
    let host = SimulatedHost::new();
    let frames = [
      ("Ljava/util/ArrayList;", "grow"),
      ("Lclojure/lang/RT;", "conj"),
      ("Lapp/Service;", "handle"),
      ("Lapp/Main;", "main"),
    ]
    .into_iter()
    .map(|(owner, name)| {
      Frame::new(host.define_method(owner, name, None, None), 0)
    })
    .collect::<Vec<_>>();
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    assert_eq!(resolver.find_calling_frame(&frames), 2);
  }

  #[test]
  fn calling_frame_falls_back_to_innermost() {
    let host = SimulatedHost::new();
    let string = host.define_method("Ljava/lang/String;", "<init>", None, None);
    let misc = host.define_method("Ljdk/internal/Misc;", "run", None, None);
    let frames = vec![Frame::new(string, 0), Frame::new(misc, 0)];
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    assert_eq!(resolver.find_calling_frame(&frames), 0);
    assert_eq!(resolver.find_calling_frame(&[]), 0);
  }

  #[test]
  fn unresolvable_frames_are_skipped_in_search() {
    let host = SimulatedHost::new();
    let frames = vec![
      Frame::new(MethodId(9000), 0),
      Frame::new(host.define_method("Lapp/Worker;", "run", None, None), 0),
    ];
    let prefixes = prefixes();
    let resolver = StackResolver::new(&host, &prefixes);

    assert_eq!(resolver.find_calling_frame(&frames), 1);
  }
}
