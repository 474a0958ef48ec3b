/// Type signature prefixes treated as runtime infrastructure when searching
/// for the calling site of an allocation.
pub const DEFAULT_INFRASTRUCTURE_PREFIXES: &[&str] = &[
  "Ljava/",
  "Lcom/sun/",
  "Ljdk/",
  "Ljavax/",
  "Lsun/management",
  "Lclojure/",
];

pub const DEFAULT_START_MARKER: &str =
  "Lalloctrace/agent/Agent$AllocationStartMarker;";

pub const DEFAULT_STOP_MARKER: &str =
  "Lalloctrace/agent/Agent$AllocationFinishMarker;";

/// Controls how the tracer samples and attributes allocations.
#[derive(Debug, Clone)]
pub struct TracerConfig {
  /// Declaring-type prefixes skipped by the calling-site search.
  pub infrastructure_prefixes: Vec<String>,
  /// Maximum number of frames captured per sampled allocation.
  pub max_stack_depth: usize,
  /// Host heap sampling interval in bytes; `0` samples every allocation.
  pub sampling_interval: u32,
  /// Type signature of the object allocated to confirm a start request.
  pub start_marker: String,
  /// Type signature of the object allocated to delimit the end of a session.
  pub stop_marker: String,
}

impl Default for TracerConfig {
  fn default() -> Self {
    Self {
      infrastructure_prefixes: DEFAULT_INFRASTRUCTURE_PREFIXES
        .iter()
        .map(|prefix| (*prefix).to_string())
        .collect(),
      max_stack_depth: 1024,
      sampling_interval: 0,
      start_marker: DEFAULT_START_MARKER.to_string(),
      stop_marker: DEFAULT_STOP_MARKER.to_string(),
    }
  }
}

impl TracerConfig {
  /// Build a configuration from the option string passed when the agent is
  /// loaded.
  ///
  /// Only a leading decimal number is understood; it sets the heap sampling
  /// interval. Anything else leaves the defaults untouched.
  #[must_use]
  pub fn from_agent_options(options: Option<&str>) -> Self {
    let mut config = Self::default();
    if let Some(interval) = options.and_then(parse_sampling_interval) {
      config.sampling_interval = interval;
    }
    config
  }

  /// Whether `object_type` is one of the session marker signatures.
  #[must_use]
  pub fn is_marker(&self, object_type: &str) -> bool {
    object_type == self.start_marker || object_type == self.stop_marker
  }

  /// Builder-style helper to adjust the maximum stack depth.
  #[must_use]
  pub fn with_max_stack_depth(mut self, depth: usize) -> Self {
    self.max_stack_depth = depth;
    self
  }

  /// Builder-style helper to adjust the heap sampling interval.
  #[must_use]
  pub fn with_sampling_interval(mut self, bytes: u32) -> Self {
    self.sampling_interval = bytes;
    self
  }
}

fn parse_sampling_interval(options: &str) -> Option<u32> {
  let digits = options
    .bytes()
    .take_while(u8::is_ascii_digit)
    .map(|digit| u64::from(digit - b'0'));

  let mut seen = false;
  let mut value: u64 = 0;
  for digit in digits {
    seen = true;
    value = value.saturating_mul(10).saturating_add(digit);
  }

  seen.then(|| u32::try_from(value).unwrap_or(u32::MAX))
}
