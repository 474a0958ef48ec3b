use super::*;

/// Allocation provenance resolved from one captured stack.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallSites {
  /// The innermost frame: where the object was literally constructed.
  pub allocation: FrameInfo,
  /// The first frame outside runtime infrastructure.
  pub calling: FrameInfo,
}

/// Captures a thread's stack through the host and resolves both sites of
/// an allocation.
pub struct StackCollector<'a, H: Host> {
  host: &'a H,
  max_depth: usize,
  resolver: StackResolver<'a, H>,
}

impl<'a, H: Host> StackCollector<'a, H> {
  /// Capture the stack of `thread` and resolve its allocation and calling
  /// sites.
  ///
  /// An empty stack resolves both sites to [`FrameInfo::unknown`].
  ///
  /// # Errors
  ///
  /// Returns an error if the stack cannot be captured or either site's
  /// frame cannot be resolved.
  pub fn capture(&self, thread: &H::Thread) -> Result<CallSites, HostError> {
    let frames = self.host.stack_trace(thread, self.max_depth)?;

    let Some(innermost) = frames.first() else {
      return Ok(CallSites {
        allocation: FrameInfo::unknown(),
        calling: FrameInfo::unknown(),
      });
    };

    let allocation = self.resolver.resolve_frame(innermost)?;
    let calling = match self.resolver.find_calling_frame(&frames) {
      0 => allocation.clone(),
      index => self.resolver.resolve_frame(&frames[index])?,
    };

    Ok(CallSites {
      allocation,
      calling,
    })
  }

  #[must_use]
  pub fn new(host: &'a H, config: &'a TracerConfig) -> Self {
    Self {
      host,
      max_depth: config.max_stack_depth.max(1),
      resolver: StackResolver::new(host, &config.infrastructure_prefixes),
    }
  }
}
