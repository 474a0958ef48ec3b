//! Sampled allocation tracing for agents attached to a managed runtime.
//!
//! The host runtime reports a sampled subset of object allocations and the
//! reclamation of tagged objects. The [`Tracer`] records where each sampled
//! object was constructed and which application frame asked for it, tracks
//! whether it has been freed, and drains the records to the embedding
//! application on request. Sessions are delimited by marker allocations so
//! that start and stop line up exactly with the host's event stream.

mod command;
mod config;
mod error;
mod free;
mod host;
mod record;
mod report;
mod sampling;
mod sim;
mod stack;
mod stack_capture;
mod state;
mod store;
mod tag;
mod tracer;

use {
  nohash_hasher::BuildNoHashHasher,
  serde::Serialize,
  std::{
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
    io::{self, Write},
    sync::{
      Arc, Mutex, MutexGuard,
      atomic::{AtomicBool, AtomicI64, Ordering},
    },
  },
  thiserror::Error,
  tracing::{debug, error, trace, warn},
};

#[cfg(test)]
use std::thread;

pub use {
  command::Command,
  config::{
    DEFAULT_INFRASTRUCTURE_PREFIXES, DEFAULT_START_MARKER, DEFAULT_STOP_MARKER,
    TracerConfig,
  },
  error::{HostError, ReportError, UnknownCommand},
  host::{Frame, Host, HostEvent, LineEntry, MethodId, NO_TAG, Tag},
  record::AllocationRecord,
  report::{JsonLinesWriter, ReportRow, ReportWriter},
  sim::{INJECTED_FAILURE_CODE, SimClass, SimObject, SimThread, SimulatedHost},
  stack::{
    FrameInfo, NO_SOURCE_FILE, StackResolver, UNKNOWN_LINE, line_for_location,
  },
  stack_capture::{CallSites, StackCollector},
  state::{StateCell, TracingState},
  store::AllocationStore,
  tag::TagAllocator,
  tracer::{Tracer, TracerBuilder},
};
