use {
  alloctrace::{
    Command, Frame, JsonLinesWriter, LineEntry, ReportError, ReportWriter,
    SimClass, SimThread, SimulatedHost, Tracer,
  },
  clap::Parser,
  std::{io, thread},
  tracing::info,
  tracing_subscriber::EnvFilter,
};

/// Run one complete allocation tracing session against a simulated runtime
/// and print the drained records as JSON lines.
#[derive(Debug, Parser)]
struct Cli {
  /// Agent option string; a leading number sets the sampling interval.
  #[arg(long)]
  options: Option<String>,
  /// Number of application threads allocating during the session.
  #[arg(long, default_value_t = 2)]
  threads: i64,
  /// Sampled allocations per thread.
  #[arg(long, default_value_t = 3)]
  allocations: usize,
}

fn main() -> Result<(), ReportError> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let host = SimulatedHost::new();
  let ctor = host.define_method(
    "Ljava/lang/Object;",
    "<init>",
    Some("Object.java"),
    Some(vec![LineEntry::new(0, 44)]),
  );
  let conj = host.define_method("Lclojure/lang/RT;", "conj", None, None);
  let handler = host.define_method(
    "Lshop/Orders;",
    "place",
    Some("Orders.java"),
    Some(vec![LineEntry::new(0, 17), LineEntry::new(6, 19)]),
  );
  let stack = vec![
    Frame::new(ctor, 0),
    Frame::new(conj, 3),
    Frame::new(handler, 8),
  ];

  let control = host.spawn_thread(1, stack.clone());
  let workers = (0..cli.threads)
    .map(|index| host.spawn_thread(index + 2, stack.clone()))
    .collect::<Vec<SimThread>>();

  let tracer = Tracer::attach(host, cli.options.as_deref());
  let marker = |signature: &str| {
    let object = tracer.host().allocate();
    tracer.on_sampled_object_alloc(
      &control,
      &object,
      &SimClass::named(signature),
      0,
    );
    object
  };

  tracer.dispatch(Command::StartAllocationTracing);
  marker(tracer.config().start_marker.as_str());

  thread::scope(|scope| {
    for worker in &workers {
      let tracer = &tracer;
      let allocations = cli.allocations;
      scope.spawn(move || {
        for index in 0..allocations {
          let object = tracer.host().allocate();
          tracer.on_sampled_object_alloc(
            worker,
            &object,
            &SimClass::named("Lshop/Order;"),
            24,
          );
          // Every other order is collected before the session ends.
          if index % 2 == 1 {
            if let Some(tag) = tracer.host().reclaim(object) {
              tracer.on_object_free(tag);
            }
          }
        }
      });
    }
  });

  tracer.dispatch(Command::StopAllocationTracing);
  let sentinel = marker(tracer.config().stop_marker.as_str());
  if let Some(tag) = tracer.host().reclaim(sentinel) {
    tracer.on_object_free(tag);
  }

  info!(message = "Session finished.", state = %tracer.state());
  tracer.dispatch(Command::ReportAllocationTracing);

  let mut writer = JsonLinesWriter::new(io::stdout().lock());
  for row in tracer.host().published_rows() {
    writer.write_row(&row)?;
  }

  Ok(())
}
