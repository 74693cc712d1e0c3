use tracing::info;

use std::process::ExitCode;

use netflow_export::exporter::UdpSink;
use netflow_export::options::{self, Invocation, Options};
use netflow_export::{Capture, ExpiryPolicy, ExportError, Exporter, RecordingSystem, pipeline, resolver};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netflow_export=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let invocation = match options::parse(std::env::args()) {
        Ok(invocation) => invocation,
        Err(err) => return fail(&err),
    };

    let options = match invocation {
        Invocation::Help => {
            print!("{}", options::usage());
            return ExitCode::SUCCESS;
        }
        Invocation::Run(options) => options,
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err),
    }
}

fn run(options: &Options) -> Result<(), ExportError> {
    println!(
        "flow {} - NetFlow V5 exporter",
        env!("CARGO_PKG_VERSION")
    );
    println!("active_timer: {}", options.active_timeout);
    println!("inactive_timer: {}", options.inactive_timeout);
    println!("cache_size: {}", options.cache_entries);

    let collector = resolver::resolve_collector(&options.collector)?;
    println!("netflow_collector:port: {}:{}", collector.ip(), collector.port());

    // The socket and the capture are opened once here and closed by drop
    // on every exit path.
    let sink = UdpSink::connect(collector)?;
    let mut exporter = Exporter::new(sink);
    let mut capture = Capture::open(options.capture_path.as_deref())?;
    let mut records = RecordingSystem::new(
        options.cache_entries,
        ExpiryPolicy::new(options.active_timeout, options.inactive_timeout),
    );

    info!(collector = %collector, "starting export run");
    let report = pipeline::run(&mut capture, &mut records, &mut exporter)?;

    println!(
        "Exported {} flows in {} packets",
        report.flows, report.datagrams
    );

    Ok(())
}

fn fail(err: &ExportError) -> ExitCode {
    eprintln!("Error: {err}");
    if err.wants_usage() {
        eprint!("{}", options::usage());
    }
    ExitCode::FAILURE
}
