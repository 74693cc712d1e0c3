//! Command-line options for the `flow` binary.
//!
//! The surface is deliberately small: five short flags plus `-h`. Every
//! flag may appear at most once, numeric flags are range-checked, and
//! each failure mode maps to its own error kind so the binary can decide
//! whether to re-print the usage text.

use clap::{Arg, ArgAction, ArgMatches, Command};

use std::ffi::OsString;

use crate::ExportError;

pub const ACTIVE_TIMEOUT_MIN: u64 = 60;
pub const ACTIVE_TIMEOUT_MAX: u64 = 3600;
pub const INACTIVE_TIMEOUT_MIN: u64 = 10;
pub const INACTIVE_TIMEOUT_MAX: u64 = 600;
pub const ENTRIES_NUMBER_MIN: u64 = 1024;
pub const ENTRIES_NUMBER_MAX: u64 = 524288;

pub const DEFAULT_COLLECTOR: &str = "127.0.0.1:2055";

/// A validated exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Capture file; `None` or `Some("-")` mean stdin.
    pub capture_path: Option<String>,
    /// Collector `host[:port]`, resolved later.
    pub collector: String,
    pub active_timeout: u64,
    pub inactive_timeout: u64,
    pub cache_entries: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capture_path: None,
            collector: DEFAULT_COLLECTOR.to_string(),
            active_timeout: ACTIVE_TIMEOUT_MIN,
            inactive_timeout: INACTIVE_TIMEOUT_MIN,
            cache_entries: ENTRIES_NUMBER_MIN as usize,
        }
    }
}

/// Outcome of argument parsing: run the exporter, or just print usage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Run(Options),
    Help,
}

fn command() -> Command {
    Command::new("flow")
        .about("Offline NetFlow V5 exporter")
        .disable_help_flag(true)
        .arg(
            Arg::new("file")
                .short('f')
                .value_name("FILE")
                .help("pcap capture to analyze, - for stdin [default: stdin]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("collector")
                .short('c')
                .value_name("HOST[:PORT]")
                .help("NetFlow collector address [default: 127.0.0.1:2055]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("active")
                .short('a')
                .value_name("SECONDS")
                .help("active timeout, 60-3600 seconds [default: 60]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("inactive")
                .short('i')
                .value_name("SECONDS")
                .help("inactive timeout, 10-600 seconds [default: 10]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("entries")
                .short('m')
                .value_name("COUNT")
                .help("flow-cache size, 1024-524288 entries [default: 1024]")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("help")
                .short('h')
                .help("print this usage text")
                .action(ArgAction::Count),
        )
}

/// Usage text, printed for `-h` and after option errors.
pub fn usage() -> String {
    command().render_help().to_string()
}

/// Parse a full argv (program name included).
pub fn parse<I, T>(args: I) -> Result<Invocation, ExportError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command()
        .try_get_matches_from(args)
        .map_err(|_| ExportError::InvalidOption)?;

    if matches.get_count("help") > 0 {
        return Ok(Invocation::Help);
    }

    let defaults = Options::default();

    let capture_path = single(&matches, "file")?;
    let collector = single(&matches, "collector")?.unwrap_or(defaults.collector);

    let active_timeout = match single(&matches, "active")? {
        Some(text) => range_checked(&text, ACTIVE_TIMEOUT_MIN, ACTIVE_TIMEOUT_MAX)
            .ok_or(ExportError::ActiveRange)?,
        None => defaults.active_timeout,
    };
    let inactive_timeout = match single(&matches, "inactive")? {
        Some(text) => range_checked(&text, INACTIVE_TIMEOUT_MIN, INACTIVE_TIMEOUT_MAX)
            .ok_or(ExportError::InactiveRange)?,
        None => defaults.inactive_timeout,
    };
    let cache_entries = match single(&matches, "entries")? {
        Some(text) => range_checked(&text, ENTRIES_NUMBER_MIN, ENTRIES_NUMBER_MAX)
            .ok_or(ExportError::EntriesNumber)? as usize,
        None => defaults.cache_entries,
    };

    Ok(Invocation::Run(Options {
        capture_path,
        collector,
        active_timeout,
        inactive_timeout,
        cache_entries,
    }))
}

/// Extract a flag's value, rejecting repeated occurrences.
fn single(matches: &ArgMatches, id: &str) -> Result<Option<String>, ExportError> {
    let mut values = matches.get_many::<String>(id).into_iter().flatten();
    let first = values.next().cloned();
    if values.next().is_some() {
        return Err(ExportError::MultipleOption);
    }
    Ok(first)
}

/// Decimal parse with range check. A non-numeric string parses to 0 and
/// so fails every range.
fn range_checked(text: &str, min: u64, max: u64) -> Option<u64> {
    let value = if text.bytes().all(|b| b.is_ascii_digit()) {
        text.parse::<u64>().unwrap_or(0)
    } else {
        0
    };
    (min..=max).contains(&value).then_some(value)
}
