//! Sampler: follow one process and append its memory counters to a log
//! until the process exits or we are interrupted.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use mstat_cli::logging;
use mstat_core::{smaps, Session};
use mstat_error::MstatError;
use mstat_types::Record;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
struct Options {
    verbose: bool,
    clobber: bool,
    sample_rate: f64,
    pid: u32,
    output: Option<PathBuf>,
}

fn main() {
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let exit_code = run(std::env::args_os(), &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run<I, W, E>(args: I, out: &mut W, err: &mut E) -> i32
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let options = match parse_args(args) {
        Ok(Some(options)) => options,
        Ok(None) => {
            let _ = write_usage(out);
            return 0;
        }
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            let _ = write_usage(err);
            return 2;
        }
    };

    logging::init(options.verbose);

    match sample(&options, out) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            error.exit_code()
        }
    }
}

fn sample<W: Write>(options: &Options, out: &mut W) -> mstat_error::Result<()> {
    let interval = sample_interval(options.sample_rate)?;
    if !smaps::pid_running(options.pid) {
        return Err(MstatError::PidGone { pid: options.pid });
    }
    // Probe the rollup before touching the output path, so an unreadable
    // pid never leaves an empty log behind.
    smaps::attach(&mut Record::default(), options.pid)?;

    let path = options
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.mstat", options.pid)));
    if path.exists() {
        if options.clobber {
            std::fs::remove_file(&path)?;
            warn!(path = %path.display(), "existing log clobbered");
        } else {
            return Err(MstatError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists (use -c to overwrite)", path.display()),
            )));
        }
    }

    let mut session = Session::open(&path)?;

    let flush_requested = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(AtomicBool::new(false));
    register_signals(&flush_requested, &shutdown)?;

    writeln!(
        out,
        "PID: {}\nSamples per second: {:.2}\n(interrupt with ctrl-c...)",
        options.pid, options.sample_rate
    )?;

    let start = Instant::now();
    let mut samples = 0u64;

    while !shutdown.load(Ordering::Relaxed) {
        let mut record = Record::default();
        record.timestamp = start.elapsed().as_secs_f64();

        if let Err(error) = smaps::attach(&mut record, options.pid) {
            info!(pid = options.pid, "pid gone, sampling stopped");
            session.close()?;
            return match samples {
                // Nothing was ever sampled: the pid vanished before the
                // first read, report that as the failure it is.
                0 => Err(error),
                _ => Ok(()),
            };
        }

        session.append(&record)?;
        samples += 1;
        debug!(
            pid = record.pid,
            sample = samples,
            elapsed = record.timestamp,
            rss = record.rss,
            "sampled"
        );

        if flush_requested.swap(false, Ordering::Relaxed) {
            session.flush()?;
            info!(path = %session.path().display(), "flushed on request");
        }

        std::thread::sleep(interval);
    }

    info!(samples, "shutting down");
    session.close()
}

/// The sleep between samples. A rate can be positive yet so small that
/// its reciprocal does not fit in a `Duration`; that is a caller error,
/// not a panic.
fn sample_interval(sample_rate: f64) -> mstat_error::Result<Duration> {
    Duration::try_from_secs_f64(1.0 / sample_rate).map_err(|e| {
        MstatError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("sample rate {sample_rate} is out of range: {e}"),
        ))
    })
}

fn register_signals(
    flush_requested: &Arc<AtomicBool>,
    shutdown: &Arc<AtomicBool>,
) -> io::Result<()> {
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(flush_requested))?;
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(shutdown))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(shutdown))?;
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args<I>(args: I) -> Result<Option<Options>, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut verbose = false;
    let mut clobber = false;
    let mut sample_rate = 1.0f64;
    let mut pid: Option<u32> = None;
    let mut output: Option<PathBuf> = None;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        match arg.as_ref() {
            "-h" | "--help" => return Ok(None),
            "-v" | "--verbose" => verbose = true,
            "-c" | "--clobber" => clobber = true,
            "-s" | "--sample-rate" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing value for `-s/--sample-rate`"))?;
                let text = next.to_string_lossy();
                sample_rate = text
                    .parse()
                    .map_err(|_| format!("invalid sample rate `{text}`"))?;
                if sample_rate <= 0.0 || !sample_rate.is_finite() {
                    return Err(format!("sample rate must be positive, got `{text}`"));
                }
                if sample_interval(sample_rate).is_err() {
                    return Err(format!("sample rate `{text}` is too small"));
                }
            }
            "-o" | "--output" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing value for `-o/--output`"))?;
                output = Some(PathBuf::from(next));
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option `{other}`"));
            }
            other => {
                if pid.is_some() {
                    return Err(String::from("too many positional arguments; expected one PID"));
                }
                pid = Some(
                    other
                        .parse()
                        .map_err(|_| format!("invalid PID `{other}`"))?,
                );
            }
        }
    }

    let pid = pid.ok_or_else(|| String::from("missing PID argument"))?;
    Ok(Some(Options {
        verbose,
        clobber,
        sample_rate,
        pid,
        output,
    }))
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "usage: mstat [OPTIONS] <PID>\n\
         \x20 -h, --help             this help message\n\
         \x20 -v, --verbose          increased verbosity\n\
         \x20 -c, --clobber          overwrite the output file if it exists\n\
         \x20 -s, --sample-rate N    samples per second (default: 1.00)\n\
         \x20 -o, --output FILE      output path (default: <PID>.mstat)\n\
         \n\
         Send SIGUSR1 to flush buffered records to disk."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Options>, String> {
        let mut full = vec![OsString::from("mstat")];
        full.extend(args.iter().map(OsString::from));
        parse_args(full)
    }

    #[test]
    fn defaults() {
        let options = parse(&["1234"]).expect("parse").expect("options");
        assert_eq!(
            options,
            Options {
                verbose: false,
                clobber: false,
                sample_rate: 1.0,
                pid: 1234,
                output: None,
            }
        );
    }

    #[test]
    fn all_flags() {
        let options = parse(&["-v", "-c", "-s", "2.5", "-o", "out.mstat", "42"])
            .expect("parse")
            .expect("options");
        assert!(options.verbose);
        assert!(options.clobber);
        assert_eq!(options.sample_rate, 2.5);
        assert_eq!(options.pid, 42);
        assert_eq!(options.output, Some(PathBuf::from("out.mstat")));
    }

    #[test]
    fn help_short_circuits() {
        assert_eq!(parse(&["-h"]).expect("parse"), None);
        assert_eq!(parse(&["--help", "1234"]).expect("parse"), None);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["abc"]).is_err());
        assert!(parse(&["-s", "0", "1"]).is_err());
        assert!(parse(&["-s", "nan", "1"]).is_err());
        assert!(parse(&["-s", "1e-300", "1"]).is_err());
        assert!(parse(&["-s"]).is_err());
        assert!(parse(&["--frobnicate", "1"]).is_err());
        assert!(parse(&["1", "2"]).is_err());
    }

    #[test]
    fn run_reports_usage_errors_on_stderr() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = run(vec![OsString::from("mstat")], &mut out, &mut err);
        assert_eq!(code, 2);
        let err = String::from_utf8(err).expect("utf8");
        assert!(err.contains("missing PID"));
        assert!(err.contains("usage: mstat"));
    }

    #[test]
    fn run_fails_cleanly_for_a_pid_that_never_existed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_path = dir.path().join("gone.mstat");
        let mut out = Vec::new();
        let mut err = Vec::new();
        // Pid 0 has no procfs entry.
        let code = run(
            ["mstat", "-o", out_path.to_string_lossy().as_ref(), "0"]
                .iter()
                .map(OsString::from),
            &mut out,
            &mut err,
        );
        assert_eq!(code, MstatError::PidGone { pid: 0 }.exit_code());
        assert!(!out_path.exists(), "no log for a pid that never existed");
    }

    #[test]
    fn extreme_sample_rate_errors_instead_of_panicking() {
        // 1/1e-300 seconds does not fit in a Duration; the conversion
        // must surface as an error before any file is touched.
        assert!(sample_interval(1e-300).is_err());
        assert!(sample_interval(1.0).is_ok());

        let dir = tempfile::tempdir().expect("tempdir");
        let out_path = dir.path().join("slow.mstat");
        let options = Options {
            verbose: false,
            clobber: false,
            sample_rate: 1e-300,
            pid: std::process::id(),
            output: Some(out_path.clone()),
        };
        let err = sample(&options, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, MstatError::Io(_)));
        assert!(!out_path.exists(), "rejected rate must not create a log");
    }

    #[test]
    fn refuses_to_overwrite_without_clobber() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out_path = dir.path().join("busy.mstat");
        std::fs::write(&out_path, b"occupied").expect("seed file");

        let options = Options {
            verbose: false,
            clobber: false,
            sample_rate: 1.0,
            // Sampling our own pid keeps the pre-flight pid check happy.
            pid: std::process::id(),
            output: Some(out_path.clone()),
        };
        let err = sample(&options, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, MstatError::Io(_)));
        assert_eq!(std::fs::read(&out_path).expect("reread"), b"occupied");
    }
}
