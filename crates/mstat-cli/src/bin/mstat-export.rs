//! Export a log to CSV on stdout: one header row of stored field names,
//! then one row per record, in the file's own field order.

use std::ffi::OsString;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use mstat_cli::logging;
use mstat_core::Session;
use mstat_types::Record;

fn main() {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut stderr = io::stderr();
    let exit_code = run(std::env::args_os(), &mut out, &mut stderr);
    let _ = out.flush();
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
    let path = match parse_args(args) {
        Ok(Some(path)) => path,
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

    logging::init(false);

    match export(&path, out) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            error.exit_code()
        }
    }
}

fn export<W: Write>(path: &Path, out: &mut W) -> mstat_error::Result<()> {
    let mut session = Session::open(path)?;

    let header: Vec<&str> = session.schema().names().collect();
    writeln!(out, "{}", header.join(","))?;

    // The schema borrows the session, so decode into an owned clone.
    let schema = session.schema().clone();
    let mut record = Record::default();
    let mut row = String::new();
    while session.iterate(&mut record)? {
        row.clear();
        for (i, name) in schema.names().enumerate() {
            if i > 0 {
                row.push(',');
            }
            row.push_str(&record.get_by_name(name).to_string());
        }
        writeln!(out, "{row}")?;
    }
    Ok(())
}

/// `Ok(None)` means help was requested.
fn parse_args<I>(args: I) -> Result<Option<PathBuf>, String>
where
    I: IntoIterator<Item = OsString>,
{
    let mut iter = args.into_iter();
    let _argv0 = iter.next();

    let mut path: Option<PathBuf> = None;
    for argument in iter {
        let arg = argument.to_string_lossy();
        match arg.as_ref() {
            "-h" | "--help" => return Ok(None),
            other if other.starts_with('-') => {
                return Err(format!("unknown option `{other}`"));
            }
            _ => {
                if path.is_some() {
                    return Err(String::from(
                        "too many positional arguments; expected one data file",
                    ));
                }
                path = Some(PathBuf::from(argument));
            }
        }
    }

    let path = path.ok_or_else(|| String::from("missing path to data file"))?;
    Ok(Some(path))
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "usage: mstat-export <FILE>\n\
         \x20 -h, --help    this help message\n\
         \n\
         Writes the log as CSV on stdout."
    )
}
