//! Render memory metrics from a log as a gnuplot line chart: elapsed
//! hours on the x axis, MiB on the y axis, one line per requested field.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mstat_cli::gnuplot::{self, Gnuplot, PlotConfig, Series};
use mstat_cli::logging;
use mstat_core::Session;
use mstat_error::MstatError;
use mstat_types::{FieldId, Record};

const DEFAULT_FIELDS: [&str; 3] = ["rss", "pss", "swap"];
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Options {
    verbose: bool,
    list: bool,
    fields: Vec<String>,
    filename: Option<PathBuf>,
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

    if options.list {
        let _ = list_fields(out);
        return 0;
    }

    logging::init(options.verbose);

    let Some(filename) = options.filename else {
        let _ = writeln!(err, "error: missing path to data file");
        let _ = write_usage(err);
        return 2;
    };

    match plot(&filename, &options.fields, out) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(err, "error: {error}");
            error.exit_code()
        }
    }
}

/// The loaded axes: shared x plus one y series per requested field.
#[derive(Debug)]
struct Axes {
    x: Vec<f64>,
    series: Vec<Series>,
}

fn load_axes(path: &Path, fields: &[String]) -> mstat_error::Result<Axes> {
    let mut session = Session::open(path)?;

    for field in fields {
        if !session.schema().contains(field) {
            return Err(MstatError::unknown_field(field));
        }
    }

    // The format stores no record count; size the axes with one scan,
    // then fill them with a second.
    #[allow(clippy::cast_possible_truncation)]
    let records = session.record_count()? as usize;
    let mut x = Vec::with_capacity(records);
    let mut series: Vec<Series> = fields
        .iter()
        .map(|f| Series {
            label: f.clone(),
            values: Vec::with_capacity(records),
        })
        .collect();

    let mut record = Record::default();
    while session.iterate(&mut record)? {
        x.push(record.timestamp / SECONDS_PER_HOUR);
        for s in &mut series {
            s.values.push(record.get_by_name(&s.label).to_f64() / BYTES_PER_MIB);
        }
    }

    if x.is_empty() {
        return Err(MstatError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{} has no records", path.display()),
        )));
    }
    Ok(Axes { x, series })
}

fn plot<W: Write>(path: &Path, fields: &[String], out: &mut W) -> mstat_error::Result<()> {
    writeln!(out, "Reading: {}", path.display())?;
    let axes = load_axes(path, fields)?;
    writeln!(out, "Records: {}", axes.x.len())?;
    for s in &axes.series {
        let (min, max) = min_max(&s.values);
        writeln!(out, "{} min({min:.2}) max({max:.2})", s.label)?;
    }

    if gnuplot::find_program("gnuplot").is_none() {
        return Err(MstatError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            "to render plots please install gnuplot",
        )));
    }

    let config = PlotConfig {
        title: path.display().to_string(),
        xlabel: "Elapsed Time (HH)".to_owned(),
        ylabel: "Memory Usage (MiB)".to_owned(),
        ..PlotConfig::default()
    };
    let mut gp = Gnuplot::spawn()?;
    gp.plot(&config, &axes.x, &axes.series)?;
    gp.wait_for_close()
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

fn list_fields<W: Write>(out: &mut W) -> io::Result<()> {
    for row in FieldId::METRICS.chunks(4) {
        let line: Vec<String> = row.iter().map(|id| format!("{:<20}", id.name())).collect();
        writeln!(out, "{}", line.concat().trim_end())?;
    }
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
    let mut list = false;
    let mut fields: Vec<String> = DEFAULT_FIELDS.iter().map(|s| (*s).to_owned()).collect();
    let mut filename: Option<PathBuf> = None;

    while let Some(argument) = iter.next() {
        let arg = argument.to_string_lossy();
        match arg.as_ref() {
            "-h" | "--help" => return Ok(None),
            "-v" | "--verbose" => verbose = true,
            "-l" | "--list" => list = true,
            "-f" | "--fields" => {
                let next = iter
                    .next()
                    .ok_or_else(|| String::from("missing value for `-f/--fields`"))?;
                let value = next.to_string_lossy();
                if value == "all" {
                    fields = FieldId::METRICS.iter().map(|id| id.name().to_owned()).collect();
                } else {
                    fields = value.split(',').map(str::to_owned).collect();
                    if fields.iter().any(String::is_empty) {
                        return Err(format!("empty field name in `{value}`"));
                    }
                }
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option `{other}`"));
            }
            _ => {
                if filename.is_some() {
                    return Err(String::from(
                        "too many positional arguments; expected one data file",
                    ));
                }
                filename = Some(PathBuf::from(argument));
            }
        }
    }

    Ok(Some(Options {
        verbose,
        list,
        fields,
        filename,
    }))
}

fn write_usage<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(
        out,
        "usage: mstat-plot [OPTIONS] <FILE>\n\
         \x20 -f, --fields NAME[,...]   field(s) to plot (default: rss,pss,swap)\n\
         \x20 -h, --help                this help message\n\
         \x20 -l, --list                list plottable fields\n\
         \x20 -v, --verbose             verbose mode"
    )
}
