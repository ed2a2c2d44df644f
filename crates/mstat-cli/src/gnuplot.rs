//! Thin gnuplot driver: find the program, spawn it with a persistent
//! window, and feed it a script with inline data.
//!
//! Script generation is separated from process handling so the exact
//! commands sent to gnuplot can be tested without a gnuplot install.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use mstat_error::{MstatError, Result};
use tracing::debug;

/// Plot-wide presentation settings.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub title: String,
    pub xlabel: String,
    pub ylabel: String,
    pub grid: bool,
    pub autoscale: bool,
    pub legend: bool,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            xlabel: String::new(),
            ylabel: String::new(),
            grid: true,
            autoscale: true,
            legend: true,
        }
    }
}

/// One line on the plot: its legend label and y values (paired with the
/// shared x axis by index).
#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
}

/// Search `PATH` for an executable named `name`.
#[must_use]
pub fn find_program(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

/// Write the full gnuplot script for one plot: presentation commands, the
/// `plot '-'` line per series, then each series' inline data terminated
/// by `e`.
pub fn write_script<W: Write>(
    sink: &mut W,
    config: &PlotConfig,
    x: &[f64],
    series: &[Series],
) -> Result<()> {
    writeln!(sink, "set title '{}'", config.title)?;
    writeln!(sink, "set xlabel '{}'", config.xlabel)?;
    writeln!(sink, "set ylabel '{}'", config.ylabel)?;
    if config.grid {
        writeln!(sink, "set grid")?;
        writeln!(sink, "set mytics 2")?;
        writeln!(sink, "set mxtics 2")?;
        writeln!(sink, "set grid mxtics mytics")?;
    }
    if config.autoscale {
        writeln!(sink, "set autoscale")?;
    }
    if config.legend {
        writeln!(sink, "set key nobox")?;
        writeln!(sink, "set key outside")?;
        writeln!(sink, "set key noenhanced")?;
    }

    let plots: Vec<String> = series
        .iter()
        .map(|s| format!("'-' title '{}' with lines", s.label))
        .collect();
    writeln!(sink, "plot {}", plots.join(", "))?;

    for s in series {
        for (xv, yv) in x.iter().zip(&s.values) {
            writeln!(sink, "{xv} {yv}")?;
        }
        writeln!(sink, "e")?;
    }
    Ok(())
}

/// A running gnuplot subprocess fed over stdin.
#[derive(Debug)]
pub struct Gnuplot {
    child: Child,
}

impl Gnuplot {
    /// Spawn `gnuplot -p` (the plot window persists after exit).
    pub fn spawn() -> Result<Self> {
        let child = Command::new("gnuplot")
            .arg("-p")
            .stdin(Stdio::piped())
            .spawn()?;
        debug!(pid = child.id(), "gnuplot started");
        Ok(Self { child })
    }

    /// Render one plot.
    pub fn plot(&mut self, config: &PlotConfig, x: &[f64], series: &[Series]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| MstatError::Io(std::io::Error::other("gnuplot stdin closed")))?;
        write_script(stdin, config, x, series)?;
        stdin.flush()?;
        Ok(())
    }

    /// Block until the user closes the plot window, then reap the child.
    pub fn wait_for_close(mut self) -> Result<()> {
        if let Some(stdin) = self.child.stdin.as_mut() {
            writeln!(stdin, "pause mouse close")?;
        }
        // Dropping stdin sends EOF so gnuplot can exit.
        drop(self.child.stdin.take());
        self.child.wait()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(config: &PlotConfig, x: &[f64], series: &[Series]) -> String {
        let mut buf = Vec::new();
        write_script(&mut buf, config, x, series).expect("script");
        String::from_utf8(buf).expect("utf8 script")
    }

    fn sample_config() -> PlotConfig {
        PlotConfig {
            title: "a.dat".to_owned(),
            xlabel: "Time (HH)".to_owned(),
            ylabel: "MiB".to_owned(),
            ..PlotConfig::default()
        }
    }

    #[test]
    fn script_sets_labels_and_grid() {
        let script = render(&sample_config(), &[], &[]);
        assert!(script.contains("set title 'a.dat'"));
        assert!(script.contains("set xlabel 'Time (HH)'"));
        assert!(script.contains("set ylabel 'MiB'"));
        assert!(script.contains("set grid mxtics mytics"));
        assert!(script.contains("set autoscale"));
        assert!(script.contains("set key outside"));
    }

    #[test]
    fn script_emits_one_inline_block_per_series() {
        let series = [
            Series {
                label: "rss".to_owned(),
                values: vec![1.0, 2.0],
            },
            Series {
                label: "swap".to_owned(),
                values: vec![0.5, 0.25],
            },
        ];
        let script = render(&sample_config(), &[0.0, 1.0], &series);
        assert!(script.contains("plot '-' title 'rss' with lines, '-' title 'swap' with lines"));
        assert_eq!(script.matches("\ne\n").count(), 2);
        assert!(script.contains("0 1\n1 2\ne\n"));
        assert!(script.contains("0 0.5\n1 0.25\ne\n"));
    }

    #[test]
    fn grid_and_legend_can_be_disabled() {
        let config = PlotConfig {
            grid: false,
            legend: false,
            ..sample_config()
        };
        let script = render(&config, &[], &[]);
        assert!(!script.contains("set grid"));
        assert!(!script.contains("set key"));
    }

    #[test]
    fn find_program_locates_a_shell() {
        // Something named `sh` is on PATH in any environment we test in.
        assert!(find_program("sh").is_some());
        assert!(find_program("definitely-not-a-real-program-9c4f").is_none());
    }
}
