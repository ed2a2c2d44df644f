//! Shared plumbing for the mstat command-line tools.

pub mod gnuplot;
pub mod logging;
