use std::fmt::Write as FmtWrite;

use anyhow::Result;
use flexi_logger::{DeferredNow, Logger, LoggerHandle, Record};
use textwrap::{termwidth, Options};

/// Setup console logging for hosts which don't bring their own logger.
///
/// The returned handle must be kept alive for as long as logging is needed.
pub fn setup() -> Result<LoggerHandle> {
    let handle = Logger::try_with_env_or_str("info")?
        .format(multiline_format)
        .start()?;

    log::info!(
        "Adjust the log level by setting RUST_LOG. By default RUST_LOG=info"
    );

    Ok(handle)
}

/// An opinionated formatting function for flexi_logger which automatically
/// wraps content to the terminal width.
///
/// The thread name is included because pacer logs come from both the timer
/// thread and whichever thread starts and stops it.
pub fn multiline_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let size = termwidth().min(74);
    let wrap_options = Options::new(size)
        .initial_indent("┏ ")
        .subsequent_indent("┃ ");

    let mut full_line = String::new();
    writeln!(
        full_line,
        "{} [{}] [{}] [{}:{}]",
        record.level(),
        now.format("%H:%M:%S%.6f"),
        std::thread::current().name().unwrap_or("<unnamed>"),
        record.file().unwrap_or("<unnamed>"),
        record.line().unwrap_or(0),
    )
    .map_err(to_io_error)?;

    write!(&mut full_line, "{}", &record.args()).map_err(to_io_error)?;

    writeln!(w, "{}", textwrap::fill(&full_line, wrap_options))
}

fn to_io_error(err: std::fmt::Error) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}
