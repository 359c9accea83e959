use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use env_logger::{Builder, Env, Target};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

/// Rotated log files kept on disk.
const MAX_LOG_FILES: usize = 14;

/// Writes every formatted record to the rolling file, then the console.
///
/// Console errors are dropped; a closed stderr must not cost file records.
struct Tee<C, F> {
    console: C,
    file: F,
}

impl<C: Write, F: Write> Write for Tee<C, F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        let _ = self.console.write_all(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}

/// Initializes the process logger.
///
/// - Level from `RUST_LOG`, default `info`
/// - Format: `2025-09-22 13:00:00 - INFO - message`
/// - Console + daily-rotating `{dir}/{prefix}.YYYY-MM-DD.log`
///
/// Must be called once, before any other component logs.
pub fn init(dir: impl AsRef<Path>, prefix: &str) -> anyhow::Result<()> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating log directory {}", dir.display()))?;

    let file = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .context("creating rolling log file")?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(Tee {
            console: io::stderr(),
            file,
        })))
        .try_init()
        .context("logger already initialized")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn closed_console_still_reaches_file() {
        let mut tee = Tee {
            console: ClosedPipe,
            file: Vec::new(),
        };

        tee.write_all(b"2025-09-22 13:00:00 - INFO - saved\n").unwrap();
        tee.flush().unwrap();

        assert_eq!(tee.file, b"2025-09-22 13:00:00 - INFO - saved\n");
    }
}
