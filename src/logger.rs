use std::io::Write;

use chrono::Local;
use env_logger::{Builder, Env, Logger, Target};
use log::{Level, Log, Metadata, Record};

/// Progress goes to stdout, warnings and errors to stderr.
struct SplitLogger {
    progress: Logger,
    problems: Logger,
}

fn goes_to_stderr(level: Level) -> bool {
    level <= Level::Warn
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.progress.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if goes_to_stderr(record.level()) {
            self.problems.log(record);
        } else {
            self.progress.log(record);
        }
    }

    fn flush(&self) {
        self.progress.flush();
        self.problems.flush();
    }
}

fn builder(target: Target) -> Builder {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    builder
        .target(target)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        });
    builder
}

/// `info` unless `RUST_LOG` says otherwise.
pub fn init() {
    let logger = SplitLogger {
        progress: builder(Target::Stdout).build(),
        problems: builder(Target::Stderr).build(),
    };
    let max_level = logger.progress.filter();
    if log::set_boxed_logger(Box::new(logger)).is_ok() {
        log::set_max_level(max_level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_and_errors_are_split_from_progress() {
        assert!(goes_to_stderr(Level::Error));
        assert!(goes_to_stderr(Level::Warn));
        assert!(!goes_to_stderr(Level::Info));
        assert!(!goes_to_stderr(Level::Debug));
    }
}
