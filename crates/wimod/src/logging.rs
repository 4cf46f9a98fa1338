use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    /// Request spans are reported on close (with their duration) only when
    /// the per-frame debug output is on too.
    pub fn span_events(self) -> FmtSpan {
        if self >= LogLevel::Debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Crate targets tell link, frame and transport output apart; below debug
    /// there is too little output for them to matter.
    pub fn shows_target(self) -> bool {
        self >= LogLevel::Debug
    }
}

/// Route link-layer tracing to stderr so stdout stays machine-readable.
///
/// Thread names are always on: receive-side events come from the `wimod-rx`
/// pump, request-side events from the calling thread.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_span_events(level.span_events())
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(level.shows_target());

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Compact => {
            let _ = builder.compact().try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().with_current_span(true).try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_spans_only_at_debug_and_above() {
        assert_eq!(LogLevel::Info.span_events(), FmtSpan::NONE);
        assert_eq!(LogLevel::Debug.span_events(), FmtSpan::CLOSE);
        assert_eq!(LogLevel::Trace.span_events(), FmtSpan::CLOSE);
    }

    #[test]
    fn targets_follow_verbosity() {
        assert!(!LogLevel::Warn.shows_target());
        assert!(LogLevel::Trace.shows_target());
        assert_eq!(LogLevel::Warn.as_filter(), LevelFilter::WARN);
    }
}
