use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use tracing::{Event, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Target for operator-facing progress lines. Always shown on the console.
pub const PROGRESS_TARGET: &str = "task_result";

/// Installs the global subscriber: colored console output plus an hourly
/// rolling file under `log_dir`.
///
/// The console shows `task_result` lines and warnings (everything at DEBUG
/// when `verbose`); the file keeps INFO and above. `RUST_LOG` overrides the
/// file filter. The returned guard flushes the file writer and must outlive
/// the run.
pub fn setup_logger(log_dir: &str, verbose: bool) -> Option<WorkerGuard> {
    let file_guard = std::fs::create_dir_all(log_dir).ok().map(|_| {
        let file_appender = tracing_appender::rolling::hourly(log_dir, "nft-dropper");
        tracing_appender::non_blocking(file_appender)
    });

    let console_filter = if verbose {
        tracing_subscriber::filter::Targets::new().with_default(tracing::Level::DEBUG)
    } else {
        tracing_subscriber::filter::Targets::new()
            .with_target(PROGRESS_TARGET, tracing::Level::INFO)
            .with_default(tracing::Level::WARN)
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    let (file_layer, guard) = match file_guard {
        Some((non_blocking, guard)) => {
            let file_filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(FileFormatter)
                .with_filter(file_filter);
            (Some(file_layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn colorize(msg: String) -> String {
    if msg.contains("SUCCESS") {
        let green_text = Style::new().fg(Color::LightGreen).bold();
        msg.replace("SUCCESS", &format!("{}", green_text.paint("SUCCESS")))
    } else if msg.contains("FAILED") {
        let red_text = Style::new().fg(Color::LightRed).bold();
        msg.replace("FAILED", &format!("{}", red_text.paint("FAILED")))
    } else {
        msg
    }
}

/// Message only, with the level for warnings and errors
struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut msg_visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut msg_visitor);

        let level = *event.metadata().level();
        if level <= tracing::Level::WARN {
            let style = if level == tracing::Level::ERROR {
                Style::new().fg(Color::LightRed).bold()
            } else {
                Style::new().fg(Color::Yellow).bold()
            };
            write!(writer, "{} ", style.paint(level.as_str()))?;
        }

        write!(writer, "{}", colorize(msg_visitor.message))?;
        writeln!(writer)
    }
}

/// Timestamped lines with level and target
struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let metadata = event.metadata();

        write!(writer, "{} [{}] {}: ", timestamp, metadata.level(), metadata.target())?;

        let mut msg_visitor = MessageVisitor {
            message: String::new(),
        };
        event.record(&mut msg_visitor);
        writeln!(writer, "{}", msg_visitor.message)
    }
}
