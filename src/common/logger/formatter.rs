use core::fmt as core_fmt;

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{
        FmtContext,
        format::{FormatEvent, FormatFields, Writer},
    },
    registry::LookupSpan,
};

const TIMESTAMP: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]");

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Single-line event format: `[timestamp] LEVEL target:line > spans: message`.
pub struct LineFormatter {
    use_ansi: bool,
}

impl LineFormatter {
    pub fn new(use_ansi: bool) -> Self {
        Self { use_ansi }
    }

    fn level_color(level: &Level) -> &'static str {
        match *level {
            Level::ERROR => "\x1b[31m",
            Level::WARN => "\x1b[33m",
            Level::INFO => "\x1b[32m",
            Level::DEBUG => "\x1b[34m",
            Level::TRACE => "\x1b[35m",
        }
    }

    /// Escape code, or nothing when colours are off.
    fn style(&self, code: &'static str) -> &'static str {
        if self.use_ansi { code } else { "" }
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> core_fmt::Result {
        let (reset, bold, dim) = (self.style(RESET), self.style(BOLD), self.style(DIM));
        let meta = event.metadata();

        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now.format(TIMESTAMP).unwrap_or_default();
        write!(writer, "{dim}[{stamp}]{reset} ")?;

        let color = self.style(Self::level_color(meta.level()));
        write!(writer, "{color}{bold}{:<5}{reset} ", meta.level().as_str())?;

        match meta.line() {
            Some(line) => write!(writer, "{dim}{}:{line}{reset} > ", meta.target())?,
            None => write!(writer, "{dim}{}{reset} > ", meta.target())?,
        }

        for span in ctx.event_scope().into_iter().flat_map(|s| s.from_root()) {
            write!(writer, "{bold}{}{reset}: ", span.name())?;
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer, "{reset}")
    }
}
