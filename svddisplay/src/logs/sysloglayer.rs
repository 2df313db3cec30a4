use std::ffi::CString;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{Layer, layer::Context};

struct LogVisitor {
    message: String,
}

impl LogVisitor {
    fn new() -> Self {
        Self {
            message: String::new(),
        }
    }
}

impl Visit for LogVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let fields = std::mem::take(&mut self.message);
            self.message = format!("{:?}", value);
            if !fields.is_empty() {
                self.message.push(' ');
                self.message.push_str(&fields);
            }
        } else {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            self.message.push_str(&format!("{}={:?}", field.name(), value));
        }
    }
}

/// Tracing layer forwarding events to the system log.
pub struct SyslogLayer {
    // openlog keeps the pointer, the string must outlive the layer
    _ident: CString,
}

impl SyslogLayer {
    pub fn new(ident: &str) -> Self {
        let ident = CString::new(ident.replace('\0', ""))
            .unwrap_or_else(|_| CString::from(c"SonosDisplay"));

        // SAFETY: ident is a valid C string owned by the layer for its whole life.
        unsafe {
            libc::openlog(ident.as_ptr(), libc::LOG_PID, libc::LOG_USER);
        }

        Self { _ident: ident }
    }
}

impl Drop for SyslogLayer {
    fn drop(&mut self) {
        // SAFETY: closelog has no preconditions.
        unsafe { libc::closelog() };
    }
}

impl<S> Layer<S> for SyslogLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = LogVisitor::new();
        event.record(&mut visitor);

        let Ok(message) = CString::new(visitor.message.replace('\0', " ")) else {
            return;
        };

        // SAFETY: both strings are NUL terminated and the format consumes one %s.
        unsafe {
            libc::syslog(
                syslog_priority(event.metadata().level()),
                c"%s".as_ptr(),
                message.as_ptr(),
            );
        }
    }
}

fn syslog_priority(level: &Level) -> libc::c_int {
    match *level {
        Level::ERROR => libc::LOG_ERR,
        Level::WARN => libc::LOG_WARNING,
        Level::INFO => libc::LOG_INFO,
        Level::DEBUG | Level::TRACE => libc::LOG_DEBUG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priorities_follow_levels() {
        assert_eq!(syslog_priority(&Level::ERROR), libc::LOG_ERR);
        assert_eq!(syslog_priority(&Level::WARN), libc::LOG_WARNING);
        assert_eq!(syslog_priority(&Level::INFO), libc::LOG_INFO);
        assert_eq!(syslog_priority(&Level::TRACE), libc::LOG_DEBUG);
    }
}
