use bytes::Bytes;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::warn;

/// What one client sent, attributed to its peer address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Report {
    pub peer: String,
    pub line: Bytes,
}

impl Report {
    pub fn new(peer: String, line: Bytes) -> Self {
        Self { peer, line }
    }

    pub fn line_lossy(&self) -> String {
        String::from_utf8_lossy(&self.line).into_owned()
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.peer, self.line_lossy())
    }
}

/// Where reports go: stdout in debug mode, an append-only log file, and/or an
/// in-process channel.
#[derive(Clone, Debug, Default)]
pub struct Reporter {
    stdout: bool,
    log_file: Option<PathBuf>,
    channel: Option<mpsc::UnboundedSender<Report>>,
}

impl Reporter {
    pub fn new(stdout: bool, log_file: Option<PathBuf>) -> Self {
        Self {
            stdout,
            log_file,
            channel: None,
        }
    }

    /// A reporter that only forwards reports to the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Report>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            channel: Some(tx),
            ..Self::default()
        };
        (reporter, rx)
    }

    pub fn is_silent(&self) -> bool {
        !self.stdout && self.log_file.is_none() && self.channel.is_none()
    }

    pub async fn emit(&self, report: Report) {
        if let Some(path) = self.log_file.as_deref() {
            if let Err(err) = append_line(path, &report).await {
                warn!(path = %path.display(), "error writing to log file: {}", err);
            }
        }

        if self.stdout {
            if let Err(err) = write_line(&mut io::stdout().lock(), &report) {
                warn!("error writing to stdout: {}", err);
            }
        }

        if let Some(channel) = &self.channel {
            if channel.send(report).is_err() {
                warn!("report receiver dropped; discarding report");
            }
        }
    }
}

// stdout may be a closed pipe; that must not panic the handler task.
fn write_line<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    writeln!(out, "{}", report)?;
    out.flush()
}

// One write per report with O_APPEND, so concurrent handlers don't interleave lines.
async fn append_line(path: &Path, report: &Report) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;

    let line = format!("{}\n", report);
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(peer: &str, line: &str) -> Report {
        Report::new(peer.to_string(), Bytes::copy_from_slice(line.as_bytes()))
    }

    #[test]
    fn display_format() {
        assert_eq!(report("127.0.0.1", "pin").to_string(), "127.0.0.1: pin");
        assert_eq!(report("::1", "").to_string(), "::1: ");
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let report = Report::new("10.0.0.1".to_string(), Bytes::from_static(b"a\xffb"));
        assert_eq!(report.line_lossy(), "a\u{fffd}b");
    }

    #[test]
    fn default_reporter_is_silent() {
        assert!(Reporter::default().is_silent());
        assert!(Reporter::new(false, None).is_silent());
        assert!(!Reporter::new(true, None).is_silent());
    }

    #[test]
    fn write_line_appends_newline() {
        let mut out = Vec::new();
        write_line(&mut out, &report("::ffff:127.0.0.1", "pin")).unwrap();
        assert_eq!(out, b"::ffff:127.0.0.1: pin\n");
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_stdout_is_an_error_not_a_panic() {
        let result = write_line(&mut ClosedPipe, &report("127.0.0.1", "pin"));
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn channel_receives_reports() {
        let (reporter, mut rx) = Reporter::channel();
        reporter.emit(report("127.0.0.1", "hell")).await;
        assert_eq!(rx.recv().await, Some(report("127.0.0.1", "hell")));
    }

    #[tokio::test]
    async fn log_file_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sws.log");
        std::fs::write(&path, "existing\n").unwrap();

        let reporter = Reporter::new(false, Some(path.clone()));
        reporter.emit(report("127.0.0.1", "one")).await;
        reporter.emit(report("::1", "two")).await;

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "existing\n127.0.0.1: one\n::1: two\n");
    }

    #[tokio::test]
    async fn unwritable_log_file_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("sws.log");
        let (mut reporter, mut rx) = Reporter::channel();
        reporter.log_file = Some(path);

        reporter.emit(report("127.0.0.1", "still delivered")).await;
        assert_eq!(rx.recv().await, Some(report("127.0.0.1", "still delivered")));
    }
}
