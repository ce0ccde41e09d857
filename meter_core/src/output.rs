//! Reading line format and the TCP line sink.

use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use meter_traits::{BoxError, ReadingSink};

use crate::tracker::InterfaceReadings;

/// Text used for an absent reading when none is configured.
pub const DEFAULT_ABSENT_TEXT: &str = "None";

/// Shortest round-trip decimal, always with a fractional part (`30.0`, `25.25`).
pub fn format_value(v: f64) -> String {
    // collapse -0.0 so a reading at a mark never prints as "-0.0"
    let v = if v == 0.0 { 0.0 } else { v };
    let s = v.to_string();
    if v.is_finite() && !s.contains('.') {
        format!("{s}.0")
    } else {
        s
    }
}

/// `"<top>,<bottom>\r\n"`, with `absent` standing in for missing readings.
pub fn format_line(readings: &InterfaceReadings, absent: &str) -> String {
    let field = |r: Option<f64>| r.map_or_else(|| absent.to_owned(), format_value);
    format!("{},{}\r\n", field(readings.top), field(readings.bottom))
}

/// Opens a fresh connection for every line, the way the acquisition side
/// expects it.
#[derive(Debug, Clone)]
pub struct TcpLineSink {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpLineSink {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: timeout.max(Duration::from_millis(1)),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&self) -> std::io::Result<TcpStream> {
        let mut last = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(s) => return Ok(s),
                Err(e) => last = Some(e),
            }
        }
        Err(last.unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{} did not resolve to any address", self.host),
            )
        }))
    }
}

impl ReadingSink for TcpLineSink {
    fn send(&mut self, line: &str) -> Result<(), BoxError> {
        if !line.is_ascii() {
            return Err(format!("reading line is not ASCII: {line:?}").into());
        }
        let mut stream = self.connect()?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.write_all(line.as_bytes())?;
        stream.flush()?;
        // peer may already have closed; the line is written either way
        let _ = stream.shutdown(Shutdown::Write);
        tracing::trace!(endpoint = %self.endpoint(), "reading sent");
        Ok(())
    }
}

/// Accepts and drops every line; used when output is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ReadingSink for NullSink {
    fn send(&mut self, _line: &str) -> Result<(), BoxError> {
        Ok(())
    }
}
