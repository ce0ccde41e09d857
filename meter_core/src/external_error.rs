//! Maps `Box<dyn Error>` from the collaborator traits to typed `MeterError`s.

use crate::error::MeterError;

/// Which collaborator produced the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Frame,
    Detector,
    Output,
}

impl Boundary {
    fn name(self) -> &'static str {
        match self {
            Self::Frame => "frame",
            Self::Detector => "detector",
            Self::Output => "output",
        }
    }
}

/// Map a trait-boundary error to a `MeterError`.
///
/// I/O timeouts are recognized from `std::io::ErrorKind` first, then from the message text.
pub fn map_external_error(
    boundary: Boundary,
    e: &(dyn std::error::Error + 'static),
) -> MeterError {
    if let Some(io) = e.downcast_ref::<std::io::Error>() {
        if matches!(
            io.kind(),
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
        ) {
            return MeterError::Timeout(boundary.name());
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        return MeterError::Timeout(boundary.name());
    }
    match boundary {
        Boundary::Frame => MeterError::Frame(s),
        Boundary::Detector => MeterError::Detector(s),
        Boundary::Output => MeterError::Output(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_timeouts_become_timeout() {
        let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "connect");
        assert_eq!(
            map_external_error(Boundary::Output, &e),
            MeterError::Timeout("output")
        );
    }

    #[test]
    fn other_errors_keep_their_message() {
        let e: Box<dyn std::error::Error + Send + Sync> = "camera unplugged".into();
        assert_eq!(
            map_external_error(Boundary::Frame, &*e),
            MeterError::Frame("camera unplugged".into())
        );
    }
}
