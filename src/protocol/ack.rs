//! Acknowledgment gate
//!
//! The token answers every request line with exactly `ACK`. Anything else,
//! including silence, means host and token no longer agree on where they are
//! in the exchange.

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{LlaveroError, Result};
use crate::transport::{Link, LineTransport};

/// The acknowledgment line, without its terminator
pub const ACK_TOKEN: &[u8] = b"ACK";

/// Read one line and require it to be exactly `ACK`
pub fn expect_ack<L: Link>(transport: &mut LineTransport<L>, timeout: Duration) -> Result<()> {
    let line = match transport.read_line_bytes(timeout) {
        Ok(line) => line,
        Err(LlaveroError::Timeout(_)) => {
            debug!(?timeout, "no acknowledgment from the device");
            return Err(LlaveroError::ProtocolDesync(String::new()));
        }
        Err(e) => return Err(e),
    };

    if line.as_slice() == ACK_TOKEN {
        trace!("ack");
        return Ok(());
    }

    let got = String::from_utf8_lossy(&line).into_owned();
    debug!(got = ?got, "expected ACK");
    Err(LlaveroError::ProtocolDesync(got))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::scripted::ScriptedLink;

    const SHORT: Duration = Duration::from_millis(20);

    fn gate(incoming: &[u8]) -> Result<()> {
        let mut transport = LineTransport::new(ScriptedLink::new().with_incoming(incoming));
        expect_ack(&mut transport, SHORT)
    }

    fn desync_content(result: Result<()>) -> String {
        match result {
            Err(LlaveroError::ProtocolDesync(got)) => got,
            other => panic!("expected desync, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_ack_accepted() {
        assert!(gate(b"ACK\n").is_ok());
    }

    #[test]
    fn test_nak_is_desync() {
        assert_eq!(desync_content(gate(b"NAK\n")), "NAK");
    }

    #[test]
    fn test_no_trimming_beyond_terminator() {
        assert_eq!(desync_content(gate(b"ACK\r\n")), "ACK\r");
        assert_eq!(desync_content(gate(b" ACK\n")), " ACK");
        assert_eq!(desync_content(gate(b"ACK \n")), "ACK ");
    }

    #[test]
    fn test_partial_and_extended_matches_are_desync() {
        assert_eq!(desync_content(gate(b"AC\n")), "AC");
        assert_eq!(desync_content(gate(b"ACKS\n")), "ACKS");
        assert_eq!(desync_content(gate(b"ack\n")), "ack");
    }

    #[test]
    fn test_empty_line_is_desync() {
        assert_eq!(desync_content(gate(b"\n")), "");
    }

    #[test]
    fn test_silence_is_desync() {
        assert_eq!(desync_content(gate(b"")), "");
        assert_eq!(desync_content(gate(b"ACK")), "");
    }

    #[test]
    fn test_ack_leaves_following_bytes_buffered() {
        let mut transport =
            LineTransport::new(ScriptedLink::new().with_incoming(b"ACK\nLLAVERO\n"));
        expect_ack(&mut transport, SHORT).unwrap();
        assert_eq!(transport.read_line(SHORT).unwrap(), "LLAVERO");
    }
}
