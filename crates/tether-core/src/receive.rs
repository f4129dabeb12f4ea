//! Timeout-bounded receive shared by server sessions and the client.

use std::io::{self, Read};

/// Outcome of one bounded receive.
#[derive(Debug, PartialEq, Eq)]
pub enum Received<'a> {
    /// A chunk of data exactly as returned by one `recv` call.
    Chunk(&'a [u8]),
    /// The receive timeout elapsed with no data; the caller re-checks shutdown.
    Timeout,
    /// The peer closed its side of the stream.
    Closed,
}

/// Fixed-size buffer that holds the most recent chunk.
#[derive(Debug)]
pub struct ReceiveBuffer {
    bytes: Box<[u8]>,
}

impl ReceiveBuffer {
    /// Allocates a buffer that reads at most `capacity` bytes per receive.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            bytes: vec![0_u8; capacity].into_boxed_slice(),
        }
    }

    /// Maximum chunk size.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    /// Performs one read and classifies the result.
    ///
    /// The reader is expected to carry a read timeout; both `WouldBlock` and
    /// `TimedOut` are reported as [`Received::Timeout`] because platforms
    /// disagree on which kind a timed-out socket read yields. Interrupted
    /// reads are retried transparently.
    pub fn receive<R>(&mut self, reader: &mut R) -> io::Result<Received<'_>>
    where
        R: Read + ?Sized,
    {
        loop {
            match reader.read(&mut self.bytes) {
                Ok(0) => return Ok(Received::Closed),
                Ok(read) => {
                    let chunk = self.bytes.get(..read).unwrap_or_default();
                    return Ok(Received::Chunk(chunk));
                }
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error)
                    if matches!(
                        error.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(Received::Timeout);
                }
                Err(error) => return Err(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::VecDeque;

    struct ScriptedReader {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl ScriptedReader {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for ScriptedReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    let len = bytes.len().min(buf.len());
                    buf[..len].copy_from_slice(&bytes[..len]);
                    Ok(len)
                }
                Some(Err(error)) => Err(error),
                None => Ok(0),
            }
        }
    }

    #[test]
    fn returns_chunk_as_read() {
        let mut reader = ScriptedReader::new(vec![Ok(b"abc".to_vec())]);
        let mut buffer = ReceiveBuffer::new(16);
        assert_eq!(
            buffer.receive(&mut reader).expect("receive"),
            Received::Chunk(b"abc")
        );
    }

    #[test]
    fn truncates_to_capacity() {
        let mut reader = ScriptedReader::new(vec![Ok(b"abcdef".to_vec())]);
        let mut buffer = ReceiveBuffer::new(4);
        assert_eq!(
            buffer.receive(&mut reader).expect("receive"),
            Received::Chunk(b"abcd")
        );
    }

    #[test]
    fn zero_byte_read_is_a_close() {
        let mut reader = ScriptedReader::new(Vec::new());
        let mut buffer = ReceiveBuffer::new(8);
        assert_eq!(buffer.receive(&mut reader).expect("receive"), Received::Closed);
    }

    #[rstest]
    #[case::would_block(io::ErrorKind::WouldBlock)]
    #[case::timed_out(io::ErrorKind::TimedOut)]
    fn timeouts_are_not_errors(#[case] kind: io::ErrorKind) {
        let mut reader = ScriptedReader::new(vec![Err(io::Error::from(kind))]);
        let mut buffer = ReceiveBuffer::new(8);
        assert_eq!(buffer.receive(&mut reader).expect("receive"), Received::Timeout);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut reader = ScriptedReader::new(vec![
            Err(io::Error::from(io::ErrorKind::Interrupted)),
            Ok(b"x".to_vec()),
        ]);
        let mut buffer = ReceiveBuffer::new(8);
        assert_eq!(
            buffer.receive(&mut reader).expect("receive"),
            Received::Chunk(b"x")
        );
    }

    #[test]
    fn other_errors_propagate() {
        let mut reader = ScriptedReader::new(vec![Err(io::Error::from(
            io::ErrorKind::ConnectionReset,
        ))]);
        let mut buffer = ReceiveBuffer::new(8);
        let error = buffer.receive(&mut reader).expect_err("reset should fail");
        assert_eq!(error.kind(), io::ErrorKind::ConnectionReset);
    }
}
