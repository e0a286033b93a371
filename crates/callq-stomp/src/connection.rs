//! Framed TCP connection to a STOMP broker.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use callq::TransportError;
use tracing::{debug, trace};

use crate::BROKER_TARGET;
use crate::frame::{Frame, FrameError, MAX_FRAME_BYTES, parse_frame};

const READ_CHUNK: usize = 8 * 1024;

/// Blocking, buffered frame stream over one TCP connection.
#[derive(Debug)]
pub(crate) struct Connection {
    stream: TcpStream,
    buffer: Vec<u8>,
    endpoint: String,
}

impl Connection {
    /// Dials `host:port`, trying every resolved address in turn.
    pub(crate) fn open(host: &str, port: u16, timeout: Duration) -> Result<Self, TransportError> {
        let endpoint = format!("{host}:{port}");
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|source| TransportError::connect(endpoint.as_str(), source))?
            .collect();

        let mut last_error = io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            "host name resolved to no addresses",
        );
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    if let Err(error) = stream.set_nodelay(true) {
                        debug!(target: BROKER_TARGET, %error, "could not disable Nagle's algorithm");
                    }
                    debug!(target: BROKER_TARGET, %addr, "connected to broker");
                    return Ok(Self {
                        stream,
                        buffer: Vec::new(),
                        endpoint,
                    });
                }
                Err(error) => {
                    debug!(target: BROKER_TARGET, %addr, %error, "connection attempt failed");
                    last_error = error;
                }
            }
        }
        Err(TransportError::connect(endpoint, last_error))
    }

    /// `host:port` this connection was opened to.
    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Writes one frame.
    pub(crate) fn send(&mut self, frame: &Frame, operation: &'static str) -> Result<(), TransportError> {
        trace!(target: BROKER_TARGET, %frame, "sending");
        self.stream
            .write_all(&frame.encode())
            .and_then(|()| self.stream.flush())
            .map_err(|source| TransportError::io(operation, source))
    }

    /// Reads the next frame, waiting until `deadline` at most.
    ///
    /// Returns `Ok(None)` once the deadline passes without a complete frame;
    /// partially received bytes stay buffered for the next call.
    pub(crate) fn read_frame(
        &mut self,
        deadline: Instant,
        operation: &'static str,
    ) -> Result<Option<Frame>, TransportError> {
        let mut chunk = [0_u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.take_buffered()? {
                trace!(target: BROKER_TARGET, %frame, "received");
                return Ok(Some(frame));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.stream
                .set_read_timeout(Some(remaining))
                .map_err(|source| TransportError::io(operation, source))?;

            match self.stream.read(&mut chunk) {
                Ok(0) => return Err(TransportError::Closed { operation }),
                Ok(read) => {
                    self.buffer
                        .extend_from_slice(chunk.get(..read).unwrap_or_default());
                }
                Err(error) if is_retryable(&error) => {}
                Err(source) => return Err(TransportError::io(operation, source)),
            }
        }
    }

    fn take_buffered(&mut self) -> Result<Option<Frame>, TransportError> {
        match parse_frame(&self.buffer).map_err(protocol_error)? {
            Some((frame, consumed)) => {
                self.buffer.drain(..consumed);
                Ok(Some(frame))
            }
            None if self.buffer.len() > MAX_FRAME_BYTES => Err(protocol_error(FrameError::TooLarge {
                limit: MAX_FRAME_BYTES,
            })),
            None => Ok(None),
        }
    }

    /// Closes both directions of the socket, ignoring failures.
    pub(crate) fn shutdown(&self) {
        if let Err(error) = self.stream.shutdown(Shutdown::Both) {
            debug!(target: BROKER_TARGET, %error, "socket shutdown failed");
        }
    }
}

fn is_retryable(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}

fn protocol_error(error: FrameError) -> TransportError {
    TransportError::protocol(error.to_string())
}
