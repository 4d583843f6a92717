//! Blocking TCP channel to the simulator
//!
//! A [`Connection`] carries strictly sequential request/response pairs. The
//! game session owns one, and every connected vehicle owns its own. Reads and
//! writes are bounded by a timeout; a timed out read surfaces as
//! [`BngError::Timeout`].
//!
//! A reply that arrives after its request timed out is discarded by the next
//! request. A timeout in the middle of a frame leaves the stream misaligned,
//! so the connection refuses every later call with
//! [`BngError::ConnectionBroken`].

use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::BngError;
use crate::protocol::codec;
use crate::protocol::messages::{HelloResponse, Request};
use crate::protocol::PROTOCOL_VERSION;

/// One TCP channel speaking the simulator protocol.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    next_id: u64,
    request_timeout: Duration,
    broken: Option<String>,
}

/// Counts the bytes pulled from the stream for one frame.
struct CountingReader<'a> {
    inner: &'a mut TcpStream,
    consumed: usize,
}

impl Read for CountingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed += n;
        Ok(n)
    }
}

impl Connection {
    /// Connect to `host:port`, trying every resolved address in turn.
    ///
    /// # Errors
    /// Returns [`BngError::ConnectionFailed`] if the host cannot be resolved or
    /// no address accepts the connection.
    pub fn open(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, BngError> {
        let addrs = (host, port).to_socket_addrs().map_err(|e| {
            BngError::ConnectionFailed(format!("cannot resolve {host}:{port}: {e}"))
        })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, connect_timeout) {
                Ok(stream) => return Self::from_stream(stream, request_timeout),
                Err(e) => {
                    debug!(%addr, error = %e, "Connection attempt failed");
                    last_err = Some(e);
                }
            }
        }

        Err(BngError::ConnectionFailed(match last_err {
            Some(e) => format!("{host}:{port}: {e}"),
            None => format!("{host}:{port} resolved to no addresses"),
        }))
    }

    /// Wrap an already connected stream.
    ///
    /// # Errors
    /// Returns an error if socket options cannot be applied.
    pub fn from_stream(stream: TcpStream, request_timeout: Duration) -> Result<Self, BngError> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(request_timeout))?;
        stream.set_write_timeout(Some(request_timeout))?;
        let peer = stream.peer_addr()?;
        Ok(Self {
            stream,
            peer,
            next_id: 0,
            request_timeout,
            broken: None,
        })
    }

    /// Address of the simulator end of this channel.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Exchange `Hello` messages and verify both sides speak the same version.
    ///
    /// # Errors
    /// Returns [`BngError::ProtocolMismatch`] if the versions differ.
    pub fn hello(&mut self) -> Result<(), BngError> {
        let request = Request::Hello {
            protocol_version: PROTOCOL_VERSION.to_string(),
        };
        let reply: HelloResponse = serde_json::from_value(self.request(&request, "Hello")?)?;
        if reply.protocol_version != PROTOCOL_VERSION {
            return Err(BngError::ProtocolMismatch {
                client: PROTOCOL_VERSION.to_string(),
                simulator: reply.protocol_version,
            });
        }
        debug!(peer = %self.peer, version = PROTOCOL_VERSION, "Handshake complete");
        Ok(())
    }

    /// Send a request without waiting for the reply. Returns the request id.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn send(&mut self, request: &Request) -> Result<u64, BngError> {
        self.ensure_usable()?;
        let id = self.next_id;
        self.next_id += 1;
        let payload = codec::encode_request(id, request)?;
        debug!(peer = %self.peer, id, kind = request.type_name(), "Sending request");
        codec::write_frame(&mut self.stream, &payload)?;
        Ok(id)
    }

    /// Block until the next message arrives.
    ///
    /// # Errors
    /// Returns [`BngError::Timeout`] if nothing arrives in time and
    /// [`BngError::ConnectionBroken`] once a frame was cut short.
    pub fn recv(&mut self) -> Result<Value, BngError> {
        self.ensure_usable()?;
        let mut reader = CountingReader {
            inner: &mut self.stream,
            consumed: 0,
        };
        let payload = match codec::read_frame(&mut reader) {
            Ok(payload) => payload,
            Err(e) if e.is_timeout() && reader.consumed > 0 => {
                let reason = format!("timed out after {} bytes of a frame", reader.consumed);
                warn!(peer = %self.peer, %reason, "Connection is no longer usable");
                self.broken = Some(reason);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let message = codec::decode_message(&payload)?;
        trace!(peer = %self.peer, ?message, "Received message");
        Ok(message)
    }

    /// Send `request` and wait for a reply of type `expected`.
    ///
    /// Replies to earlier requests that timed out are skipped.
    ///
    /// # Errors
    /// Returns any transport error, a simulator error reported in the reply,
    /// or [`BngError::UnexpectedResponse`] if the reply has the wrong type.
    pub fn request(&mut self, request: &Request, expected: &str) -> Result<Value, BngError> {
        let id = self.send(request)?;
        loop {
            let message = self.recv()?;
            match message.get(codec::ID_KEY).and_then(Value::as_u64) {
                Some(stale) if stale < id => {
                    debug!(peer = %self.peer, id = stale, current = id, "Dropping stale reply");
                }
                _ => return codec::check_response(message, expected, Some(id)),
            }
        }
    }

    /// Like [`Connection::request`] but with a one-off read timeout.
    ///
    /// # Errors
    /// Same as [`Connection::request`].
    pub fn request_with_timeout(
        &mut self,
        request: &Request,
        expected: &str,
        timeout: Duration,
    ) -> Result<Value, BngError> {
        self.stream.set_read_timeout(Some(timeout))?;
        let result = self.request(request, expected);
        self.stream.set_read_timeout(Some(self.request_timeout))?;
        result
    }

    fn ensure_usable(&self) -> Result<(), BngError> {
        match &self.broken {
            Some(reason) => Err(BngError::ConnectionBroken(format!("{}: {reason}", self.peer))),
            None => Ok(()),
        }
    }

    /// Shut the socket down. Dropping the connection does the same.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The peer may already be gone
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
