//! TCP socket channel to one fixed peer
//!
//! The peer address comes from configuration, not negotiation. Sends
//! surface short counts to the caller instead of retrying; the caller
//! decides whether a short accept kills the transfer.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::NetworkError;

/// Byte sink behind a connected channel. Lets tests stand in for a
/// real TCP stream.
pub(crate) trait ByteSink: Send {
    /// Write once; may accept fewer bytes than offered.
    fn send_bytes(&mut self, data: &[u8]) -> std::io::Result<usize>;

    fn shutdown(&mut self);
}

impl ByteSink for TcpStream {
    fn send_bytes(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.write(data)
    }

    fn shutdown(&mut self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }
}

/// Connect/send/close wrapper around one peer connection.
pub struct SocketChannel {
    peer: SocketAddr,
    connect_timeout: Duration,
    send_timeout: Duration,
    sink: Option<Box<dyn ByteSink>>,
}

impl SocketChannel {
    pub fn new(peer: SocketAddr, connect_timeout: Duration, send_timeout: Duration) -> Self {
        Self {
            peer,
            connect_timeout,
            send_timeout,
            sink: None,
        }
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }

    /// Connect to the fixed peer. No-op when already connected.
    pub fn connect(&mut self) -> Result<(), NetworkError> {
        if self.sink.is_some() {
            return Ok(());
        }
        let domain = Domain::for_address(self.peer);
        let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        socket
            .connect_timeout(&self.peer.into(), self.connect_timeout)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;
        socket
            .set_nodelay(true)
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        let stream: TcpStream = socket.into();
        stream
            .set_write_timeout(Some(self.send_timeout))
            .map_err(|e| NetworkError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to {}", self.peer);
        self.sink = Some(Box::new(stream));
        Ok(())
    }

    /// Install a pre-connected sink in place of a real TCP connection.
    #[cfg(test)]
    pub(crate) fn connect_sink(&mut self, sink: Box<dyn ByteSink>) {
        self.sink = Some(sink);
    }

    /// Send one buffer. Returns the byte count the peer accepted, which
    /// may be short.
    pub fn send(&mut self, data: &[u8]) -> Result<usize, NetworkError> {
        let sink = self.sink.as_mut().ok_or(NetworkError::NotConnected)?;
        let sent = sink
            .send_bytes(data)
            .map_err(|e| NetworkError::SendFailed(e.to_string()))?;
        if sent != data.len() {
            tracing::warn!("Expected to send {} bytes, peer accepted {}", data.len(), sent);
        }
        Ok(sent)
    }

    /// Close the connection. Idempotent.
    pub fn close(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.shutdown();
            tracing::info!("Socket to {} closed", self.peer);
        }
    }

    /// One-shot transfer: connect, send the whole buffer, close. Fails
    /// with [`NetworkError::SendIncomplete`] if the peer accepted less
    /// than everything; the socket is closed either way.
    pub fn publish(&mut self, data: &[u8]) -> Result<(), NetworkError> {
        self.connect()?;
        let result = self.send(data);
        self.close();
        let accepted = result?;
        if accepted != data.len() {
            tracing::error!("Transmission incomplete: {} of {} bytes", accepted, data.len());
            return Err(NetworkError::SendIncomplete {
                offered: data.len(),
                accepted,
            });
        }
        Ok(())
    }
}

impl Drop for SocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sink that accepts a fixed byte budget, then stalls at zero.
#[cfg(test)]
pub(crate) struct ShortSink {
    pub(crate) remaining: usize,
}

#[cfg(test)]
impl ByteSink for ShortSink {
    fn send_bytes(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let n = data.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn shutdown(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;

    fn channel_to(addr: SocketAddr) -> SocketChannel {
        SocketChannel::new(
            addr,
            Duration::from_millis(500),
            Duration::from_millis(500),
        )
    }

    #[test]
    fn send_without_connect_is_an_error() {
        let mut channel = channel_to("127.0.0.1:1".parse().unwrap());
        assert!(matches!(
            channel.send(b"hello"),
            Err(NetworkError::NotConnected)
        ));
    }

    #[test]
    fn connect_to_closed_port_fails() {
        // Port 1 is essentially never listening.
        let mut channel = channel_to("127.0.0.1:1".parse().unwrap());
        assert!(matches!(
            channel.connect(),
            Err(NetworkError::ConnectionFailed(_))
        ));
        assert!(!channel.is_connected());
    }

    #[test]
    fn publish_delivers_whole_buffer_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            conn.read_to_end(&mut received).unwrap();
            received
        });

        let payload: Vec<u8> = (0..10_000u32).flat_map(|i| i.to_le_bytes()).collect();
        let mut channel = channel_to(addr);
        channel.publish(&payload).unwrap();
        assert!(!channel.is_connected());

        assert_eq!(server.join().unwrap(), payload);
    }

    #[test]
    fn publish_reports_short_accept_and_closes() {
        // A framed default transfer (65580 bytes) against a peer that
        // only takes 30000 of it.
        let mut channel = channel_to("127.0.0.1:1".parse().unwrap());
        channel.connect_sink(Box::new(ShortSink { remaining: 30_000 }));

        let payload = vec![0u8; 65_580];
        let err = channel.publish(&payload).unwrap_err();
        assert!(matches!(
            err,
            NetworkError::SendIncomplete {
                offered: 65_580,
                accepted: 30_000
            }
        ));
        assert!(!channel.is_connected());
    }

    #[test]
    fn close_is_idempotent() {
        let mut channel = channel_to("127.0.0.1:1".parse().unwrap());
        channel.close();
        channel.close();
    }
}
