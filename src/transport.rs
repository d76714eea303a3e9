//! Request/response frame exchange over TCP.
//!
//! The protocol has no length prefix: one frame per connection, delimited by
//! the sender closing its write half. The requester writes, shuts down its
//! write side, and reads the reply to EOF; the responder mirrors that.
//! Reads are capped so a hostile sender cannot grow the buffer unbounded.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;

use crate::config::MAX_FRAME_LEN;

/// Reads one frame from the stream, until the remote closes its write half.
pub(crate) async fn read_frame(stream: &mut TcpStream, io_timeout: Duration) -> io::Result<Bytes> {
    let mut buf = BytesMut::with_capacity(8 * 1024);
    loop {
        let n = timeout(io_timeout, stream.read_buf(&mut buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))??;
        if n == 0 {
            return Ok(buf.freeze());
        }
        if buf.len() > MAX_FRAME_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "frame exceeds maximum length",
            ));
        }
    }
}

/// Writes one frame and half-closes the stream so the remote sees EOF.
pub(crate) async fn write_frame(
    stream: &mut TcpStream,
    frame: &[u8],
    io_timeout: Duration,
) -> io::Result<()> {
    timeout(io_timeout, stream.write_all(frame))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))??;
    timeout(io_timeout, stream.shutdown())
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "shutdown timed out"))??;
    Ok(())
}

/// Connects, sends one request frame, and reads the single reply.
///
/// The address may be a hostname; resolution happens at connect time.
pub(crate) async fn exchange<A: ToSocketAddrs>(
    addr: A,
    request: &[u8],
    io_timeout: Duration,
) -> io::Result<Bytes> {
    let mut stream = timeout(io_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
    write_frame(&mut stream, request, io_timeout).await?;
    read_frame(&mut stream, io_timeout).await
}
