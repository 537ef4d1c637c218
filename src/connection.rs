use crate::frame::{self, Frame};

use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// Send and receive `Frame` values from a remote peer.
///
/// Implemented as a buffered `TcpStream`. No extra bookkeeping is done to
/// optimize the number of syscalls performed, since the `tokio` primitives
/// already do some buffering internally via `BufWriter`. Reads operate
/// directly against the raw socket with `BytesMut` acting as the read
/// buffer, and `Frame::check` determines whether a complete frame is
/// present before it is parsed out.
#[derive(Debug)]
pub struct Connection {
    stream: BufWriter<TcpStream>,

    // The buffer for reading frames.
    buffer: BytesMut,
}

impl Connection {
    /// Create a new `Connection`, backed by `socket`. Read and write buffers
    /// are initialized.
    pub fn new(socket: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single `Frame` value from the underlying stream.
    ///
    /// The function waits until it has retrieved enough data to parse a
    /// frame. Any data remaining in the read buffer after the frame has been
    /// parsed is kept there for the next call to `read_frame`.
    ///
    /// # Returns
    ///
    /// On success, the received frame is returned. If the `TcpStream` is
    /// closed in a way that doesn't break a frame in half, it returns `None`.
    /// Otherwise, an error is returned.
    pub async fn read_frame(&mut self) -> crate::Result<Option<Frame>> {
        loop {
            // Attempt to parse a frame from the buffered data. If enough data
            // has been buffered, the frame is returned.
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            // There is not enough buffered data to read a frame. Attempt to
            // read more data from the socket.
            //
            // On success, the number of bytes is returned. `0` indicates
            // "end of stream".
            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                // The remote closed the connection. For this to be a clean
                // shutdown, there should be no data in the read buffer. If
                // there is, this means that the peer closed the socket while
                // sending a frame.
                if self.buffer.is_empty() {
                    return Ok(None);
                } else {
                    return Err("connection reset by peer".into());
                }
            }
        }
    }

    /// Tries to parse a frame from the buffer. If the buffer contains enough
    /// data, the frame is returned and the data removed from the buffer. If
    /// not enough data has been buffered yet, `Ok(None)` is returned. If the
    /// buffered data does not represent a valid frame, `Err` is returned.
    fn parse_frame(&mut self) -> crate::Result<Option<Frame>> {
        use frame::Error::Incomplete;

        // Cursor is used to track the "current" location in the buffer.
        // `Cursor` also implements `Buf` from the `bytes` crate which
        // provides a number of helpful utilities for working with bytes.
        let mut buf = Cursor::new(&self.buffer[..]);

        // The first step is to check if enough data has been buffered to
        // parse a single frame. This step is usually much faster than doing a
        // full parse of the frame, and allows us to skip allocating data
        // structures to hold the frame data unless we know the full frame has
        // been received.
        match Frame::check(&mut buf) {
            Ok(_) => {
                // The `check` function will have advanced the cursor until
                // the end of the frame. Since the cursor had position set to
                // zero before `Frame::check` was called, we obtain the length
                // of the frame by checking the cursor position.
                let len = buf.position() as usize;

                // Reset the position to zero before passing the cursor to
                // `Frame::parse`.
                buf.set_position(0);

                // Parse the frame from the buffer. This allocates the
                // necessary structures to represent the frame and returns the
                // frame value.
                //
                // If the encoded frame representation is invalid, an error
                // is returned. This should terminate the **current**
                // connection but should not impact any other connected
                // client.
                let frame = Frame::parse(&mut buf)?;

                // Discard the parsed data from the read buffer.
                //
                // When `advance` is called on the read buffer, all of the
                // data up to `len` is discarded. The details of how this
                // works is left to `BytesMut`. This is often done by moving
                // an internal cursor, but it may be done by reallocating and
                // copying data.
                self.buffer.advance(len);

                // Return the parsed frame to the caller.
                Ok(Some(frame))
            }
            // There is not enough data present in the read buffer to parse a
            // single frame. We must wait for more data to be received from
            // the socket. Reading from the socket will be done in the
            // statement after this `match`.
            //
            // We do not want to return `Err` from here as this "error" is an
            // expected runtime condition.
            Err(Incomplete) => Ok(None),
            // An error was encountered while parsing the frame. The
            // connection is now in an invalid state. Returning `Err` from
            // here will result in the connection being closed.
            Err(e) => Err(e.into()),
        }
    }

    /// Write a single `Frame` value to the underlying stream.
    ///
    /// The `Frame` value is written to the socket using the various
    /// `write_*` functions provided by `AsyncWrite`. Calling these functions
    /// directly on a `TcpStream` is **not** advised, as this will result in a
    /// large number of syscalls. However, it is fine to call these functions
    /// on a *buffered* write stream. The data will be written to the buffer.
    /// Once the buffer is full, it is flushed to the underlying socket.
    pub async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.write_value(frame).await?;
        self.stream.flush().await
    }

    /// Write a frame literal to the stream.
    ///
    /// Replies on this protocol surface nest at most one level deep (a
    /// top-level multi-bulk whose elements are bulk/nil/integer), so a
    /// boxed recursive async fn is overkill; `Array` is handled by writing
    /// its header here and delegating each element to `write_element`.
    async fn write_value(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Array(parts) => {
                self.stream.write_u8(b'*').await?;
                self.write_decimal(parts.len() as i64).await?;
                for part in parts {
                    self.write_element(part).await?;
                }
            }
            other => self.write_element(other).await?,
        }

        Ok(())
    }

    /// Writes a single non-array frame: a multi-bulk element or the
    /// top-level reply itself.
    async fn write_element(&mut self, frame: &Frame) -> io::Result<()> {
        match frame {
            Frame::Simple(val) => {
                self.stream.write_u8(b'+').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Error(val) => {
                self.stream.write_u8(b'-').await?;
                self.stream.write_all(val.as_bytes()).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Integer(val) => {
                self.stream.write_u8(b':').await?;
                self.write_decimal(*val).await?;
            }
            Frame::Null => {
                self.stream.write_all(b"$-1\r\n").await?;
            }
            Frame::NullArray => {
                self.stream.write_all(b"*-1\r\n").await?;
            }
            Frame::Bulk(val) => {
                let len = val.len();

                self.stream.write_u8(b'$').await?;
                self.write_decimal(len as i64).await?;
                self.stream.write_all(val).await?;
                self.stream.write_all(b"\r\n").await?;
            }
            Frame::Array(_) => unreachable!("multi-bulk replies do not nest arrays"),
        }

        Ok(())
    }

    /// Write a decimal frame to the stream
    async fn write_decimal(&mut self, val: i64) -> io::Result<()> {
        use std::io::Write;

        let mut buf = [0u8; 20];
        let mut buf = Cursor::new(&mut buf[..]);
        write!(&mut buf, "{val}")?;

        let pos = buf.position() as usize;
        self.stream.write_all(&buf.get_ref()[..pos]).await?;
        self.stream.write_all(b"\r\n").await?;

        Ok(())
    }
}
