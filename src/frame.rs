//! Fixed-length frame transport
//!
//! Every logical message travels as one `FRAME_LEN`-byte block: the payload
//! is a NUL-terminated ASCII string, zero-padded to the full frame. Partial
//! reads and writes are hidden from callers.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::AppError;

/// Size of one wire frame in bytes
pub const FRAME_LEN: usize = 256;

/// Maximum payload length (one byte reserved for the NUL terminator)
pub const MAX_PAYLOAD_LEN: usize = FRAME_LEN - 1;

/// Encode a string into a zero-padded frame
///
/// Payloads longer than `MAX_PAYLOAD_LEN` are truncated so the final byte
/// always stays zero.
pub fn encode(text: &str) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    let bytes = text.as_bytes();
    let len = bytes.len().min(MAX_PAYLOAD_LEN);
    frame[..len].copy_from_slice(&bytes[..len]);
    frame
}

/// Decode a frame back into its logical string
///
/// The payload is everything before the first zero byte.
pub fn decode(frame: &[u8; FRAME_LEN]) -> String {
    let end = frame.iter().position(|&b| b == 0).unwrap_or(FRAME_LEN);
    String::from_utf8_lossy(&frame[..end]).into_owned()
}

/// Write one whole frame
///
/// The write either completes in full or fails; there is no partial-failure
/// path and no retry.
pub async fn write_frame<W>(writer: &mut W, text: &str) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(text);
    writer.write_all(&frame).await?;
    Ok(())
}

/// Read one whole frame, accumulating until `FRAME_LEN` bytes arrive
///
/// A peer that closes the stream mid-frame (or before one) surfaces as
/// `AppError::ConnectionClosed`, which ends the caller's read loop.
pub async fn read_frame<R>(reader: &mut R) -> Result<String, AppError>
where
    R: AsyncRead + Unpin,
{
    let mut frame = [0u8; FRAME_LEN];
    let mut total = 0;
    while total < FRAME_LEN {
        let n = reader.read(&mut frame[total..]).await?;
        if n == 0 {
            return Err(AppError::ConnectionClosed);
        }
        total += n;
    }
    Ok(decode(&frame))
}

/// Resumable frame reader for use inside `select!` loops
///
/// Keeps partially accumulated bytes across cancellations, so a frame whose
/// read began before another event won is completed on the next call
/// instead of being lost. Each underlying `read` is cancel-safe.
#[derive(Debug)]
pub struct FrameReader {
    buf: [u8; FRAME_LEN],
    filled: usize,
}

impl FrameReader {
    pub fn new() -> Self {
        Self {
            buf: [0u8; FRAME_LEN],
            filled: 0,
        }
    }

    /// Read one whole frame, resuming any partial frame from a previous
    /// cancelled call
    pub async fn read_frame<R>(&mut self, reader: &mut R) -> Result<String, AppError>
    where
        R: AsyncRead + Unpin,
    {
        while self.filled < FRAME_LEN {
            let n = reader.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                return Err(AppError::ConnectionClosed);
            }
            self.filled += n;
        }
        self.filled = 0;
        Ok(decode(&self.buf))
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for s in ["", "a", "hello world", "send bob hi there"] {
            let frame = encode(s);
            assert_eq!(decode(&frame), s);
        }
    }

    #[test]
    fn test_encode_pads_with_zeros() {
        let frame = encode("hi");
        assert_eq!(&frame[..2], b"hi");
        assert!(frame[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_truncates_oversized_payload() {
        let long = "x".repeat(FRAME_LEN + 10);
        let frame = encode(&long);
        assert_eq!(frame[MAX_PAYLOAD_LEN], 0);
        assert_eq!(decode(&frame).len(), MAX_PAYLOAD_LEN);
    }

    #[test]
    fn test_decode_trims_at_first_zero() {
        let mut frame = [0u8; FRAME_LEN];
        frame[..3].copy_from_slice(b"abc");
        frame[4] = b'z'; // garbage after the terminator is ignored
        assert_eq!(decode(&frame), "abc");
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_partial_reads() {
        let frame = encode("who");
        let (mut client, mut server) = tokio::io::duplex(16); // tiny buffer forces chunking
        let write = tokio::spawn(async move {
            tokio::io::AsyncWriteExt::write_all(&mut client, &frame).await
        });
        let got = read_frame(&mut server).await.unwrap();
        assert_eq!(got, "who");
        write.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_read_frame_eof_is_connection_closed() {
        let (client, mut server) = tokio::io::duplex(FRAME_LEN);
        drop(client);
        let err = read_frame(&mut server).await.unwrap_err();
        assert!(matches!(err, AppError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_write_then_read_frame() {
        let (mut client, mut server) = tokio::io::duplex(FRAME_LEN * 2);
        write_frame(&mut client, "exit").await.unwrap();
        assert_eq!(read_frame(&mut server).await.unwrap(), "exit");
    }

    #[tokio::test]
    async fn test_frame_reader_resumes_after_cancellation() {
        let (mut client, mut server) = tokio::io::duplex(FRAME_LEN);
        let mut frames = FrameReader::new();

        // first half of a frame arrives, then the read future is dropped
        let frame = encode("who");
        tokio::io::AsyncWriteExt::write_all(&mut client, &frame[..100])
            .await
            .unwrap();
        let partial = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            frames.read_frame(&mut server),
        )
        .await;
        assert!(partial.is_err(), "half a frame must not complete");

        // the rest arrives; a fresh call completes the same frame
        tokio::io::AsyncWriteExt::write_all(&mut client, &frame[100..])
            .await
            .unwrap();
        assert_eq!(frames.read_frame(&mut server).await.unwrap(), "who");
    }

    #[tokio::test]
    async fn test_frame_reader_sequential_frames() {
        let (mut client, mut server) = tokio::io::duplex(FRAME_LEN * 4);
        let mut frames = FrameReader::new();
        write_frame(&mut client, "first").await.unwrap();
        write_frame(&mut client, "second").await.unwrap();
        assert_eq!(frames.read_frame(&mut server).await.unwrap(), "first");
        assert_eq!(frames.read_frame(&mut server).await.unwrap(), "second");
    }
}
