//! Delimiter framing shared by the server and the client.
//!
//! A frame is the bytes up to (and excluding) the first `\r\n\r\n`
//! sequence. Reads grow a buffer until the terminator shows up; writes
//! append it after the payload.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const TERMINATOR: &[u8] = b"\r\n\r\n";

const READ_CHUNK: usize = 1024;

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` when the connection closes before any byte arrives,
/// and `UnexpectedEof` when it closes mid-frame. Bytes after the terminator
/// are discarded; the protocol is one request per connection.
pub async fn read_frame<R>(reader: &mut R) -> io::Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let bytes_read = reader.read(&mut chunk).await?;
        if bytes_read == 0 {
            if buffer.is_empty() {
                return Ok(None);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before the frame terminator",
            ));
        }
        buffer.extend_from_slice(&chunk[..bytes_read]);

        if let Some(position) = find_terminator(&buffer) {
            buffer.truncate(position);
            let frame = String::from_utf8(buffer).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "frame is not valid UTF-8")
            })?;
            return Ok(Some(frame));
        }
    }
}

/// Writes `payload` followed by the frame terminator.
pub async fn write_frame<W>(writer: &mut W, payload: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(TERMINATOR).await?;
    writer.flush().await
}

fn find_terminator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(TERMINATOR.len())
        .position(|window| window == TERMINATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(256);

        write_frame(&mut client, "[echo] hello").await.unwrap();
        let frame = read_frame(&mut server).await.unwrap();

        assert_eq!(frame.as_deref(), Some("[echo] hello"));
    }

    #[tokio::test]
    async fn terminator_split_across_reads_is_found() {
        let (mut client, mut server) = tokio::io::duplex(4);

        let writer = tokio::spawn(async move {
            write_frame(&mut client, "abcdef").await.unwrap();
        });
        let frame = read_frame(&mut server).await.unwrap();
        writer.await.unwrap();

        assert_eq!(frame.as_deref(), Some("abcdef"));
    }

    #[tokio::test]
    async fn clean_close_before_any_byte_is_none() {
        let (client, mut server) = tokio::io::duplex(16);
        drop(client);

        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn close_mid_frame_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(16);
        client.write_all(b"partial").await.unwrap();
        drop(client);

        let error = read_frame(&mut server).await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn empty_frame_is_allowed() {
        let (mut client, mut server) = tokio::io::duplex(16);

        write_frame(&mut client, "").await.unwrap();

        assert_eq!(read_frame(&mut server).await.unwrap().as_deref(), Some(""));
    }
}
