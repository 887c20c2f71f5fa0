//! Chunked in-place overwrite of a file body, and read-back verification.

use std::cmp;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};

use rand::{RngCore, thread_rng};

use crate::cancel::CancelToken;
use crate::error::{Result, WipeError};
use crate::method::PassPattern;

pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024; // 8 MiB

/// Storage that can push buffered writes through to the medium.
pub trait Durable {
    fn sync(&mut self) -> io::Result<()>;
}

impl Durable for File {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl<T> Durable for io::Cursor<T>
where
    io::Cursor<T>: Write,
{
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

fn chunk_buffer(size: u64, chunk_size: usize) -> Vec<u8> {
    vec![0u8; cmp::min(size, chunk_size as u64) as usize]
}

/// Overwrite bytes `0..size` of `file` once with `pattern`, then sync.
///
/// Cancellation is checked before the pass and before every chunk, so a
/// cancel request is honoured within one chunk. A short write fails the pass.
pub fn overwrite_pass<F>(
    file: &mut F,
    size: u64,
    chunk_size: usize,
    pattern: PassPattern,
    cancel: &CancelToken,
) -> Result<()>
where
    F: Write + Seek + Durable,
{
    cancel.check()?;
    if chunk_size == 0 {
        return Err(WipeError::InvalidConfig("chunk size must be positive".into()));
    }

    // Fill buffer once for a fixed pattern; random chunks are drawn per write
    let mut buffer = chunk_buffer(size, chunk_size);
    if let PassPattern::Fixed(byte) = pattern {
        buffer.fill(byte);
    }
    let mut rng = thread_rng();

    // Seek to beginning of file
    file.seek(SeekFrom::Start(0))?;

    let mut remaining = size;
    while remaining > 0 {
        cancel.check()?;
        let n = cmp::min(remaining, chunk_size as u64) as usize;
        if pattern == PassPattern::Random {
            rng.fill_bytes(&mut buffer[..n]);
        }

        let written = file.write(&buffer[..n])?;
        if written != n {
            return Err(WipeError::ShortWrite {
                expected: n,
                written,
            });
        }
        remaining -= n as u64;
    }

    // Flush and sync so the pass is on disk before the next one starts
    file.sync()?;
    Ok(())
}

/// Read back `0..size` and check every byte equals `expected`.
///
/// Returns `Ok(false)` on any mismatch, including the file having shrunk.
pub fn verify_pass<F>(file: &mut F, size: u64, chunk_size: usize, expected: u8) -> Result<bool>
where
    F: Read + Seek + Durable,
{
    if chunk_size == 0 {
        return Err(WipeError::InvalidConfig("chunk size must be positive".into()));
    }

    file.sync()?;
    file.seek(SeekFrom::Start(0))?;

    let mut buffer = chunk_buffer(size, chunk_size);
    let mut remaining = size;
    while remaining > 0 {
        let n = cmp::min(remaining, chunk_size as u64) as usize;
        match file.read_exact(&mut buffer[..n]) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        if buffer[..n].iter().any(|&b| b != expected) {
            return Ok(false);
        }
        remaining -= n as u64;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Accepts at most `limit` bytes per write call.
    struct Stingy {
        inner: Cursor<Vec<u8>>,
        limit: usize,
    }

    impl Write for Stingy {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = cmp::min(buf.len(), self.limit);
            self.inner.write(&buf[..n])
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for Stingy {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Durable for Stingy {
        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Requests cancellation as soon as the first chunk lands.
    struct CancelOnWrite {
        inner: Cursor<Vec<u8>>,
        token: CancelToken,
        writes: usize,
    }

    impl Write for CancelOnWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            self.token.cancel();
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for CancelOnWrite {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    impl Durable for CancelOnWrite {
        fn sync(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    #[test]
    fn test_fixed_pass_fills_whole_body() {
        let mut cursor = Cursor::new(vec![0x42u8; 100]);
        let cancel = CancelToken::new();

        overwrite_pass(&mut cursor, 100, 7, PassPattern::Fixed(0xAA), &cancel).unwrap();

        assert_eq!(cursor.get_ref().len(), 100);
        assert!(cursor.get_ref().iter().all(|&b| b == 0xAA));
        assert!(verify_pass(&mut cursor, 100, 7, 0xAA).unwrap());
    }

    #[test]
    fn test_random_pass_keeps_length() {
        let mut cursor = Cursor::new(vec![0u8; 4096]);
        let cancel = CancelToken::new();

        overwrite_pass(&mut cursor, 4096, 1000, PassPattern::Random, &cancel).unwrap();

        assert_eq!(cursor.get_ref().len(), 4096);
        // 4096 zero bytes surviving a random pass is not a realistic outcome
        assert!(cursor.get_ref().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_verify_detects_single_corrupt_byte() {
        let mut cursor = Cursor::new(vec![0u8; 64]);
        let cancel = CancelToken::new();
        overwrite_pass(&mut cursor, 64, 16, PassPattern::Fixed(0x00), &cancel).unwrap();

        cursor.get_mut()[37] = 0x01;

        assert!(!verify_pass(&mut cursor, 64, 16, 0x00).unwrap());
    }

    #[test]
    fn test_verify_detects_truncation() {
        let mut cursor = Cursor::new(vec![0u8; 10]);
        assert!(!verify_pass(&mut cursor, 20, 8, 0x00).unwrap());
    }

    #[test]
    fn test_cancelled_before_first_chunk() {
        let mut cursor = Cursor::new(vec![0x11u8; 32]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = overwrite_pass(&mut cursor, 32, 8, PassPattern::Fixed(0), &cancel).unwrap_err();

        assert!(err.is_cancelled());
        assert!(cursor.get_ref().iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_cancel_stops_within_one_chunk() {
        let token = CancelToken::new();
        let mut sink = CancelOnWrite {
            inner: Cursor::new(vec![0x11u8; 40]),
            token: token.clone(),
            writes: 0,
        };

        let err = overwrite_pass(&mut sink, 40, 10, PassPattern::Fixed(0xFF), &token).unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(sink.writes, 1);
        let data = sink.inner.get_ref();
        assert!(data[..10].iter().all(|&b| b == 0xFF));
        assert!(data[10..].iter().all(|&b| b == 0x11));
    }

    #[test]
    fn test_short_write_is_fatal() {
        let mut sink = Stingy {
            inner: Cursor::new(Vec::new()),
            limit: 3,
        };
        let cancel = CancelToken::new();

        let err = overwrite_pass(&mut sink, 10, 4, PassPattern::Fixed(0xFF), &cancel).unwrap_err();

        assert!(matches!(
            err,
            WipeError::ShortWrite {
                expected: 4,
                written: 3
            }
        ));
    }

    #[test]
    fn test_empty_file_is_a_noop() {
        let mut cursor = Cursor::new(Vec::new());
        let cancel = CancelToken::new();
        overwrite_pass(&mut cursor, 0, DEFAULT_CHUNK_SIZE, PassPattern::Fixed(0), &cancel).unwrap();
        assert!(cursor.get_ref().is_empty());
        assert!(verify_pass(&mut cursor, 0, DEFAULT_CHUNK_SIZE, 0).unwrap());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        let cancel = CancelToken::new();
        let err = overwrite_pass(&mut cursor, 4, 0, PassPattern::Random, &cancel).unwrap_err();
        assert!(matches!(err, WipeError::InvalidConfig(_)));
    }
}
