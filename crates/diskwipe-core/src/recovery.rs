//! Damaged-range recovery
//!
//! When a bulk write fails, the same window is rewritten one byte at a time
//! so that only the bytes that really refuse to write are lost. Each byte is
//! flushed on its own: a buffered write may report success while the flush
//! surfaces the fault, and both count as the same failure.

use crate::error::{Error, Result};
use std::io::{ErrorKind, Seek, SeekFrom, Write};

/// Rewrite `data[start..start + count]` byte by byte at the stream's position
///
/// Returns the number of bytes that could not be written. On return the
/// stream is positioned exactly `count` bytes past where it started, no
/// matter how many bytes failed.
///
/// # Errors
///
/// * [`Error::InvalidRange`] if the window does not fit in `data`
/// * [`Error::NotSeekable`] if the stream cannot report its position
/// * [`Error::StreamStalled`] if the stream cannot be moved past the window
pub fn recover_damaged_range<W>(stream: &mut W, data: &[u8], start: usize, count: usize) -> Result<u64>
where
    W: Write + Seek,
{
    let window = start
        .checked_add(count)
        .and_then(|end| data.get(start..end))
        .ok_or(Error::InvalidRange {
            start,
            count,
            len: data.len(),
        })?;

    let origin = stream_position(stream)?;
    let expected_end = origin + count as u64;
    let mut damaged = 0u64;

    tracing::debug!(
        "Recovering damaged range {}..{} byte by byte",
        origin,
        expected_end
    );

    for byte in window.chunks(1) {
        let before = stream_position(stream)?;
        let written = stream.write_all(byte).and_then(|()| stream.flush());

        if let Err(e) = written {
            damaged += 1;
            tracing::debug!(offset = before, error = %e, "Damaged byte skipped");

            if stream_position(stream)? == before {
                stream
                    .seek(SeekFrom::Current(1))
                    .map_err(|_| Error::StreamStalled {
                        expected: expected_end,
                        actual: before,
                    })?;
            }
        }
    }

    let actual = stream_position(stream)?;
    if actual != expected_end {
        let landed = stream
            .seek(SeekFrom::Start(expected_end))
            .map_err(|e| {
                tracing::warn!("Cannot move past damaged range at {}: {}", actual, e);
                Error::StreamStalled {
                    expected: expected_end,
                    actual,
                }
            })?;

        if landed != expected_end {
            return Err(Error::StreamStalled {
                expected: expected_end,
                actual: landed,
            });
        }
    }

    if damaged > 0 {
        tracing::warn!(
            start = origin,
            damaged,
            "Damaged range recovered with unwritable bytes"
        );
    }

    Ok(damaged)
}

/// Current position, mapping an unsupported seek to a configuration error
pub(crate) fn stream_position<S: Seek>(stream: &mut S) -> Result<u64> {
    stream.stream_position().map_err(|e| match e.kind() {
        ErrorKind::Unsupported => Error::NotSeekable(e.to_string()),
        _ => Error::Io(e),
    })
}
