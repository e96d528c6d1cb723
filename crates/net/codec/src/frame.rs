//! Locating the end of a CBOR data item in a byte buffer.

/// Reasons a buffer cannot start with a well-formed CBOR item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("reserved additional info {0}")]
    Reserved(u8),
    #[error("indefinite length items are not canonical")]
    Indefinite,
    #[error("item exceeds the {0} byte limit")]
    TooLarge(usize),
}

/// Length in bytes of the first complete CBOR item in `buf`.
///
/// Returns `Ok(None)` while the item is still incomplete. Items longer than
/// `max_len`, and incomplete items already longer than it, are an error.
pub fn item_len(buf: &[u8], max_len: usize) -> Result<Option<usize>, FrameError> {
    let mut pos = 0usize;
    let mut pending = 1usize;

    while pending > 0 {
        pending -= 1;

        let Some(&initial) = buf.get(pos) else {
            return incomplete(buf, max_len);
        };
        let major = initial >> 5;
        let info = initial & 0x1f;
        pos += 1;

        let width = match info {
            0..=23 => 0,
            24 => 1,
            25 => 2,
            26 => 4,
            27 => 8,
            28..=30 => return Err(FrameError::Reserved(info)),
            _ => return Err(FrameError::Indefinite),
        };
        let Some(arg_bytes) = buf.get(pos..pos + width) else {
            return incomplete(buf, max_len);
        };
        pos += width;
        let arg = if width == 0 {
            u64::from(info)
        } else {
            arg_bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
        };

        // For strings and containers the argument is a count. Every nested
        // item or payload byte takes at least one byte, so a count beyond the
        // limit can be rejected before it is used. Integers, simple values and
        // floats carry their value in the argument and have no further payload.
        if matches!(major, 2..=6) {
            let count = usize::try_from(arg)
                .ok()
                .filter(|n| *n <= max_len)
                .ok_or(FrameError::TooLarge(max_len))?;

            match major {
                // byte and text strings
                2 | 3 => pos += count,
                // array
                4 => pending += count,
                // map
                5 => pending += count * 2,
                // tag, followed by its content
                _ => pending += 1,
            }
        }

        if pos > max_len || pending > max_len {
            return Err(FrameError::TooLarge(max_len));
        }
    }

    if pos > buf.len() {
        return incomplete(buf, max_len);
    }
    Ok(Some(pos))
}

fn incomplete(buf: &[u8], max_len: usize) -> Result<Option<usize>, FrameError> {
    if buf.len() > max_len {
        return Err(FrameError::TooLarge(max_len));
    }
    Ok(None)
}
