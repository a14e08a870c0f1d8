//! Big-endian parameter stream: a three-int header followed by `f32` blocks.
//!
//! The format carries no checksum, so readers validate the header and insist
//! the stream ends exactly where the header says it should.

use std::io::{ErrorKind, Read, Write};

use crate::error::{ImagoError, Result};

pub(crate) fn write_header(w: &mut dyn Write, header: [usize; 3]) -> Result<()> {
    for v in header {
        let v = i32::try_from(v)
            .map_err(|_| ImagoError::InvalidParameter(format!("{v} does not fit the header")))?;
        w.write_all(&v.to_be_bytes())?;
    }
    Ok(())
}

pub(crate) fn read_header(r: &mut dyn Read) -> Result<[usize; 3]> {
    let mut out = [0usize; 3];
    for slot in &mut out {
        let mut buf = [0u8; 4];
        read_exact(r, &mut buf)?;
        let v = i32::from_be_bytes(buf);
        if v <= 0 {
            return Err(ImagoError::Codec(format!(
                "parameter header value {v} must be positive"
            )));
        }
        *slot = v as usize;
    }
    Ok(out)
}

pub(crate) fn write_f32s(w: &mut dyn Write, values: impl IntoIterator<Item = f64>) -> Result<()> {
    for v in values {
        w.write_all(&(v as f32).to_be_bytes())?;
    }
    Ok(())
}

pub(crate) fn read_f32s(r: &mut dyn Read, count: usize) -> Result<Vec<f64>> {
    // The header is untrusted; grow as data actually arrives.
    let mut out = Vec::with_capacity(count.min(1 << 16));
    let mut buf = [0u8; 4];
    for _ in 0..count {
        read_exact(r, &mut buf)?;
        out.push(f64::from(f32::from_be_bytes(buf)));
    }
    Ok(out)
}

pub(crate) fn expect_end(r: &mut dyn Read) -> Result<()> {
    let mut probe = [0u8; 1];
    loop {
        match r.read(&mut probe) {
            Ok(0) => return Ok(()),
            Ok(_) => {
                return Err(ImagoError::Codec(
                    "trailing bytes after hash parameters".to_string(),
                ))
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

pub(crate) fn checked_len(parts: &[usize]) -> Result<usize> {
    parts
        .iter()
        .try_fold(1usize, |acc, &p| acc.checked_mul(p))
        .ok_or_else(|| ImagoError::Codec("parameter block size overflows".to_string()))
}

/// Round through `f32` so freshly generated parameters equal reloaded ones.
pub(crate) fn quantize(v: f64) -> f64 {
    f64::from(v as f32)
}

/// Widths feed `rand`'s uniform ranges, which need finite bounds.
pub(crate) fn check_width(width: f64) -> Result<()> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ImagoError::InvalidParameter(format!(
            "width must be positive and finite, got {width}"
        )))
    }
}

fn read_exact(r: &mut dyn Read, buf: &mut [u8]) -> Result<()> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            ImagoError::Codec("hash parameters are truncated".to_string())
        } else {
            e.into()
        }
    })
}
