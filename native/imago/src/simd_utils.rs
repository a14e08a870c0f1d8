use wide::f64x4;

#[inline]
#[allow(clippy::needless_range_loop)]
pub fn load_f64x4(slice: &[f64], i: usize) -> f64x4 {
    f64x4::from([slice[i], slice[i + 1], slice[i + 2], slice[i + 3]])
}

#[inline]
pub fn load_u8_as_f64x4(slice: &[u8], i: usize) -> f64x4 {
    f64x4::from([
        f64::from(slice[i]),
        f64::from(slice[i + 1]),
        f64::from(slice[i + 2]),
        f64::from(slice[i + 3]),
    ])
}

/// Dot product of two equally long slices.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    let len = a.len().min(b.len());
    let mut i = 0;
    let mut accum = 0.0;
    while i + 4 <= len {
        let va = load_f64x4(a, i);
        let vb = load_f64x4(b, i);
        accum += (va * vb).reduce_add();
        i += 4;
    }
    while i < len {
        accum += a[i] * b[i];
        i += 1;
    }
    accum
}
