//! Host reference kernels.
//!
//! Slice-level implementations of every per-partition operation. Each
//! function works on one device partition; vector partitions use planar
//! storage (`x0..xN, y0..yN, z0..zN`). Backends that execute on the host
//! call these directly, device backends mirror them in their kernel
//! sources and test against them.

/// `dst[i] = a[i] + b[i]`
#[inline]
pub fn add(dst: &mut [f32], a: &[f32], b: &[f32]) {
    assert_eq!(dst.len(), a.len(), "add: length mismatch");
    assert_eq!(dst.len(), b.len(), "add: length mismatch");
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = x + y;
    }
}

/// `a[i] += mul_b * b[i]`
#[inline]
pub fn madd1(a: &mut [f32], b: &[f32], mul_b: f32) {
    assert_eq!(a.len(), b.len(), "madd1: length mismatch");
    for (x, &y) in a.iter_mut().zip(b) {
        *x += mul_b * y;
    }
}

/// `a[i] += mul_b * b[i] + mul_c * c[i]`
#[inline]
pub fn madd2(a: &mut [f32], b: &[f32], mul_b: f32, c: &[f32], mul_c: f32) {
    assert_eq!(a.len(), b.len(), "madd2: length mismatch");
    assert_eq!(a.len(), c.len(), "madd2: length mismatch");
    for ((x, &y), &z) in a.iter_mut().zip(b).zip(c) {
        *x += mul_b * y + mul_c * z;
    }
}

/// `dst[i] = a[i] + mul_b * b[i]`
#[inline]
pub fn madd(dst: &mut [f32], a: &[f32], b: &[f32], mul_b: f32) {
    assert_eq!(dst.len(), a.len(), "madd: length mismatch");
    assert_eq!(dst.len(), b.len(), "madd: length mismatch");
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = x + mul_b * y;
    }
}

/// Complex multiply-add: `dst[i] += (re + i*im) * src[i]`.
///
/// `dst` holds interleaved `(re, im)` pairs, `src` one real value per pair.
#[inline]
pub fn cmadd(dst: &mut [f32], src: &[f32], re: f32, im: f32) {
    assert_eq!(dst.len(), 2 * src.len(), "cmadd: length mismatch");
    for (pair, &s) in dst.chunks_exact_mut(2).zip(src) {
        pair[0] += re * s;
        pair[1] += im * s;
    }
}

/// `a[i] *= scale`
#[inline]
pub fn scale(a: &mut [f32], scale: f32) {
    for x in a {
        *x *= scale;
    }
}

#[inline]
fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Landau-Lifshitz-Gilbert torque in reduced units:
///
/// `t = -1/(1+alpha^2) * (m x h + alpha * m x (m x h))`
///
/// Each cell reads only its own `m` and `h`, so the result does not depend
/// on how the field is partitioned.
pub fn torque(t: &mut [f32], m: &[f32], h: &[f32], alpha: f32) {
    assert_eq!(t.len(), m.len(), "torque: length mismatch");
    assert_eq!(t.len(), h.len(), "torque: length mismatch");
    assert_eq!(t.len() % 3, 0, "torque: expected 3-vector partition");
    let n = t.len() / 3;
    let pre = -1.0 / (1.0 + alpha * alpha);

    for i in 0..n {
        let mi = [m[i], m[i + n], m[i + 2 * n]];
        let hi = [h[i], h[i + n], h[i + 2 * n]];
        let mxh = cross(mi, hi);
        let mxmxh = cross(mi, mxh);
        for c in 0..3 {
            t[i + c * n] = pre * (mxh[c] + alpha * mxmxh[c]);
        }
    }
}

/// Rescale every 3-vector to unit length. Zero vectors stay zero.
pub fn normalize(m: &mut [f32]) {
    assert_eq!(m.len() % 3, 0, "normalize: expected 3-vector partition");
    let n = m.len() / 3;
    for i in 0..n {
        rescale(m, n, i, 1.0);
    }
}

/// Rescale every 3-vector to length `norm[i]`. Zero vectors stay zero.
pub fn normalize_map(m: &mut [f32], norm: &[f32]) {
    assert_eq!(m.len(), 3 * norm.len(), "normalize_map: length mismatch");
    let n = norm.len();
    for (i, &target) in norm.iter().enumerate() {
        rescale(m, n, i, target);
    }
}

#[inline]
fn rescale(m: &mut [f32], n: usize, i: usize, target: f32) {
    let (x, y, z) = (m[i], m[i + n], m[i + 2 * n]);
    let len = (x * x + y * y + z * z).sqrt();
    if len == 0.0 {
        return;
    }
    let s = target / len;
    m[i] = x * s;
    m[i + n] = y * s;
    m[i + 2 * n] = z * s;
}
