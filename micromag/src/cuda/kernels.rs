//! CUDA C sources of the field kernels.
//!
//! One thread per float (arithmetic) or per cell (torque, normalize).
//! Vector partitions are planar: component `c` of cell `i` is at
//! `i + c * n`.

pub(super) const MODULE: &str = "micromag";

pub(super) const NAMES: &[&str] = &[
    "add_f32",
    "madd1_f32",
    "madd2_f32",
    "madd_f32",
    "cmadd_f32",
    "scale_f32",
    "torque_f32",
    "normalize_f32",
    "normalize_map_f32",
];

pub(super) const SOURCE: &str = r#"
extern "C" __global__ void add_f32(
    float* __restrict__ dst,
    const float* __restrict__ a,
    const float* __restrict__ b,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        dst[i] = a[i] + b[i];
    }
}

extern "C" __global__ void madd1_f32(
    float* __restrict__ a,
    const float* __restrict__ b,
    const float mul_b,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        a[i] += mul_b * b[i];
    }
}

extern "C" __global__ void madd2_f32(
    float* __restrict__ a,
    const float* __restrict__ b,
    const float mul_b,
    const float* __restrict__ c,
    const float mul_c,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        a[i] += mul_b * b[i] + mul_c * c[i];
    }
}

extern "C" __global__ void madd_f32(
    float* __restrict__ dst,
    const float* __restrict__ a,
    const float* __restrict__ b,
    const float mul_b,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        dst[i] = a[i] + mul_b * b[i];
    }
}

extern "C" __global__ void cmadd_f32(
    float* __restrict__ dst,
    const float* __restrict__ src,
    const float re,
    const float im,
    const int n_complex
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n_complex) {
        const float s = src[i];
        dst[2 * i] += re * s;
        dst[2 * i + 1] += im * s;
    }
}

extern "C" __global__ void scale_f32(
    float* __restrict__ a,
    const float scale,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        a[i] *= scale;
    }
}

extern "C" __global__ void torque_f32(
    float* __restrict__ t,
    const float* __restrict__ m,
    const float* __restrict__ h,
    const float alpha,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        const float mx = m[i], my = m[i + n], mz = m[i + 2 * n];
        const float hx = h[i], hy = h[i + n], hz = h[i + 2 * n];

        const float ax = my * hz - mz * hy;
        const float ay = mz * hx - mx * hz;
        const float az = mx * hy - my * hx;

        const float bx = my * az - mz * ay;
        const float by = mz * ax - mx * az;
        const float bz = mx * ay - my * ax;

        const float pre = -1.0f / (1.0f + alpha * alpha);
        t[i] = pre * (ax + alpha * bx);
        t[i + n] = pre * (ay + alpha * by);
        t[i + 2 * n] = pre * (az + alpha * bz);
    }
}

extern "C" __global__ void normalize_f32(
    float* __restrict__ m,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        const float x = m[i], y = m[i + n], z = m[i + 2 * n];
        const float len = sqrtf(x * x + y * y + z * z);
        if (len != 0.0f) {
            const float s = 1.0f / len;
            m[i] = x * s;
            m[i + n] = y * s;
            m[i + 2 * n] = z * s;
        }
    }
}

extern "C" __global__ void normalize_map_f32(
    float* __restrict__ m,
    const float* __restrict__ norm,
    const int n
) {
    const int i = blockIdx.x * blockDim.x + threadIdx.x;
    if (i < n) {
        const float x = m[i], y = m[i + n], z = m[i + 2 * n];
        const float len = sqrtf(x * x + y * y + z * z);
        if (len != 0.0f) {
            const float s = norm[i] / len;
            m[i] = x * s;
            m[i + n] = y * s;
            m[i + 2 * n] = z * s;
        }
    }
}
"#;
