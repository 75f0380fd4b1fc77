//! Multi-device kernel dispatch.
//!
//! Every function here iterates over the devices in index order, issues
//! one asynchronous launch per device on that device's stream and returns
//! without waiting. Call [`synchronize_all`] (or
//! [`Field::synchronize`]) before reading results that were produced on
//! another device's stream.
//!
//! Operands must share the destination's backend. Their layouts are
//! checked against the destination in debug builds.

use crate::backend::{ArithOps, Backend, NormalizeOps, TorqueOps};
use crate::partition::{Layout, Storage};
use crate::{Error, Field, Result};

/// Barrier over every device of `backend`.
///
/// # Errors
/// Returns the first fault recorded on any device stream.
pub fn synchronize_all<B: Backend>(backend: &B) -> Result<()> {
    backend.synchronize_all()
}

/// Check that `operand` is on the same device set as `dst` and has the
/// layout `expected`.
#[inline]
fn check_operand<B: Backend>(dst: &Field<B>, operand: &Field<B>, expected: &Layout) -> Result<()> {
    if !dst.same_backend(operand) {
        return Err(Error::BackendMismatch);
    }
    if cfg!(debug_assertions) {
        expected.check_aligned(operand.layout())?;
    }
    Ok(())
}

#[inline]
fn check_vector<B: Backend>(field: &Field<B>) -> Result<()> {
    let layout = field.layout();
    if layout.components() != 3 || layout.storage() != Storage::Planar {
        return Err(Error::InvalidComponents(layout.components()));
    }
    Ok(())
}

/// `dst = a + b`
///
/// # Errors
/// Returns an error if the layouts differ (debug builds) or a launch
/// cannot be queued.
pub fn add<B: ArithOps>(dst: &mut Field<B>, a: &Field<B>, b: &Field<B>) -> Result<()> {
    let layout = *dst.layout();
    check_operand(dst, a, &layout)?;
    check_operand(dst, b, &layout)?;
    let n = layout.len_per_device();
    let (backend, parts) = dst.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.add_async(device, part, a.part(device), b.part(device), n)?;
    }
    Ok(())
}

/// `a += mul_b * b`
///
/// # Errors
/// Returns an error if the layouts differ (debug builds) or a launch
/// cannot be queued.
pub fn madd1<B: ArithOps>(a: &mut Field<B>, b: &Field<B>, mul_b: f32) -> Result<()> {
    let layout = *a.layout();
    check_operand(a, b, &layout)?;
    let n = layout.len_per_device();
    let (backend, parts) = a.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.madd1_async(device, part, b.part(device), mul_b, n)?;
    }
    Ok(())
}

/// `a += mul_b * b + mul_c * c`, fused into a single pass over `a`.
///
/// # Errors
/// Returns an error if the layouts differ (debug builds) or a launch
/// cannot be queued.
pub fn madd2<B: ArithOps>(
    a: &mut Field<B>,
    b: &Field<B>,
    mul_b: f32,
    c: &Field<B>,
    mul_c: f32,
) -> Result<()> {
    let layout = *a.layout();
    check_operand(a, b, &layout)?;
    check_operand(a, c, &layout)?;
    let n = layout.len_per_device();
    let (backend, parts) = a.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.madd2_async(device, part, b.part(device), mul_b, c.part(device), mul_c, n)?;
    }
    Ok(())
}

/// `dst = a + mul_b * b`
///
/// # Errors
/// Returns an error if the layouts differ (debug builds) or a launch
/// cannot be queued.
pub fn madd<B: ArithOps>(dst: &mut Field<B>, a: &Field<B>, b: &Field<B>, mul_b: f32) -> Result<()> {
    let layout = *dst.layout();
    check_operand(dst, a, &layout)?;
    check_operand(dst, b, &layout)?;
    let n = layout.len_per_device();
    let (backend, parts) = dst.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.madd_async(device, part, a.part(device), b.part(device), mul_b, n)?;
    }
    Ok(())
}

/// `dst += (re + i*im) * src`
///
/// `dst` is a complex field (see [`Field::complex`]); `src` is a scalar
/// field with one real value per complex element.
///
/// # Errors
/// Returns an error if `dst` is not complex, the layouts differ (debug
/// builds) or a launch cannot be queued.
pub fn cmadd<B: ArithOps>(dst: &mut Field<B>, src: &Field<B>, re: f32, im: f32) -> Result<()> {
    let layout = *dst.layout();
    if layout.storage() != Storage::Interleaved || layout.components() != 2 {
        return Err(Error::InvalidComponents(layout.components()));
    }
    check_operand(dst, src, &layout.with_components(1, Storage::Planar))?;
    let n_complex = layout.cells_per_device();
    let (backend, parts) = dst.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.cmadd_async(device, part, src.part(device), re, im, n_complex)?;
    }
    Ok(())
}

/// `a *= s`
///
/// # Errors
/// Returns an error if a launch cannot be queued.
pub fn scale<B: ArithOps>(a: &mut Field<B>, s: f32) -> Result<()> {
    let n = a.layout().len_per_device();
    let (backend, parts) = a.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.scale_async(device, part, s, n)?;
    }
    Ok(())
}

/// Landau-Lifshitz-Gilbert torque `t = f(m, h)` with damping `alpha`.
///
/// # Errors
/// Returns an error if the fields are not 3-vector fields, the layouts
/// differ (debug builds) or a launch cannot be queued.
pub fn torque<B: TorqueOps>(
    t: &mut Field<B>,
    m: &Field<B>,
    h: &Field<B>,
    alpha: f32,
) -> Result<()> {
    check_vector(t)?;
    let layout = *t.layout();
    check_operand(t, m, &layout)?;
    check_operand(t, h, &layout)?;
    let npart = layout.cells_per_device();
    let (backend, parts) = t.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.torque_async(device, part, m.part(device), h.part(device), alpha, npart)?;
    }
    Ok(())
}

/// Rescale every non-zero cell of `m` to unit length.
///
/// # Errors
/// Returns an error if `m` is not a 3-vector field or a launch cannot be
/// queued.
pub fn normalize<B: NormalizeOps>(m: &mut Field<B>) -> Result<()> {
    check_vector(m)?;
    let npart = m.layout().cells_per_device();
    let (backend, parts) = m.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.normalize_async(device, part, npart)?;
    }
    Ok(())
}

/// Rescale every non-zero cell of `m` to the length in the scalar field
/// `norm`.
///
/// # Errors
/// Returns an error if `m` is not a 3-vector field, `norm` is not its
/// scalar companion (debug builds) or a launch cannot be queued.
pub fn normalize_map<B: NormalizeOps>(m: &mut Field<B>, norm: &Field<B>) -> Result<()> {
    check_vector(m)?;
    let layout = *m.layout();
    check_operand(m, norm, &layout.with_components(1, Storage::Planar))?;
    let npart = layout.cells_per_device();
    let (backend, parts) = m.split_mut();
    for (device, part) in parts.iter_mut().enumerate() {
        backend.normalize_map_async(device, part, norm.part(device), npart)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SyncBackend;

    #[test]
    fn test_add_two_devices() {
        let backend = SyncBackend::new(2);
        let a = Field::from_host(&backend, 1, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Field::from_host(&backend, 1, &[10.0, 20.0, 30.0, 40.0]).unwrap();
        let mut dst = Field::scalar(&backend, 4).unwrap();
        add(&mut dst, &a, &b).unwrap();
        synchronize_all(&*backend).unwrap();
        assert_eq!(dst.to_host().unwrap(), vec![11.0, 22.0, 33.0, 44.0]);
        assert_eq!(backend.launches(), vec![0, 1]);
    }

    #[test]
    fn test_madd1_scenario() {
        let backend = SyncBackend::new(2);
        let mut a =
            Field::from_host(&backend, 1, &[1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]).unwrap();
        let b = Field::from_host(&backend, 1, &[1.0; 8]).unwrap();
        madd1(&mut a, &b, 2.0).unwrap();
        assert_eq!(
            a.to_host().unwrap(),
            vec![3.0, 3.0, 3.0, 3.0, 4.0, 4.0, 4.0, 4.0]
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    fn test_layout_mismatch_rejected() {
        let backend = SyncBackend::new(2);
        let a = Field::scalar(&backend, 4).unwrap();
        let b = Field::scalar(&backend, 8).unwrap();
        let mut dst = Field::scalar(&backend, 4).unwrap();
        let err = add(&mut dst, &a, &b).unwrap_err();
        assert!(matches!(err, Error::LayoutMismatch { .. }));
        assert!(backend.launches().is_empty());
    }

    #[test]
    fn test_backend_mismatch_rejected() {
        let backend = SyncBackend::new(2);
        let other = SyncBackend::new(1);
        let mut a = Field::scalar(&backend, 4).unwrap();
        let b = Field::scalar(&other, 4).unwrap();
        assert!(matches!(
            madd1(&mut a, &b, 1.0),
            Err(Error::BackendMismatch)
        ));
        assert!(backend.launches().is_empty());
    }

    #[test]
    fn test_cmadd_requires_complex_dst() {
        let backend = SyncBackend::new(1);
        let mut dst = Field::scalar(&backend, 2).unwrap();
        let src = Field::scalar(&backend, 2).unwrap();
        assert!(matches!(
            cmadd(&mut dst, &src, 1.0, 0.0),
            Err(Error::InvalidComponents(1))
        ));
    }

    #[test]
    fn test_cmadd() {
        let backend = SyncBackend::new(2);
        let mut dst = Field::complex(&backend, 2).unwrap();
        dst.copy_from_host(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        let src = Field::from_host(&backend, 1, &[2.0, 3.0]).unwrap();
        cmadd(&mut dst, &src, 0.5, -1.0).unwrap();
        assert_eq!(dst.to_host().unwrap(), vec![2.0, -2.0, 1.5, -2.0]);
    }

    #[test]
    fn test_normalize_rejects_scalar() {
        let backend = SyncBackend::new(1);
        let mut m = Field::scalar(&backend, 2).unwrap();
        assert!(matches!(
            normalize(&mut m),
            Err(Error::InvalidComponents(1))
        ));
    }

    #[test]
    fn test_torque_and_normalize() {
        let backend = SyncBackend::new(2);
        // cells: (3,4,0) and (0,0,0)
        let mut m = Field::from_host(&backend, 3, &[3.0, 0.0, 4.0, 0.0, 0.0, 0.0]).unwrap();
        normalize(&mut m).unwrap();
        let host = m.snapshot().unwrap();
        assert_eq!(host.vector(1), Some([0.0, 0.0, 0.0]));
        let [x, y, z] = host.vector(0).unwrap();
        assert!((x - 0.6).abs() < 1e-6 && (y - 0.8).abs() < 1e-6 && z == 0.0);

        let h = Field::from_host(&backend, 3, &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0]).unwrap();
        let mut t = Field::vector(&backend, 2).unwrap();
        torque(&mut t, &m, &h, 0.0).unwrap();
        // m x h = (0.6,0.8,0) x (0,0,1) = (0.8,-0.6,0); t = -(m x h)
        let t = t.snapshot().unwrap();
        let [tx, ty, tz] = t.vector(0).unwrap();
        assert!((tx + 0.8).abs() < 1e-6 && (ty - 0.6).abs() < 1e-6 && tz.abs() < 1e-6);
        assert_eq!(t.vector(1), Some([0.0, 0.0, 0.0]));
    }

    #[test]
    fn test_zero_sized_partitions() {
        let backend = SyncBackend::new(2);
        let mut a = Field::vector(&backend, 0).unwrap();
        let b = Field::vector(&backend, 0).unwrap();
        madd1(&mut a, &b, 3.0).unwrap();
        normalize(&mut a).unwrap();
        assert!(a.to_host().unwrap().is_empty());
    }
}
