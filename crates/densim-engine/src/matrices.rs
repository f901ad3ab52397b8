//! Gate matrices, indexed with `qubits[0]` as the least significant bit.

use ndarray::{Array2, array};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// U3(θ, φ, λ).
pub fn u3(theta: f64, phi: f64, lambda: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    array![
        [c(co, 0.0), -Complex64::from_polar(s, lambda)],
        [
            Complex64::from_polar(s, phi),
            Complex64::from_polar(co, phi + lambda)
        ]
    ]
}

/// Hadamard, as U3(π/2, 0, π).
pub fn h() -> Array2<Complex64> {
    u3(std::f64::consts::FRAC_PI_2, 0.0, std::f64::consts::PI)
}

/// Rotation around X.
pub fn rx(theta: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    array![[c(co, 0.0), c(0.0, -s)], [c(0.0, -s), c(co, 0.0)]]
}

/// Rotation around Y.
pub fn ry(theta: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    array![[c(co, 0.0), c(-s, 0.0)], [c(s, 0.0), c(co, 0.0)]]
}

/// Rotation by θ around `cos(φ) X + sin(φ) Y`.
pub fn r(theta: f64, phi: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    let minus_i = c(0.0, -1.0);
    array![
        [c(co, 0.0), minus_i * Complex64::from_polar(s, -phi)],
        [minus_i * Complex64::from_polar(s, phi), c(co, 0.0)]
    ]
}

/// sqrt(X).
pub fn sx() -> Array2<Complex64> {
    array![[c(0.5, 0.5), c(0.5, -0.5)], [c(0.5, -0.5), c(0.5, 0.5)]]
}

/// sqrt(X)†.
pub fn sxdg() -> Array2<Complex64> {
    sx().mapv(|z| z.conj())
}

/// Echoed cross-resonance gate.
pub fn ecr() -> Array2<Complex64> {
    let a = FRAC_1_SQRT_2;
    let z = c(0.0, 0.0);
    array![
        [z, c(a, 0.0), z, c(0.0, a)],
        [c(a, 0.0), z, c(0.0, -a), z],
        [z, c(0.0, a), z, c(a, 0.0)],
        [c(0.0, -a), z, c(a, 0.0), z]
    ]
}

/// exp(-iθ/2 X⊗X).
pub fn rxx(theta: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    let (a, b, z) = (c(co, 0.0), c(0.0, -s), c(0.0, 0.0));
    array![[a, z, z, b], [z, a, b, z], [z, b, a, z], [b, z, z, a]]
}

/// exp(-iθ/2 Y⊗Y).
pub fn ryy(theta: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    let (a, b, z) = (c(co, 0.0), c(0.0, s), c(0.0, 0.0));
    array![[a, z, z, b], [z, a, -b, z], [z, -b, a, z], [b, z, z, a]]
}

/// exp(-iθ/2 X⊗Z), Z on the first qubit.
pub fn rzx(theta: f64) -> Array2<Complex64> {
    let (s, co) = (theta / 2.0).sin_cos();
    let (a, b, z) = (c(co, 0.0), c(0.0, s), c(0.0, 0.0));
    array![[a, z, -b, z], [z, a, z, b], [-b, z, a, z], [z, b, z, a]]
}

/// Diagonal of Rz(θ).
pub fn rz_diag(theta: f64) -> Vec<Complex64> {
    vec![
        Complex64::from_polar(1.0, -theta / 2.0),
        Complex64::from_polar(1.0, theta / 2.0),
    ]
}

/// Diagonal of Rzz(θ).
pub fn rzz_diag(theta: f64) -> Vec<Complex64> {
    let minus = Complex64::from_polar(1.0, -theta / 2.0);
    let plus = Complex64::from_polar(1.0, theta / 2.0);
    vec![minus, plus, plus, minus]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn is_unitary(m: &Array2<Complex64>) -> bool {
        let prod = m.t().mapv(|z| z.conj()).dot(m);
        prod.indexed_iter().all(|((i, j), v)| {
            let expected = if i == j { 1.0 } else { 0.0 };
            (v - c(expected, 0.0)).norm() < 1e-12
        })
    }

    #[test]
    fn test_matrices_are_unitary() {
        for m in [
            u3(0.3, 1.2, -0.7),
            h(),
            rx(0.4),
            ry(1.1),
            r(0.9, 0.2),
            sx(),
            sxdg(),
            ecr(),
            rxx(0.5),
            ryy(0.6),
            rzx(0.7),
        ] {
            assert!(is_unitary(&m), "{m:?}");
        }
    }

    #[test]
    fn test_sx_squares_to_x() {
        let x = sx().dot(&sx());
        assert!((x[[0, 1]] - c(1.0, 0.0)).norm() < 1e-12);
        assert!(x[[0, 0]].norm() < 1e-12);
    }

    #[test]
    fn test_hadamard_entries() {
        let m = h();
        assert!((m[[0, 0]] - c(FRAC_1_SQRT_2, 0.0)).norm() < 1e-12);
        assert!((m[[1, 1]] + c(FRAC_1_SQRT_2, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_r_reduces_to_rx() {
        let a = r(0.8, 0.0);
        let b = rx(0.8);
        assert!(a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() < 1e-12));
        let rz = rz_diag(PI);
        assert!((rz[0] - c(0.0, -1.0)).norm() < 1e-12);
    }
}
