//! Small dense linear-algebra helpers over column-major vectorized matrices.

use ndarray::Array2;
use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Flatten a matrix in column-major order.
pub fn vectorize(mat: &Array2<Complex64>) -> Vec<Complex64> {
    mat.t().iter().copied().collect()
}

/// Rebuild a `dim x dim` matrix from its column-major flattening.
pub fn devectorize(vec: &[Complex64], dim: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((dim, dim), |(r, c)| vec[r + c * dim])
}

/// Element-wise complex conjugate.
pub fn conjugate(mat: &Array2<Complex64>) -> Array2<Complex64> {
    mat.mapv(|z| z.conj())
}

/// Kronecker product `a ⊗ b`.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    Array2::from_shape_fn((ar * br, ac * bc), |(r, c)| {
        a[[r / br, c / bc]] * b[[r % br, c % bc]]
    })
}

/// Tensor product of two diagonals: `out[i * b.len() + j] = a[i] * b[j]`.
pub fn tensor(a: &[Complex64], b: &[Complex64]) -> Vec<Complex64> {
    a.iter()
        .flat_map(|&x| b.iter().map(move |&y| x * y))
        .collect()
}

/// Superoperator `Σ conj(K) ⊗ K` of a Kraus set.
///
/// Each `K` acts on the low (row) half of the vectorized index, matching
/// `vec(K ρ K†) = (conj(K) ⊗ K) vec(ρ)`.
pub fn kraus_superop(mats: &[Array2<Complex64>]) -> Array2<Complex64> {
    let dim = mats.first().map_or(1, |m| m.nrows());
    let mut superop = Array2::from_elem((dim * dim, dim * dim), ZERO);
    for mat in mats {
        superop += &kron(&conjugate(mat), mat);
    }
    superop
}

/// Vectorized reset superoperator on `num_qubits` qubits.
///
/// Maps `|i⟩⟨j|` to `δ_ij |0⟩⟨0|`.
pub fn reset_superop(num_qubits: usize) -> Vec<Complex64> {
    let dim = 1usize << num_qubits;
    let vdim = dim * dim;
    let mut superop = vec![ZERO; vdim * vdim];
    for i in 0..dim {
        superop[(i + i * dim) * vdim] = ONE;
    }
    superop
}

/// Vectorized `|ψ⟩⟨ψ|`.
pub fn outer_product(psi: &[Complex64]) -> Vec<Complex64> {
    let dim = psi.len();
    let mut out = vec![ZERO; dim * dim];
    for (c, &bra) in psi.iter().enumerate() {
        let bra = bra.conj();
        for (r, &ket) in psi.iter().enumerate() {
            out[r + c * dim] = ket * bra;
        }
    }
    out
}
