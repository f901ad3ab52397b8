//! Index arithmetic over the vectorized (superoperator) index space.

/// Insert a zero bit at every position in `qubits_sorted` into `k`.
///
/// Enumerating `k` over `0..2^(n - len)` visits the first index of every
/// block touched by a gate on `qubits_sorted`.
#[inline]
pub fn index0(qubits_sorted: &[usize], k: u64) -> u64 {
    let mut idx = k;
    for &q in qubits_sorted {
        let low = idx & ((1u64 << q) - 1);
        idx >>= q;
        idx <<= q + 1;
        idx |= low;
    }
    idx
}

/// All `2^len` indices of the block starting at `index0(qubits_sorted, k)`.
///
/// Entry `i` sets bit `qubits[j]` for every bit `j` set in `i`, so the
/// ordering follows `qubits`, not `qubits_sorted`.
pub fn indexes(qubits: &[usize], qubits_sorted: &[usize], k: u64) -> Vec<u64> {
    let mut ret = vec![0u64; 1usize << qubits.len()];
    ret[0] = index0(qubits_sorted, k);
    for (i, &q) in qubits.iter().enumerate() {
        let n = 1usize << i;
        let bit = 1u64 << q;
        for j in 0..n {
            ret[n + j] = ret[j] | bit;
        }
    }
    ret
}

/// Bit mask with one bit per qubit.
#[inline]
pub fn qubit_mask(qubits: &[usize]) -> u64 {
    qubits.iter().fold(0, |mask, &q| mask | (1u64 << q))
}

/// Gather the bits of `index` at `qubits` into a compact integer, with
/// `qubits[0]` as the least significant bit.
#[inline]
pub fn extract_bits(index: u64, qubits: &[usize]) -> usize {
    qubits
        .iter()
        .enumerate()
        .fold(0, |acc, (j, &q)| acc | ((((index >> q) & 1) as usize) << j))
}

/// Sorted copy of a qubit list.
pub fn sorted(qubits: &[usize]) -> Vec<usize> {
    let mut out = qubits.to_vec();
    out.sort_unstable();
    out
}
