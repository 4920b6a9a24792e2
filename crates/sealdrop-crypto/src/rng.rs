//! OS CSPRNG access and secret wiping

use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroize;

/// Fill a fixed-size array with OS randomness
pub fn random_array<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Produce `n` bytes of OS randomness
pub fn random_bytes(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// Overwrite a secret buffer with zeros
///
/// Delegates to `zeroize`, which guarantees the store is not elided.
pub fn wipe(buf: &mut [u8]) {
    buf.zeroize();
}
