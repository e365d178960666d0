use zeroize::{Zeroize, ZeroizeOnDrop};

/// Fixed-capacity secret byte storage with a live length, zeroized on drop.
/// The working replacement for keeping raw key arrays on the stack: every
/// owner of chaining keys, cipher keys or DH scalars stores them here.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
    #[zeroize(skip)]
    len: usize,
}

impl<const N: usize> SecretBytes<N> {
    /// An all-zero secret of `len` bytes (at most the capacity).
    pub fn zeroed(len: usize) -> Self {
        Self {
            bytes: [0u8; N],
            len: len.min(N),
        }
    }

    /// Moves `src` into a new secret, zeroizing the source.
    pub fn take(src: &mut [u8]) -> Self {
        debug_assert!(src.len() <= N);
        let len = src.len().min(N);
        let mut bytes = [0u8; N];
        bytes[..len].copy_from_slice(&src[..len]);
        src.zeroize();
        Self { bytes, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

#[cfg(test)]
mod tests {
    use super::SecretBytes;

    #[test]
    fn take_zeroizes_the_source() {
        let mut src = [0xaau8; 32];
        let secret = SecretBytes::<32>::take(&mut src);
        assert_eq!(src, [0u8; 32]);
        assert_eq!(secret.as_slice(), &[0xaau8; 32]);
        assert_eq!(secret.len(), 32);
    }

    #[test]
    fn partial_capacity() {
        let mut src = [1u8; 56];
        let secret = SecretBytes::<56>::take(&mut src[..32]);
        assert_eq!(secret.len(), 32);
        assert_eq!(secret.as_slice(), &[1u8; 32]);
    }
}
