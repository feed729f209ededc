//! 256-bit set of network numbers.

use std::fmt;

/// A set of Econet network numbers, one bit per network.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NetworkSet {
    words: [u64; 4],
}

impl NetworkSet {
    /// Size of [`NetworkSet::to_bytes`]
    pub const BYTES: usize = 32;

    /// The empty set.
    pub const fn new() -> Self {
        Self { words: [0; 4] }
    }

    /// Add a network.
    pub fn insert(&mut self, net: u8) {
        self.words[usize::from(net >> 6)] |= 1u64 << (net & 63);
    }

    /// Remove a network.
    pub fn remove(&mut self, net: u8) {
        self.words[usize::from(net >> 6)] &= !(1u64 << (net & 63));
    }

    /// Whether `net` is in the set.
    pub const fn contains(&self, net: u8) -> bool {
        self.words[(net >> 6) as usize] & (1u64 << (net & 63)) != 0
    }

    /// Remove every network.
    pub fn clear(&mut self) {
        self.words = [0; 4];
    }

    /// Whether the set has no members.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Add every member of `other`.
    pub fn union_with(&mut self, other: &Self) {
        for (mine, theirs) in self.words.iter_mut().zip(other.words.iter()) {
            *mine |= theirs;
        }
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..=u8::MAX).filter(|net| self.contains(*net))
    }

    /// Bitmap with network `n` at bit `n % 8` of byte `n / 8`.
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        for (chunk, word) in out.chunks_exact_mut(8).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

impl FromIterator<u8> for NetworkSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = Self::new();
        for net in iter {
            set.insert(net);
        }
        set
    }
}

impl fmt::Debug for NetworkSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_across_words() {
        let set: NetworkSet = [0u8, 63, 64, 200, 255].into_iter().collect();
        for net in [0u8, 63, 64, 200, 255] {
            assert!(set.contains(net));
        }
        assert!(!set.contains(1));
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn remove_and_clear() {
        let mut set: NetworkSet = [5u8, 9].into_iter().collect();
        set.remove(5);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![9]);
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn union_combines() {
        let mut a: NetworkSet = [1u8].into_iter().collect();
        let b: NetworkSet = [2u8, 130].into_iter().collect();
        a.union_with(&b);
        assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 2, 130]);
    }

    #[test]
    fn bitmap_layout() {
        let set: NetworkSet = [0u8, 9, 255].into_iter().collect();
        let bytes = set.to_bytes();
        assert_eq!(bytes[0], 0b0000_0001);
        assert_eq!(bytes[1], 0b0000_0010);
        assert_eq!(bytes[31], 0b1000_0000);
    }
}
