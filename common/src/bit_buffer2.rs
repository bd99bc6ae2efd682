//! Read-only bit-packed 2D mask.

/// Bits held by one storage word.
pub const BITS_PER_WORD: usize = 64;

/// Row-major boolean grid, one bit per pixel.
///
/// Pixel `i` sits in word `i / 64`, bit `i % 64` (LSB first). Bits past
/// `width * height` in the last word are padding and never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitBuffer2 {
    words: Vec<u64>,
    width: usize,
    height: usize,
    len: usize,
}

impl BitBuffer2 {
    /// Take ownership of words packed by the caller.
    pub fn from_words(width: usize, height: usize, words: Vec<u64>) -> Self {
        let len = width * height;
        assert_eq!(
            words.len(),
            Self::words_for(len),
            "word count {} does not match dimensions {}x{}",
            words.len(),
            width,
            height
        );
        Self {
            words,
            width,
            height,
            len,
        }
    }

    /// Pack a row-major slice of `width * height` flags.
    pub fn from_slice(width: usize, height: usize, data: &[bool]) -> Self {
        assert_eq!(data.len(), width * height, "flag count does not match dimensions");
        let words = data
            .chunks(BITS_PER_WORD)
            .map(|chunk| {
                chunk
                    .iter()
                    .enumerate()
                    .fold(0u64, |word, (bit, &set)| word | (u64::from(set) << bit))
            })
            .collect();
        Self::from_words(width, height, words)
    }

    /// Words needed for `len` bits.
    #[inline]
    pub fn words_for(len: usize) -> usize {
        len.div_ceil(BITS_PER_WORD)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bit at row-major index `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> bool {
        debug_assert!(idx < self.len);
        (self.words[idx / BITS_PER_WORD] >> (idx % BITS_PER_WORD)) & 1 != 0
    }

    #[inline]
    pub fn get_xy(&self, x: usize, y: usize) -> bool {
        debug_assert!(x < self.width && y < self.height);
        self.get(y * self.width + x)
    }

    /// Set bits, padding excluded.
    pub fn count_ones(&self) -> usize {
        let full = self.len / BITS_PER_WORD;
        let body: usize = self.words[..full]
            .iter()
            .map(|w| w.count_ones() as usize)
            .sum();
        let tail = self.len % BITS_PER_WORD;
        if tail == 0 {
            body
        } else {
            body + (self.words[full] & ((1u64 << tail) - 1)).count_ones() as usize
        }
    }
}
