//! Common utilities for diffuse.

pub use common::bit_buffer2::BitBuffer2;
pub use common::buffer2::Buffer2;

use common::bit_buffer2::BITS_PER_WORD;
use rayon::prelude::*;

use crate::error::DiffuseError;


/// Base pointer of a row-major buffer shared by the row tasks of
/// [`for_each_row_interleaved`].
///
/// Each task derives its own row slice from it; the row permutation keeps
/// those slices disjoint. Closures read it through [`UnsafeSendPtr::get`], so
/// they capture the `Sync` wrapper and not the bare pointer.
#[derive(Debug, Clone, Copy)]
pub struct UnsafeSendPtr<T: Copy>(T);
unsafe impl<T: Copy> Send for UnsafeSendPtr<T> {}
unsafe impl<T: Copy> Sync for UnsafeSendPtr<T> {}

impl<T: Copy> UnsafeSendPtr<T> {
    pub fn new(ptr: T) -> Self {
        Self(ptr)
    }

    pub fn get(&self) -> T {
        self.0
    }
}

/// Map a sequential row counter onto the interleaved row order
/// `0, mult, 2·mult, …, 1, 1 + mult, …`.
///
/// Rows sharing a residue modulo `mult` are grouped, so consecutive tasks of a
/// dilated filter touch disjoint cache lines. The mapping is a permutation of
/// `0..height`.
#[inline]
pub fn interleave_rows(row: usize, height: usize, mult: usize) -> usize {
    if height <= mult {
        return row;
    }
    let per_pass = height.div_ceil(mult);
    let long_passes = height % mult;

    if long_passes == 0 || row < long_passes * per_pass {
        // every pass so far holds per_pass rows
        let pass = row / per_pass;
        let offset = row % per_pass;
        pass + offset * mult
    } else {
        let row = row - long_passes * per_pass;
        let short = per_pass - 1;
        let pass = long_passes + row / short;
        let offset = row % short;
        pass + offset * mult
    }
}

/// Fill every row of `output` in parallel, visiting rows in the order given by
/// [`interleave_rows`].
///
/// `init` builds per-thread scratch (reused across the rows a worker handles);
/// `f` receives that scratch, the row index and the row slice to write.
pub fn for_each_row_interleaved<T, S, I, F>(output: &mut Buffer2<T>, mult: usize, init: I, f: F)
where
    T: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, usize, &mut [T]) + Sync + Send,
{
    let width = output.width();
    let height = output.height();
    let mult = mult.max(1);
    let ptr = UnsafeSendPtr::new(output.pixels_mut().as_mut_ptr());

    (0..height).into_par_iter().for_each_init(init, |scratch, i| {
        let y = interleave_rows(i, height, mult);
        // SAFETY: interleave_rows is a permutation of 0..height, so each
        // row slice is handed to exactly one task and slices never overlap.
        let row = unsafe { std::slice::from_raw_parts_mut(ptr.get().add(y * width), width) };
        f(scratch, y, row);
    });
}

/// Build a bit buffer from a per-pixel predicate on the linear index, one
/// 64-pixel word per task.
pub fn pack_bits<F>(width: usize, height: usize, f: F) -> Result<BitBuffer2, DiffuseError>
where
    F: Fn(usize) -> bool + Sync + Send,
{
    let len = width * height;
    let word_count = BitBuffer2::words_for(len);
    let mut words = Vec::new();
    words
        .try_reserve_exact(word_count)
        .map_err(|_| DiffuseError::OutOfMemory {
            what: "mask",
            bytes: word_count * std::mem::size_of::<u64>(),
        })?;
    words.resize(word_count, 0u64);

    words.par_iter_mut().enumerate().for_each(|(w, word)| {
        let start = w * BITS_PER_WORD;
        let end = (start + BITS_PER_WORD).min(len);
        for i in start..end {
            if f(i) {
                *word |= 1u64 << (i - start);
            }
        }
    });

    Ok(BitBuffer2::from_words(width, height, words))
}
