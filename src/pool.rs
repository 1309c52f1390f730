//! Reusable scratch buffers.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Buffers retained per size class.
const RETAINED_PER_CLASS: usize = 4;

/// A pool of scratch buffers keyed by power-of-two size class.
///
/// Buffers are handed out as [`Scratch`] guards and go back to the pool when the guard is dropped,
/// whichever way the borrowing scope is left.
#[derive(Debug, Default)]
pub struct ScratchPool<T> {
    classes: Mutex<Vec<Vec<Vec<T>>>>,
}

impl<T: Copy + Default> ScratchPool<T> {
    pub const fn new() -> Self {
        ScratchPool {
            classes: Mutex::new(Vec::new()),
        }
    }

    fn class_of(len: usize) -> usize {
        len.max(1).next_power_of_two().trailing_zeros() as usize
    }

    /// Borrow a buffer of exactly `len` default-initialized elements.
    pub fn acquire(&self, len: usize) -> Scratch<'_, T> {
        let class = Self::class_of(len);
        let reused = {
            let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
            classes.get_mut(class).and_then(Vec::pop)
        };

        let mut buffer = reused.unwrap_or_else(|| Vec::with_capacity(1 << class));
        buffer.clear();
        buffer.resize(len, T::default());

        Scratch { pool: self, buffer }
    }

    fn release(&self, buffer: Vec<T>) {
        let class = Self::class_of(buffer.capacity());
        let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
        if classes.len() <= class {
            classes.resize_with(class + 1, Vec::new);
        }
        if classes[class].len() < RETAINED_PER_CLASS {
            classes[class].push(buffer);
        }
    }

    /// Number of buffers currently parked in the pool.
    pub fn retained(&self) -> usize {
        let classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
        classes.iter().map(Vec::len).sum()
    }
}

/// A pooled buffer, returned to its pool on drop.
#[derive(Debug)]
pub struct Scratch<'a, T: Copy + Default> {
    pool: &'a ScratchPool<T>,
    buffer: Vec<T>,
}

impl<T: Copy + Default> Deref for Scratch<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.buffer
    }
}

impl<T: Copy + Default> DerefMut for Scratch<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.buffer
    }
}

impl<T: Copy + Default> Drop for Scratch<'_, T> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}
