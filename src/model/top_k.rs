use std::{
    cmp::{Ordering, Reverse},
    collections::BinaryHeap
};

/// Keeps the `capacity` largest values seen so far.
///
/// Internally a min-heap, so the smallest kept value is always at the top and
/// a candidate only has to beat it to get in. Memory stays bounded by the
/// capacity no matter how many values are offered.
#[derive(Debug, Clone)]
pub struct BoundedTopK<T: Ord> {
    capacity: usize,
    heap: BinaryHeap<Reverse<T>>
}

impl<T: Ord> BoundedTopK<T> {
    pub fn new(capacity: usize) -> Self {
        BoundedTopK {
            capacity,
            heap: BinaryHeap::new()
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Smallest value currently kept
    pub fn min(&self) -> Option<&T> {
        self.heap.peek().map(|Reverse(v)| v)
    }

    /// Offers a value. Returns whether it was kept.
    ///
    /// A value is kept when the structure is below capacity, or when it is
    /// strictly greater than the current minimum (which is then evicted).
    pub fn admit(&mut self, value: T) -> bool {
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(value));
            return true;
        }

        match self.heap.peek() {
            Some(Reverse(min)) if value > *min => {
                self.heap.pop();
                self.heap.push(Reverse(value));
                true
            }
            _ => false
        }
    }

    /// Consumes the structure, yielding the kept values largest first
    pub fn into_descending(self) -> Vec<T> {
        // Ascending order of `Reverse<T>` is descending order of `T`
        self.heap.into_sorted_vec().into_iter().map(|Reverse(v)| v).collect()
    }
}

/// Totally ordered wrapper so `f64` performance values can live in a heap
#[derive(Debug, Clone, Copy)]
pub struct Scalar(pub f64);

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scalar {}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scalar {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}
