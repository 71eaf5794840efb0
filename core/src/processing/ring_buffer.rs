/// Fixed-capacity circular buffer.
///
/// The buffer is always full: it starts out holding `capacity` copies of an
/// initial value and every push evicts the oldest element. Logical index 0 is
/// the oldest element and `len() - 1` the newest.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    data: Vec<T>,
    head: usize,
}

impl<T: Clone> RingBuffer<T> {
    pub fn filled(capacity: usize, value: T) -> Self {
        Self {
            data: vec![value; capacity.max(1)],
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn physical(&self, index: usize) -> usize {
        (self.head + index) % self.data.len()
    }

    /// Appends `value`, returning the evicted oldest element.
    pub fn push(&mut self, value: T) -> T {
        let evicted = std::mem::replace(&mut self.data[self.head], value);
        self.head = (self.head + 1) % self.data.len();
        evicted
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        (index < self.data.len()).then(|| &self.data[self.physical(index)])
    }

    pub fn newest(&self) -> &T {
        &self.data[self.physical(self.data.len() - 1)]
    }

    /// Element `offset` positions before the newest one (0 is the newest).
    pub fn from_newest(&self, offset: usize) -> Option<&T> {
        let len = self.data.len();
        (offset < len).then(|| &self.data[self.physical(len - 1 - offset)])
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (wrapped, oldest) = self.data.split_at(self.head);
        oldest.iter().chain(wrapped.iter())
    }

    /// The last `count` elements (clamped to the capacity), oldest first.
    pub fn last_n(&self, count: usize) -> Vec<T> {
        let len = self.data.len();
        let count = count.min(len);
        (len - count..len)
            .map(|i| self.data[self.physical(i)].clone())
            .collect()
    }

    /// Replaces the newest `values.len()` elements in place, oldest first.
    pub fn overwrite_last(&mut self, values: &[T]) {
        let len = self.data.len();
        let count = values.len().min(len);
        let values = &values[values.len() - count..];
        for (slot, value) in (len - count..len).zip(values) {
            let idx = self.physical(slot);
            self.data[idx] = value.clone();
        }
    }

    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|slot| *slot = value.clone());
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_constant_and_eviction_is_fifo() {
        let mut ring = RingBuffer::filled(4, 0);
        for value in 1..=10 {
            ring.push(value);
            assert_eq!(ring.len(), 4);
        }
        assert_eq!(ring.to_vec(), vec![7, 8, 9, 10]);
        assert_eq!(*ring.newest(), 10);
        assert_eq!(ring.get(0), Some(&7));
        assert_eq!(ring.get(4), None);
    }

    #[test]
    fn newest_entries_match_pushed_sequence() {
        let mut ring = RingBuffer::filled(6, -1);
        assert_eq!(ring.push(1), -1);
        ring.push(2);
        ring.push(3);
        assert_eq!(ring.last_n(3), vec![1, 2, 3]);
        assert_eq!(ring.to_vec(), vec![-1, -1, -1, 1, 2, 3]);
        assert_eq!(ring.from_newest(1), Some(&2));
    }

    #[test]
    fn last_n_clamps_to_capacity() {
        let mut ring = RingBuffer::filled(3, 0.0);
        ring.push(1.0);
        assert_eq!(ring.last_n(10).len(), 3);
        assert!(ring.last_n(0).is_empty());
    }

    #[test]
    fn overwrite_last_touches_only_the_tail() {
        let mut ring = RingBuffer::filled(5, 0);
        for value in 1..=7 {
            ring.push(value);
        }
        ring.overwrite_last(&[30, 40]);
        assert_eq!(ring.to_vec(), vec![3, 4, 5, 30, 40]);
    }
}
