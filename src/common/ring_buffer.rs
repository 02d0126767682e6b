/// Fixed-capacity ring buffer; overwrites the oldest slot when full.
///
/// Slots are addressed by arena position, so push/evict are O(1) and never
/// shift the remaining elements.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    head: usize, // next write position
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Panics if `capacity` is zero; callers validate capacity up front.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots, head: 0, len: 0 }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Arena position of the oldest element.
    #[inline]
    fn start(&self) -> usize {
        (self.head + self.capacity() - self.len) % self.capacity()
    }

    /// Appends `value`, returning the evicted oldest element when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = self.slots[self.head].replace(value);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        evicted
    }

    /// Element `i` counted from the oldest (0 = oldest).
    pub fn get(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.slots[(self.start() + i) % self.capacity()].as_ref()
    }

    /// Element `i` counted from the newest (0 = newest).
    pub fn get_from_end(&self, i: usize) -> Option<&T> {
        if i >= self.len {
            return None;
        }
        self.get(self.len - 1 - i)
    }

    pub fn last(&self) -> Option<&T> {
        self.get_from_end(0)
    }

    /// Chronological iterator, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }
}
