/// A simple slab arena.
///
/// A `Slab` stores values of type `T` in a contiguous array and
/// returns stable indices that can be reused after removal.
///
/// Internally, it keeps track of:
/// - occupied slots,
/// - and a stack of free indices.
///
/// The runtime uses it as the task arena of an environment: every task
/// of a chain lives in one slot and is addressed by its index, so parent
/// and leaf links are plain integers rather than references.
pub(crate) struct Slab<T> {
    /// Storage for items. Vacant slots hold `None`.
    items: Vec<Option<T>>,
    /// Stack of free indices that can be reused.
    free: Vec<usize>,
}

impl<T> Slab<T> {
    /// Creates a new `Slab` with a fixed initial capacity.
    ///
    /// All slots are initially free.
    pub(crate) fn new(size: usize) -> Self {
        let items = (0..size).map(|_| None).collect();
        // Reversed so that the lowest index is handed out first.
        let free = (0..size).rev().collect();

        Self { items, free }
    }

    /// Inserts a value into the slab and returns its index.
    ///
    /// If a free slot is available, it is reused.
    /// Otherwise, the slab grows exponentially.
    pub(crate) fn insert(&mut self, item: T) -> usize {
        let index = if let Some(i) = self.free.pop() {
            i
        } else {
            let len = self.items.len();
            let new_len = if len == 0 { 1 } else { 2 * len };

            self.items.extend((len..new_len).map(|_| None));
            self.free.extend(((len + 1)..new_len).rev());

            len
        };

        self.items[index] = Some(item);

        index
    }

    /// Removes and returns the value stored at `index`.
    ///
    /// The slot becomes free and may be reused by future insertions.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds or the slot is vacant.
    pub(crate) fn remove(&mut self, index: usize) -> T {
        assert!(index < self.items.len(), "Index out of range");

        let item = self.items[index].take().expect("Item is not set");
        self.free.push(index);

        item
    }

    /// Returns `true` if `index` refers to an occupied slot.
    pub(crate) fn contains(&self, index: usize) -> bool {
        matches!(self.items.get(index), Some(Some(_)))
    }

    /// Returns a shared reference to the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant or out of bounds.
    pub(crate) fn get(&self, index: usize) -> &T {
        self.items
            .get(index)
            .and_then(Option::as_ref)
            .expect("Item is not set")
    }

    /// Returns a mutable reference to the value at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the slot is vacant or out of bounds.
    pub(crate) fn get_mut(&mut self, index: usize) -> &mut T {
        self.items
            .get_mut(index)
            .and_then(Option::as_mut)
            .expect("Item is not set")
    }

    /// Number of occupied slots.
    pub(crate) fn len(&self) -> usize {
        self.items.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Slab;

    #[test]
    fn reuses_freed_slots() {
        let mut slab = Slab::new(2);

        let a = slab.insert("a");
        let b = slab.insert("b");
        assert_ne!(a, b);
        assert_eq!(slab.len(), 2);

        assert_eq!(slab.remove(a), "a");
        assert!(!slab.contains(a));

        let c = slab.insert("c");
        assert_eq!(c, a);
        assert_eq!(*slab.get(c), "c");
        assert_eq!(*slab.get(b), "b");
    }

    #[test]
    fn grows_when_full() {
        let mut slab = Slab::new(0);

        let indices: Vec<usize> = (0..5).map(|i| slab.insert(i)).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        *slab.get_mut(3) = 30;
        assert_eq!(*slab.get(3), 30);
        assert_eq!(slab.len(), 5);
    }

    #[test]
    #[should_panic(expected = "Item is not set")]
    fn removing_vacant_slot_panics() {
        let mut slab: Slab<u8> = Slab::new(1);
        slab.remove(0);
    }
}
