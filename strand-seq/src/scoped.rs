//! Scoped Containers.
//!
//! Every mutable store of the theory is scoped: `push_scope` stamps the
//! trail, mutations record inverses, and `pop_scope(k)` replays the
//! inverses in LIFO order back to the stamp.

/// A vector with scoped push, in-place update and swap-removal.
#[derive(Debug, Clone)]
pub struct ScopedVec<T: Clone> {
    items: Vec<T>,
    trail: Vec<Undo<T>>,
    lims: Vec<usize>,
}

#[derive(Debug, Clone)]
enum Undo<T> {
    Pushed,
    EraseSwap { idx: usize, value: T },
    Set { idx: usize, old: T },
}

impl<T: Clone> Default for ScopedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ScopedVec<T> {
    /// Create an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            trail: Vec::new(),
            lims: Vec::new(),
        }
    }

    /// Number of live items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True iff no items are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read an item.
    #[must_use]
    pub fn get(&self, idx: usize) -> &T {
        &self.items[idx]
    }

    /// Iterate live items.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Append an item.
    pub fn push(&mut self, value: T) {
        self.items.push(value);
        self.trail.push(Undo::Pushed);
    }

    /// Replace the item at `idx`.
    pub fn set(&mut self, idx: usize, value: T) {
        let old = std::mem::replace(&mut self.items[idx], value);
        self.trail.push(Undo::Set { idx, old });
    }

    /// Remove the item at `idx` by swapping in the last item.
    pub fn erase_and_swap(&mut self, idx: usize) {
        let value = self.items.swap_remove(idx);
        self.trail.push(Undo::EraseSwap { idx, value });
    }

    /// Stamp the current state.
    pub fn push_scope(&mut self) {
        self.lims.push(self.trail.len());
    }

    /// Undo everything since the `num_scopes`-th most recent stamp.
    pub fn pop_scope(&mut self, num_scopes: usize) {
        if num_scopes == 0 {
            return;
        }
        let target = self.lims[self.lims.len() - num_scopes];
        self.lims.truncate(self.lims.len() - num_scopes);
        while self.trail.len() > target {
            match self.trail.pop().expect("trail entry") {
                Undo::Pushed => {
                    self.items.pop();
                }
                Undo::EraseSwap { idx, value } => {
                    // inverse of swap_remove: the displaced tail item
                    // returns to the end, the removed one to its slot
                    if idx < self.items.len() {
                        let moved = std::mem::replace(&mut self.items[idx], value);
                        self.items.push(moved);
                    } else {
                        self.items.push(value);
                    }
                }
                Undo::Set { idx, old } => {
                    self.items[idx] = old;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop() {
        let mut v: ScopedVec<u32> = ScopedVec::new();
        v.push(1);
        v.push_scope();
        v.push(2);
        v.push(3);
        assert_eq!(v.len(), 3);
        v.pop_scope(1);
        assert_eq!(v.len(), 1);
        assert_eq!(*v.get(0), 1);
    }

    #[test]
    fn test_erase_and_swap_restores() {
        let mut v: ScopedVec<u32> = ScopedVec::new();
        v.push(10);
        v.push(20);
        v.push(30);
        v.push_scope();
        v.erase_and_swap(0); // [30, 20]
        assert_eq!(*v.get(0), 30);
        v.pop_scope(1);
        assert_eq!(
            (0..v.len()).map(|i| *v.get(i)).collect::<Vec<_>>(),
            vec![10, 20, 30]
        );
    }

    #[test]
    fn test_set_restores() {
        let mut v: ScopedVec<u32> = ScopedVec::new();
        v.push(5);
        v.push_scope();
        v.set(0, 7);
        assert_eq!(*v.get(0), 7);
        v.pop_scope(1);
        assert_eq!(*v.get(0), 5);
    }

    #[test]
    fn test_nested_scopes() {
        let mut v: ScopedVec<u32> = ScopedVec::new();
        v.push_scope();
        v.push(1);
        v.push_scope();
        v.push(2);
        v.erase_and_swap(0); // [2]
        v.pop_scope(2);
        assert!(v.is_empty());
    }
}
