/// Fixed set of records plus a most-recently-used order.
///
/// `order[0]` is the most recent record, the last entry the least recent one.
/// Records never move in memory; only their position in `order` changes.
pub struct RecencyList<T> {
    recs: Vec<T>,
    order: Vec<usize>,
}

impl<T> RecencyList<T> {
    fn check_rep(&self) {
        assert_eq!(self.recs.len(), self.order.len());
    }

    #[must_use]
    pub fn new(len: usize, mut init: impl FnMut() -> T) -> Self {
        assert!(len > 0);
        let this = RecencyList {
            recs: (0..len).map(|_| init()).collect(),
            order: (0..len).collect(),
        };
        this.check_rep();
        this
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.recs.len()
    }

    /// Record index at position `pos` of the recency order.
    #[must_use]
    #[inline]
    pub fn at(&self, pos: usize) -> usize {
        self.order[pos]
    }

    #[must_use]
    #[inline]
    pub fn get(&self, idx: usize) -> &T {
        &self.recs[idx]
    }

    #[must_use]
    #[inline]
    pub fn get_mut(&mut self, idx: usize) -> &mut T {
        &mut self.recs[idx]
    }

    /// First position, from most recent to least recent, whose record matches.
    #[must_use]
    pub fn position(&self, mut pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.order.iter().position(|&idx| pred(&self.recs[idx]))
    }

    /// Position of the least recently used record.
    #[must_use]
    #[inline]
    pub fn last_pos(&self) -> usize {
        self.order.len() - 1
    }

    pub fn move_to_front(&mut self, pos: usize) {
        self.order[..=pos].rotate_right(1);
        self.check_rep();
    }

    /// Record indices from most recent to least recent.
    pub fn iter_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.order.iter().copied()
    }
}
