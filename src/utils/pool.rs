/// Handle of one slot in a [`Pool`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SlotId(u16);

impl SlotId {
    #[must_use]
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

struct Slot<T> {
    v: T,
    next: Option<SlotId>,
    linked: bool,
}

/// FIFO of slots whose links live inside the owning [`Pool`].
///
/// A slot is on at most one queue at a time; moving a slot between queues is
/// the only way to hand it over.
#[derive(Debug, Default)]
pub struct Que {
    head: Option<SlotId>,
    tail: Option<SlotId>,
    len: usize,
}

impl Que {
    #[must_use]
    pub const fn new() -> Self {
        Que {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    #[must_use]
    #[inline]
    pub fn front(&self) -> Option<SlotId> {
        self.head
    }
}

/// Fixed arena of records with an O(1) free list.
///
/// All slots are allocated by [`Pool::new`]; nothing grows afterwards.
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    free: Que,
}

impl<T> Pool<T> {
    fn check_rep(&self) {
        assert!(self.free.len <= self.slots.len());
        assert_eq!(self.free.head.is_none(), self.free.tail.is_none());
    }

    #[must_use]
    pub fn new(len: usize, mut init: impl FnMut() -> T) -> Self {
        assert!(len <= u16::MAX as usize);
        let mut this = Pool {
            slots: Vec::with_capacity(len),
            free: Que::new(),
        };
        for _ in 0..len {
            this.slots.push(Slot {
                v: init(),
                next: None,
                linked: false,
            });
        }
        for i in 0..len {
            let mut free = std::mem::take(&mut this.free);
            this.push_back(&mut free, SlotId(i as u16));
            this.free = free;
        }
        this.check_rep();
        this
    }

    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    #[inline]
    pub fn free_len(&self) -> usize {
        self.free.len
    }

    #[must_use]
    pub fn acquire(&mut self) -> Option<SlotId> {
        let mut free = std::mem::take(&mut self.free);
        let id = self.pop_front(&mut free);
        self.free = free;
        self.check_rep();
        id
    }

    pub fn release(&mut self, id: SlotId) {
        let mut free = std::mem::take(&mut self.free);
        self.push_back(&mut free, id);
        self.free = free;
        self.check_rep();
    }

    /// Returns every slot of `que` to the free list.
    pub fn release_all(&mut self, que: &mut Que) {
        while let Some(id) = self.pop_front(que) {
            self.release(id);
        }
    }

    #[must_use]
    #[inline]
    pub fn get(&self, id: SlotId) -> &T {
        &self.slots[id.index()].v
    }

    #[must_use]
    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> &mut T {
        &mut self.slots[id.index()].v
    }

    pub fn push_back(&mut self, que: &mut Que, id: SlotId) {
        let slot = &mut self.slots[id.index()];
        assert!(!slot.linked);
        slot.linked = true;
        slot.next = None;
        match que.tail {
            Some(tail) => self.slots[tail.index()].next = Some(id),
            None => que.head = Some(id),
        }
        que.tail = Some(id);
        que.len += 1;
    }

    pub fn push_front(&mut self, que: &mut Que, id: SlotId) {
        let slot = &mut self.slots[id.index()];
        assert!(!slot.linked);
        slot.linked = true;
        slot.next = que.head;
        if que.tail.is_none() {
            que.tail = Some(id);
        }
        que.head = Some(id);
        que.len += 1;
    }

    #[must_use]
    pub fn pop_front(&mut self, que: &mut Que) -> Option<SlotId> {
        let id = que.head?;
        let slot = &mut self.slots[id.index()];
        que.head = slot.next.take();
        slot.linked = false;
        if que.head.is_none() {
            que.tail = None;
        }
        que.len -= 1;
        Some(id)
    }

    /// Moves all of `src` in front of `dst`, keeping the order of both.
    pub fn splice_front(&mut self, dst: &mut Que, src: &mut Que) {
        let (Some(src_head), Some(src_tail)) = (src.head, src.tail) else {
            return;
        };
        self.slots[src_tail.index()].next = dst.head;
        if dst.tail.is_none() {
            dst.tail = Some(src_tail);
        }
        dst.head = Some(src_head);
        dst.len += src.len;
        *src = Que::new();
    }

    #[must_use]
    pub fn iter<'a>(&'a self, que: &Que) -> Iter<'a, T> {
        Iter {
            pool: self,
            cur: que.head,
        }
    }
}

pub struct Iter<'a, T> {
    pool: &'a Pool<T>,
    cur: Option<SlotId>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (SlotId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        let slot = &self.pool.slots[id.index()];
        self.cur = slot.next;
        Some((id, &slot.v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(pool: &Pool<u32>, que: &Que) -> Vec<u32> {
        pool.iter(que).map(|(_, v)| *v).collect()
    }

    #[test]
    fn acquire_until_empty() {
        let mut pool = Pool::new(2, || 0u32);
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        assert_ne!(a, b);
        assert!(pool.acquire().is_none());
        assert_eq!(pool.free_len(), 0);
        pool.release(a);
        assert_eq!(pool.acquire(), Some(a));
    }

    #[test]
    fn fifo_order() {
        let mut pool = Pool::new(4, || 0u32);
        let mut que = Que::new();
        for i in 0..3 {
            let id = pool.acquire().unwrap();
            *pool.get_mut(id) = i;
            pool.push_back(&mut que, id);
        }
        assert_eq!(que.len(), 3);
        assert_eq!(values(&pool, &que), vec![0, 1, 2]);
        let id = pool.pop_front(&mut que).unwrap();
        assert_eq!(*pool.get(id), 0);
        pool.push_front(&mut que, id);
        assert_eq!(values(&pool, &que), vec![0, 1, 2]);
    }

    #[test]
    fn splice_front_keeps_order() {
        let mut pool = Pool::new(5, || 0u32);
        let mut wait = Que::new();
        let mut pend = Que::new();
        for i in 0..5 {
            let id = pool.acquire().unwrap();
            *pool.get_mut(id) = i;
            if i < 2 {
                pool.push_back(&mut pend, id);
            } else {
                pool.push_back(&mut wait, id);
            }
        }
        pool.splice_front(&mut wait, &mut pend);
        assert!(pend.is_empty());
        assert_eq!(wait.len(), 5);
        assert_eq!(values(&pool, &wait), vec![0, 1, 2, 3, 4]);

        // the spliced queue stays usable at both ends
        let id = pool.acquire();
        assert!(id.is_none());
        let tail = pool.pop_front(&mut wait).unwrap();
        pool.push_back(&mut wait, tail);
        assert_eq!(values(&pool, &wait), vec![1, 2, 3, 4, 0]);
    }

    #[test]
    fn splice_into_empty() {
        let mut pool = Pool::new(2, || 0u32);
        let mut dst = Que::new();
        let mut src = Que::new();
        let id = pool.acquire().unwrap();
        pool.push_back(&mut src, id);
        pool.splice_front(&mut dst, &mut src);
        assert_eq!(dst.len(), 1);
        assert_eq!(pool.pop_front(&mut dst), Some(id));
        assert!(dst.is_empty());
    }

    #[test]
    fn release_all_returns_slots() {
        let mut pool = Pool::new(3, || 0u32);
        let mut que = Que::new();
        while let Some(id) = pool.acquire() {
            pool.push_back(&mut que, id);
        }
        pool.release_all(&mut que);
        assert!(que.is_empty());
        assert_eq!(pool.free_len(), 3);
    }

    #[test]
    #[should_panic]
    fn double_link_panics() {
        let mut pool = Pool::new(1, || 0u32);
        let mut a = Que::new();
        let mut b = Que::new();
        let id = pool.acquire().unwrap();
        pool.push_back(&mut a, id);
        pool.push_back(&mut b, id);
    }
}
