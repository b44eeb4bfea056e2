/// Stable identifier of a node inside a [`List`]. It stays valid until the
/// node is removed; after that the slot may be recycled for another node.
pub(crate) type NodeId = usize;

/// Optional link to another node of the same list.
pub(crate) type Link = Option<NodeId>;

pub(crate) struct Node<T> {
    /// Link to the next node of the list
    pub next: Link,
    /// Link to the previous node of the list
    pub prev: Link,
    /// Element of the node
    pub data: T,
}

enum Slot<T> {
    Occupied(Node<T>),
    /// Free slot, chained to the next free slot so removal and insertion
    /// never have to search.
    Vacant { next_vacant: Link },
}

/// Doubly linked list whose nodes live in a slab instead of being scattered
/// over the heap.
///
/// ```text
///   slots:  [ Occupied ][ Vacant ][ Occupied ][ Occupied ][ Vacant ]
///                |          |          ^  |        ^          |
///   head --------+          |          |  +--------+          |
///                +----------|----------+     (next links)     |
///   vacant -----------------+-----------------------------------+
/// ```
///
/// Node order is the list order, not the slot order: a node can sit anywhere
/// in the slab. Removed slots are chained into a vacant list and reused by
/// the next insertion, so ids are small integers that never dangle into freed
/// memory.
pub(crate) struct List<T> {
    slots: Vec<Slot<T>>,
    vacant: Link,
    head: Link,
    tail: Link,
    len: usize,
}

pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    current: Link,
    remaining: usize,
}

impl<T> List<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            vacant: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn first(&self) -> Link {
        self.head
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, id: NodeId) -> Option<&Node<T>> {
        match self.slots.get(id) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    /// Inserts `data` right after the node `prev`, or at the front of the
    /// list if `prev` is `None`. Returns the id of the new node.
    ///
    /// `prev` must be a live node of this list.
    pub fn insert_after(&mut self, prev: Link, data: T) -> NodeId {
        let next = match prev {
            Some(prev) => self.node(prev).next,
            None => self.head,
        };

        let id = self.claim_slot(Node { next, prev, data });

        match prev {
            Some(prev) => self.node_mut(prev).next = Some(id),
            None => self.head = Some(id),
        }

        match next {
            Some(next) => self.node_mut(next).prev = Some(id),
            None => self.tail = Some(id),
        }

        self.len += 1;

        id
    }

    /// Unlinks the node `id` and returns its element. Removing an id that
    /// is not live is a no-op.
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id)?;

        if matches!(slot, Slot::Vacant { .. }) {
            return None;
        }

        let Slot::Occupied(node) = std::mem::replace(
            slot,
            Slot::Vacant {
                next_vacant: self.vacant,
            },
        ) else {
            return None;
        };
        self.vacant = Some(id);

        match node.prev {
            Some(prev) => self.node_mut(prev).next = node.next,
            None => self.head = node.next,
        }

        match node.next {
            Some(next) => self.node_mut(next).prev = node.prev,
            None => self.tail = node.prev,
        }

        self.len -= 1;

        Some(node.data)
    }

    /// Drops every node and forgets the slab.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.vacant = None;
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }

    fn claim_slot(&mut self, node: Node<T>) -> NodeId {
        match self.vacant {
            Some(id) => {
                if let Some(Slot::Vacant { next_vacant }) = self.slots.get(id) {
                    self.vacant = *next_vacant;
                }
                self.slots[id] = Slot::Occupied(node);
                id
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        }
    }

    // Links inside the list always point at occupied slots.
    fn node(&self, id: NodeId) -> &Node<T> {
        match &self.slots[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("list link {id} points at a vacant slot"),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<T> {
        match &mut self.slots[id] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => unreachable!("list link {id} points at a vacant slot"),
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (NodeId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.current?;
        let node = self.list.node(id);

        self.current = node.next;
        self.remaining -= 1;

        Some((id, &node.data))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = (NodeId, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(list: &List<u8>) -> Vec<u8> {
        list.iter().map(|(_, value)| *value).collect()
    }

    #[test]
    fn new_list_is_empty() {
        let list: List<u8> = List::new();

        assert_eq!(list.len, 0);
        assert!(list.is_empty());
        assert!(list.iter().next().is_none());
        assert_eq!(list.first(), None);
        assert_eq!(list.tail, None);
    }

    #[test]
    fn insert_after_keeps_order() {
        let mut list = List::new();

        let b = list.insert_after(None, 2);
        let a = list.insert_after(None, 1);
        let d = list.insert_after(Some(b), 4);
        list.insert_after(Some(b), 3);

        assert_eq!(values(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.first(), Some(a));
        assert_eq!(list.tail, Some(d));
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn remove_relinks_neighbours() {
        let mut list = List::new();

        let a = list.insert_after(None, 1);
        let b = list.insert_after(Some(a), 2);
        let c = list.insert_after(Some(b), 3);

        assert_eq!(list.remove(b), Some(2));
        assert_eq!(values(&list), vec![1, 3]);
        assert_eq!(list.get(a).unwrap().next, Some(c));
        assert_eq!(list.get(c).unwrap().prev, Some(a));

        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.first(), Some(c));
        assert_eq!(list.remove(c), Some(3));
        assert!(list.is_empty());
        assert_eq!(list.tail, None);
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let mut list = List::new();

        let a = list.insert_after(None, 1);
        assert_eq!(list.remove(a), Some(1));
        assert_eq!(list.remove(a), None);
        assert_eq!(list.remove(99), None);
        assert!(list.is_empty());
    }

    #[test]
    fn vacant_slots_are_recycled() {
        let mut list = List::new();

        let a = list.insert_after(None, 1);
        let b = list.insert_after(Some(a), 2);
        list.remove(a);

        let c = list.insert_after(Some(b), 3);
        assert_eq!(c, a);
        assert_eq!(list.slots.len(), 2);
        assert_eq!(values(&list), vec![2, 3]);
    }
}
