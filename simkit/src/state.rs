use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Queue;

static NEXT_STATE: AtomicU64 = AtomicU64::new(0);

/// A type-safe handle of a value kept in [`State`].
///
/// Keys are issued by [`State::insert`] and remember which state issued them. Using a key with
/// another state panics:
///
/// ```should_panic
/// # use simkit::State;
/// let mut first = State::default();
/// let mut second = State::default();
/// let key = first.insert(1);
/// let _ = second.get(key);
/// ```
///
/// A key for a value of type `T` cannot be used to access a value of another type:
///
/// ```compile_fail
/// # use simkit::State;
/// let mut state = State::default();
/// let key = state.insert(String::from("1"));
/// let _: Option<&i32> = state.get(key);
/// ```
pub struct Key<V> {
    slot: usize,
    owner: u64,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for Key<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Key<V> {}

impl<V> PartialEq for Key<V> {
    fn eq(&self, other: &Self) -> bool {
        (self.slot, self.owner) == (other.slot, other.owner)
    }
}

impl<V> Eq for Key<V> {}

impl<V> Hash for Key<V> {
    fn hash<H: Hasher>(&self, hasher: &mut H) {
        (self.slot, self.owner).hash(hasher);
    }
}

impl<V> fmt::Debug for Key<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.slot)
    }
}

/// Identifies a FIFO queue of values of type `V` kept in [`State`].
pub struct QueueId<V>(Key<Queue<V>>);

impl<V> Clone for QueueId<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for QueueId<V> {}

impl<V> PartialEq for QueueId<V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<V> Eq for QueueId<V> {}

impl<V> fmt::Debug for QueueId<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueueId({})", self.0.slot)
    }
}

/// Values and queues shared by the components of a simulation.
///
/// Components keep only keys; the values themselves live here, so that any component can reach
/// them while processing an event.
pub struct State {
    slots: Vec<Option<Box<dyn Any>>>,
    id: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            id: NEXT_STATE.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl State {
    fn check_owner(&self, owner: u64) {
        assert_eq!(owner, self.id, "Key issued by a different state");
    }

    /// Stores `value` and returns its key.
    #[must_use = "Discarding key results in leaking inserted value"]
    pub fn insert<V: 'static>(&mut self, value: V) -> Key<V> {
        self.slots.push(Some(Box::new(value)));
        Key {
            slot: self.slots.len() - 1,
            owner: self.id,
            _marker: PhantomData,
        }
    }

    /// Takes the value out of the state. Returns `None` if it has already been removed.
    pub fn remove<V: 'static>(&mut self, key: Key<V>) -> Option<V> {
        self.check_owner(key.owner);
        let slot = self.slots.get_mut(key.slot)?;
        match slot.take()?.downcast::<V>() {
            Ok(value) => Some(*value),
            Err(value) => {
                *slot = Some(value);
                None
            }
        }
    }

    /// Returns a reference to the value stored under `key`.
    #[must_use]
    pub fn get<V: 'static>(&self, key: Key<V>) -> Option<&V> {
        self.check_owner(key.owner);
        self.slots.get(key.slot)?.as_ref()?.downcast_ref()
    }

    /// Returns a mutable reference to the value stored under `key`.
    #[must_use]
    pub fn get_mut<V: 'static>(&mut self, key: Key<V>) -> Option<&mut V> {
        self.check_owner(key.owner);
        self.slots.get_mut(key.slot)?.as_mut()?.downcast_mut()
    }

    /// Creates a new unbounded queue.
    pub fn new_queue<V: 'static>(&mut self) -> QueueId<V> {
        QueueId(self.insert(Queue::default()))
    }

    /// Creates a new queue holding at most `capacity` values.
    pub fn new_bounded_queue<V: 'static>(&mut self, capacity: usize) -> QueueId<V> {
        QueueId(self.insert(Queue::bounded(capacity)))
    }

    /// Read access to a queue.
    ///
    /// # Panics
    ///
    /// Panics if the queue ID was issued by another state.
    #[must_use]
    pub fn queue<V: 'static>(&self, queue: QueueId<V>) -> &Queue<V> {
        self.get(queue.0)
            .expect("Queues are never removed from the state")
    }

    fn queue_mut<V: 'static>(&mut self, queue: QueueId<V>) -> &mut Queue<V> {
        self.get_mut(queue.0)
            .expect("Queues are never removed from the state")
    }

    /// Appends `value` to the back of `queue`.
    ///
    /// # Errors
    ///
    /// Gives the value back if the queue is full.
    pub fn send<V: 'static>(&mut self, queue: QueueId<V>, value: V) -> Result<(), V> {
        self.queue_mut(queue).push_back(value)
    }

    /// Takes the value at the front of `queue`, if any.
    pub fn recv<V: 'static>(&mut self, queue: QueueId<V>) -> Option<V> {
        self.queue_mut(queue).pop_front()
    }

    /// Removes the first occurrence of `value` from `queue`, keeping the order of the others.
    /// Returns `false` if the value was not queued.
    pub fn remove_from_queue<V: PartialEq + 'static>(
        &mut self,
        queue: QueueId<V>,
        value: &V,
    ) -> bool {
        self.queue_mut(queue).remove(value)
    }

    /// Number of values in `queue`.
    #[must_use]
    pub fn len<V: 'static>(&self, queue: QueueId<V>) -> usize {
        self.queue(queue).len()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_values() {
        let mut state = State::default();
        let number = state.insert(1_u32);
        let text = state.insert(String::from("agents"));

        *state.get_mut(number).unwrap() += 1;
        state.get_mut(text).unwrap().push('!');
        assert_eq!(state.get(number), Some(&2));
        assert_eq!(state.get(text).map(String::as_str), Some("agents!"));

        assert_eq!(state.remove(number), Some(2));
        assert_eq!(state.remove(number), None);
        assert_eq!(state.get(number), None);
        assert!(state.get(text).is_some());
    }

    #[test]
    fn test_keys_compare_by_identity() {
        let mut state = State::default();
        let a = state.insert(7);
        let b = state.insert(7);
        let copy = a;
        assert_eq!(a, copy);
        assert_ne!(a, b);
    }

    #[test]
    fn test_bounded_queue() {
        let mut state = State::default();
        let queue = state.new_bounded_queue::<u8>(2);
        assert_eq!(state.len(queue), 0);
        assert_eq!(state.send(queue, 1), Ok(()));
        assert_eq!(state.send(queue, 2), Ok(()));
        assert_eq!(state.send(queue, 3), Err(3));
        assert_eq!(state.recv(queue), Some(1));
        assert_eq!(state.send(queue, 3), Ok(()));
        assert_eq!(state.len(queue), 2);
    }

    #[test]
    fn test_remove_from_queue() {
        let mut state = State::default();
        let queue = state.new_queue::<char>();
        for c in "abcb".chars() {
            assert!(state.send(queue, c).is_ok());
        }
        assert!(state.remove_from_queue(queue, &'b'));
        assert!(!state.remove_from_queue(queue, &'x'));
        assert_eq!(
            state.queue(queue).iter().copied().collect::<String>(),
            "acb"
        );
        assert_eq!(state.recv(queue), Some('a'));
    }

    #[test]
    fn test_queues_of_same_type_are_separate() {
        let mut state = State::default();
        let first = state.new_queue::<u8>();
        let second = state.new_queue::<u8>();
        assert_ne!(first, second);
        assert!(state.send(first, 1).is_ok());
        assert_eq!(state.len(second), 0);
        assert_eq!(state.recv(second), None);
        assert_eq!(state.recv(first), Some(1));
    }
}
