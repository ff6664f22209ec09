use std::collections::VecDeque;

/// FIFO queue of values, optionally limited in size.
///
/// Values enter at the back and normally leave from the front. A value can also leave from the
/// middle with [`Queue::remove`], in which case the others keep their relative order.
///
/// ```
/// # use simkit::Queue;
/// let mut unbounded: Queue<u32> = Queue::default();
/// assert!(unbounded.push_back(1).is_ok());
///
/// let mut bounded = Queue::bounded(1);
/// assert_eq!(bounded.push_back('a'), Ok(()));
/// assert_eq!(bounded.push_back('b'), Err('b'));
/// ```
#[derive(Debug)]
pub struct Queue<T> {
    inner: VecDeque<T>,
    limit: Option<usize>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            inner: VecDeque::new(),
            limit: None,
        }
    }
}

impl<T> Queue<T> {
    /// Creates a queue holding at most `limit` values.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self {
            inner: VecDeque::with_capacity(limit),
            limit: Some(limit),
        }
    }

    /// Appends `value` at the back.
    ///
    /// # Errors
    ///
    /// Gives the value back if the queue is full.
    pub fn push_back(&mut self, value: T) -> Result<(), T> {
        match self.limit {
            Some(limit) if self.inner.len() >= limit => Err(value),
            _ => {
                self.inner.push_back(value);
                Ok(())
            }
        }
    }

    /// Takes the value at the front.
    pub fn pop_front(&mut self) -> Option<T> {
        self.inner.pop_front()
    }

    /// The value at the front.
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.inner.front()
    }

    /// Number of queued values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }
}

impl<T: PartialEq> Queue<T> {
    /// Checks if an element equal to `value` is in the queue.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.inner.contains(value)
    }

    /// Removes the first element equal to `value`, wherever it is in the queue.
    /// Returns `false` if no such element was found.
    pub fn remove(&mut self, value: &T) -> bool {
        match self.inner.iter().position(|v| v == value) {
            Some(pos) => self.inner.remove(pos).is_some(),
            None => false,
        }
    }
}
