//! Queue identifiers and the return-path stack threaded through messages.
//!
//! A request entering the server carries the id of the queue that will
//! receive its reply. Every service that forwards the request pushes its own
//! id, and every service on the reply path pops its id before handing the
//! reply on, so the reply retraces the forward path exactly.

use std::fmt;

/// Address of a registered message queue. `QueueId::NONE` (0) is never
/// assigned to a live queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct QueueId(pub u32);

impl QueueId {
    pub const NONE: QueueId = QueueId(0);

    #[must_use]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "queue#{}", self.0)
    }
}

impl From<u32> for QueueId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Errors from `QueueIdStack` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QueueIdStackError {
    #[error("queue id stack is full ({} entries)", QueueIdStack::CAPACITY)]
    Overflow,
    #[error("queue id stack is empty")]
    Empty,
}

/// Fixed-capacity LIFO of queue ids. Copying a stack copies its contents.
#[derive(Clone, Copy)]
pub struct QueueIdStack {
    items: [QueueId; QueueIdStack::CAPACITY],
    len: usize,
}

impl QueueIdStack {
    /// Maximum hop depth: dispatcher, provider manager, provider, plus two
    /// intermediate services.
    pub const CAPACITY: usize = 5;

    #[must_use]
    pub fn new() -> Self {
        Self {
            items: [QueueId::NONE; Self::CAPACITY],
            len: 0,
        }
    }

    /// Stack holding a single id.
    #[must_use]
    pub fn with_one(id: QueueId) -> Self {
        let mut stack = Self::new();
        stack.items[0] = id;
        stack.len = 1;
        stack
    }

    /// Stack holding `bottom` with `top` pushed above it.
    #[must_use]
    pub fn with_two(bottom: QueueId, top: QueueId) -> Self {
        let mut stack = Self::with_one(bottom);
        stack.items[1] = top;
        stack.len = 2;
        stack
    }

    /// # Errors
    ///
    /// Returns `QueueIdStackError::Overflow` if the stack already holds
    /// `CAPACITY` ids. The stack is left unchanged.
    pub fn push(&mut self, id: QueueId) -> Result<(), QueueIdStackError> {
        if self.is_full() {
            return Err(QueueIdStackError::Overflow);
        }
        self.items[self.len] = id;
        self.len += 1;
        Ok(())
    }

    /// Removes and returns the top id.
    ///
    /// # Errors
    ///
    /// Returns `QueueIdStackError::Empty` if there is nothing to pop.
    pub fn pop(&mut self) -> Result<QueueId, QueueIdStackError> {
        if self.is_empty() {
            return Err(QueueIdStackError::Empty);
        }
        self.len -= 1;
        let id = self.items[self.len];
        self.items[self.len] = QueueId::NONE;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `QueueIdStackError::Empty` on an empty stack.
    pub fn top(&self) -> Result<QueueId, QueueIdStackError> {
        self.as_slice().last().copied().ok_or(QueueIdStackError::Empty)
    }

    /// Mutable access to the top id, for rewriting the reply address in place.
    ///
    /// # Errors
    ///
    /// Returns `QueueIdStackError::Empty` on an empty stack.
    pub fn top_mut(&mut self) -> Result<&mut QueueId, QueueIdStackError> {
        let len = self.len;
        self.items[..len].last_mut().ok_or(QueueIdStackError::Empty)
    }

    /// A copy of this stack without its top entry. `self` is not modified.
    ///
    /// # Errors
    ///
    /// Returns `QueueIdStackError::Empty` on an empty stack.
    pub fn copy_and_pop(&self) -> Result<Self, QueueIdStackError> {
        let mut copy = *self;
        copy.pop()?;
        Ok(copy)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == Self::CAPACITY
    }

    /// Ids from bottom to top.
    #[must_use]
    pub fn as_slice(&self) -> &[QueueId] {
        &self.items[..self.len]
    }
}

impl Default for QueueIdStack {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for QueueIdStack {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for QueueIdStack {}

impl fmt::Debug for QueueIdStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
