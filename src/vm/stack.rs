//! Auxiliary Stack
//!
//! A frame-pointer discipline for guest toolchains that expect a native call
//! stack but have no stack-frame concept of their own. `top` is the current
//! frame pointer; `saved` is a LIFO list of frame pointers pushed on entry and
//! restored on exit.
//!
//! ```text
//! push()          saved = [.., top]       returns top
//! increment(n)    top += n                returns top
//! top()           -                       returns top
//! pop()           top = saved.pop()       returns top
//! ```
//!
//! Increments only move the current top, never a saved entry, so a `pop`
//! always restores exactly the value seen by its matching `push`.

use super::error::{LinkError, LinkResult};

/// The `StackTop` / `CallStack` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuxStack {
    top: i64,
    saved: Vec<i64>,
}

impl AuxStack {
    /// Create a stack whose current top starts at `top`.
    pub fn new(top: i64) -> Self {
        Self {
            top,
            saved: Vec::new(),
        }
    }

    /// Save the current top and return it unchanged.
    pub fn push(&mut self) -> i64 {
        self.saved.push(self.top);
        self.top
    }

    /// Move the current top by `delta` and return the new top.
    pub fn increment(&mut self, delta: i64) -> i64 {
        self.top = self.top.wrapping_add(delta);
        self.top
    }

    /// Current top.
    pub fn top(&self) -> i64 {
        self.top
    }

    /// Restore the most recently saved top.
    ///
    /// Fails with [`LinkError::StackUnderflow`] when nothing is saved; the
    /// stack is left untouched in that case.
    pub fn pop(&mut self) -> LinkResult<i64> {
        let restored = self.saved.pop().ok_or(LinkError::StackUnderflow)?;
        self.top = restored;
        Ok(self.top)
    }

    /// Number of saved frames.
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    /// Saved frames, oldest first.
    pub fn saved(&self) -> &[i64] {
        &self.saved
    }
}
