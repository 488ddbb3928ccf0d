//! Lexical frames and the frame stack.
//!
//! The [`Stack`] is an ordered list of [`Frame`]s. Index 0 is the global frame;
//! it is created with the stack and can never be popped. Lookups scan from the
//! top down and the first binding found wins.

use std::collections::HashMap;

use crate::ast::Name;
use crate::object::Object;

/// One scope's bindings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    bindings: HashMap<Name, Object>,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    pub fn get(&self, name: &str) -> Option<&Object> {
        self.bindings.get(name)
    }

    pub fn insert(&mut self, name: Name, value: Object) -> Option<Object> {
        self.bindings.insert(name, value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Object> {
        self.bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Combine two frames; bindings from `other` win on conflict
    pub fn merge(mut self, other: Frame) -> Frame {
        self.merge_from(other);
        self
    }

    /// In-place variant of [`Frame::merge`]
    pub fn merge_from(&mut self, other: Frame) {
        self.bindings.extend(other.bindings);
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.bindings.values()
    }

    /// Bindings sorted by name
    pub fn sorted(&self) -> Vec<(&Name, &Object)> {
        let mut entries: Vec<_> = self.bindings.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl FromIterator<(Name, Object)> for Frame {
    fn from_iter<I: IntoIterator<Item = (Name, Object)>>(iter: I) -> Self {
        Frame {
            bindings: iter.into_iter().collect(),
        }
    }
}

/// Ordered frames; index 0 is global
#[derive(Debug, Clone, PartialEq)]
pub struct Stack {
    frames: Vec<Frame>,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl Stack {
    /// Stack holding only an empty global frame
    pub fn new() -> Self {
        Stack {
            frames: vec![Frame::new()],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Never true: the global frame always exists
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Pop the top frame. The global frame is never removed.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn global(&self) -> &Frame {
        &self.frames[0]
    }

    pub fn global_mut(&mut self) -> &mut Frame {
        &mut self.frames[0]
    }

    pub fn top(&self) -> &Frame {
        let last = self.frames.len() - 1;
        &self.frames[last]
    }

    pub fn top_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    /// Index of the top frame
    pub fn top_index(&self) -> usize {
        self.frames.len() - 1
    }

    /// Find a binding scanning top to bottom; returns the frame index with it
    pub fn lookup(&self, name: &str) -> Option<(usize, &Object)> {
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, frame)| frame.get(name).map(|v| (i, v)))
    }

    /// Drop every frame above the global one
    pub fn truncate_to_global(&mut self) {
        self.frames.truncate(1);
    }

    /// Frames from global (index 0) to top
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}
