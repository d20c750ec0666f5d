//! Tag events and tag sources

use std::collections::VecDeque;

use rowsync_core::SyncResult;

/// One structural event from a feed tokenizer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagEvent {
    /// A row begins
    StartEntry,
    /// A named cell of the current row
    Field { name: String, value: String },
    /// The current row's clock, as raw text
    Updated(String),
    /// The current row ends
    EndEntry,
    /// No more events will follow
    EndDocument,
}

impl TagEvent {
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        TagEvent::Field {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Pull-based producer of tag events
///
/// After `EndDocument` has been returned, further calls keep returning it.
pub trait TagSource {
    fn next_event(&mut self) -> SyncResult<TagEvent>;
}

impl<S: TagSource + ?Sized> TagSource for &mut S {
    fn next_event(&mut self) -> SyncResult<TagEvent> {
        (**self).next_event()
    }
}

/// Tag source over a prepared event list; exhaustion reads as `EndDocument`
#[derive(Clone, Debug, Default)]
pub struct VecTagSource {
    events: VecDeque<TagEvent>,
}

impl VecTagSource {
    pub fn new(events: impl IntoIterator<Item = TagEvent>) -> Self {
        VecTagSource {
            events: events.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

impl TagSource for VecTagSource {
    fn next_event(&mut self) -> SyncResult<TagEvent> {
        Ok(self.events.pop_front().unwrap_or(TagEvent::EndDocument))
    }
}
