//! Entry readers
//!
//! An entry reader yields one [`Entry`] per feed row, or `None` at end of
//! stream. Structural breakage (a row cut short by the end of the document,
//! a nested row, a row without a usable clock) is a `MalformedFeed` error
//! and ends the pass.

use std::collections::VecDeque;

use rowsync_core::{Entry, SyncError, SyncResult, Timestamp};
use tracing::trace;

use crate::{parse_updated, TagEvent, TagSource};

/// Pull-based entry stream consumed by the reconciliation engine
pub trait EntryReader {
    /// Next row, or `None` once the document has ended
    fn advance(&mut self) -> SyncResult<Option<Entry>>;

    /// Zero-based index of the row most recently started
    fn row(&self) -> usize;
}

impl<R: EntryReader + ?Sized> EntryReader for &mut R {
    fn advance(&mut self) -> SyncResult<Option<Entry>> {
        (**self).advance()
    }

    fn row(&self) -> usize {
        (**self).row()
    }
}

impl<R: EntryReader + ?Sized> EntryReader for Box<R> {
    fn advance(&mut self) -> SyncResult<Option<Entry>> {
        (**self).advance()
    }

    fn row(&self) -> usize {
        (**self).row()
    }
}

/// Assembles entries from a tag source.
///
/// Cells and clocks outside any row (document-level tags) are ignored.
pub struct TagEntryReader<S> {
    source: S,
    /// Rows started so far
    started: usize,
    done: bool,
}

impl<S: TagSource> TagEntryReader<S> {
    pub fn new(source: S) -> Self {
        TagEntryReader {
            source,
            started: 0,
            done: false,
        }
    }

    pub fn into_inner(self) -> S {
        self.source
    }

    fn read_entry(&mut self) -> SyncResult<Entry> {
        let row = self.row();
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut updated: Option<Timestamp> = None;

        loop {
            match self.source.next_event()? {
                TagEvent::Field { name, value } => fields.push((name, value)),
                TagEvent::Updated(text) => {
                    let parsed = parse_updated(&text).ok_or_else(|| {
                        SyncError::malformed(row, format!("unparseable updated value {:?}", text))
                    })?;
                    updated = Some(parsed);
                }
                TagEvent::EndEntry => {
                    let updated = updated
                        .ok_or_else(|| SyncError::malformed(row, "entry has no updated clock"))?;
                    let mut entry = Entry::new(updated);
                    for (name, value) in fields {
                        entry.insert(name, value);
                    }
                    return Ok(entry);
                }
                TagEvent::StartEntry => {
                    return Err(SyncError::malformed(row, "entry opened inside another entry"));
                }
                TagEvent::EndDocument => {
                    self.done = true;
                    return Err(SyncError::malformed(row, "document ended inside an entry"));
                }
            }
        }
    }
}

impl<S: TagSource> EntryReader for TagEntryReader<S> {
    fn advance(&mut self) -> SyncResult<Option<Entry>> {
        if self.done {
            return Ok(None);
        }

        loop {
            match self.source.next_event()? {
                TagEvent::StartEntry => {
                    self.started += 1;
                    let entry = self.read_entry()?;
                    trace!(row = self.row(), %entry, "read feed entry");
                    return Ok(Some(entry));
                }
                TagEvent::EndDocument => {
                    self.done = true;
                    return Ok(None);
                }
                TagEvent::EndEntry => {
                    return Err(SyncError::malformed(
                        self.started,
                        "entry closed without being opened",
                    ));
                }
                TagEvent::Field { .. } | TagEvent::Updated(_) => {}
            }
        }
    }

    fn row(&self) -> usize {
        self.started.saturating_sub(1)
    }
}

/// Reader over rows that are already parsed
#[derive(Clone, Debug, Default)]
pub struct MemoryReader {
    entries: VecDeque<Entry>,
    started: usize,
}

impl MemoryReader {
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        MemoryReader {
            entries: entries.into_iter().collect(),
            started: 0,
        }
    }
}

impl EntryReader for MemoryReader {
    fn advance(&mut self) -> SyncResult<Option<Entry>> {
        let entry = self.entries.pop_front();
        if entry.is_some() {
            self.started += 1;
        }
        Ok(entry)
    }

    fn row(&self) -> usize {
        self.started.saturating_sub(1)
    }
}
