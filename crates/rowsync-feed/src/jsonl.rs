//! JSON-lines tag source
//!
//! One JSON object per line, one row per object:
//!
//! ```text
//! {"updated": "2010-05-19T17:30:00Z", "companyname": "280 North, Inc.", "companypod": "Google APIs"}
//! ```
//!
//! Scalar cells are stringified, `null` cells are treated as absent, and
//! nested arrays or objects are structural errors. Blank lines are skipped.
//! Invalid UTF-8 is decoded lossily; only a failing reader is an I/O error.

use std::collections::VecDeque;
use std::io::BufRead;

use rowsync_core::{SyncError, SyncResult, UPDATED_FIELD};
use serde_json::Value;

use crate::{TagEvent, TagSource};

pub struct JsonLinesSource<R> {
    input: R,
    pending: VecDeque<TagEvent>,
    line: Vec<u8>,
    line_no: usize,
    rows: usize,
    updated_key: String,
    ended: bool,
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(input: R) -> Self {
        JsonLinesSource {
            input,
            pending: VecDeque::new(),
            line: Vec::new(),
            line_no: 0,
            rows: 0,
            updated_key: UPDATED_FIELD.to_string(),
            ended: false,
        }
    }

    /// Read the row clock from `key` instead of `updated`
    pub fn with_updated_key(mut self, key: impl Into<String>) -> Self {
        self.updated_key = key.into();
        self
    }

    fn expand(&mut self, value: Value) -> SyncResult<()> {
        let Value::Object(cells) = value else {
            return Err(SyncError::malformed(
                self.rows,
                format!("line {} is not a JSON object", self.line_no),
            ));
        };

        self.pending.push_back(TagEvent::StartEntry);
        for (name, cell) in cells {
            let text = match cell {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Array(_) | Value::Object(_) => {
                    self.pending.clear();
                    return Err(SyncError::malformed(
                        self.rows,
                        format!("line {}: cell {:?} is not a scalar", self.line_no, name),
                    ));
                }
            };
            if name == self.updated_key {
                self.pending.push_back(TagEvent::Updated(text));
            } else {
                self.pending.push_back(TagEvent::Field { name, value: text });
            }
        }
        self.pending.push_back(TagEvent::EndEntry);
        self.rows += 1;
        Ok(())
    }
}

impl<R: BufRead> TagSource for JsonLinesSource<R> {
    fn next_event(&mut self) -> SyncResult<TagEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            if self.ended {
                return Ok(TagEvent::EndDocument);
            }

            self.line.clear();
            if self.input.read_until(b'\n', &mut self.line)? == 0 {
                self.ended = true;
                continue;
            }
            self.line_no += 1;

            let text = String::from_utf8_lossy(&self.line);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(text).map_err(|e| {
                SyncError::malformed(self.rows, format!("line {}: {}", self.line_no, e))
            })?;
            self.expand(value)?;
        }
    }
}
