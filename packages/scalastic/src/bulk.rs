//! Bulk stream rewriting
//!
//! Points every action of a bulk stream at a partition's index alias and
//! stamps the partition selector on create/index documents, in one pass.

use crate::domain::{BulkEntry, BulkOp};
use crate::error::{PartitionError, Result};
use crate::selector::PartitionSelector;

/// Rewrites bulk streams for one partition
#[derive(Debug, Clone, Copy)]
pub struct BulkRewriter<'a> {
    index_endpoint: &'a str,
    selector: &'a PartitionSelector,
}

impl<'a> BulkRewriter<'a> {
    pub fn new(index_endpoint: &'a str, selector: &'a PartitionSelector) -> Self {
        Self {
            index_endpoint,
            selector,
        }
    }

    /// Rewrite `entries` in place order
    ///
    /// Entry count and order are preserved. A payload entry takes the verb of
    /// the closest preceding action; a payload with no action before it is a
    /// [`crate::ErrorKind::MalformedBulk`] error.
    pub fn rewrite(&self, entries: Vec<BulkEntry>) -> Result<Vec<BulkEntry>> {
        let mut pending: Option<BulkOp> = None;
        let mut rewritten = Vec::with_capacity(entries.len());

        for entry in entries {
            let entry = match entry {
                BulkEntry::Action(mut action) => {
                    action.meta.index = Some(self.index_endpoint.to_string());
                    if action.op.stamps_payload() {
                        if let Some(data) = action.meta.data.as_mut() {
                            self.selector.apply_to(data)?;
                        }
                    }
                    pending = Some(action.op);
                    BulkEntry::Action(action)
                }
                BulkEntry::Payload(mut body) => match pending {
                    None => {
                        return Err(PartitionError::malformed_bulk(format!(
                            "Unexpected entry without a preceding action: {}",
                            body
                        )))
                    }
                    Some(op) => {
                        if op.stamps_payload() {
                            self.selector.apply_to(&mut body)?;
                        }
                        BulkEntry::Payload(body)
                    }
                },
            };
            rewritten.push(entry);
        }

        Ok(rewritten)
    }
}
