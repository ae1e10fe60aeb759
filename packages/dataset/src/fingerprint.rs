//! Cheap structural hash used to decide whether cached state is stale.
//!
//! The fingerprint covers the shape, the header, and the first and last
//! rows. It is not a content hash: an edit in the middle of the sheet that
//! keeps the shape unchanged is not detected.

use std::fmt::Write as _;

use crate::{CellValue, Dataset};

/// Fingerprint of a dataset with no rows.
pub const EMPTY_FINGERPRINT: &str = "empty";

/// Computes the MD5 hex fingerprint of `dataset`.
#[must_use]
pub fn fingerprint(dataset: &Dataset) -> String {
    if dataset.is_empty() {
        return EMPTY_FINGERPRINT.to_string();
    }

    let mut buf = String::new();
    write!(buf, "({}, {})", dataset.len(), dataset.columns().len()).ok();
    write!(buf, "{:?}", dataset.columns()).ok();
    if let Some(first) = dataset.records().next() {
        write_row(&mut buf, first.values());
    }
    if let Some(last) = dataset.records().next_back() {
        write_row(&mut buf, last.values());
    }

    let mut context = md5::Context::new();
    context.consume(buf.as_bytes());
    format!("{:x}", context.finalize())
}

fn write_row(buf: &mut String, values: &[CellValue]) {
    buf.push('[');
    for value in values {
        write!(buf, "{value:?},").ok();
    }
    buf.push(']');
}
