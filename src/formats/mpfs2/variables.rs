use std::io::Cursor;
use std::ops::ControlFlow;

use binrw::BinReaderExt;
use indexmap::IndexMap;
use log::{debug, warn};

use super::decoder::RecordKind;
use super::error::FormatError;
use super::include::*;
use crate::utils::common;

/// Outcome of the variable pass. Whatever was collected before the pass
/// stopped is kept.
#[derive(Debug, Default)]
pub struct VariableScan {
    pub variables: IndexMap<u32, String>,
    pub issues: Vec<FormatError>,
}

/// Name of the variable whose `~name~` marker starts at `position`.
/// A position that does not hold a `~` resolves to `<no var>`.
pub fn resolve_var(image: &[u8], position: u64) -> Result<String, FormatError> {
    let start = usize::try_from(position).ok().and_then(|p| image.get(p));
    match start {
        None => Err(FormatError::truncated("variable", position, 1, image.len())),
        Some(&b) if b != VAR_DELIMITER => Ok(NO_VAR.to_string()),
        Some(_) => common::bytes_until(image, position + 1, VAR_DELIMITER)
            .map(common::latin1_string)
            .ok_or_else(|| {
                let remaining = (image.len() as u64).saturating_sub(position);
                FormatError::truncated("variable", position, remaining + 1, image.len())
            }),
    }
}

/// Walks the table once, left to right, reading the index of every
/// has-index record from its companion. Stops at the first malformed
/// companion or the first id that resolves to two names.
pub fn find_variables(image: &[u8], records: &[FileRecord], kinds: &[RecordKind]) -> VariableScan {
    let mut scan = VariableScan::default();

    for (i, record) in records.iter().enumerate() {
        if !record.has_index() || matches!(kinds[i], RecordKind::Index { .. }) {
            continue;
        }

        let companion = match kinds.get(i + 1) {
            Some(RecordKind::Index { owner }) if *owner == i => &records[i + 1],
            _ => {
                debug!("Variable scan stopped at record {}, its index is malformed", i);
                break;
            }
        };

        if scan_index(image, record, companion, &mut scan).is_break() {
            break;
        }
    }

    scan
}

fn scan_index(image: &[u8], owner: &FileRecord, companion: &FileRecord, scan: &mut VariableScan) -> ControlFlow<()> {
    let Some(entries) = common::slice_at(image, companion.data_ptr as u64, companion.len as u64) else {
        scan.issues.push(FormatError::truncated("index", companion.data_ptr as u64, companion.len as u64, image.len()));
        return ControlFlow::Continue(());
    };

    if entries.len() % INDEX_ENTRY_SIZE != 0 {
        warn!("Index at {:#x} has {} trailing bytes, ignoring them", companion.data_ptr, entries.len() % INDEX_ENTRY_SIZE);
    }

    let mut reader = Cursor::new(entries);
    for _i in 0..entries.len() / INDEX_ENTRY_SIZE {
        let offset = companion.data_ptr as u64 + reader.position();
        let entry: IndexEntry = match reader.read_le() {
            Ok(entry) => entry,
            Err(_) => {
                scan.issues.push(FormatError::truncated("index", offset, INDEX_ENTRY_SIZE as u64, image.len()));
                break;
            }
        };

        let name = match resolve_var(image, owner.data_ptr as u64 + entry.offset as u64) {
            Ok(name) => name,
            Err(issue) => {
                scan.issues.push(issue);
                continue;
            }
        };

        match scan.variables.get(&entry.var_id) {
            None => {
                scan.variables.insert(entry.var_id, name);
            }
            Some(known) if *known == name => {}
            Some(known) => {
                scan.issues.push(FormatError::InconsistentVariable {
                    id: entry.var_id,
                    first: known.clone(),
                    second: name,
                });
                return ControlFlow::Break(());
            }
        }
    }

    ControlFlow::Continue(())
}
