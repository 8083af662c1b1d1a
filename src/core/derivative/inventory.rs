//! Record inventory
//!
//! Counts the files of DICOM series entries without decoding them.

use crate::adapters::store::RecordStore;
use crate::domain::{DataType, PhiScrubError, Result, SessionId};

/// Count records in a session
///
/// With `entry` set, counts the files of that entry only; a missing entry
/// counts as zero. Without it, sums over every DICOM series entry,
/// derivatives included.
pub async fn count_records(
    store: &dyn RecordStore,
    session: &SessionId,
    entry: Option<&str>,
) -> Result<usize> {
    if let Some(name) = entry {
        return match store.read_series(session, name).await {
            Ok(series) => Ok(series.len()),
            Err(PhiScrubError::EntryNotFound(_)) => {
                tracing::warn!(session = %session, entry = %name, "Entry not found, counting 0");
                Ok(0)
            }
            Err(e) => Err(e),
        };
    }

    let mut total = 0;
    for descriptor in store.list_entries(session).await? {
        if descriptor.datatype != DataType::DicomSeries {
            continue;
        }
        let count = store.read_series(session, &descriptor.name).await?.len();
        tracing::debug!(session = %session, entry = %descriptor.name, count, "Counted entry");
        total += count;
    }

    Ok(total)
}
