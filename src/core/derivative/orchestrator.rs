//! Derivative orchestrator - walks a session and writes de-identified copies
//!
//! For every eligible DICOM series entry the orchestrator reads the files,
//! runs each decoded record through the [`Deidentifier`], and stores the
//! results in a sibling entry named by [`derivative_entry_name`]. Source
//! entries are never modified. A derivative left without files by a failed
//! write is filled in on the next run instead of blocking its source.

use crate::adapters::codec::ImageCodec;
use crate::adapters::store::RecordStore;
use crate::core::derivative::summary::{DeidError, DeidErrorType, DeidentificationSummary};
use crate::deidentification::audit::RecordAudit;
use crate::deidentification::{Deidentifier, DeidentifyOptions, RecordReport};
use crate::domain::{
    derivative_entry_name, derivative_file_name, DataType, EntryDescriptor, PhiScrubError,
    Result, RunId, Series, SeriesFile, SessionId,
};
use crate::logging::run_span;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

/// Why an entry was not processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySkipReason {
    /// Datatype other than a DICOM series
    NotDicomSeries,
    /// The entry is itself a derivative
    Derivative,
    /// A derivative of this entry already exists
    AlreadyDeidentified,
    /// The series holds no files
    EmptySeries,
}

impl fmt::Display for EntrySkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotDicomSeries => "not a DICOM series",
            Self::Derivative => "derivative entry",
            Self::AlreadyDeidentified => "already de-identified",
            Self::EmptySeries => "empty series",
        };
        f.write_str(reason)
    }
}

/// Decide whether an entry of the snapshot is eligible
///
/// `existing` holds every entry name known so far; `linked` holds every
/// `derived_from` value.
pub fn skip_reason(
    entry: &EntryDescriptor,
    existing: &HashSet<String>,
    linked: &HashSet<String>,
) -> Option<EntrySkipReason> {
    if entry.datatype != DataType::DicomSeries {
        return Some(EntrySkipReason::NotDicomSeries);
    }
    if entry.is_derivative() {
        return Some(EntrySkipReason::Derivative);
    }
    if linked.contains(&entry.name) || existing.contains(&derivative_entry_name(&entry.name)) {
        return Some(EntrySkipReason::AlreadyDeidentified);
    }
    None
}

/// A record transformed and ready to store
struct TransformedRecord {
    file: SeriesFile,
    report: RecordReport,
}

/// Derivative orchestrator
pub struct DerivativeOrchestrator {
    store: Arc<dyn RecordStore>,
    codec: Arc<dyn ImageCodec>,
    deidentifier: Arc<Deidentifier>,
}

impl DerivativeOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        store: Arc<dyn RecordStore>,
        codec: Arc<dyn ImageCodec>,
        deidentifier: Arc<Deidentifier>,
    ) -> Self {
        Self {
            store,
            codec,
            deidentifier,
        }
    }

    /// De-identify every eligible entry of a session
    ///
    /// Entries are handled one at a time in store order. A failure while
    /// reading or writing one entry is recorded in the summary and the run
    /// moves on; the source stays eligible for the next run. Only a failure
    /// to list the session or a fatal NER error is returned as `Err`.
    pub async fn deidentify(
        &self,
        session: &SessionId,
        options: &DeidentifyOptions,
    ) -> Result<DeidentificationSummary> {
        let run_id = RunId::generate();
        self.run(run_id, session, options)
            .instrument(run_span(&run_id, session))
            .await
    }

    async fn run(
        &self,
        run_id: RunId,
        session: &SessionId,
        options: &DeidentifyOptions,
    ) -> Result<DeidentificationSummary> {
        let start_time = Instant::now();
        let mut summary = DeidentificationSummary::new(run_id, options.dry_run);

        tracing::info!(
            session = %session,
            run_id = %run_id,
            dry_run = options.dry_run,
            destroy_pixels = options.destroy_pixels,
            use_transformers = options.use_transformers,
            "Starting de-identification"
        );

        let entries = self
            .store
            .list_entries(session)
            .await
            .map_err(|e| match e {
                PhiScrubError::SessionNotFound(_) => e,
                other => PhiScrubError::Store(format!(
                    "Failed to list entries of session {session}: {other}"
                )),
            })?;

        let mut existing: HashSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        // source name -> derivative entry linked to it
        let derivatives_of: HashMap<String, String> = entries
            .iter()
            .filter_map(|e| e.derived_from.clone().map(|source| (source, e.name.clone())))
            .collect();
        let linked: HashSet<String> = derivatives_of.keys().cloned().collect();

        for entry in &entries {
            summary.entries_seen += 1;

            let mut resumed = None;
            if let Some(reason) = skip_reason(entry, &existing, &linked) {
                if reason == EntrySkipReason::AlreadyDeidentified {
                    if let Some(derivative) = derivatives_of.get(&entry.name) {
                        if self.is_incomplete(session, derivative).await {
                            resumed = Some(derivative.clone());
                        }
                    }
                }
                if resumed.is_none() {
                    crate::log_entry_skipped!(session, entry.name, reason);
                    summary.entries_skipped += 1;
                    continue;
                }
            }

            let derivative = match &resumed {
                Some(derivative) => {
                    tracing::info!(
                        session = %session,
                        entry = %entry.name,
                        derivative = %derivative,
                        "Resuming incomplete derivative"
                    );
                    derivative.clone()
                }
                None => derivative_entry_name(&entry.name),
            };
            let series = match self.store.read_series(session, &entry.name).await {
                Ok(series) => series,
                Err(e) => {
                    tracing::error!(
                        session = %session,
                        entry = %entry.name,
                        error = %e,
                        "Failed to read series"
                    );
                    summary.entries_failed += 1;
                    summary.add_error(
                        DeidError::new(DeidErrorType::Read, e.to_string())
                            .with_context(entry.name.clone()),
                    );
                    continue;
                }
            };

            if series.is_empty() {
                crate::log_entry_skipped!(session, entry.name, EntrySkipReason::EmptySeries);
                summary.entries_skipped += 1;
                continue;
            }

            let transformed = self
                .transform_series(&entry.name, series, options, &mut summary)
                .await?;

            if transformed.is_empty() {
                tracing::warn!(
                    session = %session,
                    entry = %entry.name,
                    "No record could be transformed, derivative not created"
                );
                summary.entries_failed += 1;
                continue;
            }

            let record_count = transformed.len();
            let mut files = Vec::with_capacity(record_count);
            let mut audited = Vec::with_capacity(record_count);
            for record in transformed {
                audited.push((record.file.name.clone(), record.report));
                files.push(record.file);
            }

            if !options.dry_run {
                if let Err(e) = self
                    .write_derivative(
                        session,
                        &entry.name,
                        &derivative,
                        Series::new(files),
                        resumed.is_some(),
                    )
                    .await
                {
                    tracing::error!(
                        session = %session,
                        entry = %entry.name,
                        derivative = %derivative,
                        error = %e,
                        "Failed to write derivative"
                    );
                    summary.entries_failed += 1;
                    summary.add_error(
                        DeidError::new(DeidErrorType::Write, e.to_string())
                            .with_context(derivative),
                    );
                    continue;
                }
                existing.insert(derivative.clone());
                summary.derivatives_created.push(derivative.clone());
            }

            self.write_audit(run_id, session, &entry.name, audited, options, &mut summary);

            summary.entries_processed += 1;
            tracing::info!(
                session = %session,
                entry = %entry.name,
                derivative = %derivative,
                records = record_count,
                dry_run = options.dry_run,
                "Entry de-identified"
            );
        }

        let summary = summary.with_duration(start_time.elapsed());
        crate::log_deidentify_complete!(
            session,
            summary.derivatives_created.len(),
            summary.duration
        );
        Ok(summary)
    }

    /// Decode, de-identify and re-encode every file of a series, in order
    ///
    /// Records that fail are counted and dropped; a fatal error aborts.
    async fn transform_series(
        &self,
        entry: &str,
        series: Series,
        options: &DeidentifyOptions,
        summary: &mut DeidentificationSummary,
    ) -> Result<Vec<TransformedRecord>> {
        let mut transformed = Vec::with_capacity(series.len());

        for file in series.files {
            let context = format!("{entry}/{}", file.name);

            let record = match self.codec.decode(&file.content) {
                Ok(record) => record,
                Err(e) => {
                    crate::log_record_failed!(entry, file.name, e);
                    summary.records_failed += 1;
                    summary.add_error(
                        DeidError::new(DeidErrorType::Decode, e.to_string()).with_context(context),
                    );
                    continue;
                }
            };

            let (record, report) = match self.deidentifier.process_record(record, options).await {
                Ok(processed) => processed,
                Err(e) if e.is_fatal() => {
                    tracing::error!(entry = %entry, file = %file.name, error = %e, "Aborting run");
                    return Err(e);
                }
                Err(e) => {
                    crate::log_record_failed!(entry, file.name, e);
                    summary.records_failed += 1;
                    summary.add_error(
                        DeidError::new(DeidErrorType::Process, e.to_string())
                            .with_context(context),
                    );
                    continue;
                }
            };

            let content = match self.codec.encode(&record) {
                Ok(content) => content,
                Err(e) => {
                    crate::log_record_failed!(entry, file.name, e);
                    summary.records_failed += 1;
                    summary.add_error(
                        DeidError::new(DeidErrorType::Encode, e.to_string()).with_context(context),
                    );
                    continue;
                }
            };

            summary.record(&report);
            transformed.push(TransformedRecord {
                file: SeriesFile::new(derivative_file_name(&file.name), content),
                report,
            });
        }

        Ok(transformed)
    }

    /// Store the derivative series, creating the entry unless a previous
    /// run already did
    async fn write_derivative(
        &self,
        session: &SessionId,
        source: &str,
        derivative: &str,
        series: Series,
        resume: bool,
    ) -> Result<()> {
        if !resume {
            self.store
                .create_entry(session, derivative, DataType::DicomSeries, Some(source))
                .await?;
        }
        self.store.write_series(session, derivative, series).await
    }

    /// A derivative entry left without files by an interrupted write
    async fn is_incomplete(&self, session: &SessionId, derivative: &str) -> bool {
        match self.store.read_series(session, derivative).await {
            Ok(series) => series.is_empty(),
            Err(e) => {
                tracing::warn!(
                    session = %session,
                    derivative = %derivative,
                    error = %e,
                    "Failed to inspect existing derivative"
                );
                false
            }
        }
    }

    /// One audit line per transformed record, named by its output file
    fn write_audit(
        &self,
        run_id: RunId,
        session: &SessionId,
        entry: &str,
        records: Vec<(String, RecordReport)>,
        options: &DeidentifyOptions,
        summary: &mut DeidentificationSummary,
    ) {
        let Some(audit) = self.deidentifier.audit() else {
            return;
        };

        for (output_name, report) in records {
            let mut line = RecordAudit::new(
                run_id,
                session.as_str(),
                entry,
                report.record_id,
                output_name.clone(),
            );
            line.dry_run = options.dry_run;
            line.pixels_destroyed = report.pixels_destroyed;
            line.fields = report.changes;

            if let Err(e) = audit.log_record(&line) {
                tracing::warn!(
                    entry = %entry,
                    file = %output_name,
                    error = %e,
                    "Failed to write audit entry"
                );
                summary.add_error(
                    DeidError::new(DeidErrorType::Audit, e.to_string())
                        .with_context(format!("{entry}/{output_name}")),
                );
            }
        }
    }
}

impl fmt::Debug for DerivativeOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivativeOrchestrator")
            .field("deidentifier", &self.deidentifier)
            .finish_non_exhaustive()
    }
}
