//! Integration tests for derivative orchestration
//!
//! These tests run whole sessions through the orchestrator against the
//! in-memory record store and the JSON image codec.

use phiscrub::adapters::codec::{ImageCodec, JsonImageCodec};
use phiscrub::adapters::memory::InMemoryRecordStore;
use phiscrub::adapters::store::RecordStore;
use phiscrub::core::derivative::{count_records, DeidErrorType, DerivativeOrchestrator};
use phiscrub::deidentification::ner::HttpEntityRecognizer;
use phiscrub::deidentification::{
    Deidentifier, DeidentifyOptions, NerFailurePolicy, NerScrubber, PhiCategory, RedactionEngine,
};
use phiscrub::domain::{
    DataType, DicomTag, EntryDescriptor, FieldValue, ImageRecord, MetadataField, PhiScrubError,
    PixelData, Series, SeriesFile, SessionId, Vr,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn session() -> SessionId {
    SessionId::new("MR-0042").unwrap()
}

fn image(id: &str) -> ImageRecord {
    ImageRecord::new(id)
        .with_field(
            MetadataField::new(
                DicomTag::PATIENT_NAME,
                Vr::PN,
                FieldValue::Text("Doe^John".to_string()),
            )
            .with_keyword("PatientName"),
        )
        .with_field(
            MetadataField::new(
                DicomTag::INSTITUTION_NAME,
                Vr::LO,
                FieldValue::Text("Liverpool Hospital".to_string()),
            )
            .with_keyword("InstitutionName"),
        )
        .with_field(
            MetadataField::new(
                DicomTag::STUDY_DESCRIPTION,
                Vr::LO,
                FieldValue::Text("axial t2 flair".to_string()),
            )
            .with_keyword("StudyDescription"),
        )
        .with_field(MetadataField::new(
            DicomTag::ROWS,
            Vr::US,
            FieldValue::Integer(vec![4]),
        ))
        .with_field(MetadataField::new(
            DicomTag::COLUMNS,
            Vr::US,
            FieldValue::Integer(vec![4]),
        ))
        .with_pixel_data(PixelData {
            rows: 4,
            columns: 4,
            frames: 1,
            samples_per_pixel: 1,
            bits_allocated: 8,
            data: (1..=16).collect(),
        })
}

fn encoded(id: &str) -> Vec<u8> {
    JsonImageCodec::new().encode(&image(id)).unwrap()
}

fn dicom_series(entry: &str, files: usize) -> Series {
    Series::new(
        (1..=files)
            .map(|i| SeriesFile::new(format!("{i}.dcm"), encoded(&format!("{entry}.{i}"))))
            .collect(),
    )
}

/// Three DICOM series with two files each, plus one report
fn seeded_store() -> Arc<InMemoryRecordStore> {
    let store = InMemoryRecordStore::new();
    for name in ["CT/DICOM", "MR_T1/DICOM", "PET"] {
        store
            .insert_entry(
                &session(),
                EntryDescriptor::new(name, DataType::DicomSeries),
                dicom_series(name, 2),
            )
            .unwrap();
    }
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("report.pdf", DataType::Other("pdf".to_string())),
            Series::new(vec![SeriesFile::new("report.pdf", b"%PDF-1.7".to_vec())]),
        )
        .unwrap();
    Arc::new(store)
}

fn orchestrator(store: Arc<InMemoryRecordStore>) -> DerivativeOrchestrator {
    DerivativeOrchestrator::new(
        store,
        Arc::new(JsonImageCodec::new()),
        Arc::new(Deidentifier::with_defaults().unwrap()),
    )
}

async fn read_record(store: &InMemoryRecordStore, entry: &str, file: &str) -> ImageRecord {
    let series = store.read_series(&session(), entry).await.unwrap();
    let file = series
        .files
        .iter()
        .find(|f| f.name == file)
        .unwrap_or_else(|| panic!("{entry}/{file} not found"));
    JsonImageCodec::new().decode(&file.content).unwrap()
}

#[tokio::test]
async fn test_creates_one_derivative_per_series() {
    let store = seeded_store();
    let summary = orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.entries_seen, 4);
    assert_eq!(summary.entries_processed, 3);
    assert_eq!(summary.entries_skipped, 1);
    assert_eq!(summary.records_processed, 6);
    assert_eq!(summary.records_failed, 0);
    assert_eq!(summary.person_names_replaced, 6);
    assert!(summary.detections_by_category.contains_key(&PhiCategory::Institute));
    assert_eq!(
        summary.derivatives_created,
        vec!["CT@deidentified", "MR_T1@deidentified", "PET@deidentified"]
    );
    assert!(summary.is_successful());

    let entries = store.list_entries(&session()).await.unwrap();
    let ct = entries.iter().find(|e| e.name == "CT@deidentified").unwrap();
    assert_eq!(ct.derived_from.as_deref(), Some("CT/DICOM"));
    assert_eq!(ct.datatype, DataType::DicomSeries);

    assert_eq!(count_records(store.as_ref(), &session(), Some("CT@deidentified")).await.unwrap(), 2);
    assert_eq!(count_records(store.as_ref(), &session(), None).await.unwrap(), 12);
}

#[tokio::test]
async fn test_derivative_content_is_deidentified() {
    let store = seeded_store();
    orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    let record = read_record(&store, "CT@deidentified", "1_deidentified.dcm").await;
    assert_eq!(record.id, "CT/DICOM.1");
    assert_eq!(record.text(DicomTag::PATIENT_NAME), Some("XXXX"));
    assert_eq!(record.text(DicomTag::INSTITUTION_NAME), Some("[XXXX]"));
    assert_eq!(record.text(DicomTag::STUDY_DESCRIPTION), Some("axial t2 flair"));

    let pixels = record.pixel_data.as_ref().unwrap();
    assert_eq!(pixels.shape(), (1, 8, 8));
    assert!(pixels.is_all_zero());
    assert_eq!(
        record.field(DicomTag::ROWS).unwrap().value,
        FieldValue::Integer(vec![8])
    );

    // Sources are untouched
    let source = read_record(&store, "CT/DICOM", "1.dcm").await;
    assert_eq!(source, image("CT/DICOM.1"));
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let store = seeded_store();
    let orchestrator = orchestrator(store.clone());
    orchestrator
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();
    let names_after_first = store.entry_names(&session()).unwrap();

    let summary = orchestrator
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert!(summary.derivatives_created.is_empty());
    assert_eq!(summary.entries_seen, 7);
    assert_eq!(summary.entries_skipped, 7);
    assert_eq!(summary.records_processed, 0);
    assert_eq!(store.entry_names(&session()).unwrap(), names_after_first);
    assert_eq!(count_records(store.as_ref(), &session(), None).await.unwrap(), 12);
}

#[tokio::test]
async fn test_dry_run_writes_nothing() {
    let store = seeded_store();
    let before = store.entry_names(&session()).unwrap();

    let options = DeidentifyOptions {
        dry_run: true,
        ..Default::default()
    };
    let summary = orchestrator(store.clone())
        .deidentify(&session(), &options)
        .await
        .unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.entries_processed, 3);
    assert_eq!(summary.records_processed, 6);
    assert!(summary.derivatives_created.is_empty());
    assert_eq!(store.entry_names(&session()).unwrap(), before);
}

#[tokio::test]
async fn test_pixels_kept_when_destruction_disabled() {
    let store = seeded_store();
    let options = DeidentifyOptions {
        destroy_pixels: false,
        ..Default::default()
    };
    orchestrator(store.clone())
        .deidentify(&session(), &options)
        .await
        .unwrap();

    let record = read_record(&store, "PET@deidentified", "2_deidentified.dcm").await;
    assert_eq!(record.pixel_data, image("PET.2").pixel_data);
    assert_eq!(record.text(DicomTag::PATIENT_NAME), Some("XXXX"));
}

#[tokio::test]
async fn test_file_order_is_preserved() {
    let store = InMemoryRecordStore::new();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("US/DICOM", DataType::DicomSeries),
            Series::new(vec![
                SeriesFile::new("3.dcm", encoded("c")),
                SeriesFile::new("1.dcm", encoded("a")),
                SeriesFile::new("p/2.dcm", encoded("b")),
            ]),
        )
        .unwrap();
    let store = Arc::new(store);

    orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    let series = store.read_series(&session(), "US@deidentified").await.unwrap();
    let names: Vec<&str> = series.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["3_deidentified.dcm", "1_deidentified.dcm", "p/2_deidentified.dcm"]
    );
}

#[tokio::test]
async fn test_derivatives_are_never_chained() {
    let store = InMemoryRecordStore::new();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("CT@deidentified", DataType::DicomSeries).derived("CT/DICOM"),
            dicom_series("CT@deidentified", 1),
        )
        .unwrap();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("MR/DICOM", DataType::DicomSeries),
            dicom_series("MR/DICOM", 1),
        )
        .unwrap();
    let store = Arc::new(store);

    let summary = orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.derivatives_created, vec!["MR@deidentified"]);
    let names = store.entry_names(&session()).unwrap();
    assert!(!names.iter().any(|n| n.contains("@deidentified@")));
}

#[tokio::test]
async fn test_missing_session() {
    let store = Arc::new(InMemoryRecordStore::new());
    let err = orchestrator(store)
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PhiScrubError::SessionNotFound(_)));
}

#[tokio::test]
async fn test_undecodable_file_is_skipped() {
    let store = InMemoryRecordStore::new();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("CT/DICOM", DataType::DicomSeries),
            Series::new(vec![
                SeriesFile::new("1.dcm", encoded("a")),
                SeriesFile::new("2.dcm", b"DICM\x00garbage".to_vec()),
            ]),
        )
        .unwrap();
    let store = Arc::new(store);

    let summary = orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.records_processed, 1);
    assert_eq!(summary.records_failed, 1);
    assert_eq!(summary.errors[0].error_type, DeidErrorType::Decode);
    assert!(!summary.is_successful());

    let series = store.read_series(&session(), "CT@deidentified").await.unwrap();
    assert_eq!(series.len(), 1);
    assert_eq!(series.files[0].name, "1_deidentified.dcm");
}

#[tokio::test]
async fn test_entry_without_transformable_records_stays_eligible() {
    let store = InMemoryRecordStore::new();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("CT/DICOM", DataType::DicomSeries),
            Series::new(vec![SeriesFile::new("1.dcm", b"not an image".to_vec())]),
        )
        .unwrap();
    store
        .insert_entry(
            &session(),
            EntryDescriptor::new("MR/DICOM", DataType::DicomSeries),
            Series::default(),
        )
        .unwrap();
    let store = Arc::new(store);

    let summary = orchestrator(store.clone())
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.entries_failed, 1);
    assert_eq!(summary.entries_skipped, 1);
    assert!(summary.derivatives_created.is_empty());
    assert_eq!(
        store.entry_names(&session()).unwrap(),
        vec!["CT/DICOM", "MR/DICOM"]
    );
}

fn ner_orchestrator(
    store: Arc<InMemoryRecordStore>,
    endpoint: String,
    policy: NerFailurePolicy,
) -> DerivativeOrchestrator {
    let recognizer =
        HttpEntityRecognizer::new("clinical-ner", endpoint, None, Duration::from_secs(5)).unwrap();
    let scrubber = NerScrubber::new(policy).with_recognizer(Arc::new(recognizer));
    let deidentifier =
        Deidentifier::from_parts(RedactionEngine::with_defaults().unwrap(), scrubber);
    DerivativeOrchestrator::new(store, Arc::new(JsonImageCodec::new()), Arc::new(deidentifier))
}

#[tokio::test]
async fn test_ner_failure_aborts_under_fail_fast() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/ner")
        .with_status(500)
        .with_body("model loading")
        .expect_at_least(1)
        .create_async()
        .await;

    let store = seeded_store();
    let options = DeidentifyOptions {
        use_transformers: true,
        ..Default::default()
    };
    let err = ner_orchestrator(
        store.clone(),
        format!("{}/ner", server.url()),
        NerFailurePolicy::FailFast,
    )
    .deidentify(&session(), &options)
    .await
    .unwrap_err();

    assert!(matches!(err, PhiScrubError::Recognition(_)));
    mock.assert_async().await;
    assert!(!store
        .entry_names(&session())
        .unwrap()
        .iter()
        .any(|n| n.ends_with("@deidentified")));
}

#[tokio::test]
async fn test_ner_failure_passes_through_under_fail_open() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ner")
        .with_status(500)
        .create_async()
        .await;

    let store = seeded_store();
    let options = DeidentifyOptions {
        use_transformers: true,
        ..Default::default()
    };
    let summary = ner_orchestrator(
        store.clone(),
        format!("{}/ner", server.url()),
        NerFailurePolicy::FailOpen,
    )
    .deidentify(&session(), &options)
    .await
    .unwrap();

    assert_eq!(summary.derivatives_created.len(), 3);
    let record = read_record(&store, "CT@deidentified", "1_deidentified.dcm").await;
    assert_eq!(record.text(DicomTag::STUDY_DESCRIPTION), Some("axial t2 flair"));
}

#[tokio::test]
async fn test_ner_mentions_are_replaced() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/ner")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"entity_group": "ORG", "word": "flair", "score": 0.91}]"#)
        .create_async()
        .await;

    let store = seeded_store();
    let options = DeidentifyOptions {
        use_transformers: true,
        ..Default::default()
    };
    let summary = ner_orchestrator(
        store.clone(),
        format!("{}/ner", server.url()),
        NerFailurePolicy::FailFast,
    )
    .deidentify(&session(), &options)
    .await
    .unwrap();

    assert!(summary.fields_redacted >= 6);
    let record = read_record(&store, "MR_T1@deidentified", "2_deidentified.dcm").await;
    assert_eq!(record.text(DicomTag::STUDY_DESCRIPTION), Some("axial t2 [XXXX]"));
}

/// Store that fails reads of one entry and the first `write_failures` writes
struct FailingStore {
    inner: Arc<InMemoryRecordStore>,
    unreadable: Option<&'static str>,
    write_failures: AtomicUsize,
}

impl FailingStore {
    fn new(inner: Arc<InMemoryRecordStore>) -> Self {
        Self {
            inner,
            unreadable: None,
            write_failures: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn list_entries(&self, session: &SessionId) -> phiscrub::domain::Result<Vec<EntryDescriptor>> {
        self.inner.list_entries(session).await
    }

    async fn read_series(&self, session: &SessionId, entry: &str) -> phiscrub::domain::Result<Series> {
        if self.unreadable.is_some_and(|name| name == entry) {
            return Err(PhiScrubError::Store(format!("{entry}: connection reset")));
        }
        self.inner.read_series(session, entry).await
    }

    async fn create_entry(
        &self,
        session: &SessionId,
        name: &str,
        datatype: DataType,
        derived_from: Option<&str>,
    ) -> phiscrub::domain::Result<EntryDescriptor> {
        self.inner.create_entry(session, name, datatype, derived_from).await
    }

    async fn write_series(
        &self,
        session: &SessionId,
        entry: &str,
        series: Series,
    ) -> phiscrub::domain::Result<()> {
        let remaining = self.write_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.write_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(PhiScrubError::Store(format!("{entry}: disk full")));
        }
        self.inner.write_series(session, entry, series).await
    }
}

fn orchestrator_over(store: Arc<FailingStore>) -> DerivativeOrchestrator {
    DerivativeOrchestrator::new(
        store,
        Arc::new(JsonImageCodec::new()),
        Arc::new(Deidentifier::with_defaults().unwrap()),
    )
}

#[tokio::test]
async fn test_unreadable_entry_does_not_stop_siblings() {
    let inner = InMemoryRecordStore::new();
    for name in ["A/DICOM", "B/DICOM"] {
        inner
            .insert_entry(
                &session(),
                EntryDescriptor::new(name, DataType::DicomSeries),
                dicom_series(name, 2),
            )
            .unwrap();
    }
    let inner = Arc::new(inner);
    let mut store = FailingStore::new(inner.clone());
    store.unreadable = Some("A/DICOM");

    let summary = orchestrator_over(Arc::new(store))
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.entries_processed, 1);
    assert_eq!(summary.entries_failed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].error_type, DeidErrorType::Read);
    assert_eq!(
        inner.entry_names(&session()).unwrap(),
        vec!["A/DICOM", "B/DICOM", "B@deidentified"]
    );
}

#[tokio::test]
async fn test_failed_write_is_completed_on_next_run() {
    let inner = InMemoryRecordStore::new();
    inner
        .insert_entry(
            &session(),
            EntryDescriptor::new("CT/DICOM", DataType::DicomSeries),
            dicom_series("CT/DICOM", 2),
        )
        .unwrap();
    let inner = Arc::new(inner);
    let store = FailingStore::new(inner.clone());
    store.write_failures.store(1, Ordering::SeqCst);
    let orchestrator = orchestrator_over(Arc::new(store));

    let first = orchestrator
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();
    assert_eq!(first.entries_processed, 0);
    assert_eq!(first.entries_failed, 1);
    assert_eq!(first.errors[0].error_type, DeidErrorType::Write);
    // The entry exists but holds nothing yet
    assert!(inner
        .read_series(&session(), "CT@deidentified")
        .await
        .unwrap()
        .is_empty());

    let second = orchestrator
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();
    assert_eq!(second.entries_processed, 1);
    assert_eq!(second.entries_failed, 0);
    assert_eq!(second.derivatives_created, vec!["CT@deidentified"]);
    assert_eq!(
        inner.entry_names(&session()).unwrap(),
        vec!["CT/DICOM", "CT@deidentified"]
    );
    let series = inner.read_series(&session(), "CT@deidentified").await.unwrap();
    assert_eq!(series.len(), 2);

    let third = orchestrator
        .deidentify(&session(), &DeidentifyOptions::default())
        .await
        .unwrap();
    assert_eq!(third.entries_processed, 0);
    assert_eq!(third.entries_skipped, 2);
}
