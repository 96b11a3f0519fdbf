//! Document processing orchestrator.
//!
//! Drives one batch of uploads for one family member:
//! upload gate → extraction (concurrent, bounded, timed, cancellable) →
//! classification → rule engine → auto-actions → predictions → score refresh.
//!
//! Extraction runs as tokio tasks; everything that touches the store runs
//! sequentially in the batch loop as files complete. No single file can fail
//! the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::actions::{ActionOutcome, AutoActionOrchestrator};
use crate::config::PipelineConfig;
use crate::db::HealthStore;
use crate::intelligence::score::{refresh_health_score, HealthScoreCalculator};
use crate::intelligence::types::{
    AggregatedHealthData, AlertFinding, AppointmentCandidate, ClinicalInterpretation,
    ConditionFinding, MedicationCandidate, PredictionCandidate, RecommendationFinding,
};
use crate::intelligence::{ClinicalRuleEngine, RiskPredictor};
use crate::models::enums::{ConditionStatus, MedicationStatus, RejectionReason};
use crate::pipeline::cancel::CancelSignal;
use crate::pipeline::classify::{ClassificationScore, DocumentClassifier};
use crate::pipeline::extraction::{DocumentExtractor, ExtractionError, ExtractionResult};
use crate::pipeline::import::{check_upload, FormatDetection, RawDocument, UploadError};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Per-file outcome returned to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_name: String,
    pub accepted: bool,
    pub score: f32,
    pub matched_terms: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionReason>,
    /// User-facing explanation for `rejection_reason`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<HealthAnalysis>,
    pub actions: Vec<ActionOutcome>,
    /// Set when the file could not be processed at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    fn failed(file_name: &str, error: impl std::fmt::Display) -> Self {
        Self {
            file_name: file_name.to_string(),
            accepted: false,
            score: 0.0,
            matched_terms: Vec::new(),
            rejection_reason: None,
            rejection_message: None,
            analysis: None,
            actions: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    fn classified(file_name: &str, classification: ClassificationScore) -> Self {
        Self {
            file_name: file_name.to_string(),
            accepted: classification.accepted,
            score: classification.score,
            matched_terms: classification.matched_terms,
            rejection_message: classification
                .rejection_reason
                .map(|r| r.message().to_string()),
            rejection_reason: classification.rejection_reason,
            analysis: None,
            actions: Vec::new(),
            error: None,
        }
    }
}

/// What an accepted document says about the member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthAnalysis {
    pub extraction_confidence: f32,
    /// Dates printed on the document, earliest first.
    pub document_dates: Vec<NaiveDate>,
    pub conditions: Vec<ConditionFinding>,
    pub alerts: Vec<AlertFinding>,
    pub recommendations: Vec<RecommendationFinding>,
    pub medications: Vec<MedicationCandidate>,
    pub appointments: Vec<AppointmentCandidate>,
    pub predictions: Vec<PredictionCandidate>,
}

impl HealthAnalysis {
    fn new(
        extraction_confidence: f32,
        document_dates: Vec<NaiveDate>,
        interpretation: ClinicalInterpretation,
        predictions: Vec<PredictionCandidate>,
    ) -> Self {
        let conditions = interpretation.conditions().cloned().collect();
        let alerts = interpretation.alerts().cloned().collect();
        let recommendations = interpretation.recommendations().cloned().collect();
        Self {
            extraction_confidence,
            document_dates,
            conditions,
            alerts,
            recommendations,
            medications: interpretation.medications,
            appointments: interpretation.appointments,
            predictions,
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Orchestrates document analysis for family members.
///
/// All collaborators are injected; the processor holds no global state and
/// can serve batches for different members concurrently.
pub struct DocumentProcessor {
    extractor: Arc<dyn DocumentExtractor>,
    store: Arc<dyn HealthStore>,
    classifier: DocumentClassifier,
    engine: ClinicalRuleEngine,
    predictor: RiskPredictor,
    calculator: HealthScoreCalculator,
    orchestrator: AutoActionOrchestrator,
    config: PipelineConfig,
}

impl DocumentProcessor {
    pub fn new(
        extractor: Arc<dyn DocumentExtractor>,
        store: Arc<dyn HealthStore>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            orchestrator: AutoActionOrchestrator::new(Arc::clone(&store)),
            calculator: HealthScoreCalculator::new(config.scoring),
            classifier: DocumentClassifier,
            engine: ClinicalRuleEngine::new(),
            predictor: RiskPredictor,
            extractor,
            store,
            config,
        }
    }

    /// Process a single upload.
    pub async fn process_document(
        self: &Arc<Self>,
        member_id: Uuid,
        doc: RawDocument,
        now: NaiveDateTime,
        cancel: CancelSignal,
    ) -> FileReport {
        let file_name = doc.file_name.clone();
        match self.process_batch(member_id, vec![doc], now, cancel).await {
            Ok(mut reports) if !reports.is_empty() => reports.remove(0),
            Ok(_) => FileReport::failed(&file_name, "No report produced"),
            Err(e) => FileReport::failed(&file_name, e),
        }
    }

    /// Process a batch of uploads for one member.
    ///
    /// Returns one report per input, in input order. Only an oversized batch
    /// is an error; every per-file problem lands in that file's report.
    pub async fn process_batch(
        self: &Arc<Self>,
        member_id: Uuid,
        docs: Vec<RawDocument>,
        now: NaiveDateTime,
        cancel: CancelSignal,
    ) -> Result<Vec<FileReport>, UploadError> {
        let settings = &self.config.extraction;
        if docs.len() > settings.max_batch_files {
            return Err(UploadError::BatchTooLarge {
                count: docs.len(),
                max: settings.max_batch_files,
            });
        }

        tracing::info!(member_id = %member_id, files = docs.len(), "Processing batch");

        let total = docs.len();
        let mut reports: Vec<Option<FileReport>> = vec![None; total];
        let mut file_names = Vec::with_capacity(total);
        let permits = Arc::new(Semaphore::new(settings.max_parallel));
        let timeout = Duration::from_millis(settings.timeout_ms);
        let mut tasks = JoinSet::new();

        for (idx, doc) in docs.into_iter().enumerate() {
            file_names.push(doc.file_name.clone());

            // Gate before paying for extraction.
            if let Some(rejection) = self.classifier.check_file_name(&doc.file_name) {
                tracing::info!(file_name = %doc.file_name, "Rejected by file name");
                reports[idx] = Some(FileReport::classified(&doc.file_name, rejection));
                continue;
            }
            let format = match check_upload(&doc, settings) {
                Ok(format) => format,
                Err(e) => {
                    tracing::warn!(file_name = %doc.file_name, error = %e, "Upload rejected");
                    reports[idx] = Some(FileReport::failed(&doc.file_name, e));
                    continue;
                }
            };

            let extractor = Arc::clone(&self.extractor);
            let permits = Arc::clone(&permits);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let result = run_extraction(extractor, doc, format, permits, timeout, cancel).await;
                (idx, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (idx, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    // run_extraction never panics; anything left unfilled is
                    // reported after the loop.
                    tracing::error!(error = %e, "Batch task failed");
                    continue;
                }
            };
            let file_name = &file_names[idx];
            reports[idx] = Some(match result {
                // Store work is blocking; one file at a time keeps a member's
                // writes ordered.
                Ok(extraction) => {
                    let this = Arc::clone(self);
                    let name = file_name.clone();
                    tokio::task::spawn_blocking(move || {
                        this.analyze(&member_id, &name, extraction, now)
                    })
                    .await
                    .unwrap_or_else(|e| {
                        tracing::error!(file_name = %file_name, error = %e, "Analysis task failed");
                        FileReport::failed(file_name, format!("Analysis failed: {e}"))
                    })
                }
                Err(e) => {
                    tracing::warn!(file_name = %file_name, error = %e, "Extraction failed");
                    FileReport::failed(file_name, e)
                }
            });
        }

        let reports: Vec<FileReport> = reports
            .into_iter()
            .zip(&file_names)
            .map(|(report, name)| {
                report.unwrap_or_else(|| FileReport::failed(name, "Processing task failed"))
            })
            .collect();

        tracing::info!(
            member_id = %member_id,
            accepted = reports.iter().filter(|r| r.accepted).count(),
            failed = reports.iter().filter(|r| r.error.is_some()).count(),
            total,
            "Batch complete"
        );
        Ok(reports)
    }

    /// Classify, interpret and act on one extracted document.
    fn analyze(
        &self,
        member_id: &Uuid,
        file_name: &str,
        extraction: ExtractionResult,
        now: NaiveDateTime,
    ) -> FileReport {
        let classification = self.classifier.classify_document(file_name, &extraction.text);
        tracing::info!(
            file_name = %file_name,
            score = classification.score,
            accepted = classification.accepted,
            "Document classified"
        );
        if !classification.accepted {
            return FileReport::classified(file_name, classification);
        }

        if extraction.entities.is_empty() {
            tracing::info!(file_name = %file_name, "Accepted document has no extractable entities");
        }
        let interpretation =
            self.engine
                .interpret(&extraction.entities, extraction.confidence, now.date());
        let actions = self.orchestrator.materialize(member_id, &interpretation, now);

        let conditions_changed = self.record_conditions(member_id, &interpretation);
        let aggregated = self.aggregate(member_id, &interpretation);
        let predictions = self.predictor.predict(&aggregated);

        if conditions_changed || actions.iter().any(|a| a.created) {
            if let Err(e) =
                refresh_health_score(self.store.as_ref(), &self.calculator, member_id, now.date())
            {
                tracing::warn!(member_id = %member_id, error = %e, "Health score refresh failed");
            }
        }

        let mut report = FileReport::classified(file_name, classification);
        report.analysis = Some(HealthAnalysis::new(
            extraction.confidence,
            extraction.entities.parsed_dates(),
            interpretation,
            predictions,
        ));
        report.actions = actions;
        report
    }

    /// Add newly found active conditions to the member record. Returns
    /// whether the record changed.
    fn record_conditions(&self, member_id: &Uuid, interpretation: &ClinicalInterpretation) -> bool {
        let found: Vec<String> = interpretation
            .conditions()
            .filter(|c| c.status != ConditionStatus::Resolved)
            .map(|c| c.name.clone())
            .collect();
        if found.is_empty() {
            return false;
        }

        match self.store.add_conditions(member_id, &found) {
            Ok(added) => !added.is_empty(),
            Err(e) => {
                tracing::warn!(member_id = %member_id, error = %e, "Cannot record conditions");
                false
            }
        }
    }

    /// Member history plus this document's findings.
    fn aggregate(
        &self,
        member_id: &Uuid,
        interpretation: &ClinicalInterpretation,
    ) -> AggregatedHealthData {
        let mut data = AggregatedHealthData::default();

        match self.store.read_family_member(member_id) {
            Ok(member) => {
                let medications = self
                    .store
                    .list_medications(member_id)
                    .map(|meds| {
                        meds.into_iter()
                            .filter(|m| m.status == MedicationStatus::Active)
                            .map(|m| m.name)
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_else(|e| {
                        tracing::warn!(member_id = %member_id, error = %e, "Cannot list medications");
                        Vec::new()
                    });
                data.merge(member.conditions, medications);
            }
            Err(e) => {
                tracing::debug!(member_id = %member_id, error = %e, "Predicting from document only");
            }
        }

        data.merge(
            interpretation.conditions().map(|c| c.name.clone()),
            interpretation.medications.iter().map(|m| m.name.clone()),
        );
        data
    }
}

/// Extract one file under the concurrency limit, the timeout and the
/// cancel signal. The backend runs in its own task so a panic or an
/// abandoned call cannot take the batch down.
async fn run_extraction(
    extractor: Arc<dyn DocumentExtractor>,
    doc: RawDocument,
    format: FormatDetection,
    permits: Arc<Semaphore>,
    timeout: Duration,
    mut cancel: CancelSignal,
) -> Result<ExtractionResult, ExtractionError> {
    let _permit = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ExtractionError::Cancelled),
        permit = permits.acquire_owned() => {
            permit.map_err(|_| ExtractionError::Backend("extraction pool closed".into()))?
        }
    };

    let mut handle = tokio::spawn(async move { extractor.extract(&doc, &format).await });

    let joined = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        joined = tokio::time::timeout(timeout, &mut handle) => Some(joined),
    };

    let Some(joined) = joined else {
        handle.abort();
        return Err(ExtractionError::Cancelled);
    };
    match joined {
        Ok(Ok(result)) => result.and_then(ExtractionResult::validated),
        Ok(Err(e)) => Err(ExtractionError::Backend(format!("extraction task failed: {e}"))),
        Err(_) => {
            handle.abort();
            Err(ExtractionError::Timeout {
                timeout_ms: timeout.as_millis() as u64,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, NaiveDate};

    use super::*;
    use crate::actions::ActionStatus;
    use crate::db::{DatabaseError, SqliteHealthStore, WriteOutcome};
    use crate::intelligence::types::HealthScoreBreakdown;
    use crate::models::enums::{AppointmentStatus, ConditionSeverity, HealthStatus, Urgency};
    use crate::models::{Appointment, FamilyMember, Medication};
    use crate::pipeline::cancel::cancel_pair;
    use crate::pipeline::extraction::{ExtractedEntities, PlainTextExtractor};

    const LAB_REPORT: &str = "City Diagnostics Laboratory
Patient: Robert Doe
Dr. Sarah Johnson
Hemoglobin 14.2 g/dL
Glucose: 130 mg/dL
Cholesterol: 220 mg/dL
- Metformin 500mg twice daily";

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn member_store() -> (Arc<SqliteHealthStore>, Uuid) {
        let store = Arc::new(SqliteHealthStore::open_in_memory().unwrap());
        let mut member = FamilyMember::new("Robert");
        member.age = Some(58);
        store.create_family_member(&member).unwrap();
        (store, member.id)
    }

    fn processor(
        extractor: Arc<dyn DocumentExtractor>,
        store: Arc<SqliteHealthStore>,
        config: PipelineConfig,
    ) -> Arc<DocumentProcessor> {
        Arc::new(DocumentProcessor::new(extractor, store, config))
    }

    fn text_doc(name: &str, text: &str) -> RawDocument {
        RawDocument::new(name, text.as_bytes().to_vec())
    }

    /// Returns canned results keyed by file name; sleeps, panics or finds
    /// nothing on demand.
    struct ScriptedExtractor {
        confidence: f32,
        delay: Option<std::time::Duration>,
        calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn new(confidence: f32) -> Self {
            Self {
                confidence,
                delay: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DocumentExtractor for ScriptedExtractor {
        async fn extract(
            &self,
            doc: &RawDocument,
            _format: &FormatDetection,
        ) -> Result<ExtractionResult, ExtractionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if doc.file_name.starts_with("panic") {
                panic!("backend crashed");
            }
            if doc.file_name.starts_with("broken") {
                return Err(ExtractionError::Backend("OCR service unavailable".into()));
            }
            let text = String::from_utf8_lossy(&doc.bytes).into_owned();
            let mut entities = ExtractedEntities::default();
            if doc.file_name.starts_with("blank") {
                return Ok(ExtractionResult {
                    text,
                    confidence: self.confidence,
                    entities,
                });
            }
            entities.lab_values.insert("Glucose".into(), "130 mg/dL".into());
            entities
                .medication_mentions
                .push("Metformin 500mg twice daily".into());
            Ok(ExtractionResult {
                text,
                confidence: self.confidence,
                entities,
            })
        }
    }

    #[tokio::test]
    async fn accepted_report_runs_full_pipeline() {
        let (store, member_id) = member_store();
        let p = processor(Arc::new(PlainTextExtractor), store.clone(), PipelineConfig::default());

        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        assert!(report.accepted, "{report:?}");
        assert!(report.error.is_none());
        assert!(report.matched_terms.contains(&"Hemoglobin".to_string()));

        let analysis = report.analysis.as_ref().unwrap();
        assert_eq!(analysis.conditions.len(), 1);
        assert_eq!(analysis.conditions[0].name, "Diabetes");
        assert_eq!(analysis.conditions[0].severity, ConditionSeverity::Moderate);
        assert_eq!(analysis.alerts.len(), 1);
        assert_eq!(analysis.medications.len(), 1);
        assert_eq!(analysis.appointments.len(), 1);
        assert_eq!(analysis.appointments[0].specialty, "Endocrinology");
        assert_eq!(analysis.predictions[0].condition, "Cardiovascular Disease");
        assert!(analysis
            .predictions
            .iter()
            .any(|p| p.condition == "Vitamin B12 Deficiency"));

        // Metformin at 0.99 and the 0.85 medium-urgency follow-up both pass.
        assert_eq!(report.actions.len(), 2);
        assert!(report.actions.iter().all(|a| a.status == ActionStatus::Created));

        let member = store.read_family_member(&member_id).unwrap();
        assert_eq!(member.conditions, vec!["Diabetes"]);
        assert_eq!(member.medication_count, 1);
        assert_eq!(
            member.next_appointment,
            Some(now().date() + ChronoDuration::days(14))
        );
        // 100 - 15 (age) - 8 - 5 - 15 (no checkup) + 5 (appointment soon)
        assert_eq!(member.health_score, Some(62));
        assert_eq!(member.health_status, Some(HealthStatus::Fair));
    }

    #[tokio::test]
    async fn same_document_twice_is_idempotent() {
        let (store, member_id) = member_store();
        let p = processor(Arc::new(PlainTextExtractor), store.clone(), PipelineConfig::default());

        let first = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;
        let second = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        assert!(first.actions.iter().all(|a| a.created));
        assert!(second
            .actions
            .iter()
            .all(|a| a.status == ActionStatus::Duplicate));
        assert_eq!(store.list_medications(&member_id).unwrap().len(), 1);
        assert_eq!(store.list_appointments(&member_id).unwrap().len(), 1);
        assert_eq!(store.read_family_member(&member_id).unwrap().conditions.len(), 1);
    }

    #[tokio::test]
    async fn rejected_document_has_no_side_effects() {
        let (store, member_id) = member_store();
        let p = processor(Arc::new(PlainTextExtractor), store.clone(), PipelineConfig::default());

        let report = p
            .process_document(
                member_id,
                text_doc("notes.txt", "Shopping list: bread, milk, eggs"),
                now(),
                CancelSignal::never(),
            )
            .await;

        assert!(!report.accepted);
        assert_eq!(report.rejection_reason, Some(RejectionReason::InsufficientTerms));
        assert_eq!(
            report.rejection_message.as_deref(),
            Some(RejectionReason::InsufficientTerms.message())
        );
        assert!(report.analysis.is_none());
        assert!(report.actions.is_empty());
        assert!(store.list_medications(&member_id).unwrap().is_empty());
        assert_eq!(store.read_family_member(&member_id).unwrap().health_score, None);
    }

    /// Lets another analysis write to the same member the first time the
    /// processor reads or appends to the member record.
    struct InterleavingStore {
        inner: Arc<SqliteHealthStore>,
        fired: AtomicBool,
    }

    impl InterleavingStore {
        fn other_analysis_writes(&self, member_id: &Uuid) {
            if self.fired.swap(true, Ordering::SeqCst) {
                return;
            }
            self.inner
                .add_conditions(member_id, &["Hypertension".to_string()])
                .unwrap();
            self.inner
                .create_appointment(&Appointment {
                    id: Uuid::new_v4(),
                    member_id: *member_id,
                    specialty: "Cardiology".into(),
                    reason: "Follow-up for Hypertension".into(),
                    urgency: Urgency::Medium,
                    date: NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
                    status: AppointmentStatus::Scheduled,
                    created_at: now(),
                })
                .unwrap();
        }
    }

    impl HealthStore for InterleavingStore {
        fn create_family_member(&self, m: &FamilyMember) -> Result<Uuid, DatabaseError> {
            self.inner.create_family_member(m)
        }
        fn read_family_member(&self, id: &Uuid) -> Result<FamilyMember, DatabaseError> {
            // The other write lands after this snapshot is taken.
            let member = self.inner.read_family_member(id);
            self.other_analysis_writes(id);
            member
        }
        fn update_family_member(&self, m: &FamilyMember) -> Result<(), DatabaseError> {
            self.inner.update_family_member(m)
        }
        fn add_conditions(&self, id: &Uuid, c: &[String]) -> Result<Vec<String>, DatabaseError> {
            self.other_analysis_writes(id);
            self.inner.add_conditions(id, c)
        }
        fn delete_family_member(&self, id: &Uuid) -> Result<(), DatabaseError> {
            self.inner.delete_family_member(id)
        }
        fn list_family_members(&self) -> Result<Vec<FamilyMember>, DatabaseError> {
            self.inner.list_family_members()
        }
        fn create_medication(&self, m: &Medication) -> Result<WriteOutcome, DatabaseError> {
            self.inner.create_medication(m)
        }
        fn list_medications(&self, id: &Uuid) -> Result<Vec<Medication>, DatabaseError> {
            self.inner.list_medications(id)
        }
        fn create_appointment(&self, a: &Appointment) -> Result<WriteOutcome, DatabaseError> {
            self.inner.create_appointment(a)
        }
        fn list_appointments(&self, id: &Uuid) -> Result<Vec<Appointment>, DatabaseError> {
            self.inner.list_appointments(id)
        }
        fn update_health_score(
            &self,
            id: &Uuid,
            b: &HealthScoreBreakdown,
        ) -> Result<(), DatabaseError> {
            self.inner.update_health_score(id, b)
        }
    }

    #[tokio::test]
    async fn overlapping_analysis_writes_are_kept() {
        let (inner, member_id) = member_store();
        let store = Arc::new(InterleavingStore {
            inner: inner.clone(),
            fired: AtomicBool::new(false),
        });
        let p = Arc::new(DocumentProcessor::new(
            Arc::new(PlainTextExtractor),
            store,
            PipelineConfig::default(),
        ));

        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;
        assert!(report.accepted);

        let member = inner.read_family_member(&member_id).unwrap();
        assert_eq!(member.conditions, vec!["Hypertension", "Diabetes"]);
        assert_eq!(member.next_appointment, NaiveDate::from_ymd_opt(2026, 3, 7));
        assert_eq!(inner.list_appointments(&member_id).unwrap().len(), 2);
        // 100 - 15 (age) - 16 - 5 - 15 (no checkup) + 5 (appointment soon)
        assert_eq!(member.health_score, Some(54));
    }

    #[tokio::test]
    async fn accepted_document_without_entities_has_empty_analysis() {
        let (store, member_id) = member_store();
        let p = processor(
            Arc::new(ScriptedExtractor::new(0.95)),
            store.clone(),
            PipelineConfig::default(),
        );

        let report = p
            .process_document(member_id, text_doc("blank.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        assert!(report.accepted, "{report:?}");
        let analysis = report.analysis.unwrap();
        assert!(analysis.conditions.is_empty());
        assert!(analysis.medications.is_empty());
        assert!(analysis.document_dates.is_empty());
        assert!(report.actions.is_empty());
        assert_eq!(store.read_family_member(&member_id).unwrap().health_score, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn multi_file_batch_on_worker_pool_keeps_order() {
        let (store, member_id) = member_store();
        let p = processor(Arc::new(PlainTextExtractor), store.clone(), PipelineConfig::default());

        let docs = vec![
            text_doc("a.txt", LAB_REPORT),
            text_doc("b.txt", "Shopping list: bread, milk, eggs"),
            text_doc("c.txt", LAB_REPORT),
        ];
        let reports = p
            .process_batch(member_id, docs, now(), CancelSignal::never())
            .await
            .unwrap();

        let names: Vec<_> = reports.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(reports[0].accepted && reports[2].accepted && !reports[1].accepted);
        let created = reports
            .iter()
            .flat_map(|r| &r.actions)
            .filter(|a| a.created)
            .count();
        assert_eq!(created, 2);
        assert_eq!(store.list_medications(&member_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn marksheet_is_rejected_before_extraction() {
        let (store, member_id) = member_store();
        let extractor = Arc::new(ScriptedExtractor::new(0.9));
        let p = processor(extractor.clone(), store, PipelineConfig::default());

        let report = p
            .process_document(
                member_id,
                text_doc("Sem 6 Result Marksheet.pdf", LAB_REPORT),
                now(),
                CancelSignal::never(),
            )
            .await;

        assert!(!report.accepted);
        assert_eq!(report.rejection_reason, Some(RejectionReason::ExplicitNonmedical));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["rejectionReason"], "explicit-nonmedical");
        assert_eq!(
            json["rejectionMessage"],
            RejectionReason::ExplicitNonmedical.message()
        );
    }

    #[tokio::test]
    async fn low_extraction_confidence_skips_medication() {
        let (store, member_id) = member_store();
        let p = processor(
            Arc::new(ScriptedExtractor::new(0.65)),
            store.clone(),
            PipelineConfig::default(),
        );

        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        let med = report.actions.iter().find(|a| a.subject == "Metformin").unwrap();
        assert_eq!(med.status, ActionStatus::Skipped);
        assert!(store.list_medications(&member_id).unwrap().is_empty());
        // The appointment gate uses its own fixed confidence.
        assert_eq!(store.list_appointments(&member_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failing_files_do_not_abort_the_batch() {
        let (store, member_id) = member_store();
        let p = processor(
            Arc::new(ScriptedExtractor::new(0.9)),
            store,
            PipelineConfig::default(),
        );

        let docs = vec![
            text_doc("broken.txt", LAB_REPORT),
            text_doc("labs.txt", LAB_REPORT),
            text_doc("panic.txt", LAB_REPORT),
            text_doc("photo.docx", LAB_REPORT),
        ];
        let reports = p
            .process_batch(member_id, docs, now(), CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(reports.len(), 4);
        assert_eq!(reports[0].file_name, "broken.txt");
        assert!(reports[0].error.as_deref().unwrap().contains("OCR service unavailable"));
        assert!(reports[1].accepted);
        assert!(reports[1].error.is_none());
        assert!(reports[2].error.as_deref().unwrap().contains("extraction task failed"));
        assert!(reports[3].error.as_deref().unwrap().contains("Unsupported file type"));
    }

    #[tokio::test]
    async fn slow_extraction_times_out() {
        let (store, member_id) = member_store();
        let mut extractor = ScriptedExtractor::new(0.9);
        extractor.delay = Some(std::time::Duration::from_millis(500));
        let mut config = PipelineConfig::default();
        config.extraction.timeout_ms = 20;
        let p = processor(Arc::new(extractor), store, config);

        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        assert_eq!(report.error.as_deref(), Some("Extraction timed out after 20ms"));
        assert!(!report.accepted);
    }

    #[tokio::test]
    async fn cancel_abandons_pending_files() {
        let (store, member_id) = member_store();
        let mut extractor = ScriptedExtractor::new(0.9);
        extractor.delay = Some(std::time::Duration::from_secs(5));
        let mut config = PipelineConfig::default();
        config.extraction.max_parallel = 1;
        let p = processor(Arc::new(extractor), store.clone(), config);

        let (handle, signal) = cancel_pair();
        let docs = vec![text_doc("a.txt", LAB_REPORT), text_doc("b.txt", LAB_REPORT)];
        let batch = tokio::spawn({
            let p = Arc::clone(&p);
            async move { p.process_batch(member_id, docs, now(), signal).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        handle.cancel();

        let reports = tokio::time::timeout(std::time::Duration::from_secs(2), batch)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(reports.len(), 2);
        for report in &reports {
            assert_eq!(report.error.as_deref(), Some("Extraction cancelled"));
        }
        assert!(store.list_medications(&member_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn oversized_batch_is_refused() {
        let (store, member_id) = member_store();
        let mut config = PipelineConfig::default();
        config.extraction.max_batch_files = 2;
        let p = processor(Arc::new(PlainTextExtractor), store, config);

        let docs = (0..3).map(|i| text_doc(&format!("{i}.txt"), "x")).collect();
        let err = p
            .process_batch(member_id, docs, now(), CancelSignal::never())
            .await
            .unwrap_err();
        assert_eq!(err, UploadError::BatchTooLarge { count: 3, max: 2 });
    }

    #[tokio::test]
    async fn malformed_confidence_is_reported() {
        let (store, member_id) = member_store();
        let p = processor(
            Arc::new(ScriptedExtractor::new(f32::NAN)),
            store,
            PipelineConfig::default(),
        );
        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;
        assert!(report.error.as_deref().unwrap().starts_with("Malformed"));
    }

    #[tokio::test]
    async fn predictions_use_member_history() {
        let (store, member_id) = member_store();
        let mut member = store.read_family_member(&member_id).unwrap();
        member.conditions = vec!["Hypertension".into()];
        store.update_family_member(&member).unwrap();

        let p = processor(Arc::new(PlainTextExtractor), store, PipelineConfig::default());
        let report = p
            .process_document(member_id, text_doc("labs.txt", LAB_REPORT), now(), CancelSignal::never())
            .await;

        let predicted: Vec<_> = report
            .analysis
            .unwrap()
            .predictions
            .into_iter()
            .map(|p| p.condition)
            .collect();
        assert!(predicted.contains(&"Stroke".to_string()));
        assert!(predicted.contains(&"Cardiovascular Disease".to_string()));
    }

    #[test]
    fn report_serializes_camel_case() {
        let report = FileReport::failed("x.txt", "boom");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["fileName"], "x.txt");
        assert_eq!(json["matchedTerms"], serde_json::json!([]));
        assert_eq!(json["error"], "boom");
        assert!(json.get("analysis").is_none());
        assert!(json.get("rejectionMessage").is_none());
    }
}
