//! Analysis Pipeline: the request-scoped orchestration of
//! extract → delegate → normalize → score → enrich.
//!
//! # Failure model
//! Only two things fail a request: a document with too little text under the
//! `reject` policy, and a worker thread that dies mid-extraction. Everything else
//! (model unavailable, timed out or malformed; job search down) degrades to
//! heuristic output and is recorded in `AnalysisReport::diagnostics`.
//!
//! Extraction is CPU-bound and runs inside `tokio::task::spawn_blocking`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::analysis::delegate::AiDelegate;
use crate::analysis::normalizer::ResponseNormalizer;
use crate::analysis::skills::{RequiredSkills, SkillMatcher};
use crate::config::{Config, InsufficientTextPolicy};
use crate::errors::AppError;
use crate::extraction::{Document, ExtractedText, Extraction, ExtractionError, TextExtractor};
use crate::jobs::{job_query, JobLookup, JobLookupError};
use crate::llm_client::{LlmError, ModelProvider};
use crate::models::report::{AnalysisReport, Diagnostic, DiagnosticCode, JobPosting};

/// Message returned when a document has no usable text.
pub const NO_TEXT_MESSAGE: &str = "Could not extract text from resume";

/// Heuristic `required` size when no role list is configured.
const TOP_MATCHED_REQUIRED: usize = 5;

pub struct AnalysisPipeline {
    extractor: TextExtractor,
    delegate: AiDelegate,
    normalizer: ResponseNormalizer,
    jobs: Arc<dyn JobLookup>,
    job_timeout: Duration,
    region: String,
    insufficient_text: InsufficientTextPolicy,
}

impl AnalysisPipeline {
    pub fn new(
        extractor: TextExtractor,
        delegate: AiDelegate,
        normalizer: ResponseNormalizer,
        jobs: Arc<dyn JobLookup>,
        job_timeout: Duration,
        region: String,
        insufficient_text: InsufficientTextPolicy,
    ) -> Self {
        Self {
            extractor,
            delegate,
            normalizer,
            jobs,
            job_timeout,
            region,
            insufficient_text,
        }
    }

    /// Wires the pipeline from configuration. `provider` is `None` when no model
    /// credential is set.
    pub fn from_config(
        config: &Config,
        provider: Option<Arc<dyn ModelProvider>>,
        jobs: Arc<dyn JobLookup>,
    ) -> Self {
        let required = if config.role_skills.is_empty() {
            RequiredSkills::TopMatched(TOP_MATCHED_REQUIRED)
        } else {
            RequiredSkills::Role(config.role_skills.clone())
        };

        Self::new(
            TextExtractor::new(config.max_text_chars, config.min_text_chars),
            AiDelegate::new(
                provider,
                config.ai_timeout,
                config.prompt_text_chars,
                config.ai_temperature,
                config.ai_max_tokens,
            ),
            ResponseNormalizer::new(
                Arc::new(SkillMatcher::with_default_vocabulary()),
                required,
                config.fit_weights,
            ),
            jobs,
            config.job_lookup_timeout,
            config.job_search_region.clone(),
            config.insufficient_text_policy,
        )
    }

    /// Full analysis of an uploaded file.
    pub async fn analyze_document(&self, document: Document) -> Result<AnalysisReport, AppError> {
        let file_name = document.file_name.clone();
        let mut diagnostics = Vec::new();

        let text = match self.extract(document).await? {
            Ok(extraction) => {
                if let Some(reason) = extraction.fallback {
                    diagnostics.push(Diagnostic {
                        code: DiagnosticCode::ExtractionFallback,
                        message: reason,
                    });
                }
                extraction.text
            }
            Err(err) => self.on_insufficient_text(err, &mut diagnostics)?,
        };

        info!("Analyzing '{file_name}' ({} characters)", text.char_count());
        Ok(self.analyze(text, diagnostics, None).await)
    }

    /// Full analysis of text the caller already has. `role_skills` replaces the
    /// configured role list for the heuristic path.
    pub async fn analyze_text(
        &self,
        text: &str,
        role_skills: Option<Vec<String>>,
    ) -> Result<AnalysisReport, AppError> {
        let mut diagnostics = Vec::new();
        let text = match self.extractor.from_raw_text(text) {
            Ok(text) => text,
            Err(err) => self.on_insufficient_text(err, &mut diagnostics)?,
        };
        let required = role_skills
            .filter(|skills| !skills.is_empty())
            .map(RequiredSkills::Role);
        Ok(self.analyze(text, diagnostics, required).await)
    }

    /// Text extraction only, with no analysis.
    pub async fn extract_document(&self, document: Document) -> Result<Extraction, AppError> {
        match self.extract(document).await? {
            Ok(extraction) => Ok(extraction),
            Err(err) => {
                let mut ignored = Vec::new();
                let text = self.on_insufficient_text(err, &mut ignored)?;
                Ok(Extraction {
                    text,
                    fallback: None,
                })
            }
        }
    }

    /// Postings for a role or skill in the configured region. Lookup failures
    /// yield an empty list.
    pub async fn job_demand(&self, role: &str) -> Vec<JobPosting> {
        match self.lookup_jobs(role).await {
            Ok(jobs) => jobs,
            Err(err) => {
                warn!("Job demand lookup for '{role}' failed: {err}");
                Vec::new()
            }
        }
    }

    async fn extract(
        &self,
        document: Document,
    ) -> Result<Result<Extraction, ExtractionError>, AppError> {
        let extractor = self.extractor;
        tokio::task::spawn_blocking(move || extractor.extract(&document))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in extraction: {e}")))
    }

    fn on_insufficient_text(
        &self,
        err: ExtractionError,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<ExtractedText, AppError> {
        match self.insufficient_text {
            InsufficientTextPolicy::Reject => {
                warn!("Rejecting document: {err}");
                Err(AppError::Validation(NO_TEXT_MESSAGE.to_string()))
            }
            InsufficientTextPolicy::Placeholder => {
                warn!("Continuing with placeholder text: {err}");
                diagnostics.push(Diagnostic {
                    code: DiagnosticCode::TextPlaceholder,
                    message: err.to_string(),
                });
                Ok(ExtractedText::placeholder())
            }
        }
    }

    async fn analyze(
        &self,
        text: ExtractedText,
        mut diagnostics: Vec<Diagnostic>,
        required: Option<RequiredSkills>,
    ) -> AnalysisReport {
        // The placeholder carries no résumé content worth a model call.
        let raw = if text.is_placeholder() {
            None
        } else {
            match self.delegate.ask(&text).await {
                Ok(raw) => Some(raw),
                Err(err) => {
                    warn!("AI analysis unavailable, using heuristics: {err}");
                    diagnostics.push(Diagnostic {
                        code: diagnostic_code(&err),
                        message: err.to_string(),
                    });
                    None
                }
            }
        };

        let mut report = match &required {
            Some(required) => self.normalizer.normalize_with(raw.as_deref(), &text, required),
            None => self.normalizer.normalize(raw.as_deref(), &text),
        };

        let query_skill = if text.is_placeholder() {
            None
        } else {
            report
                .required_skills
                .first()
                .or_else(|| report.matched_skills.first())
                .cloned()
        };

        if let Some(skill) = query_skill {
            match self.lookup_jobs(&skill).await {
                Ok(jobs) => report = report.with_jobs(jobs),
                Err(JobLookupError::Disabled) => {}
                Err(err) => {
                    warn!("Job lookup for '{skill}' failed: {err}");
                    diagnostics.push(Diagnostic {
                        code: DiagnosticCode::JobLookupFailed,
                        message: err.to_string(),
                    });
                }
            }
        }

        // Pipeline notes first, then the normalizer's.
        diagnostics.append(&mut report.diagnostics);
        report.diagnostics = diagnostics;

        info!(
            "Analysis complete: source={:?} fit={} ats={} jobs={} diagnostics={}",
            report.source,
            report.fit_score,
            report.ats_score,
            report.jobs.len(),
            report.diagnostics.len()
        );
        report
    }

    async fn lookup_jobs(&self, skill: &str) -> Result<Vec<JobPosting>, JobLookupError> {
        let query = job_query(skill, &self.region);
        tokio::time::timeout(self.job_timeout, self.jobs.search(&query))
            .await
            .map_err(|_| JobLookupError::Timeout(self.job_timeout))?
    }
}

fn diagnostic_code(err: &LlmError) -> DiagnosticCode {
    match err {
        LlmError::Unavailable(_) => DiagnosticCode::AiUnavailable,
        LlmError::Timeout(_) => DiagnosticCode::AiTimeout,
        LlmError::Transport(e) if e.is_timeout() => DiagnosticCode::AiTimeout,
        LlmError::Transport(_) => DiagnosticCode::AiTransportError,
        LlmError::Upstream { .. } => DiagnosticCode::AiUpstreamError,
        LlmError::EmptyContent => DiagnosticCode::AiMalformedOutput,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    use crate::analysis::salary::DEFAULT_SALARY;
    use crate::analysis::scoring::FitWeights;
    use crate::analysis::skills::DEFAULT_ROLE_SKILLS;
    use crate::llm_client::CompletionRequest;
    use crate::models::report::AnalysisSource;

    const RESUME: &str = "Jane Doe\nData analyst. Skills: Python, SQL, Excel, Tableau.\n\
        Built weekly reporting dashboards.";

    struct FixedProvider(Result<String, fn() -> LlmError>);

    #[async_trait]
    impl ModelProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn submit(&self, _request: &CompletionRequest<'_>) -> Result<String, LlmError> {
            match &self.0 {
                Ok(reply) => Ok(reply.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingJobs {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl JobLookup for RecordingJobs {
        async fn search(&self, query: &str) -> Result<Vec<JobPosting>, JobLookupError> {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(JobLookupError::Upstream {
                    status: 503,
                    message: "down".to_string(),
                });
            }
            Ok(vec![JobPosting {
                title: format!("{query} role"),
                ..JobPosting::default()
            }])
        }
    }

    struct HangingJobs;

    #[async_trait]
    impl JobLookup for HangingJobs {
        async fn search(&self, _query: &str) -> Result<Vec<JobPosting>, JobLookupError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(Vec::new())
        }
    }

    fn pipeline(
        provider: Option<Arc<dyn ModelProvider>>,
        jobs: Arc<dyn JobLookup>,
        policy: InsufficientTextPolicy,
    ) -> AnalysisPipeline {
        let role: Vec<String> = DEFAULT_ROLE_SKILLS.iter().map(|s| s.to_string()).collect();
        AnalysisPipeline::new(
            TextExtractor::new(6000, 20),
            AiDelegate::new(provider, Duration::from_secs(30), 4500, 0.2, 1200),
            ResponseNormalizer::new(
                Arc::new(SkillMatcher::with_default_vocabulary()),
                RequiredSkills::Role(role),
                FitWeights::default(),
            ),
            jobs,
            Duration::from_secs(20),
            "India".to_string(),
            policy,
        )
    }

    fn replying(reply: &str) -> Option<Arc<dyn ModelProvider>> {
        Some(Arc::new(FixedProvider(Ok(reply.to_string()))))
    }

    fn failing(make: fn() -> LlmError) -> Option<Arc<dyn ModelProvider>> {
        Some(Arc::new(FixedProvider(Err(make))))
    }

    fn doc(name: &str, bytes: &[u8]) -> Document {
        Document {
            file_name: name.to_string(),
            bytes: Bytes::copy_from_slice(bytes),
        }
    }

    #[tokio::test]
    async fn test_model_reply_drives_report_and_job_query() {
        let jobs = Arc::new(RecordingJobs::default());
        let p = pipeline(
            replying(r#"{"ats": 77, "required_skills": ["power bi", "sql"], "demand_score": 65}"#),
            jobs.clone(),
            InsufficientTextPolicy::Reject,
        );

        let report = p.analyze_document(doc("cv.txt", RESUME.as_bytes())).await.unwrap();

        assert_eq!(report.source, AnalysisSource::Model);
        assert_eq!(report.ats_score, 77);
        assert_eq!(report.demand_score, 65);
        assert_eq!(report.missing_skills, vec!["power bi".to_string()]);
        assert_eq!(jobs.queries.lock().unwrap().as_slice(), ["power bi India"]);
        assert_eq!(report.jobs.len(), 1);
        assert!(report.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn test_no_credential_degrades_to_heuristic() {
        let jobs = Arc::new(RecordingJobs::default());
        let p = pipeline(None, jobs.clone(), InsufficientTextPolicy::Reject);

        let report = p.analyze_document(doc("cv.txt", RESUME.as_bytes())).await.unwrap();

        assert_eq!(report.source, AnalysisSource::Heuristic);
        assert!(report.has_diagnostic(DiagnosticCode::AiUnavailable));
        assert_eq!(report.salary_range, DEFAULT_SALARY);
        assert!(report.matched_skills.contains(&"python".to_string()));
        assert_eq!(jobs.queries.lock().unwrap().as_slice(), ["python India"]);
    }

    #[tokio::test]
    async fn test_upstream_and_transport_failures_are_diagnosed() {
        let cases: [(fn() -> LlmError, DiagnosticCode); 2] = [
            (
                || LlmError::Upstream {
                    status: 500,
                    message: "boom".to_string(),
                },
                DiagnosticCode::AiUpstreamError,
            ),
            (|| LlmError::EmptyContent, DiagnosticCode::AiMalformedOutput),
        ];
        for (make, code) in cases {
            let p = pipeline(
                failing(make),
                Arc::new(RecordingJobs::default()),
                InsufficientTextPolicy::Reject,
            );
            let report = p.analyze_text(RESUME, None).await.unwrap();
            assert_eq!(report.source, AnalysisSource::Heuristic);
            assert!(report.has_diagnostic(code), "expected {code:?}");
        }
    }

    #[tokio::test]
    async fn test_prose_reply_is_malformed_output() {
        let p = pipeline(
            replying("I am unable to analyse this résumé."),
            Arc::new(RecordingJobs::default()),
            InsufficientTextPolicy::Reject,
        );
        let report = p.analyze_text(RESUME, None).await.unwrap();
        assert_eq!(report.source, AnalysisSource::Heuristic);
        assert!(report.has_diagnostic(DiagnosticCode::AiMalformedOutput));
    }

    #[tokio::test]
    async fn test_job_failure_is_absorbed() {
        let jobs = Arc::new(RecordingJobs {
            fail: true,
            ..RecordingJobs::default()
        });
        let p = pipeline(None, jobs, InsufficientTextPolicy::Reject);
        let report = p.analyze_text(RESUME, None).await.unwrap();
        assert!(report.jobs.is_empty());
        assert!(report.has_diagnostic(DiagnosticCode::JobLookupFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_job_search_times_out() {
        let p = pipeline(None, Arc::new(HangingJobs), InsufficientTextPolicy::Reject);
        let report = p.analyze_text(RESUME, None).await.unwrap();
        assert!(report.jobs.is_empty());
        assert!(report.has_diagnostic(DiagnosticCode::JobLookupFailed));
    }

    #[tokio::test]
    async fn test_disabled_job_search_adds_no_diagnostic() {
        let p = pipeline(
            None,
            Arc::new(crate::jobs::DisabledJobLookup),
            InsufficientTextPolicy::Reject,
        );
        let report = p.analyze_text(RESUME, None).await.unwrap();
        assert!(report.jobs.is_empty());
        assert!(!report.has_diagnostic(DiagnosticCode::JobLookupFailed));
    }

    #[tokio::test]
    async fn test_short_text_rejected_by_default() {
        let p = pipeline(None, Arc::new(RecordingJobs::default()), InsufficientTextPolicy::Reject);
        let err = p.analyze_document(doc("cv.pdf", b"")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg == NO_TEXT_MESSAGE));
    }

    #[tokio::test]
    async fn test_short_text_placeholder_policy() {
        let jobs = Arc::new(RecordingJobs::default());
        let p = pipeline(
            replying(r#"{"ats": 99}"#),
            jobs.clone(),
            InsufficientTextPolicy::Placeholder,
        );
        let report = p.analyze_document(doc("cv.txt", b"tiny")).await.unwrap();
        assert!(report.has_diagnostic(DiagnosticCode::TextPlaceholder));
        assert_eq!(report.source, AnalysisSource::Heuristic);
        assert!(report.resume_text.starts_with('['));
        assert!(jobs.queries.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_pdf_reports_extraction_fallback() {
        let p = pipeline(None, Arc::new(RecordingJobs::default()), InsufficientTextPolicy::Reject);
        let report = p
            .analyze_document(doc("cv.pdf", RESUME.as_bytes()))
            .await
            .unwrap();
        assert!(report.has_diagnostic(DiagnosticCode::ExtractionFallback));
        assert!(report.resume_text.contains("Python"));
        assert_eq!(report.diagnostics[0].code, DiagnosticCode::ExtractionFallback);
    }

    #[tokio::test]
    async fn test_caller_role_skills_are_used() {
        let p = pipeline(None, Arc::new(RecordingJobs::default()), InsufficientTextPolicy::Reject);
        let report = p
            .analyze_text(RESUME, Some(vec!["docker".to_string(), "sql".to_string()]))
            .await
            .unwrap();
        assert_eq!(report.required_skills, vec!["docker".to_string(), "sql".to_string()]);
        assert_eq!(report.missing_skills, vec!["docker".to_string()]);
    }

    #[tokio::test]
    async fn test_job_demand_absorbs_errors() {
        let failing_jobs = Arc::new(RecordingJobs {
            fail: true,
            ..RecordingJobs::default()
        });
        let p = pipeline(None, failing_jobs, InsufficientTextPolicy::Reject);
        assert!(p.job_demand("data analyst").await.is_empty());

        let p = pipeline(None, Arc::new(RecordingJobs::default()), InsufficientTextPolicy::Reject);
        let jobs = p.job_demand("data analyst").await;
        assert_eq!(jobs[0].title, "data analyst India role");
    }
}
