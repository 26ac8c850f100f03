//! Content policy gate ("Guardian").
//!
//! Validates draft content against a named zone's ruleset by making exactly
//! one call to an external reasoning backend and parsing a verdict out of
//! its free-text reply. The gate is fail-open: a backend outage, timeout,
//! or unparseable reply produces a permissive verdict with a degraded flag,
//! never an error. Publishing must not block on a moderation hiccup.
//!
//! Each call walks a small state machine: PENDING until the backend
//! answers, then PASSED, FAILED, or DEGRADED. The resulting state is
//! derivable from the verdict via [`PolicyVerdict::state`].

use anyhow::{bail, Result};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::GuardianConfig;
use crate::json_extract;

/// Flag set when the backend could not be reached (or timed out).
pub const FLAG_OFFLINE: &str = "guardian_offline";
/// Flag set when the backend answered but no verdict could be parsed.
pub const FLAG_PARSE_ERROR: &str = "parse_error";

/// A named content-policy context with its own compliance rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Product,
    Science,
    Brand,
}

impl Zone {
    pub fn parse(s: &str) -> Result<Zone> {
        match s.to_lowercase().as_str() {
            "product" => Ok(Zone::Product),
            "science" => Ok(Zone::Science),
            "brand" => Ok(Zone::Brand),
            other => bail!("Unknown zone: {}. Use product, science, or brand.", other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Product => "product",
            Zone::Science => "science",
            Zone::Brand => "brand",
        }
    }

    /// Ruleset text submitted to the reasoning backend for this zone.
    fn rubric(&self) -> &'static str {
        match self {
            Zone::Product => {
                "Product content may describe composition, sourcing, sensory character, \
                 usage and dosage guidance, and general hydration benefits. Therapeutic or \
                 medical claims (treating, curing, preventing, or diagnosing any disease \
                 or condition) are forbidden."
            }
            Zone::Science => {
                "Science content may present hypothesis-level claims, but they must use \
                 hedged phrasing (\"may\", \"suggests\", \"is associated with\") and be \
                 grounded with citation-like references to studies or sources. Unhedged \
                 causal health claims are forbidden."
            }
            Zone::Brand => {
                "Brand content may use philosophical and aesthetic language freely. \
                 Medical claims remain forbidden even in poetic form."
            }
        }
    }
}

/// Terminal state of one gate invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Passed,
    Failed,
    Degraded,
}

impl GateState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateState::Passed => "passed",
            GateState::Failed => "failed",
            GateState::Degraded => "degraded",
        }
    }
}

/// Structured verdict for one validation call. The zone is request context
/// and is not recorded on the verdict.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyVerdict {
    pub valid: bool,
    pub score: u8,
    pub flags: Vec<String>,
    pub reasons: Vec<String>,
    pub suggested_fix: Option<String>,
}

impl PolicyVerdict {
    /// Verdict for empty content: nothing to review, backend not called.
    fn empty_pass() -> Self {
        Self {
            valid: true,
            score: 100,
            flags: Vec::new(),
            reasons: Vec::new(),
            suggested_fix: None,
        }
    }

    /// Fail-open verdict for a transport or backend failure.
    fn offline(reason: String) -> Self {
        Self {
            valid: true,
            score: 100,
            flags: vec![FLAG_OFFLINE.to_string()],
            reasons: vec![reason],
            suggested_fix: None,
        }
    }

    /// Fail-open verdict for a reply with no extractable JSON verdict.
    fn unparseable() -> Self {
        Self {
            valid: true,
            score: 90,
            flags: vec![FLAG_PARSE_ERROR.to_string()],
            reasons: vec!["no verdict object found in backend response".to_string()],
            suggested_fix: None,
        }
    }

    pub fn state(&self) -> GateState {
        if self
            .flags
            .iter()
            .any(|f| f == FLAG_OFFLINE || f == FLAG_PARSE_ERROR)
        {
            GateState::Degraded
        } else if self.valid {
            GateState::Passed
        } else {
            GateState::Failed
        }
    }
}

// ============ Reasoning backends ============

/// A reasoning backend that answers a free-text prompt with free text.
#[async_trait::async_trait]
pub trait ReasoningBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// A no-op backend that always errors. With the guardian's fail-open
/// semantics this makes every verdict a `guardian_offline` pass.
pub struct DisabledBackend;

#[async_trait::async_trait]
impl ReasoningBackend for DisabledBackend {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        bail!("Reasoning backend is disabled")
    }
}

/// Backend using the OpenAI chat completions API.
///
/// Makes exactly one request per call, with no internal retry; the gate's
/// fail-open handling covers transient failures. The request timeout comes
/// from `guardian.timeout_secs`, and a timeout surfaces as a transport
/// error like any other.
pub struct OpenAiBackend {
    model: String,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(config: &GuardianConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("guardian.model required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { model, client })
    }
}

#[async_trait::async_trait]
impl ReasoningBackend for OpenAiBackend {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing content"))?;

        Ok(text.to_string())
    }
}

/// Create the appropriate [`ReasoningBackend`] based on configuration.
pub fn create_backend(config: &GuardianConfig) -> Result<Box<dyn ReasoningBackend>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledBackend)),
        "openai" => Ok(Box::new(OpenAiBackend::new(config)?)),
        other => bail!("Unknown guardian provider: {}", other),
    }
}

// ============ The gate ============

/// The content policy gate. Holds the backend, the content cap, and a
/// semaphore bounding concurrent backend calls so bursts of validations
/// don't trip backend throttling.
pub struct Guardian {
    backend: Box<dyn ReasoningBackend>,
    limiter: Semaphore,
    max_content_chars: usize,
}

impl Guardian {
    pub fn new(backend: Box<dyn ReasoningBackend>, max_content_chars: usize, max_concurrent: usize) -> Self {
        Self {
            backend,
            limiter: Semaphore::new(max_concurrent.max(1)),
            max_content_chars,
        }
    }

    pub fn from_config(config: &GuardianConfig) -> Result<Self> {
        Ok(Self::new(
            create_backend(config)?,
            config.max_content_chars,
            config.max_concurrent,
        ))
    }

    /// Validate `content` against `zone`'s ruleset.
    ///
    /// Always returns a verdict, never an error. Content beyond the
    /// configured cap is truncated before submission; the verdict then
    /// reflects only the submitted prefix.
    pub async fn validate(&self, content: &str, zone: Zone) -> PolicyVerdict {
        if content.trim().is_empty() {
            return PolicyVerdict::empty_pass();
        }

        let truncated = truncate_chars(content, self.max_content_chars);
        let prompt = build_prompt(zone, truncated);

        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(e) => return PolicyVerdict::offline(e.to_string()),
        };

        match self.backend.complete(&prompt).await {
            Ok(response) => parse_verdict(&response).unwrap_or_else(PolicyVerdict::unparseable),
            Err(e) => PolicyVerdict::offline(e.to_string()),
        }
    }
}

fn build_prompt(zone: Zone, content: &str) -> String {
    format!(
        "You are the content compliance reviewer for the {zone} zone of a \
         hydration brand site.\n\n\
         Ruleset:\n{rubric}\n\n\
         Review the content below against the ruleset. Respond with a single \
         JSON object, nothing else:\n\
         {{\"valid\": <bool>, \"score\": <integer 0-100>, \"flags\": [<string>], \
         \"reasons\": [<string>], \"suggested_fix\": <string or null>}}\n\n\
         Content:\n{content}",
        zone = zone.as_str(),
        rubric = zone.rubric(),
        content = content,
    )
}

/// Truncate to at most `max_chars` characters on a char boundary.
fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

/// Parse a verdict out of a free-text backend reply. Returns `None` when no
/// JSON object is present or the object carries no usable `valid` field.
/// The backend schema is requested via prompt only, so anything may come
/// back.
fn parse_verdict(text: &str) -> Option<PolicyVerdict> {
    let value = json_extract::first_json_object(text)?;

    let valid = value.get("valid").and_then(Value::as_bool)?;
    let score = value
        .get("score")
        .and_then(Value::as_f64)
        .map(|s| s.clamp(0.0, 100.0) as u8)
        .unwrap_or(if valid { 100 } else { 0 });
    let flags = string_array(value.get("flags"));
    let reasons = string_array(value.get("reasons"));
    let suggested_fix = value
        .get("suggested_fix")
        .or_else(|| value.get("suggestedFix"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(PolicyVerdict {
        valid,
        score,
        flags,
        reasons,
        suggested_fix,
    })
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted backend: returns a fixed reply (or error) and records how
    /// it was called.
    struct ScriptedBackend {
        reply: Result<String, String>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedBackend {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        fn err(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl ReasoningBackend for &'static ScriptedBackend {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => bail!("{}", message),
            }
        }
    }

    fn guardian_with(backend: &'static ScriptedBackend) -> Guardian {
        Guardian::new(Box::new(backend), 15_000, 4)
    }

    fn leak(backend: ScriptedBackend) -> &'static ScriptedBackend {
        Box::leak(Box::new(backend))
    }

    #[tokio::test]
    async fn test_empty_content_short_circuits_without_backend_call() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": false, "score": 0}"#));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("", Zone::Product).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 100);
        assert!(verdict.flags.is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_content_short_circuits() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": false}"#));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("  \n\t ", Zone::Brand).await;
        assert!(verdict.valid);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_error_fails_open_with_offline_flag() {
        let backend = leak(ScriptedBackend::err("connection refused"));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("Pure mountain water.", Zone::Product).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 100);
        assert!(verdict.flags.iter().any(|f| f == FLAG_OFFLINE));
        assert!(verdict.reasons.iter().any(|r| r.contains("connection refused")));
        assert_eq!(verdict.state(), GateState::Degraded);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_prose_reply_fails_open_with_parse_error() {
        let backend = leak(ScriptedBackend::ok(
            "I reviewed the content and it seems mostly fine to me.",
        ));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("Some draft copy.", Zone::Science).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 90);
        assert!(verdict.flags.iter().any(|f| f == FLAG_PARSE_ERROR));
        assert_eq!(verdict.state(), GateState::Degraded);
    }

    #[tokio::test]
    async fn test_failing_verdict_parsed_from_prose_wrapper() {
        let backend = leak(ScriptedBackend::ok(
            r#"Here is my verdict:
            {"valid": false, "score": 25, "flags": ["medical_claim"],
             "reasons": ["claims to cure dehydration-related illness"],
             "suggested_fix": "Replace the cure claim with hydration support language."}
            Let me know if you need anything else."#,
        ));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("Cures all illness!", Zone::Product).await;
        assert!(!verdict.valid);
        assert_eq!(verdict.score, 25);
        assert_eq!(verdict.flags, vec!["medical_claim".to_string()]);
        assert_eq!(verdict.reasons.len(), 1);
        assert!(verdict.suggested_fix.is_some());
        assert_eq!(verdict.state(), GateState::Failed);
    }

    #[tokio::test]
    async fn test_passing_verdict_state() {
        let backend = leak(ScriptedBackend::ok(
            r#"{"valid": true, "score": 92, "flags": [], "reasons": []}"#,
        ));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("Calm, clean copy.", Zone::Brand).await;
        assert!(verdict.valid);
        assert_eq!(verdict.score, 92);
        assert_eq!(verdict.state(), GateState::Passed);
    }

    #[tokio::test]
    async fn test_repeated_calls_are_not_cached() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": true, "score": 90}"#));
        let guardian = guardian_with(backend);

        guardian.validate("same content", Zone::Product).await;
        guardian.validate("same content", Zone::Product).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_oversized_content_truncated_before_submission() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": true, "score": 100}"#));
        let guardian = guardian_with(backend);

        let content = "x".repeat(20_000);
        guardian.validate(&content, Zone::Product).await;

        let prompt = backend.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains(&"x".repeat(15_000)));
        assert!(!prompt.contains(&"x".repeat(15_001)));
    }

    #[tokio::test]
    async fn test_score_clamped_to_range() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": true, "score": 250}"#));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("copy", Zone::Brand).await;
        assert_eq!(verdict.score, 100);
    }

    #[tokio::test]
    async fn test_missing_score_defaults_by_validity() {
        let backend = leak(ScriptedBackend::ok(r#"{"valid": false}"#));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("copy", Zone::Product).await;
        assert!(!verdict.valid);
        assert_eq!(verdict.score, 0);
    }

    #[tokio::test]
    async fn test_object_without_valid_field_is_parse_error() {
        let backend = leak(ScriptedBackend::ok(r#"{"sentiment": "positive"}"#));
        let guardian = guardian_with(backend);

        let verdict = guardian.validate("copy", Zone::Science).await;
        assert!(verdict.flags.iter().any(|f| f == FLAG_PARSE_ERROR));
        assert_eq!(verdict.score, 90);
    }

    #[test]
    fn test_zone_parse() {
        assert_eq!(Zone::parse("product").unwrap(), Zone::Product);
        assert_eq!(Zone::parse("SCIENCE").unwrap(), Zone::Science);
        assert_eq!(Zone::parse("Brand").unwrap(), Zone::Brand);
        assert!(Zone::parse("legal").is_err());
    }

    #[test]
    fn test_prompt_carries_zone_rubric() {
        let prompt = build_prompt(Zone::Science, "some claim");
        assert!(prompt.contains("hedged"));
        assert!(prompt.contains("some claim"));
        assert!(prompt.contains("science"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let content = "é".repeat(10);
        assert_eq!(truncate_chars(&content, 4).chars().count(), 4);
        assert_eq!(truncate_chars(&content, 20), content.as_str());
    }
}
