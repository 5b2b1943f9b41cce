//! Injection Guard
//!
//! Pattern-based prompt-injection filter applied at three trust boundaries:
//!
//! 1. [`GuardFilter::check_input`]: user prompts, blocked outright on a match
//! 2. [`GuardFilter::check_tool_result`]: tool output, matched spans redacted
//! 3. [`GuardFilter::check_output`]: the final answer, matched spans redacted
//!
//! Detection goes through the [`Detector`] trait so a stronger classifier can
//! replace the regex signatures without touching the loop or the dispatcher.
//! The filter never fails: a broken security sink only costs the log line.

use std::borrow::Cow;
use std::sync::{Arc, LazyLock};

use regex::{NoExpand, Regex, RegexBuilder};

use crate::security_log::{NullSink, SecurityEvent, SecurityLogEntry, SecuritySink};

/// Returned instead of a prompt that carries an injection signature
pub const REFUSAL_MESSAGE: &str = "I can only answer questions about office locations and weather.";

/// Replaces every matched span in tool results and answers
pub const FILTERED_PLACEHOLDER: &str = "[FILTERED]";

/// Known manipulation phrase families, matched case-insensitively.
pub const INJECTION_SIGNATURES: &[&str] = &[
    // instruction override
    r"ignore\s+(all\s+)?previous\s+instructions",
    r"ignore\s+(all\s+)?above\s+instructions",
    r"disregard\s+(all\s+)?(previous|prior|above)",
    // role reassignment
    r"you\s+are\s+now\s+(a|an)\s+",
    r"new\s+instructions?\s*:",
    // system-prompt spoofing
    r"system\s*:\s*",
    r"<\s*system\s*>",
    r"pretend\s+(you\s+are|to\s+be)",
    // rule negation
    r"override\s+(your\s+)?(instructions|rules|prompt)",
    r"forget\s+(your|all)\s+(instructions|rules|training)",
    r"do\s+not\s+follow\s+(your|the)\s+(rules|instructions)",
    // jailbreak keyword
    r"jailbreak",
];

/// Longest slice of a blocked prompt copied into the security log
const PROMPT_PREVIEW_CHARS: usize = 200;

static DEFAULT_DETECTOR: LazyLock<PatternDetector> = LazyLock::new(|| {
    PatternDetector::new(INJECTION_SIGNATURES.iter().copied())
        .expect("invalid injection signature")
});

/// Finds and removes injection content.
pub trait Detector: Send + Sync {
    /// Every signature that matches `text`, in signature order.
    fn scan(&self, text: &str) -> Vec<String>;

    /// `text` with every matched span replaced by `placeholder`.
    fn redact<'a>(&self, text: &'a str, placeholder: &str) -> Cow<'a, str>;
}

/// A compiled signature and the source it was built from
#[derive(Clone, Debug)]
struct Signature {
    source: String,
    regex: Regex,
}

/// Ordered list of case-insensitive regular expressions
#[derive(Clone, Debug)]
pub struct PatternDetector {
    signatures: Vec<Signature>,
}

impl PatternDetector {
    /// Compile `patterns` in order; fails on the first invalid one
    pub fn new<I, S>(patterns: I) -> std::result::Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let signatures = patterns
            .into_iter()
            .map(|p| {
                let source = p.as_ref().to_string();
                let regex = RegexBuilder::new(&source).case_insensitive(true).build()?;
                Ok(Signature { source, regex })
            })
            .collect::<std::result::Result<Vec<_>, regex::Error>>()?;

        Ok(Self { signatures })
    }

    /// The built-in injection signatures
    pub fn injection_signatures() -> Self {
        DEFAULT_DETECTOR.clone()
    }

    /// Add one more signature after the existing ones
    pub fn with_pattern(mut self, pattern: &str) -> std::result::Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        self.signatures.push(Signature {
            source: pattern.to_string(),
            regex,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

impl Default for PatternDetector {
    fn default() -> Self {
        Self::injection_signatures()
    }
}

impl Detector for PatternDetector {
    fn scan(&self, text: &str) -> Vec<String> {
        self.signatures
            .iter()
            .filter(|s| s.regex.is_match(text))
            .map(|s| s.source.clone())
            .collect()
    }

    fn redact<'a>(&self, text: &'a str, placeholder: &str) -> Cow<'a, str> {
        let mut result = Cow::Borrowed(text);
        for signature in &self.signatures {
            if signature.regex.is_match(&result) {
                result = Cow::Owned(
                    signature
                        .regex
                        .replace_all(&result, NoExpand(placeholder))
                        .into_owned(),
                );
            }
        }
        result
    }
}

/// Outcome of a boundary check.
///
/// When `clean` is false, `text` is the refusal or the redacted text and the
/// original must not travel any further.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardVerdict {
    pub clean: bool,
    pub text: String,
}

impl GuardVerdict {
    fn clean(text: &str) -> Self {
        Self {
            clean: true,
            text: text.to_string(),
        }
    }

    fn flagged(text: impl Into<String>) -> Self {
        Self {
            clean: false,
            text: text.into(),
        }
    }
}

/// The boundary filter shared by every run
#[derive(Clone)]
pub struct GuardFilter {
    detector: Arc<dyn Detector>,
    sink: Arc<dyn SecuritySink>,
    refusal: String,
    placeholder: String,
}

impl Default for GuardFilter {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl std::fmt::Debug for GuardFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardFilter")
            .field("refusal", &self.refusal)
            .field("placeholder", &self.placeholder)
            .finish_non_exhaustive()
    }
}

impl GuardFilter {
    /// Built-in signatures, logging detections to `sink`
    pub fn new(sink: Arc<dyn SecuritySink>) -> Self {
        Self::with_detector(Arc::new(PatternDetector::injection_signatures()), sink)
    }

    /// Custom detector, logging detections to `sink`
    pub fn with_detector(detector: Arc<dyn Detector>, sink: Arc<dyn SecuritySink>) -> Self {
        Self {
            detector,
            sink,
            refusal: REFUSAL_MESSAGE.into(),
            placeholder: FILTERED_PLACEHOLDER.into(),
        }
    }

    pub fn with_refusal(mut self, refusal: impl Into<String>) -> Self {
        self.refusal = refusal.into();
        self
    }

    pub fn refusal(&self) -> &str {
        &self.refusal
    }

    /// Refuse a prompt carrying any signature; the prompt itself is dropped.
    pub fn check_input(&self, text: &str) -> GuardVerdict {
        let matches = self.detector.scan(text);
        if matches.is_empty() {
            return GuardVerdict::clean(text);
        }

        tracing::warn!(patterns = ?matches, "Input injection detected");
        let preview: String = text.chars().take(PROMPT_PREVIEW_CHARS).collect();
        self.record(SecurityEvent::InputBlocked, matches, format!("prompt={:?}", preview));
        GuardVerdict::flagged(self.refusal.clone())
    }

    /// Redact matched spans in a tool result, keeping the rest of the text.
    pub fn check_tool_result(&self, source: &str, text: &str) -> GuardVerdict {
        let matches = self.detector.scan(text);
        if matches.is_empty() {
            return GuardVerdict::clean(text);
        }

        tracing::warn!(tool = %source, patterns = ?matches, "Injection in tool result");
        self.record(SecurityEvent::ToolSanitised, matches, format!("tool={}", source));
        GuardVerdict::flagged(self.detector.redact(text, &self.placeholder))
    }

    /// Redact matched spans in the final answer.
    pub fn check_output(&self, text: &str) -> String {
        let matches = self.detector.scan(text);
        if matches.is_empty() {
            return text.to_string();
        }

        tracing::warn!(patterns = ?matches, "Output contains suspicious patterns");
        self.record(SecurityEvent::OutputSanitised, matches, "final response");
        self.detector.redact(text, &self.placeholder).into_owned()
    }

    fn record(&self, event: SecurityEvent, matches: Vec<String>, context: impl Into<String>) {
        let entry = SecurityLogEntry::new(event, matches, context);
        if let Err(e) = self.sink.append(&entry) {
            tracing::error!(event = %event, error = %e, "Failed to write security log entry");
        }
    }
}
