use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What went wrong (or degraded) for one entry. None of these abort the
/// run — every anomaly produces a best-effort record plus one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Roman numeral could not be decoded — child kept with a sequential
    /// fallback ordinal
    MalformedOrdinal,
    /// Reference number collision — entry retained under a synthetic key
    DuplicateReference,
    /// Child ordinals within one marriage have a gap or repeat
    OrdinalSequence,
    /// Input ended with an opened-but-empty structure
    TruncatedEntry,
}

impl DiagnosticKind {
    pub fn label(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedOrdinal => "malformed-ordinal",
            DiagnosticKind::DuplicateReference => "duplicate-reference",
            DiagnosticKind::OrdinalSequence => "ordinal-sequence",
            DiagnosticKind::TruncatedEntry => "truncated-entry",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Reference number of the affected entry, when known
    pub reference: Option<u64>,
    /// Best-effort name or text excerpt identifying the entry
    pub subject: String,
    pub detail: String,
    /// 1-based source line where the anomaly was seen
    pub line: Option<usize>,
}

/// Side-channel log of skipped or degraded entries. Consumed by operators,
/// never by downstream rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: DiagnosticKind,
        reference: Option<u64>,
        subject: impl Into<String>,
        detail: impl Into<String>,
        line: Option<usize>,
    ) {
        self.entries.push(Diagnostic {
            kind,
            reference,
            subject: subject.into(),
            detail: detail.into(),
            line,
        });
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    /// Render the operator-facing log file: a provenance header followed by
    /// one line per diagnostic.
    pub fn render_report(&self, input_hash: &str) -> String {
        let mut out = String::new();
        out.push_str("# lineatex diagnostics\n");
        out.push_str(&format!("# generated_at: {}\n", Utc::now().to_rfc3339()));
        out.push_str(&format!("# input_sha256: {}\n", input_hash));
        out.push_str(&format!("# total: {}\n", self.entries.len()));
        for d in &self.entries {
            let reference = d
                .reference
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let line = d
                .line
                .map(|l| format!(" (line {l})"))
                .unwrap_or_default();
            out.push_str(&format!(
                "Entry {}: {} - [{}] {}{}\n",
                reference,
                d.subject,
                d.kind.label(),
                d.detail,
                line
            ));
        }
        out
    }
}

/// Content hash of the raw input, recorded in the diagnostics report so a
/// log file can be matched back to the dump it came from.
pub fn calculate_input_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_hash_consistency() {
        let h1 = calculate_input_hash("1. Jane Doe, born 1900.");
        let h2 = calculate_input_hash("1. Jane Doe, born 1900.");
        assert_eq!(h1, h2);
        assert_ne!(h1, calculate_input_hash("2. John Doe."));
    }

    #[test]
    fn test_report_lists_entries_with_reasons() {
        let mut log = DiagnosticLog::new();
        log.record(
            DiagnosticKind::MalformedOrdinal,
            Some(17),
            "Mary Smith",
            "cannot decode \"iix\"",
            Some(42),
        );
        let report = log.render_report("abc123");
        assert!(report.contains("input_sha256: abc123"));
        assert!(report.contains("Entry 17: Mary Smith - [malformed-ordinal]"));
        assert!(report.contains("(line 42)"));
    }
}
