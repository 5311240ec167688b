use crate::config::ClassifierConfig;
use crate::types::ReferenceNumber;
use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

/// Lexical tag for one input line. Classification here is line-local;
/// the parser downgrades tags that conflict with its current state
/// (a child line outside a children section becomes a continuation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LineTag {
    GenerationTitle {
        label: String,
    },
    EntryStart {
        reference: ReferenceNumber,
        name: String,
        bio: String,
    },
    MarriageLine,
    ChildrenHeading,
    ChildLine {
        /// Roman numeral prefix as written, not yet decoded
        roman: String,
        /// Inline reference number when the child is a full entry elsewhere
        reference: Option<ReferenceNumber>,
        text: String,
    },
    Continuation,
    Blank,
}

impl LineTag {
    /// Short tag name for stage dumps and diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            LineTag::GenerationTitle { .. } => "generation-title",
            LineTag::EntryStart { .. } => "entry-start",
            LineTag::MarriageLine => "marriage-line",
            LineTag::ChildrenHeading => "children-heading",
            LineTag::ChildLine { .. } => "child-line",
            LineTag::Continuation => "continuation",
            LineTag::Blank => "blank",
        }
    }
}

pub struct LineClassifier {
    entry_start: Regex,
    child_roman_first: Regex,
    child_reference_first: Regex,
    children_headings: Vec<Regex>,
    generation_titles: Vec<Regex>,
    marriage: Regex,
    max_roman_length: usize,
    max_title_words: usize,
}

impl LineClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let children_headings = config
            .children_heading_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("bad children-heading pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        let generation_titles = config
            .generation_title_patterns
            .iter()
            .map(|p| Regex::new(p).with_context(|| format!("bad generation-title pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        let marriage = Regex::new(&format!(
            r"(?i)^(?:\S+\s+){{0,{}}}(?:next\s+)?married\b",
            config.marriage_keyword_window
        ))?;

        Ok(Self {
            entry_start: Regex::new(r"^(\d+)\.\s+(\p{Lu}.*)$")?,
            child_roman_first: Regex::new(r"(?i)^([ivxlcdm]+)\.\s+(.*)$")?,
            child_reference_first: Regex::new(r"(?i)^(\d+)\s+([ivxlcdm]+)\.\s+(.*)$")?,
            children_headings,
            generation_titles,
            marriage,
            max_roman_length: config.max_roman_length,
            max_title_words: config.max_title_words,
        })
    }

    /// Classify a single line. `standalone` is true when the line is its own
    /// paragraph (blank or boundary on both sides) — required for the
    /// title-case generation heuristic.
    pub fn classify(&self, line: &str, standalone: bool) -> LineTag {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return LineTag::Blank;
        }

        // Priority 1: entry start — "123. Capitalized Name, rest of bio"
        if let Some(caps) = self.entry_start.captures(trimmed) {
            if let Ok(reference) = caps[1].parse::<ReferenceNumber>() {
                let (name, bio) = split_entry_name(&caps[2]);
                return LineTag::EntryStart {
                    reference,
                    name,
                    bio,
                };
            }
        }

        // Priority 2: child line — "i. 2 Name …" or "2 i. Name …"
        if let Some(caps) = self.child_reference_first.captures(trimmed) {
            let roman = caps[2].to_string();
            if roman.len() <= self.max_roman_length {
                if let Ok(reference) = caps[1].parse::<ReferenceNumber>() {
                    return LineTag::ChildLine {
                        roman,
                        reference: Some(reference),
                        text: caps[3].trim().to_string(),
                    };
                }
            }
        }
        if let Some(caps) = self.child_roman_first.captures(trimmed) {
            let roman = caps[1].to_string();
            if roman.len() <= self.max_roman_length {
                let rest = caps[2].trim();
                // Optional bare integer before the name is an inline reference
                let (reference, text) = split_inline_reference(rest);
                return LineTag::ChildLine {
                    roman,
                    reference,
                    text,
                };
            }
        }

        // Priority 3: children-section heading phrase
        if self.children_headings.iter().any(|r| r.is_match(trimmed)) {
            return LineTag::ChildrenHeading;
        }

        // Priority 4: marriage line — "married" within the leading words
        if self.marriage.is_match(trimmed) {
            return LineTag::MarriageLine;
        }

        // Priority 5: generation title
        if self.generation_titles.iter().any(|r| r.is_match(trimmed))
            || (standalone && self.looks_like_title(trimmed))
        {
            return LineTag::GenerationTitle {
                label: trimmed.to_string(),
            };
        }

        LineTag::Continuation
    }

    /// Standalone title-case phrase with no trailing sentence punctuation
    fn looks_like_title(&self, trimmed: &str) -> bool {
        if trimmed.ends_with(['.', '!', '?', ',', ';', ':']) {
            return false;
        }
        let words: Vec<&str> = trimmed.split_whitespace().collect();
        if words.is_empty() || words.len() > self.max_title_words {
            return false;
        }
        words.iter().all(|w| {
            w.chars()
                .next()
                .map(|c| c.is_uppercase() || c.is_ascii_digit())
                .unwrap_or(false)
        })
    }
}

/// Split the text after an entry number into (name, leading bio text).
/// The name runs to the first comma when one exists ("Jane Doe, born 1900"),
/// otherwise it is the leading run of capitalized words.
fn split_entry_name(text: &str) -> (String, String) {
    if let Some(idx) = text.find(',') {
        let name = text[..idx].trim().trim_end_matches('.').to_string();
        let bio = text[idx + 1..].trim().to_string();
        return (name, bio);
    }

    let mut name_words: Vec<&str> = Vec::new();
    let mut rest_start = text.len();
    for (offset, word) in split_words_with_offsets(text) {
        let starts_upper = word
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if starts_upper {
            name_words.push(word);
            if word.ends_with('.') {
                // Sentence ended inside the name run ("Jane Doe." with no bio)
                rest_start = offset + word.len();
                break;
            }
        } else {
            rest_start = offset;
            break;
        }
    }

    if name_words.is_empty() {
        return (text.trim().trim_end_matches('.').to_string(), String::new());
    }
    let name = name_words
        .join(" ")
        .trim_end_matches(['.', ','])
        .to_string();
    let bio = text[rest_start.min(text.len())..].trim().to_string();
    (name, bio)
}

/// Leading bare integer on a child line is an inline reference number
fn split_inline_reference(text: &str) -> (Option<ReferenceNumber>, String) {
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or("");
    if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(reference) = head.parse::<ReferenceNumber>() {
            let rest = parts.next().unwrap_or("").trim().to_string();
            if !rest.is_empty() {
                return (Some(reference), rest);
            }
        }
    }
    (None, text.to_string())
}

pub(crate) fn split_words_with_offsets(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace()
        .map(move |w| (w.as_ptr() as usize - text.as_ptr() as usize, w))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;

    fn classifier() -> LineClassifier {
        LineClassifier::new(&ClassifierConfig::default()).unwrap()
    }

    #[test]
    fn test_entry_start_with_comma() {
        let tag = classifier().classify("1. Jane Doe, born 1900.", false);
        assert_eq!(
            tag,
            LineTag::EntryStart {
                reference: 1,
                name: "Jane Doe".to_string(),
                bio: "born 1900.".to_string(),
            }
        );
    }

    #[test]
    fn test_entry_start_without_comma() {
        let tag = classifier().classify("42. John Smith was born in 1850", false);
        assert_eq!(
            tag,
            LineTag::EntryStart {
                reference: 42,
                name: "John Smith".to_string(),
                bio: "was born in 1850".to_string(),
            }
        );
    }

    #[test]
    fn test_entry_start_requires_capitalized_name() {
        // "3. and then…" is a sentence continuation, not an entry
        assert_eq!(classifier().classify("3. and then left", false), LineTag::Continuation);
    }

    #[test]
    fn test_child_line_roman_first_with_inline_reference() {
        let tag = classifier().classify("i. 2 Richard Doe was born 1925.", false);
        assert_eq!(
            tag,
            LineTag::ChildLine {
                roman: "i".to_string(),
                reference: Some(2),
                text: "Richard Doe was born 1925.".to_string(),
            }
        );
    }

    #[test]
    fn test_child_line_reference_first() {
        let tag = classifier().classify("1701 iv. Mary Ann Smith.", false);
        assert_eq!(
            tag,
            LineTag::ChildLine {
                roman: "iv".to_string(),
                reference: Some(1701),
                text: "Mary Ann Smith.".to_string(),
            }
        );
    }

    #[test]
    fn test_child_line_without_reference() {
        let tag = classifier().classify("ii. Thomas, died young.", false);
        assert_eq!(
            tag,
            LineTag::ChildLine {
                roman: "ii".to_string(),
                reference: None,
                text: "Thomas, died young.".to_string(),
            }
        );
    }

    #[test]
    fn test_long_roman_token_is_not_a_child_line() {
        // "mimicked" has letters outside the numeral alphabet
        assert_eq!(
            classifier().classify("mimicked. He stayed home.", false),
            LineTag::Continuation
        );
        // All-numeral-letter word, but longer than max_roman_length
        assert_eq!(
            classifier().classify("mmddccll. He stayed home.", false),
            LineTag::Continuation
        );
    }

    #[test]
    fn test_children_heading_variants() {
        let c = classifier();
        assert_eq!(
            c.classify("Children from this marriage were:", false),
            LineTag::ChildrenHeading
        );
        assert_eq!(
            c.classify("The child from this marriage was:", false),
            LineTag::ChildrenHeading
        );
        assert_eq!(c.classify("Her children were:", false), LineTag::ChildrenHeading);
    }

    #[test]
    fn test_marriage_line_near_start() {
        let c = classifier();
        assert_eq!(
            c.classify("Jane married John Smith on 4 May 1920.", false),
            LineTag::MarriageLine
        );
        assert_eq!(
            c.classify("She next married Robert Brown.", false),
            LineTag::MarriageLine
        );
    }

    #[test]
    fn test_married_deep_in_sentence_is_continuation() {
        let tag = classifier().classify(
            "After many years of living alone on the farm he finally married again",
            false,
        );
        assert_eq!(tag, LineTag::Continuation);
    }

    #[test]
    fn test_generation_title_ordinal_pattern() {
        let tag = classifier().classify("3rd Generation", false);
        assert_eq!(
            tag,
            LineTag::GenerationTitle {
                label: "3rd Generation".to_string()
            }
        );
    }

    #[test]
    fn test_title_case_heuristic_requires_standalone() {
        let c = classifier();
        assert_eq!(
            c.classify("The Next Generation", true),
            LineTag::GenerationTitle {
                label: "The Next Generation".to_string()
            }
        );
        assert_eq!(c.classify("The Next Generation", false), LineTag::Continuation);
        // Trailing sentence punctuation disqualifies a title
        assert_eq!(c.classify("He Went Home.", true), LineTag::Continuation);
    }

    #[test]
    fn test_blank_lines() {
        assert_eq!(classifier().classify("   ", false), LineTag::Blank);
        assert_eq!(classifier().classify("", false), LineTag::Blank);
    }
}
