use crate::classifier::{LineClassifier, LineTag};
use crate::config::ParsingConfig;
use crate::diagnostics::{DiagnosticKind, DiagnosticLog};
use crate::linker;
use crate::registry::RegistryBuilder;
use crate::roman;
use crate::types::{Child, Generation, Marriage, Person};
use anyhow::Result;

/// State machine states. A tag the current state cannot accept is
/// downgraded to a continuation of the most recently open free-text field —
/// a line is never dropped once an entry is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    AwaitingEntry,
    InBio,
    InMarriage,
    InChildren,
}

/// Consumes classified lines and assembles Person records with nested
/// Marriage and Child sub-records, registering each person as it is
/// finalized. Parsing never aborts the run — every anomaly degrades to a
/// best-effort record plus a diagnostic.
pub struct EntryParser {
    classifier: LineClassifier,
    strip_words: Vec<String>,
}

impl EntryParser {
    pub fn new(config: &ParsingConfig) -> Result<Self> {
        Ok(Self {
            classifier: LineClassifier::new(&config.classifier)?,
            strip_words: config.linker.strip_words.clone(),
        })
    }

    /// Classify-and-parse pass over the whole input. Returns the populated
    /// registry builder; the caller freezes it before linking.
    pub fn parse(&self, text: &str, diagnostics: &mut DiagnosticLog) -> RegistryBuilder {
        let lines: Vec<&str> = text.lines().collect();
        let mut session = ParseSession::new(&self.strip_words, diagnostics);

        for (i, line) in lines.iter().enumerate() {
            let prev_blank = i == 0 || lines[i - 1].trim().is_empty();
            let next_blank = i + 1 >= lines.len() || lines[i + 1].trim().is_empty();
            let tag = self.classifier.classify(line, prev_blank && next_blank);
            session.step(line.trim(), tag, i + 1);
        }

        session.finish(lines.len())
    }

    /// Tag every line without assembling entries — used for stage dumps
    pub fn classify_lines(&self, text: &str) -> Vec<(usize, LineTag)> {
        let lines: Vec<&str> = text.lines().collect();
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let prev_blank = i == 0 || lines[i - 1].trim().is_empty();
                let next_blank = i + 1 >= lines.len() || lines[i + 1].trim().is_empty();
                (i + 1, self.classifier.classify(line, prev_blank && next_blank))
            })
            .collect()
    }
}

struct ParseSession<'a> {
    state: ParserState,
    registry: RegistryBuilder,
    current: Option<Person>,
    open_marriage: Option<Marriage>,
    generation: Option<Generation>,
    generation_counter: u32,
    strip_words: &'a [String],
    diagnostics: &'a mut DiagnosticLog,
}

impl<'a> ParseSession<'a> {
    fn new(strip_words: &'a [String], diagnostics: &'a mut DiagnosticLog) -> Self {
        Self {
            state: ParserState::AwaitingEntry,
            registry: RegistryBuilder::new(),
            current: None,
            open_marriage: None,
            generation: None,
            generation_counter: 0,
            strip_words,
            diagnostics,
        }
    }

    fn step(&mut self, raw: &str, tag: LineTag, line_no: usize) {
        match tag {
            LineTag::Blank => {} // paragraph separator, open fields stay open

            LineTag::EntryStart {
                reference,
                name,
                bio,
            } => {
                self.finalize_person(line_no);
                let mut person = Person::new(Some(reference), name);
                person.biography = bio;
                person.generation = self.generation.clone();
                self.current = Some(person);
                self.state = ParserState::InBio;
            }

            LineTag::GenerationTitle { label } => {
                self.finalize_person(line_no);
                let number = leading_number(&label).unwrap_or(self.generation_counter + 1);
                self.generation_counter = number;
                self.generation = Some(Generation { label, number });
                self.state = ParserState::AwaitingEntry;
            }

            LineTag::MarriageLine => match self.state {
                ParserState::AwaitingEntry => {} // preamble, no entry open yet
                ParserState::InBio => {
                    self.open_marriage = Some(Marriage::new(raw.to_string()));
                    self.state = ParserState::InMarriage;
                }
                ParserState::InMarriage | ParserState::InChildren => {
                    // "She next married …" — close the marriage, open another
                    self.close_marriage();
                    self.open_marriage = Some(Marriage::new(raw.to_string()));
                    self.state = ParserState::InMarriage;
                }
            },

            LineTag::ChildrenHeading => match self.state {
                ParserState::AwaitingEntry => {}
                ParserState::InBio => {
                    // Heading without a preceding marriage line: keep the
                    // children under an anonymous marriage rather than losing
                    // them into the biography
                    self.open_marriage = Some(Marriage::new(String::new()));
                    self.state = ParserState::InChildren;
                }
                ParserState::InMarriage => self.state = ParserState::InChildren,
                ParserState::InChildren => {} // repeated heading
            },

            LineTag::ChildLine {
                roman,
                reference,
                text,
            } => match self.state {
                ParserState::InChildren => self.push_child(&roman, reference, text, line_no),
                // Outside a children section a roman-looking prefix is just
                // prose — reclassify as continuation
                _ => self.append_continuation(raw),
            },

            LineTag::Continuation => match self.state {
                ParserState::AwaitingEntry => {} // preamble before first entry
                _ => self.append_continuation(raw),
            },
        }
    }

    fn push_child(&mut self, roman: &str, reference: Option<u64>, text: String, line_no: usize) {
        // InChildren always has an open marriage
        let expected = match self.open_marriage.as_ref() {
            Some(m) => m.children.len() as u32 + 1,
            None => return,
        };

        let ordinal = match roman::decode(roman) {
            Ok(value) => {
                if value != expected {
                    self.diagnostics.record(
                        DiagnosticKind::OrdinalSequence,
                        self.current.as_ref().and_then(|p| p.reference),
                        self.current
                            .as_ref()
                            .map(|p| p.display_name.clone())
                            .unwrap_or_default(),
                        format!("child ordinal {value} where {expected} was expected"),
                        Some(line_no),
                    );
                }
                value
            }
            Err(e) => {
                self.diagnostics.record(
                    DiagnosticKind::MalformedOrdinal,
                    self.current.as_ref().and_then(|p| p.reference),
                    self.current
                        .as_ref()
                        .map(|p| p.display_name.clone())
                        .unwrap_or_default(),
                    format!("{e}; using sequential fallback {expected}"),
                    Some(line_no),
                );
                expected
            }
        };

        if let Some(marriage) = self.open_marriage.as_mut() {
            marriage.children.push(Child {
                ordinal,
                reference,
                name_text: text,
            });
        }
    }

    fn append_continuation(&mut self, raw: &str) {
        match self.state {
            ParserState::AwaitingEntry => {}
            ParserState::InBio => {
                if let Some(person) = self.current.as_mut() {
                    append_text(&mut person.biography, raw);
                }
            }
            ParserState::InMarriage => {
                if let Some(marriage) = self.open_marriage.as_mut() {
                    append_text(&mut marriage.spouse_text, raw);
                }
            }
            ParserState::InChildren => {
                // Wrapped child description — extend the last child, or the
                // spouse text when no child has been seen yet
                if let Some(marriage) = self.open_marriage.as_mut() {
                    match marriage.children.last_mut() {
                        Some(child) => append_text(&mut child.name_text, raw),
                        None => append_text(&mut marriage.spouse_text, raw),
                    }
                }
            }
        }
    }

    fn close_marriage(&mut self) {
        if let Some(marriage) = self.open_marriage.take() {
            if let Some(person) = self.current.as_mut() {
                person.marriages.push(marriage);
            }
        }
    }

    fn finalize_person(&mut self, line_no: usize) {
        self.close_marriage();
        if let Some(mut person) = self.current.take() {
            person.biography = person.biography.trim().to_string();
            person.name_tokens = linker::parse_name_tokens(&person.display_name, self.strip_words);

            let reference = person.reference;
            let name = person.display_name.clone();
            if let Err(e) = self.registry.register(person) {
                self.diagnostics.record(
                    DiagnosticKind::DuplicateReference,
                    reference,
                    name,
                    format!("{e}; entry retained under a synthetic key"),
                    Some(line_no),
                );
            }
        }
        self.state = ParserState::AwaitingEntry;
    }

    fn finish(mut self, last_line: usize) -> RegistryBuilder {
        // Input ended mid-structure with an opened-but-empty children list
        if self.state == ParserState::InChildren {
            let empty = self
                .open_marriage
                .as_ref()
                .map(|m| m.children.is_empty())
                .unwrap_or(false);
            if empty {
                self.diagnostics.record(
                    DiagnosticKind::TruncatedEntry,
                    self.current.as_ref().and_then(|p| p.reference),
                    self.current
                        .as_ref()
                        .map(|p| p.display_name.clone())
                        .unwrap_or_default(),
                    "input ended after a children heading with no children",
                    Some(last_line),
                );
            }
        }
        self.finalize_person(last_line);
        self.registry
    }
}

fn append_text(field: &mut String, raw: &str) {
    if raw.is_empty() {
        return;
    }
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(raw);
}

fn leading_number(label: &str) -> Option<u32> {
    let digits: String = label.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}
