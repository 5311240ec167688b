use crate::classifier::split_words_with_offsets;
use crate::config::{EmitterConfig, ParsingConfig};
use crate::linker::Linker;
use crate::registry::PersonRegistry;
use crate::roman;
use crate::types::{Child, ReferenceNumber};
use anyhow::Result;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;

/// One logical LaTeX macro invocation. All text fields hold final markup,
/// escaped and with mention links already inserted — render() is pure
/// formatting against the macro contract of the document preamble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LatexBlock {
    GenerationTitle {
        label: String,
    },
    Entry {
        reference: Option<ReferenceNumber>,
        name: String,
        bio: String,
    },
    Marriage {
        text: String,
    },
    ChildrenHeading {
        plural: bool,
    },
    /// Child that resolves to a full entry elsewhere in the document
    ChildLinked {
        reference: ReferenceNumber,
        roman: String,
        text: String,
    },
    /// Child carrying a reference number that no entry in the dump holds
    ChildUnlinked {
        roman: String,
        text: String,
    },
    /// Child mentioned only here
    ChildPlain {
        roman: String,
        text: String,
    },
    Divider,
}

impl LatexBlock {
    pub fn render(&self) -> String {
        match self {
            LatexBlock::GenerationTitle { label } => format!("\\generationtitle{{{label}}}"),
            LatexBlock::Entry {
                reference,
                name,
                bio,
            } => {
                let reference = reference.map(|r| r.to_string()).unwrap_or_default();
                format!("\\entry{{{reference}}}{{\\textbf{{{name}}}}}{{{bio}}}")
            }
            LatexBlock::Marriage { text } => format!("\\marriage{{{text}}}"),
            LatexBlock::ChildrenHeading { plural: true } => "\\childrenheadingplural".to_string(),
            LatexBlock::ChildrenHeading { plural: false } => {
                "\\childrenheadingsingular".to_string()
            }
            LatexBlock::ChildLinked {
                reference,
                roman,
                text,
            } => format!("\\childentrylinked{{{reference}}}{{{roman}}}{{{text}}}"),
            LatexBlock::ChildUnlinked { roman, text } => {
                format!("\\childentry{{}}{{{roman}}}{{{text}}}")
            }
            LatexBlock::ChildPlain { roman, text } => {
                format!("\\childentryplain{{{text}}}{{{roman}}}{{}}")
            }
            LatexBlock::Divider => "\\dividerline".to_string(),
        }
    }

    /// Short block name for stage dumps
    pub fn name(&self) -> &'static str {
        match self {
            LatexBlock::GenerationTitle { .. } => "generation-title",
            LatexBlock::Entry { .. } => "entry",
            LatexBlock::Marriage { .. } => "marriage",
            LatexBlock::ChildrenHeading { .. } => "children-heading",
            LatexBlock::ChildLinked { .. } => "child-linked",
            LatexBlock::ChildUnlinked { .. } => "child-unlinked",
            LatexBlock::ChildPlain { .. } => "child-plain",
            LatexBlock::Divider => "divider",
        }
    }
}

pub fn render_document(blocks: &[LatexBlock]) -> String {
    let mut out = String::new();
    for block in blocks {
        out.push_str(&block.render());
        out.push('\n');
    }
    out
}

/// Walks the frozen registry in document order and produces the block
/// stream: generation titles on label change, one entry per person with its
/// marriages and children, a divider after each entry.
pub struct LatexEmitter<'a> {
    registry: &'a PersonRegistry,
    linker: Linker<'a>,
    config: &'a EmitterConfig,
    link_parent_references: bool,
    url: Regex,
    spouse: Regex,
    parent: Regex,
}

impl<'a> LatexEmitter<'a> {
    pub fn new(registry: &'a PersonRegistry, config: &'a ParsingConfig) -> Result<Self> {
        Ok(Self {
            registry,
            linker: Linker::new(registry, &config.linker)?,
            config: &config.emitter,
            link_parent_references: config.linker.link_parent_references,
            url: Regex::new(r"<https?://[^>\s]+>|https?://[^\s{}<>]+")?,
            spouse: Regex::new(r"(?i)\bmarried\s+")?,
            parent: Regex::new(
                r"(?i)\b(?:son|daughter)\s+of\s+(\p{Lu}[^,.;]+?)(?:\s+and\s+(\p{Lu}[^,.;]+?))?\s*(?:[,.;]|$)",
            )?,
        })
    }

    pub fn emit(&self) -> Vec<LatexBlock> {
        let mut blocks = Vec::new();
        let mut current_label: Option<String> = None;

        for person in self.registry.iter() {
            if let Some(generation) = &person.generation {
                if current_label.as_deref() != Some(generation.label.as_str()) {
                    blocks.push(LatexBlock::GenerationTitle {
                        label: self.escape(&generation.label),
                    });
                    current_label = Some(generation.label.clone());
                }
            }

            let generation = person.generation_number();
            blocks.push(LatexBlock::Entry {
                reference: person.reference,
                name: self.escape(&person.display_name),
                bio: self.render_bio(&person.biography, generation),
            });

            for marriage in &person.marriages {
                let text = self.render_marriage_text(&marriage.spouse_text, generation);
                if !text.is_empty() {
                    blocks.push(LatexBlock::Marriage { text });
                }
                if !marriage.children.is_empty() {
                    blocks.push(LatexBlock::ChildrenHeading {
                        plural: marriage.children.len() > 1,
                    });
                    for child in &marriage.children {
                        blocks.push(self.child_block(child, generation));
                    }
                }
            }

            blocks.push(LatexBlock::Divider);
        }

        blocks
    }

    // ===== TEXT RENDERING =====

    fn render_bio(&self, text: &str, generation: Option<u32>) -> String {
        let spans = if self.link_parent_references {
            self.parent_spans(text)
        } else {
            Vec::new()
        };
        self.render_with_links(text, spans, generation)
    }

    /// Marriage sentence with the spouse name (and any parent reference)
    /// linked. Trailing comma-period debris from the dump is dropped.
    fn render_marriage_text(&self, text: &str, generation: Option<u32>) -> String {
        let trimmed = text.trim().trim_end_matches([',', '.']).trim_end();
        if trimmed.is_empty() {
            return String::new();
        }
        let mut spans = Vec::new();
        if let Some(span) = self.spouse_span(trimmed) {
            spans.push(span);
        }
        if self.link_parent_references {
            spans.extend(self.parent_spans(trimmed));
        }
        self.render_with_links(trimmed, spans, generation)
    }

    fn child_block(&self, child: &Child, generation: Option<u32>) -> LatexBlock {
        let roman =
            roman::encode(child.ordinal).unwrap_or_else(|_| child.ordinal.to_string());
        let text = child.name_text.trim();
        let name_len = leading_name_len(text);

        if name_len == 0 {
            return LatexBlock::ChildPlain {
                roman,
                text: self.prepare(text),
            };
        }

        let name = &text[..name_len];
        let rest = self.prepare(&text[name_len..]);
        let styled_name = styled(&self.escape(name));

        match child.reference {
            Some(reference) if self.registry.contains(reference) => LatexBlock::ChildLinked {
                reference,
                roman,
                text: format!("{}{rest}", hyperlink(reference, &styled_name)),
            },
            Some(_) => LatexBlock::ChildUnlinked {
                roman,
                text: format!("{styled_name}{rest}"),
            },
            None => match self.linker.resolve(name, generation) {
                Some(reference) => LatexBlock::ChildLinked {
                    reference,
                    roman,
                    text: format!("{}{rest}", hyperlink(reference, &styled_name)),
                },
                None => LatexBlock::ChildPlain {
                    roman,
                    text: format!("{styled_name}{rest}"),
                },
            },
        }
    }

    /// Escape the gaps, style the mention spans, hyperlink the ones that
    /// resolve. Overlapping spans keep the earlier one.
    fn render_with_links(
        &self,
        text: &str,
        mut spans: Vec<Range<usize>>,
        generation: Option<u32>,
    ) -> String {
        spans.sort_by_key(|r| r.start);
        let mut out = String::new();
        let mut pos = 0;

        for span in spans {
            if span.start < pos {
                continue;
            }
            out.push_str(&self.prepare(&text[pos..span.start]));
            let mention = &text[span.clone()];
            if self.linker.looks_like_non_name(mention) {
                out.push_str(&self.escape(mention));
            } else {
                let styled_mention = styled(&self.escape(mention));
                match self.linker.resolve(mention, generation) {
                    Some(reference) => out.push_str(&hyperlink(reference, &styled_mention)),
                    None => out.push_str(&styled_mention),
                }
            }
            pos = span.end;
        }

        out.push_str(&self.prepare(&text[pos..]));
        out
    }

    fn spouse_span(&self, text: &str) -> Option<Range<usize>> {
        let m = self.spouse.find(text)?;
        let len = leading_name_len(&text[m.end()..]);
        if len == 0 {
            None
        } else {
            Some(m.end()..m.end() + len)
        }
    }

    /// Byte ranges of each name in "son/daughter of X" and
    /// "son/daughter of X and Y" phrases
    fn parent_spans(&self, text: &str) -> Vec<Range<usize>> {
        let mut spans = Vec::new();
        for caps in self.parent.captures_iter(text) {
            for i in [1, 2] {
                if let Some(m) = caps.get(i) {
                    let trimmed = m.as_str().trim_end();
                    spans.push(m.start()..m.start() + trimmed.len());
                }
            }
        }
        spans
    }

    /// Escape for LaTeX, with URL spans pulled out into \url{} first
    fn prepare(&self, text: &str) -> String {
        if !self.config.wrap_urls {
            return self.escape(text);
        }
        let mut out = String::new();
        let mut pos = 0;
        for m in self.url.find_iter(text) {
            out.push_str(&self.escape(&text[pos..m.start()]));
            let raw = m.as_str();
            if let Some(inner) = raw.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
                out.push_str(&format!("\\url{{{inner}}}"));
            } else {
                // Sentence punctuation glued to the URL is not part of it
                let trimmed = raw.trim_end_matches(['.', ',', ')']);
                out.push_str(&format!("\\url{{{trimmed}}}"));
                out.push_str(&self.escape(&raw[trimmed.len()..]));
            }
            pos = m.end();
        }
        out.push_str(&self.escape(&text[pos..]));
        out
    }

    fn escape(&self, text: &str) -> String {
        if !self.config.escape_special_characters {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                    out.push('\\');
                    out.push(c);
                }
                '~' => out.push_str("\\textasciitilde{}"),
                '^' => out.push_str("\\textasciicircum{}"),
                '\\' => out.push_str("\\textbackslash{}"),
                _ => out.push(c),
            }
        }
        out
    }
}

fn styled(name: &str) -> String {
    format!("\\textcolor{{accent}}{{\\textbf{{\\underline{{{name}}}}}}}")
}

fn hyperlink(reference: ReferenceNumber, styled_name: &str) -> String {
    format!("\\hyperlink{{person{reference}}}{{{styled_name}}}")
}

/// Length of the leading capitalized name run of a free-text fragment.
/// Stops at prepositions, conjunctions, commas, lowercase words, and
/// sentence-ending periods; single-letter initials with a period pass.
fn leading_name_len(text: &str) -> usize {
    let stops = ["on", "in", "at", "about", "circa", "and", "the"];
    let mut end = 0;

    for (offset, word) in split_words_with_offsets(text) {
        let bare = word.to_lowercase();
        let bare = bare.trim_end_matches(['.', ',']);
        if stops.contains(&bare) {
            break;
        }
        let starts_upper = word
            .chars()
            .next()
            .map(|c| c.is_uppercase())
            .unwrap_or(false);
        if !starts_upper {
            break;
        }

        end = offset + word.len();
        if word.ends_with(',') {
            end -= 1;
            break;
        }
        if word.ends_with('.') {
            let alphabetic = word.chars().filter(|c| c.is_alphabetic()).count();
            if alphabetic > 1 {
                // Sentence end, not an initial
                end -= 1;
                break;
            }
        }
    }

    end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParsingConfig;
    use crate::linker::parse_name_tokens;
    use crate::registry::RegistryBuilder;
    use crate::types::{Generation, Marriage, Person};

    fn build_registry(people: Vec<Person>) -> PersonRegistry {
        let config = ParsingConfig::default();
        let mut builder = RegistryBuilder::new();
        for mut p in people {
            p.name_tokens = parse_name_tokens(&p.display_name, &config.linker.strip_words);
            builder.register(p).unwrap();
        }
        builder.freeze()
    }

    fn person(reference: u64, name: &str) -> Person {
        Person::new(Some(reference), name.to_string())
    }

    fn emit(registry: &PersonRegistry) -> Vec<LatexBlock> {
        let config = ParsingConfig::default();
        LatexEmitter::new(registry, &config).unwrap().emit()
    }

    #[test]
    fn test_leading_name_len() {
        assert_eq!(leading_name_len("John Smith on 4 May 1920"), 10);
        assert_eq!(leading_name_len("John A. Smith."), 13);
        assert_eq!(leading_name_len("Thomas, died young."), 6);
        assert_eq!(leading_name_len("a woman from town"), 0);
    }

    #[test]
    fn test_escape_special_characters() {
        let registry = build_registry(vec![]);
        let config = ParsingConfig::default();
        let emitter = LatexEmitter::new(&registry, &config).unwrap();
        assert_eq!(
            emitter.escape("Smith & Sons, 50% of $100 #1_a"),
            "Smith \\& Sons, 50\\% of \\$100 \\#1\\_a"
        );
        assert_eq!(emitter.escape("a~b^c"), "a\\textasciitilde{}b\\textasciicircum{}c");
    }

    #[test]
    fn test_url_wrapping() {
        let registry = build_registry(vec![]);
        let config = ParsingConfig::default();
        let emitter = LatexEmitter::new(&registry, &config).unwrap();
        assert_eq!(
            emitter.prepare("see https://example.org/page_1. Next"),
            "see \\url{https://example.org/page_1}. Next"
        );
        assert_eq!(
            emitter.prepare("see <https://example.org/a_b> now"),
            "see \\url{https://example.org/a_b} now"
        );
    }

    #[test]
    fn test_marriage_spouse_resolved_to_hyperlink() {
        let mut jane = person(1, "Jane Doe");
        jane.marriages
            .push(Marriage::new("Jane married John Smith on 4 May 1920.".to_string()));
        let registry = build_registry(vec![jane, person(2, "John Smith")]);

        let blocks = emit(&registry);
        let marriage = blocks
            .iter()
            .find(|b| matches!(b, LatexBlock::Marriage { .. }))
            .unwrap();
        let rendered = marriage.render();
        assert!(rendered.contains("\\hyperlink{person2}"));
        assert!(rendered.contains("\\underline{John Smith}"));
        assert!(rendered.ends_with("on 4 May 1920}"));
    }

    #[test]
    fn test_marriage_spouse_unresolved_styled_without_link() {
        let mut jane = person(1, "Jane Doe");
        jane.marriages
            .push(Marriage::new("Jane married Robert Brown in 1930.".to_string()));
        let registry = build_registry(vec![jane]);

        let rendered = render_document(&emit(&registry));
        assert!(rendered.contains("\\textcolor{accent}{\\textbf{\\underline{Robert Brown}}}"));
        assert!(!rendered.contains("\\hyperlink"));
    }

    #[test]
    fn test_child_with_registered_reference_is_linked() {
        let mut jane = person(1, "Jane Doe");
        let mut m = Marriage::new("Jane married John Smith.".to_string());
        m.children.push(Child {
            ordinal: 1,
            reference: Some(2),
            name_text: "Richard Doe was born 1925.".to_string(),
        });
        jane.marriages.push(m);
        let registry = build_registry(vec![jane, person(2, "Richard Doe")]);

        let blocks = emit(&registry);
        let child = blocks
            .iter()
            .find(|b| matches!(b, LatexBlock::ChildLinked { .. }))
            .unwrap();
        let rendered = child.render();
        // The template macro receives the bare numeral and adds its own punctuation
        assert!(rendered.starts_with("\\childentrylinked{2}{i}{"));
        assert!(rendered.contains("\\hyperlink{person2}"));
    }

    #[test]
    fn test_child_with_unregistered_reference() {
        let mut jane = person(1, "Jane Doe");
        let mut m = Marriage::new("Jane married John Smith.".to_string());
        m.children.push(Child {
            ordinal: 1,
            reference: Some(99),
            name_text: "Richard Doe.".to_string(),
        });
        jane.marriages.push(m);
        let registry = build_registry(vec![jane]);

        let blocks = emit(&registry);
        assert!(blocks
            .iter()
            .any(|b| matches!(b, LatexBlock::ChildUnlinked { .. })));
        assert!(!render_document(&blocks).contains("\\hyperlink"));
    }

    #[test]
    fn test_child_without_reference_resolves_by_name() {
        let mut jane = person(1, "Jane Doe");
        let mut m = Marriage::new("Jane married John Smith.".to_string());
        m.children.push(Child {
            ordinal: 1,
            reference: None,
            name_text: "Sarah Doe.".to_string(),
        });
        jane.marriages.push(m);
        let registry = build_registry(vec![jane, person(5, "Sarah Doe")]);

        let blocks = emit(&registry);
        assert!(blocks.iter().any(
            |b| matches!(b, LatexBlock::ChildLinked { reference: 5, .. })
        ));
    }

    #[test]
    fn test_children_heading_number() {
        let mut jane = person(1, "Jane Doe");
        let mut m = Marriage::new("Jane married John Smith.".to_string());
        m.children.push(Child {
            ordinal: 1,
            reference: None,
            name_text: "Sarah.".to_string(),
        });
        jane.marriages.push(m);
        let registry = build_registry(vec![jane]);

        let rendered = render_document(&emit(&registry));
        assert!(rendered.contains("\\childrenheadingsingular"));
        assert!(!rendered.contains("\\childrenheadingplural"));
    }

    #[test]
    fn test_generation_title_emitted_on_label_change() {
        let mut a = person(1, "Adam Doe");
        a.generation = Some(Generation {
            label: "1st Generation".to_string(),
            number: 1,
        });
        let mut b = person(2, "Eve Doe");
        b.generation = a.generation.clone();
        let mut c = person(3, "Cain Doe");
        c.generation = Some(Generation {
            label: "2nd Generation".to_string(),
            number: 2,
        });
        let registry = build_registry(vec![a, b, c]);

        let blocks = emit(&registry);
        let titles: Vec<_> = blocks
            .iter()
            .filter(|b| matches!(b, LatexBlock::GenerationTitle { .. }))
            .collect();
        assert_eq!(titles.len(), 2);
        let dividers = blocks
            .iter()
            .filter(|b| matches!(b, LatexBlock::Divider))
            .count();
        assert_eq!(dividers, 3);
    }

    #[test]
    fn test_parent_reference_linked_in_bio() {
        let mut jane = person(1, "Jane Doe");
        jane.biography = "born 1900, daughter of Adam Doe and Mary Brown.".to_string();
        let registry = build_registry(vec![jane, person(7, "Adam Doe")]);

        let rendered = render_document(&emit(&registry));
        assert!(rendered.contains("\\hyperlink{person7}"));
        // Unresolved parent stays styled but unlinked
        assert!(rendered.contains("\\textbf{\\underline{Mary Brown}}"));
        assert!(!rendered.contains("\\hyperlink{personMary"));
    }

    #[test]
    fn test_single_parent_reference_is_linked() {
        let mut richard = person(2, "Richard Doe");
        richard.biography = "born 1900, son of Adam Doe.".to_string();
        let registry = build_registry(vec![richard, person(1, "Adam Doe")]);

        let rendered = render_document(&emit(&registry));
        assert!(rendered.contains("\\hyperlink{person1}"));
        assert!(rendered.contains("\\underline{Adam Doe}"));
    }

    #[test]
    fn test_empty_marriage_text_skips_marriage_block() {
        let mut jane = person(1, "Jane Doe");
        let mut m = Marriage::new(String::new());
        m.children.push(Child {
            ordinal: 1,
            reference: None,
            name_text: "Sarah.".to_string(),
        });
        jane.marriages.push(m);
        let registry = build_registry(vec![jane]);

        let blocks = emit(&registry);
        assert!(!blocks.iter().any(|b| matches!(b, LatexBlock::Marriage { .. })));
        assert!(blocks
            .iter()
            .any(|b| matches!(b, LatexBlock::ChildrenHeading { .. })));
    }
}
