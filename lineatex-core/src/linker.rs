use crate::config::LinkerConfig;
use crate::registry::PersonRegistry;
use crate::types::{NameTokens, Person, ReferenceNumber};
use anyhow::Result;
use regex::Regex;

/// Break a display name into lowercase match tokens. Honorifics and
/// suffixes from `strip_words` are dropped (trailing period tolerated, so
/// "Rev." strips like "rev"). Names with fewer than two remaining tokens
/// cannot be matched safely and yield None.
pub fn parse_name_tokens(name: &str, strip_words: &[String]) -> Option<NameTokens> {
    let mut tokens: Vec<String> = name
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| ",;:()\"".contains(c))
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .filter(|t| {
            let bare = t.trim_end_matches('.');
            !strip_words.iter().any(|s| s == bare)
        })
        .collect();

    if tokens.len() < 2 {
        return None;
    }
    let last = tokens.pop()?.trim_end_matches('.').to_string();
    let first = tokens.remove(0).trim_end_matches('.').to_string();
    Some(NameTokens {
        first,
        middles: tokens,
        last,
    })
}

/// First and last must agree exactly; middles match when either side has
/// none, or pairwise when one is an initial of the other ("a." vs "arthur").
pub fn tokens_match(a: &NameTokens, b: &NameTokens) -> bool {
    if a.first != b.first || a.last != b.last {
        return false;
    }
    if a.middles.is_empty() || b.middles.is_empty() {
        return true;
    }
    a.middles
        .iter()
        .zip(b.middles.iter())
        .all(|(x, y)| initial_compatible(x, y))
}

fn initial_compatible(a: &str, b: &str) -> bool {
    let a = a.trim_end_matches('.');
    let b = b.trim_end_matches('.');
    !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a))
}

/// Resolves free-text name mentions against the frozen registry. Purely
/// read-only — ambiguity always degrades to "no link", never to a guess
/// that could point a reader at the wrong relative.
pub struct Linker<'a> {
    registry: &'a PersonRegistry,
    config: &'a LinkerConfig,
    year: Regex,
}

impl<'a> Linker<'a> {
    pub fn new(registry: &'a PersonRegistry, config: &'a LinkerConfig) -> Result<Self> {
        Ok(Self {
            registry,
            config,
            year: Regex::new(r"\b\d{4}\b")?,
        })
    }

    /// Resolve a mention to a reference number, or None when the mention is
    /// not a person name, matches nobody, or matches ambiguously.
    /// `mention_generation` is the generation of the entry the mention
    /// appears in, used only to break ties.
    pub fn resolve(
        &self,
        mention: &str,
        mention_generation: Option<u32>,
    ) -> Option<ReferenceNumber> {
        let cleaned = mention.trim().trim_end_matches([',', '.', ';']);
        if self.looks_like_non_name(cleaned) {
            return None;
        }

        // Pass 1: exact display-name match, case-insensitive
        let lowered = cleaned.to_lowercase();
        let exact: Vec<&Person> = self
            .registry
            .iter()
            .filter(|p| p.reference.is_some() && p.display_name.to_lowercase() == lowered)
            .collect();
        if exact.len() == 1 {
            return exact[0].reference;
        }

        // Pass 2: token match with honorifics stripped and initials expanded
        let candidates = if exact.is_empty() {
            let target = parse_name_tokens(cleaned, &self.config.strip_words)?;
            self.registry
                .iter()
                .filter(|p| p.reference.is_some())
                .filter(|p| {
                    p.name_tokens
                        .as_ref()
                        .map(|t| tokens_match(t, &target))
                        .unwrap_or(false)
                })
                .collect()
        } else {
            exact
        };

        match candidates.len() {
            0 => None,
            1 => candidates[0].reference,
            _ => self.break_tie(&candidates, mention_generation),
        }
    }

    /// Among ambiguous candidates prefer the unique one in the nearest
    /// adjacent generation. Equally near candidates stay unresolved.
    fn break_tie(
        &self,
        candidates: &[&Person],
        mention_generation: Option<u32>,
    ) -> Option<ReferenceNumber> {
        let mention_gen = mention_generation?;
        let mut best: Option<(u32, &Person)> = None;
        let mut tied = false;

        for person in candidates {
            let person_gen = match person.generation_number() {
                Some(g) => g,
                None => continue,
            };
            let delta = person_gen.abs_diff(mention_gen);
            if delta > self.config.generation_adjacency {
                continue;
            }
            match best {
                None => best = Some((delta, person)),
                Some((b, _)) if delta < b => {
                    best = Some((delta, person));
                    tied = false;
                }
                Some((b, _)) if delta == b => tied = true,
                _ => {}
            }
        }

        if tied {
            None
        } else {
            best.and_then(|(_, p)| p.reference)
        }
    }

    /// Mentions that are dates, places, or placeholders rather than names
    pub fn looks_like_non_name(&self, mention: &str) -> bool {
        if mention.is_empty() {
            return true;
        }
        let lowered = mention.to_lowercase();
        if ["on ", "in ", "about ", "from ", "at "]
            .iter()
            .any(|p| lowered.starts_with(p))
        {
            return true;
        }
        if lowered.contains("unknown") || lowered.contains("unnamed") {
            return true;
        }
        self.year.is_match(mention)
    }
}
