use anyhow::Result;
use serde::{Deserialize, Serialize};

// Default value functions for serde
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsingConfig {
    /// Line classification patterns and thresholds
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Cross-reference linking behavior
    #[serde(default)]
    pub linker: LinkerConfig,
    /// LaTeX emission behavior
    #[serde(default)]
    pub emitter: EmitterConfig,
    /// Replace curly quotes and en/em dashes from PDF extraction
    /// before classification
    #[serde(default = "default_true")]
    pub normalize_input: bool,
}

impl Default for ParsingConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            linker: LinkerConfig::default(),
            emitter: EmitterConfig::default(),
            normalize_input: true,
        }
    }
}

impl ParsingConfig {
    /// Load config from a YAML file path (functional approach)
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParsingConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to default
    pub fn load_with_fallback(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|_| {
                eprintln!("⚠️  Failed to load config from {}, using defaults", p);
                Self::default()
            }),
            None => Self::default(),
        }
    }
}

// ===== CLASSIFIER =====

fn default_children_heading_patterns() -> Vec<String> {
    vec![
        // "Children from this marriage were:", "The child of this marriage was:"
        r"(?i)^(?:the\s+)?(?:following\s+)?child(?:ren)?\s+(?:from|of)\s+this\s+marriage"
            .to_string(),
        // "His children were:", "Her child was:"
        r"(?i)^(?:his|her|their)\s+child(?:ren)?\s+(?:was|were)\b".to_string(),
    ]
}

fn default_generation_title_patterns() -> Vec<String> {
    vec![
        // "1st Generation", "12th Generation"
        r"(?i)^\d+(?:st|nd|rd|th)\s+generation$".to_string(),
    ]
}

fn default_max_roman_length() -> usize {
    6 // longer roman-letter tokens are almost always ordinary words
}

fn default_marriage_keyword_window() -> usize {
    5 // "married" must appear within this many leading words
}

fn default_max_title_words() -> usize {
    6
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Regexes (anchored, case-insensitive) recognizing children-section
    /// heading phrases
    #[serde(default = "default_children_heading_patterns")]
    pub children_heading_patterns: Vec<String>,

    /// Regexes recognizing generation titles. Lines matching none of these
    /// can still classify as a title via the standalone title-case heuristic.
    #[serde(default = "default_generation_title_patterns")]
    pub generation_title_patterns: Vec<String>,

    /// Maximum length of a roman-numeral child prefix
    #[serde(default = "default_max_roman_length")]
    pub max_roman_length: usize,

    /// How many words may precede "married" on a marriage line
    #[serde(default = "default_marriage_keyword_window")]
    pub marriage_keyword_window: usize,

    /// Maximum word count for the standalone title-case generation heuristic
    #[serde(default = "default_max_title_words")]
    pub max_title_words: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            children_heading_patterns: default_children_heading_patterns(),
            generation_title_patterns: default_generation_title_patterns(),
            max_roman_length: default_max_roman_length(),
            marriage_keyword_window: default_marriage_keyword_window(),
            max_title_words: default_max_title_words(),
        }
    }
}

// ===== LINKER =====

fn default_strip_words() -> Vec<String> {
    // Honorifics and suffixes removed before name matching
    [
        "sir", "lady", "lord", "count", "countess", "duke", "duchess", "baron",
        "baroness", "mr", "mrs", "miss", "dr", "rev", "jr", "sr", "i", "ii",
        "iii", "iv", "v",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_generation_adjacency() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkerConfig {
    /// Tokens stripped from names before matching (lowercase, period-tolerant)
    #[serde(default = "default_strip_words")]
    pub strip_words: Vec<String>,

    /// Maximum generation distance still considered "adjacent" when breaking
    /// ties between ambiguous token matches
    #[serde(default = "default_generation_adjacency")]
    pub generation_adjacency: u32,

    /// Resolve "son/daughter of X and Y" mentions in biography and
    /// marriage text
    #[serde(default = "default_true")]
    pub link_parent_references: bool,
}

impl Default for LinkerConfig {
    fn default() -> Self {
        Self {
            strip_words: default_strip_words(),
            generation_adjacency: default_generation_adjacency(),
            link_parent_references: true,
        }
    }
}

// ===== EMITTER =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitterConfig {
    /// Escape LaTeX special characters in free text
    #[serde(default = "default_true")]
    pub escape_special_characters: bool,

    /// Wrap bare URLs and <http…> spans in \url{}
    #[serde(default = "default_true")]
    pub wrap_urls: bool,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            escape_special_characters: true,
            wrap_urls: true,
        }
    }
}
