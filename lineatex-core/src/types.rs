use serde::{Deserialize, Serialize};

/// The declared entry number of a person in the source report.
/// Primary key into the registry.
pub type ReferenceNumber = u64;

// ===== PERSON MODEL =====
// These types mirror the structure of a register-style genealogy report:
// numbered person entries, each with a biography, zero or more marriages,
// and roman-numbered children under each marriage.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Declared reference number, absent for unlinkable placeholders
    pub reference: Option<ReferenceNumber>,
    /// Full name as it should render
    pub display_name: String,
    /// Name components derived from display_name, used for matching
    pub name_tokens: Option<NameTokens>,
    /// Free-form text following the name on the entry line
    pub biography: String,
    /// Insertion order = document order
    pub marriages: Vec<Marriage>,
    /// Most recent generation title seen before this entry
    pub generation: Option<Generation>,
}

impl Person {
    pub fn new(reference: Option<ReferenceNumber>, display_name: String) -> Self {
        Self {
            reference,
            display_name,
            name_tokens: None,
            biography: String::new(),
            marriages: Vec::new(),
            generation: None,
        }
    }

    /// Generation ordinal for adjacency checks, when known
    pub fn generation_number(&self) -> Option<u32> {
        self.generation.as_ref().map(|g| g.number)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marriage {
    /// Raw text describing the spouse and marriage details
    pub spouse_text: String,
    pub children: Vec<Child>,
}

impl Marriage {
    pub fn new(spouse_text: String) -> Self {
        Self {
            spouse_text,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Child {
    /// Decoded from the roman numeral prefix, 1-based
    pub ordinal: u32,
    /// Present when the child is themselves a full entry elsewhere
    pub reference: Option<ReferenceNumber>,
    /// Raw name/description text
    pub name_text: String,
}

/// A generation title as it appeared in the source, plus its ordinal.
/// The number is parsed from the title when present ("3rd Generation" → 3),
/// otherwise it is a running index of titles seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    pub label: String,
    pub number: u32,
}

// ===== NAME TOKENS =====

/// Ordered name components used by the linker. All tokens are lowercased
/// and stripped of honorifics/suffixes before they get here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameTokens {
    pub first: String,
    pub middles: Vec<String>,
    pub last: String,
}
