//! Field-name conventions and comparison forms.
//!
//! Source documents and target templates disagree on casing and separators
//! (`legal_name`, `LegalName`, `CD_Legal_Name`, `"state "`). Everything that
//! compares names goes through [`normalize`] or [`compact`] so those spellings
//! meet on one form.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Naming convention of a single field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingConvention {
    /// `legal_name`
    LowerSeparated,
    /// `legalName`
    Camel,
    /// `LegalName`
    Pascal,
    /// `legal-name`
    Kebab,
    /// `LEGAL_NAME`
    UpperSeparated,
    /// Anything else, e.g. `Legal_Name` or `RA city`.
    Mixed,
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LowerSeparated => "lower-separated",
            Self::Camel => "camel",
            Self::Pascal => "pascal",
            Self::Kebab => "kebab",
            Self::UpperSeparated => "upper-separated",
            Self::Mixed => "mixed",
        };
        f.write_str(label)
    }
}

// First match wins.
static CONVENTIONS: LazyLock<Vec<(NamingConvention, Regex)>> = LazyLock::new(|| {
    [
        (NamingConvention::LowerSeparated, r"^[a-z][a-z0-9_]*$"),
        (NamingConvention::Camel, r"^[a-z][a-zA-Z0-9]*$"),
        (NamingConvention::Pascal, r"^[A-Z][a-zA-Z0-9]*$"),
        (NamingConvention::Kebab, r"^[a-z][a-z0-9-]*$"),
        (NamingConvention::UpperSeparated, r"^[A-Z][A-Z0-9_]*$"),
    ]
    .into_iter()
    .filter_map(|(convention, pattern)| Regex::new(pattern).ok().map(|re| (convention, re)))
    .collect()
});

/// Prefixes that scope a target field to a section of the record.
pub const KNOWN_PREFIXES: &[&str] = &[
    "PA_", "RA_", "CD_", "Org_", "Og_", "Contact_", "Billing_", "Mailing_",
];

pub fn classify(name: &str) -> NamingConvention {
    let name = name.trim();
    CONVENTIONS
        .iter()
        .find(|(_, re)| re.is_match(name))
        .map_or(NamingConvention::Mixed, |(convention, _)| *convention)
}

/// Lowercase `_`-joined words.
///
/// Splits camel/pascal humps and letter/digit boundaries, and folds any run
/// of non-alphanumeric characters into one separator.
pub fn normalize(name: &str) -> String {
    let chars: Vec<char> = name.trim().chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    let mut pending_separator = false;
    for (idx, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            pending_separator = !out.is_empty();
            continue;
        }
        if idx > 0 && !pending_separator && !out.is_empty() && is_boundary(&chars, idx) {
            pending_separator = true;
        }
        if pending_separator {
            out.push('_');
            pending_separator = false;
        }
        out.extend(c.to_lowercase());
    }
    out
}

fn is_boundary(chars: &[char], idx: usize) -> bool {
    let prev = chars[idx - 1];
    let c = chars[idx];
    if !prev.is_alphanumeric() {
        return false;
    }
    if c.is_uppercase() && (prev.is_lowercase() || prev.is_ascii_digit()) {
        return true;
    }
    // `RAName` splits before the last capital of an acronym.
    if c.is_uppercase()
        && prev.is_uppercase()
        && chars.get(idx + 1).is_some_and(|next| next.is_lowercase())
    {
        return true;
    }
    (c.is_ascii_digit() && prev.is_alphabetic()) || (c.is_alphabetic() && prev.is_ascii_digit())
}

/// [`normalize`] without separators, for matching generated target names.
pub fn compact(name: &str) -> String {
    normalize(name).replace('_', "")
}

/// Strips one known prefix from an already normalized name.
///
/// A name that is nothing but a prefix is returned unchanged.
pub fn strip_known_prefix(normalized: &str) -> (Option<&'static str>, &str) {
    for prefix in KNOWN_PREFIXES {
        let lowered = prefix.to_lowercase();
        if let Some(rest) = normalized.strip_prefix(lowered.as_str())
            && !rest.is_empty()
        {
            return (Some(prefix), rest);
        }
    }
    (None, normalized)
}

/// Forms a name is compared under, most literal first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonForm {
    pub normalized: String,
    /// The prefix removed to produce this form, if any.
    pub prefix: Option<&'static str>,
}

pub fn comparison_forms(name: &str) -> Vec<ComparisonForm> {
    let normalized = normalize(name);
    let mut forms = vec![ComparisonForm {
        normalized: normalized.clone(),
        prefix: None,
    }];
    if let (Some(prefix), rest) = strip_known_prefix(&normalized) {
        forms.push(ComparisonForm {
            normalized: rest.to_string(),
            prefix: Some(prefix),
        });
    }
    forms
}

/// `legal_name` becomes `Legal_Name`.
pub fn label_case(name: &str) -> String {
    normalize(name)
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("_")
}

/// Normalizes each dotted segment and drops leading numeric envelope keys.
///
/// `1.Payload.Principal_Address.City` and `payload.principal_address.city`
/// share the key `payload.principal_address.city`.
pub fn path_key(path: &str) -> String {
    path.split('.')
        .skip_while(|segment| is_envelope_segment(segment))
        .map(normalize)
        .collect::<Vec<_>>()
        .join(".")
}

/// The literal path with leading numeric envelope keys removed.
pub fn strip_envelope(path: &str) -> &str {
    let mut rest = path;
    while let Some((head, tail)) = rest.split_once('.') {
        if !is_envelope_segment(head) {
            break;
        }
        rest = tail;
    }
    rest
}

fn is_envelope_segment(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}
