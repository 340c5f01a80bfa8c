//! Static semantic vocabulary used by the semantic strategy.
//!
//! This table is also what keeps resolution alive when the rule store is
//! unavailable, so it does not depend on any persisted state.

use std::collections::BTreeSet;

use fieldmap_model::InferredType;

use crate::naming::{compact, comparison_forms};

/// Score of a synonym hit.
pub const SYNONYM_SCORE: f64 = 0.9;
/// Minimum character-set similarity for a fuzzy hit.
pub const FUZZY_FLOOR: f64 = 0.7;
/// Fuzzy hits always rank below synonym hits.
pub const FUZZY_CEILING: f64 = 0.89;

/// A semantic field with its canonical target attribute and known spellings.
#[derive(Debug, PartialEq, Eq)]
pub struct SemanticTag {
    pub tag: &'static str,
    /// Attribute appended to a section prefix, e.g. `Postal_Code` in `PA_Postal_Code`.
    pub attribute: &'static str,
    pub field_type: InferredType,
    pub synonyms: &'static [&'static str],
}

pub static VOCABULARY: &[SemanticTag] = &[
    SemanticTag {
        tag: "legal_name",
        attribute: "Legal_Name",
        field_type: InferredType::Name,
        synonyms: &[
            "legal_name",
            "legalName",
            "entity_name",
            "Entity Name",
            "llc_name",
            "company_name",
            "business_name",
        ],
    },
    SemanticTag {
        tag: "alternate_legal_name",
        attribute: "Alternate_Legal_Name",
        field_type: InferredType::Name,
        synonyms: &[
            "alternate_legal_name",
            "alternateName",
            "alternate_name",
            "dba",
            "doing_business_as",
        ],
    },
    SemanticTag {
        tag: "personnel_name",
        attribute: "Name",
        field_type: InferredType::Name,
        synonyms: &[
            "name",
            "keyPersonnelName",
            "personnelName",
            "agent_name",
            "full_name",
            "statutoryAgent",
        ],
    },
    SemanticTag {
        tag: "city",
        attribute: "City",
        field_type: InferredType::Address,
        synonyms: &["city", "town", "municipality"],
    },
    SemanticTag {
        tag: "state",
        attribute: "State",
        field_type: InferredType::Address,
        synonyms: &["state", "stateId", "province"],
    },
    SemanticTag {
        tag: "zip_code",
        attribute: "Postal_Code",
        field_type: InferredType::Address,
        synonyms: &["zip", "zip_code", "zipCode", "postalCode", "postal_code", "postcode"],
    },
    SemanticTag {
        tag: "street_address",
        attribute: "Address_Line1",
        field_type: InferredType::Address,
        synonyms: &[
            "street_address",
            "addressLine1",
            "address_line1",
            "street",
            "address1",
        ],
    },
    SemanticTag {
        tag: "address_line2",
        attribute: "Address_Line2",
        field_type: InferredType::Address,
        synonyms: &["address_line2", "addressLine2", "address_line 2", "address2", "suite"],
    },
    SemanticTag {
        tag: "email",
        attribute: "Email",
        field_type: InferredType::Email,
        synonyms: &["email", "emailId", "email_address", "email address"],
    },
    SemanticTag {
        tag: "contact_no",
        attribute: "Contact_No",
        field_type: InferredType::Phone,
        synonyms: &[
            "contact_no",
            "contactNo",
            "contact_number",
            "phone",
            "phone_number",
            "telephone",
        ],
    },
    SemanticTag {
        tag: "country",
        attribute: "Country",
        field_type: InferredType::Address,
        synonyms: &["country", "countryName", "country_name"],
    },
    SemanticTag {
        tag: "entity_type",
        attribute: "Entity_Type",
        field_type: InferredType::String,
        synonyms: &["entity_type", "entityType", "business_type"],
    },
];

/// A vocabulary hit for one field name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SemanticMatch {
    pub tag: &'static SemanticTag,
    pub score: f64,
    /// Section prefix stripped from the name before it matched.
    pub prefix: Option<&'static str>,
}

impl SemanticMatch {
    pub fn is_synonym(&self) -> bool {
        self.score >= SYNONYM_SCORE
    }
}

/// Jaccard similarity of the two strings' character sets.
pub fn char_set_similarity(left: &str, right: &str) -> f64 {
    let left: BTreeSet<char> = left.chars().collect();
    let right: BTreeSet<char> = right.chars().collect();
    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    left.intersection(&right).count() as f64 / union as f64
}

pub fn tag(name: &str) -> Option<&'static SemanticTag> {
    VOCABULARY.iter().find(|entry| entry.tag == name)
}

/// Classifies a field name against the vocabulary.
///
/// Every comparison form of the name is tried for a synonym hit before any
/// fuzzy comparison, so `Contact_No` stays a contact number instead of
/// losing its `Contact_` prefix.
pub fn classify(name: &str) -> Option<SemanticMatch> {
    let forms = comparison_forms(name);
    for form in &forms {
        let key = compact(&form.normalized);
        if key.is_empty() {
            continue;
        }
        for entry in VOCABULARY {
            if entry.synonyms.iter().any(|synonym| compact(synonym) == key) {
                return Some(SemanticMatch {
                    tag: entry,
                    score: SYNONYM_SCORE,
                    prefix: form.prefix,
                });
            }
        }
    }
    let mut best: Option<SemanticMatch> = None;
    for form in &forms {
        let key = compact(&form.normalized);
        if key.is_empty() {
            continue;
        }
        for entry in VOCABULARY {
            for synonym in entry.synonyms {
                let score = char_set_similarity(&key, &compact(synonym));
                if score >= FUZZY_FLOOR && best.is_none_or(|current| score > current.score) {
                    best = Some(SemanticMatch {
                        tag: entry,
                        score,
                        prefix: form.prefix,
                    });
                }
            }
        }
    }
    best.map(|hit| SemanticMatch {
        score: hit.score.min(FUZZY_CEILING),
        ..hit
    })
}

/// Section of the record a name or path is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Principal,
    RegisteredAgent,
    Organizer,
    Billing,
    Mailing,
}

impl Section {
    /// Section a target prefix scopes to; `CD_` and `Contact_` are record-wide.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "PA_" => Some(Self::Principal),
            "RA_" => Some(Self::RegisteredAgent),
            "Org_" | "Og_" => Some(Self::Organizer),
            "Billing_" => Some(Self::Billing),
            "Mailing_" => Some(Self::Mailing),
            _ => None,
        }
    }

    /// Innermost section named by a normalized parent path.
    pub fn from_path(path_key: &str) -> Option<Self> {
        path_key.split('.').rev().find_map(|segment| {
            if segment.contains("billing") {
                Some(Self::Billing)
            } else if segment.contains("mailing") {
                Some(Self::Mailing)
            } else if segment.contains("principal") {
                Some(Self::Principal)
            } else if segment.contains("registered_agent") || segment == "agent" {
                Some(Self::RegisteredAgent)
            } else if segment.contains("organizer") || segment.contains("contact_information") {
                Some(Self::Organizer)
            } else {
                None
            }
        })
    }
}
