//! The curated default rule catalogue.
//!
//! This is the only definition of the defaults; `seed_defaults` on every
//! store writes exactly this set.

use fieldmap_model::{InferredType, MappingRule};

const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const PHONE_PATTERN: &str = r"^\+?[\d\s\-\(\)]+$";
const ADDRESS_PATTERN: &str = r"^[a-zA-Z0-9\s\.,\-]+$";

const EXACT_PRIORITY: u32 = 10;
const ABBREVIATION_PRIORITY: u32 = 15;
const PATTERN_PRIORITY: u32 = 20;
const CONTEXT_PRIORITY: u32 = 30;

/// Address components shared by the principal and registered-agent sections.
///
/// `(source terminal, meaning, canonical target attribute)`
const ADDRESS_COMPONENTS: &[(&str, &str, &str)] = &[
    ("city", "city", "City"),
    ("state", "state", "State"),
    ("zip_code", "zip_code", "Postal_Code"),
    ("street_address", "street_address", "Address_Line1"),
    ("address_line_2", "address_line2", "Address_Line2"),
];

/// Target spellings used by individual form templates.
///
/// `(source path, meaning, target)`
const ABBREVIATIONS: &[(&str, &str, &str)] = &[
    ("payload.name.legal_name", "legal_name", "Entity Name"),
    ("payload.principal_address.city", "city", "Principle city"),
    ("payload.principal_address.state", "state", "PS"),
    ("payload.principal_address.zip_code", "zip_code", "PZIP"),
    ("payload.registered_agent.address.city", "city", "RA city"),
    ("payload.registered_agent.address.city", "city", "RA Address city"),
    ("payload.registered_agent.address.city", "city", "Register_Agent MI_city"),
    ("payload.registered_agent.address.state", "state", "RS"),
    ("payload.registered_agent.address.state", "state", "Register Agent MI_state"),
    ("payload.registered_agent.address.zip_code", "zip_code", "RA zip"),
    ("payload.registered_agent.address.zip_code", "zip_code", "RA Zip"),
    ("payload.registered_agent.address.street_address", "street_address", "RA address"),
    ("payload.registered_agent.key_personnel_name", "personnel_name", "RA Name"),
    ("payload.registered_agent.key_personnel_name", "personnel_name", "Register Agent Name"),
    ("payload.registered_agent.key_personnel_name", "personnel_name", "statutoryAgent"),
    ("payload.registered_agent.email_id", "email", "Register Agent email"),
    ("payload.registered_agent.contact_no", "contact_no", "Register_Agent MI_phone number"),
    ("payload.registered_agent.mailing_information.zip_code", "zip_code", "RAMAZ"),
    ("payload.registered_agent.mailing_information.zip_code", "zip_code", "RA MailingAdd zip"),
];

/// `(regex, target template, meaning, field type, priority)`
const PATTERNS: &[(&str, &str, &str, InferredType, u32)] = &[
    (
        r"EntityType\.(\w+)",
        "data.EntityType.{field}",
        "entity_type",
        InferredType::String,
        PATTERN_PRIORITY,
    ),
    (
        r"State\.countryMaster\.(\w+)",
        "data.State.Country.{field}",
        "country",
        InferredType::Address,
        PATTERN_PRIORITY - 1,
    ),
    (
        r"State\.(\w+)",
        "data.State.{field}",
        "state",
        InferredType::Address,
        PATTERN_PRIORITY,
    ),
    (
        r"name\.(\w+)",
        "data.Payload.Name.{field}",
        "legal_name",
        InferredType::Name,
        PATTERN_PRIORITY + 1,
    ),
    (
        r"registered_agent\.Address\.(\w+)",
        "data.Payload.Registered_Agent.Address.{field}",
        "address",
        InferredType::Address,
        PATTERN_PRIORITY - 1,
    ),
    (
        r"registered_agent\.(\w+)",
        "data.Payload.Registered_Agent.{field}",
        "personnel_name",
        InferredType::Name,
        PATTERN_PRIORITY + 1,
    ),
];

/// `(parent bucket, target template, meaning)`
const CONTEXTS: &[(&str, &str, &str)] = &[
    ("principal_address", "PA_{field}", "principal_address"),
    ("registered_agent.address", "RA_{field}", "registered_agent_address"),
    ("registered_agent", "RA_{field}", "registered_agent"),
    ("registered_agent.billing_information", "Billing_{field}", "billing_information"),
    ("registered_agent.mailing_information", "Mailing_{field}", "mailing_information"),
    ("contact_information", "Org_{field}", "organizer_contact"),
    ("contact_information", "Og_{field}", "organizer_contact"),
    ("contact_information.address", "Org_{field}", "organizer_address"),
    ("organizer_information", "Org_{field}", "organizer_contact"),
    ("organizer_information", "Og_{field}", "organizer_contact"),
];

/// Builds the default rule catalogue.
pub fn default_rules() -> Vec<MappingRule> {
    let mut rules = Vec::new();

    for target in ["CD_Legal_Name", "CD_LLC_Name", "Legal_Name"] {
        rules.push(
            MappingRule::exact("payload.name.legal_name", target)
                .with_meaning("legal_name")
                .with_field_type(InferredType::Name)
                .with_priority(EXACT_PRIORITY)
                .required(),
        );
    }
    rules.push(
        MappingRule::exact("payload.name.entity_name", "Legal_Name")
            .with_meaning("legal_name")
            .with_field_type(InferredType::Name)
            .with_priority(EXACT_PRIORITY + 1),
    );
    rules.push(
        MappingRule::exact("payload.name.alternate_legal_name", "CD_Alternate_Legal_Name")
            .with_meaning("alternate_legal_name")
            .with_field_type(InferredType::Name)
            .with_priority(EXACT_PRIORITY),
    );

    for (section, prefix) in [
        ("payload.principal_address", "PA_"),
        ("payload.registered_agent.address", "RA_"),
    ] {
        for (terminal, meaning, attribute) in ADDRESS_COMPONENTS {
            rules.push(
                MappingRule::exact(format!("{section}.{terminal}"), format!("{prefix}{attribute}"))
                    .with_meaning(*meaning)
                    .with_field_type(InferredType::Address)
                    .with_priority(EXACT_PRIORITY)
                    .with_validation(ADDRESS_PATTERN),
            );
        }
    }

    rules.push(
        MappingRule::exact("payload.registered_agent.key_personnel_name", "RA_Name")
            .with_meaning("personnel_name")
            .with_field_type(InferredType::Name)
            .with_priority(EXACT_PRIORITY),
    );
    rules.push(
        MappingRule::exact("payload.registered_agent.email_id", "Email")
            .with_meaning("email")
            .with_field_type(InferredType::Email)
            .with_priority(EXACT_PRIORITY)
            .with_validation(EMAIL_PATTERN),
    );
    rules.push(
        MappingRule::exact("payload.registered_agent.contact_no", "Contact_No")
            .with_meaning("contact_no")
            .with_field_type(InferredType::Phone)
            .with_priority(EXACT_PRIORITY)
            .with_validation(PHONE_PATTERN),
    );

    for (source, meaning, target) in ABBREVIATIONS {
        let mut rule = MappingRule::exact(*source, *target)
            .with_meaning(*meaning)
            .with_priority(ABBREVIATION_PRIORITY);
        if let Some(field_type) = crate::vocabulary::tag(meaning).map(|tag| tag.field_type) {
            rule = rule.with_field_type(field_type);
        }
        rules.push(rule);
    }

    for (pattern, template, meaning, field_type, priority) in PATTERNS {
        rules.push(
            MappingRule::pattern(*pattern, *template)
                .with_meaning(*meaning)
                .with_field_type(*field_type)
                .with_priority(*priority),
        );
    }

    for (bucket, template, meaning) in CONTEXTS {
        rules.push(
            MappingRule::context(*bucket, *template)
                .with_meaning(*meaning)
                .with_priority(CONTEXT_PRIORITY),
        );
    }

    rules
}
