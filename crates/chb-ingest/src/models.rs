//! Domain model for the company register
//!
//! A [`Company`] is the aggregate root: it owns its registered address, SIC
//! codes, and previous names, all keyed by the source-assigned company
//! number. The aggregate is constructed once per source row, persisted once,
//! and never merged or updated by this loader.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A company aggregate: the root row plus every nested entity it owns.
///
/// Dates use `Option<NaiveDate>`; `None` is the unset value, produced both
/// by empty source fields and by malformed ones (the mapper reports the
/// latter separately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_number: String,
    pub company_name: String,
    pub category: String,
    pub status: String,
    pub country_of_origin: String,
    pub dissolution_date: Option<NaiveDate>,
    pub incorporation_date: Option<NaiveDate>,
    pub uri: String,
    pub registered_address: Address,
    pub sic_codes: SicCodes,
    pub previous_names: Vec<PreviousName>,
}

/// Registered address, 1:1 with its company.
///
/// Always present on the aggregate, even when every field is empty, so the
/// one-to-one join stays unconditional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub care_of: String,
    pub po_box: String,
    pub address_line_1: String,
    pub address_line_2: String,
    pub post_town: String,
    pub county: String,
    pub country: String,
    pub postcode: String,
}

/// Industry classification text fields, 1:1 with the company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SicCodes {
    pub sic_text_1: String,
    pub sic_text_2: String,
    pub sic_text_3: String,
    pub sic_text_4: String,
}

/// A historical company name and the date the change took effect.
///
/// `effective_date` is `None` when the source date string was present but
/// malformed; the pair is still kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviousName {
    pub effective_date: Option<NaiveDate>,
    pub name: String,
}

impl PreviousName {
    pub fn new(effective_date: Option<NaiveDate>, name: impl Into<String>) -> Self {
        Self {
            effective_date,
            name: name.into(),
        }
    }
}

// ============================================================================
// Reserved schema slots
// ============================================================================
//
// The export carries accounts, returns, mortgages, and limited-partnership
// column blocks that this loader does not map yet. Their model types (and
// tables) are kept so a later loader can fill them without a schema change.

/// Accounts filing details (reserved, not populated by the bulk loader).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accounts {
    pub account_ref_day: Option<i32>,
    pub account_ref_month: Option<i32>,
    pub next_due_date: String,
    pub last_made_up_date: String,
    pub account_category: String,
}

/// Mortgage charge counts (reserved, not populated by the bulk loader).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mortgages {
    pub num_charges: Option<i32>,
    pub num_outstanding: Option<i32>,
    pub num_part_satisfied: Option<i32>,
    pub num_satisfied: Option<i32>,
}

/// Annual return dates (reserved, not populated by the bulk loader).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Returns {
    pub next_due_date: String,
    pub last_made_up_date: String,
}

/// Limited partnership partner counts (reserved, not populated by the bulk
/// loader).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitedPartnerships {
    pub num_general_partners: Option<i32>,
    pub num_limited_partners: Option<i32>,
}
