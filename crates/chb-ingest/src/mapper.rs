//! Row-to-aggregate mapping
//!
//! [`map_row`] is the pure center of the pipeline: one raw record in, one
//! [`Company`] aggregate out. No I/O, no shared state, so it can run on any
//! worker without coordination.

use chrono::NaiveDate;
use csv::StringRecord;

use crate::error::IngestError;
use crate::layout::{self, DATE_FORMAT, EXPECTED_COLUMNS, PREVIOUS_NAME_COLUMNS};
use crate::models::{Address, Company, PreviousName, SicCodes};

/// A field that was present but could not be parsed.
///
/// The mapped value falls back to unset; the warning carries enough context
/// to log and count the occurrence instead of swallowing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    /// Name of the affected field, e.g. "dissolution_date".
    pub field: &'static str,
    /// The raw source value that failed to parse.
    pub value: String,
}

/// Result of mapping one raw row.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub company: Company,
    pub warnings: Vec<FieldWarning>,
}

/// Map one raw record into a [`Company`] aggregate.
///
/// Fails only when the record does not have the contracted column count.
/// Every other problem is field-local: a malformed date becomes the unset
/// value plus a [`FieldWarning`] on the returned [`MappedRow`].
pub fn map_row(record: &StringRecord) -> Result<MappedRow, IngestError> {
    if record.len() != EXPECTED_COLUMNS {
        return Err(IngestError::Structure {
            expected: EXPECTED_COLUMNS,
            found: record.len(),
        });
    }

    let mut warnings = Vec::new();
    let company_number = field(record, layout::COL_COMPANY_NUMBER);

    let registered_address = Address {
        care_of: field(record, layout::COL_ADDR_CARE_OF),
        po_box: field(record, layout::COL_ADDR_PO_BOX),
        address_line_1: field(record, layout::COL_ADDR_LINE_1),
        address_line_2: field(record, layout::COL_ADDR_LINE_2),
        post_town: field(record, layout::COL_ADDR_POST_TOWN),
        county: field(record, layout::COL_ADDR_COUNTY),
        country: field(record, layout::COL_ADDR_COUNTRY),
        postcode: field(record, layout::COL_ADDR_POSTCODE),
    };

    let sic_codes = SicCodes {
        sic_text_1: field(record, layout::COL_SIC_TEXT_1),
        sic_text_2: field(record, layout::COL_SIC_TEXT_2),
        sic_text_3: field(record, layout::COL_SIC_TEXT_3),
        sic_text_4: field(record, layout::COL_SIC_TEXT_4),
    };

    let mut previous_names = Vec::new();
    for (date_col, name_col) in PREVIOUS_NAME_COLUMNS {
        let raw_date = raw_field(record, date_col).trim();
        let name = raw_field(record, name_col).trim();
        // A slot counts only when both halves are present; the date is
        // parsed only for slots that are kept.
        if raw_date.is_empty() || name.is_empty() {
            continue;
        }
        let effective_date =
            parse_date(raw_date, "previous_name.effective_date", &mut warnings);
        previous_names.push(PreviousName::new(effective_date, name));
    }

    let company = Company {
        company_name: field(record, layout::COL_COMPANY_NAME),
        company_number,
        category: field(record, layout::COL_CATEGORY),
        status: field(record, layout::COL_STATUS),
        country_of_origin: field(record, layout::COL_COUNTRY_OF_ORIGIN),
        dissolution_date: parse_date(
            raw_field(record, layout::COL_DISSOLUTION_DATE),
            "dissolution_date",
            &mut warnings,
        ),
        incorporation_date: parse_date(
            raw_field(record, layout::COL_INCORPORATION_DATE),
            "incorporation_date",
            &mut warnings,
        ),
        uri: field(record, layout::COL_URI),
        registered_address,
        sic_codes,
        previous_names,
    };

    Ok(MappedRow { company, warnings })
}

fn raw_field<'a>(record: &'a StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("")
}

fn field(record: &StringRecord, index: usize) -> String {
    raw_field(record, index).trim().to_string()
}

/// Parse a source date field.
///
/// Empty means unset. A non-empty value that does not match the export's
/// date format also maps to unset, but is reported through `warnings`
/// rather than dropped on the floor.
fn parse_date(
    raw: &str,
    name: &'static str,
    warnings: &mut Vec<FieldWarning>,
) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            warnings.push(FieldWarning {
                field: name,
                value: raw.to_string(),
            });
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{COL_COMPANY_NUMBER, COL_DISSOLUTION_DATE, COL_INCORPORATION_DATE};

    /// A structurally valid row with the given company number and name,
    /// every other field empty.
    fn blank_row(number: &str, name: &str) -> Vec<String> {
        let mut fields = vec![String::new(); EXPECTED_COLUMNS];
        fields[layout::COL_COMPANY_NAME] = name.to_string();
        fields[COL_COMPANY_NUMBER] = number.to_string();
        fields
    }

    fn record(fields: &[String]) -> StringRecord {
        StringRecord::from(fields.iter().map(String::as_str).collect::<Vec<_>>())
    }

    #[test]
    fn maps_company_number_from_its_column() {
        let row = blank_row("07495895", "ACME WIDGETS LTD");
        let mapped = map_row(&record(&row)).unwrap();

        assert_eq!(mapped.company.company_number, "07495895");
        assert_eq!(mapped.company.company_name, "ACME WIDGETS LTD");
        assert!(mapped.warnings.is_empty());
    }

    #[test]
    fn maps_core_attributes_positionally() {
        let mut row = blank_row("07495895", "ACME WIDGETS LTD");
        row[layout::COL_CATEGORY] = "Private Limited Company".to_string();
        row[layout::COL_STATUS] = "Active".to_string();
        row[layout::COL_COUNTRY_OF_ORIGIN] = "United Kingdom".to_string();
        row[COL_INCORPORATION_DATE] = "11/01/2011".to_string();
        row[layout::COL_URI] =
            "http://business.data.gov.uk/id/company/07495895".to_string();
        row[layout::COL_ADDR_LINE_1] = "1 HIGH STREET".to_string();
        row[layout::COL_ADDR_POSTCODE] = "AB1 2CD".to_string();
        row[layout::COL_SIC_TEXT_1] = "62012 - Business and domestic software development".to_string();

        let mapped = map_row(&record(&row)).unwrap();
        let company = mapped.company;

        assert_eq!(company.category, "Private Limited Company");
        assert_eq!(company.status, "Active");
        assert_eq!(company.country_of_origin, "United Kingdom");
        assert_eq!(
            company.incorporation_date,
            NaiveDate::from_ymd_opt(2011, 1, 11)
        );
        assert_eq!(company.registered_address.address_line_1, "1 HIGH STREET");
        assert_eq!(company.registered_address.postcode, "AB1 2CD");
        assert_eq!(
            company.sic_codes.sic_text_1,
            "62012 - Business and domestic software development"
        );
    }

    #[test]
    fn empty_dissolution_date_maps_to_unset_without_warning() {
        let row = blank_row("07495895", "ACME WIDGETS LTD");
        let mapped = map_row(&record(&row)).unwrap();

        assert_eq!(mapped.company.dissolution_date, None);
        assert!(mapped.warnings.is_empty());
    }

    #[test]
    fn malformed_dissolution_date_maps_to_unset_with_warning() {
        let mut row = blank_row("07495895", "ACME WIDGETS LTD");
        row[COL_DISSOLUTION_DATE] = "2019-05-01".to_string();

        let mapped = map_row(&record(&row)).unwrap();

        assert_eq!(mapped.company.dissolution_date, None);
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].field, "dissolution_date");
        assert_eq!(mapped.warnings[0].value, "2019-05-01");
    }

    #[test]
    fn previous_names_keep_only_complete_pairs_in_slot_order() {
        let mut row = blank_row("07495895", "ACME WIDGETS LTD");
        // Slot 0: complete.
        row[33] = "01/03/2015".to_string();
        row[34] = "THIRD NAME LTD".to_string();
        // Slot 1: date without a name, dropped.
        row[35] = "01/03/2014".to_string();
        // Slot 2: name without a date, dropped.
        row[38] = "GHOST NAME LTD".to_string();
        // Slot 4: complete, out of date order on purpose.
        row[41] = "20/07/2009".to_string();
        row[42] = "FIRST NAME LTD".to_string();

        let mapped = map_row(&record(&row)).unwrap();
        let names = mapped.company.previous_names;

        assert_eq!(names.len(), 2);
        assert_eq!(names[0].name, "THIRD NAME LTD");
        assert_eq!(
            names[0].effective_date,
            NaiveDate::from_ymd_opt(2015, 3, 1)
        );
        assert_eq!(names[1].name, "FIRST NAME LTD");
        assert_eq!(
            names[1].effective_date,
            NaiveDate::from_ymd_opt(2009, 7, 20)
        );
    }

    #[test]
    fn previous_name_with_malformed_date_is_kept_and_warned() {
        let mut row = blank_row("07495895", "ACME WIDGETS LTD");
        row[33] = "not-a-date".to_string();
        row[34] = "OLD NAME LTD".to_string();

        let mapped = map_row(&record(&row)).unwrap();

        assert_eq!(mapped.company.previous_names.len(), 1);
        assert_eq!(mapped.company.previous_names[0].effective_date, None);
        assert_eq!(mapped.warnings.len(), 1);
        assert_eq!(mapped.warnings[0].field, "previous_name.effective_date");
    }

    #[test]
    fn duplicate_previous_name_pairs_are_not_deduplicated() {
        let mut row = blank_row("07495895", "ACME WIDGETS LTD");
        for (date_col, name_col) in &PREVIOUS_NAME_COLUMNS[..2] {
            row[*date_col] = "20/07/2009".to_string();
            row[*name_col] = "SAME NAME LTD".to_string();
        }

        let mapped = map_row(&record(&row)).unwrap();
        assert_eq!(mapped.company.previous_names.len(), 2);
    }

    #[test]
    fn short_row_fails_structurally() {
        let fields = vec![String::new(); EXPECTED_COLUMNS - 1];
        let err = map_row(&record(&fields)).unwrap_err();

        match err {
            IngestError::Structure { expected, found } => {
                assert_eq!(expected, EXPECTED_COLUMNS);
                assert_eq!(found, EXPECTED_COLUMNS - 1);
            },
            other => panic!("expected Structure error, got {other:?}"),
        }
    }

    #[test]
    fn long_row_fails_structurally() {
        let fields = vec![String::new(); EXPECTED_COLUMNS + 3];
        assert!(matches!(
            map_row(&record(&fields)),
            Err(IngestError::Structure { found: 58, .. })
        ));
    }

    #[test]
    fn address_and_sic_are_built_even_when_empty() {
        let row = blank_row("07495895", "ACME WIDGETS LTD");
        let mapped = map_row(&record(&row)).unwrap();

        assert_eq!(mapped.company.registered_address, Address::default());
        assert_eq!(mapped.company.sic_codes, SicCodes::default());
    }
}
