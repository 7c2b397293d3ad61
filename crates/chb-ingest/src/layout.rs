//! Column layout of the Basic Company Data export
//!
//! The export is positional: the mapper addresses fields by index, never by
//! header name. Everything the mapper knows about the file shape lives here
//! so the column contract can be audited (and tested) in one place.
//!
//! The layout carries several column groups the loader does not currently
//! map (accounts, returns, mortgages, limited partnerships, confirmation
//! statement); their indexes are declared anyway so the arithmetic around
//! them stays visible.

/// Number of columns in every data row.
pub const EXPECTED_COLUMNS: usize = 55;

/// Date format used throughout the export, e.g. "14/02/2011".
pub const DATE_FORMAT: &str = "%d/%m/%Y";

pub const COL_COMPANY_NAME: usize = 0;
pub const COL_COMPANY_NUMBER: usize = 1;

// Registered address block
pub const COL_ADDR_CARE_OF: usize = 2;
pub const COL_ADDR_PO_BOX: usize = 3;
pub const COL_ADDR_LINE_1: usize = 4;
pub const COL_ADDR_LINE_2: usize = 5;
pub const COL_ADDR_POST_TOWN: usize = 6;
pub const COL_ADDR_COUNTY: usize = 7;
pub const COL_ADDR_COUNTRY: usize = 8;
pub const COL_ADDR_POSTCODE: usize = 9;

pub const COL_CATEGORY: usize = 10;
pub const COL_STATUS: usize = 11;
pub const COL_COUNTRY_OF_ORIGIN: usize = 12;
pub const COL_DISSOLUTION_DATE: usize = 13;
pub const COL_INCORPORATION_DATE: usize = 14;

// Accounts block (15..=19) and returns block (20..=21): reserved, unmapped.
pub const COL_ACCOUNTS_FIRST: usize = 15;
pub const COL_RETURNS_FIRST: usize = 20;

// Mortgages block (22..=25): reserved, unmapped.
pub const COL_MORTGAGES_FIRST: usize = 22;

pub const COL_SIC_TEXT_1: usize = 26;
pub const COL_SIC_TEXT_2: usize = 27;
pub const COL_SIC_TEXT_3: usize = 28;
pub const COL_SIC_TEXT_4: usize = 29;

// Limited partnerships block (30..=31): reserved, unmapped.
pub const COL_LIMITED_PARTNERSHIPS_FIRST: usize = 30;

pub const COL_URI: usize = 32;

/// The ten previous-name slots as explicit (change date, name) index pairs,
/// in file order. An empty slot means "no previous name recorded here".
pub const PREVIOUS_NAME_COLUMNS: [(usize, usize); 10] = [
    (33, 34),
    (35, 36),
    (37, 38),
    (39, 40),
    (41, 42),
    (43, 44),
    (45, 46),
    (47, 48),
    (49, 50),
    (51, 52),
];

// Confirmation statement block (53..=54): reserved, unmapped.
pub const COL_CONF_STMT_FIRST: usize = 53;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_name_slots_are_contiguous_and_ordered() {
        let mut expected = 33;
        for (date_col, name_col) in PREVIOUS_NAME_COLUMNS {
            assert_eq!(date_col, expected);
            assert_eq!(name_col, expected + 1);
            expected += 2;
        }
        assert_eq!(expected, COL_CONF_STMT_FIRST);
    }

    #[test]
    fn layout_spans_the_full_row() {
        // The last declared block ends at the final column.
        assert_eq!(COL_CONF_STMT_FIRST + 2, EXPECTED_COLUMNS);
    }

    #[test]
    fn blocks_do_not_overlap() {
        assert!(COL_ADDR_POSTCODE < COL_CATEGORY);
        assert!(COL_INCORPORATION_DATE < COL_ACCOUNTS_FIRST);
        assert!(COL_ACCOUNTS_FIRST < COL_RETURNS_FIRST);
        assert!(COL_RETURNS_FIRST < COL_MORTGAGES_FIRST);
        assert!(COL_MORTGAGES_FIRST < COL_SIC_TEXT_1);
        assert!(COL_SIC_TEXT_4 < COL_LIMITED_PARTNERSHIPS_FIRST);
        assert!(COL_LIMITED_PARTNERSHIPS_FIRST < COL_URI);
        assert!(COL_URI < PREVIOUS_NAME_COLUMNS[0].0);
    }
}
