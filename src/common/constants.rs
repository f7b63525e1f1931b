/// Source table name constants to ensure consistency across the codebase.
/// These are the logical table tags the upstream export layer stamps on
/// each raw batch.
pub const DEALS_TABLE: &str = "deals";
pub const COMPANIES_TABLE: &str = "companies";
pub const CONTACTS_TABLE: &str = "contacts";
pub const PARTICIPANTS_TABLE: &str = "participants";

/// Cell spellings that all collapse to the single absent marker.
/// Whitespace-only cells are trimmed before this list is consulted.
pub const NULL_SPELLINGS: [&str; 5] = ["", "NA", "N/A", "None", "-"];

/// Full-date formats tried in order; first match wins.
pub const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y"];

/// Excel-style month-year fallback ("Jan-24"); resolves to the first of
/// the month.
pub const MONTH_YEAR_FORMAT: &str = "%b-%y";

/// Boolean vocabulary, matched case-insensitively.
pub const TRUE_WORDS: [&str; 4] = ["true", "yes", "y", "1"];
pub const FALSE_WORDS: [&str; 4] = ["false", "no", "n", "0"];

/// Formatting artifacts stripped from emails before matching.
pub const MAILTO_PREFIX: &str = "mailto:";

/// Column in the contacts export that carries an already-assigned
/// identity. Rows without it are minted fresh.
pub const CONTACT_ID_COLUMN: &str = "Contact_ID";

/// Row-level notes column maintained by the financial scrub pass.
pub const NOTES_COLUMN: &str = "Notes";

/// Relocation targets for values whose cell text marks them as
/// trailing-twelve-month figures.
pub const LTM_EBITDA_COLUMN: &str = "LTM EBITDA";
pub const LTM_REVENUE_COLUMN: &str = "LTM Revenue";

/// Default CAD to USD conversion applied when a financial cell is tagged
/// as Canadian dollars.
pub const DEFAULT_CAD_TO_USD: f64 = 0.73;
