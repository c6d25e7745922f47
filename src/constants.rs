// -
// Composite key

/// Separator between location key and category inside a record id
pub(crate) const KEY_SEPARATOR: char = '|';

/// Separator between latitude and longitude inside a location key
pub(crate) const COORDINATE_SEPARATOR: char = ',';

// -
// Collections

/// Top level collection holding one aggregate document per country
pub const COUNTRIES_COLLECTION: &str = "countries";

/// Sub-collection under each country holding per-location records
pub const RECORDS_COLLECTION: &str = "records";

/// Aggregate field holding per-record contributions for read-side rollups
pub const PARTS_FIELD: &str = "parts";

// -
// Categories

pub const CONFIRMED: &str = "confirmed";
pub const DEATHS: &str = "deaths";
pub const RECOVERED: &str = "recovered";

// -
// Environment

/// Prefix for environment overrides, e.g. `TALLY__COMMIT__INTERVAL_MS`
pub(crate) const ENV_PREFIX: &str = "TALLY";
