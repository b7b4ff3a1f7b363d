/// Product identifier components shared across crates
pub const PRODUCT_NAME: &str = "jscal";
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_PRODUCT_ID: &str =
    const_str::concat!("-//", PRODUCT_NAME, "//", PRODUCT_NAME, " ", PRODUCT_VERSION, "//EN");

/// `@type` value carried by every event object
pub const EVENT_TYPE: &str = "jsevent";

/// Calendar format version written on freshly created calendars
pub const ICALENDAR_VERSION: &str = "2.0";
pub const ICALENDAR_CALSCALE: &str = "GREGORIAN";
