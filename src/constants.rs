/// Wire format for calendar dates exchanged with bank APIs
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Default transaction history window, in calendar months
pub const DEFAULT_WINDOW_MONTHS: u32 = 1;
