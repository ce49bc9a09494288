//! Constants

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub(crate) static ref RE_USERNAME: Regex = Regex::new(r"^[a-zA-Z0-9\.\-_ ]+$").unwrap();
    pub(crate) static ref RE_PHONE: Regex = Regex::new(r"^\+?[0-9 ]{6,20}$").unwrap();
}

pub(crate) const DEFAULT_ADDR: &str = "0.0.0.0:4433";
pub(crate) const DEFAULT_DATABASE_URL: &str = "sqlite://dispatch.db?mode=rwc";

// for issued tokens
pub(crate) const DEFAULT_TOKEN_EXPIRY_SECS: u64 = 3600;

pub(crate) const DEFAULT_SUPPORT_USER_ID: i64 = 1;
pub(crate) const DEFAULT_RECENT_LOCATION_MINUTES: i64 = 30;
// one year
pub(crate) const MAX_RECENT_LOCATION_MINUTES: i64 = 525_600;
