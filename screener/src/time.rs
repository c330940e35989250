use chrono::{DateTime, Local, NaiveDate, Utc};

/// Calendar date used to key the result cache (server local time).
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}
