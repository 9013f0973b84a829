use crate::errors::Result;
use crate::session::SessionClient;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Base trait for end-of-day archive sources
pub trait EodScraper {
    /// Short code used in logs, e.g. "NSE-CM"
    fn exchange_code(&self) -> &str;

    /// Archive URL for the given trading date
    fn archive_url(&self, date: &NaiveDate) -> String;

    /// Fetch the archive for one trading date, returning the local file
    fn fetch_day(&self, session: &SessionClient, date: &NaiveDate) -> Result<PathBuf> {
        session.download(&self.archive_url(date))
    }
}
