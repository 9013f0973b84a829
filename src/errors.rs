use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 数据尚不可用时的停止原因，不属于故障
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// 下一个交易日还在未来
    UpToDate,
    /// 当日数据要到发布截止时间之后才有
    AwaitingPublish { cutoff_hour: u32 },
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::UpToDate => write!(f, "All Up To Date"),
            Halt::AwaitingPublish { cutoff_hour } => write!(
                f,
                "All Up To Date. Check again after {} for today's EOD data",
                twelve_hour(*cutoff_hour)
            ),
        }
    }
}

// 19 -> "7pm"
fn twelve_hour(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "am" } else { "pm" };
    let h = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{}{}", h, suffix)
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("{0}")]
    NotYetAvailable(Halt),

    #[error("Corrupt sync marker {}: {content:?} is not an ISO-8601 date", .path.display())]
    CorruptState { path: PathBuf, content: String },

    #[error("Error: set cookie. {status}: {reason}")]
    CookieAcquisition { status: u16, reason: String },

    #[error("Request timed out")]
    Timeout,

    #[error("{status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Refusing to move sync marker back from {current} to {requested}")]
    MarkerRegression { current: NaiveDate, requested: NaiveDate },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl SyncError {
    /// "没有新数据" 是正常的结束状态
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, SyncError::NotYetAvailable(_))
    }

    /// reqwest 的超时单独归类，其余原样包装
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::RequestError(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halt_messages_match_cli_output() {
        assert_eq!(Halt::UpToDate.to_string(), "All Up To Date");
        assert_eq!(
            Halt::AwaitingPublish { cutoff_hour: 19 }.to_string(),
            "All Up To Date. Check again after 7pm for today's EOD data"
        );
        assert_eq!(twelve_hour(0), "12am");
        assert_eq!(twelve_hour(12), "12pm");
        assert_eq!(twelve_hour(9), "9am");
    }

    #[test]
    fn http_error_reports_status_and_reason() {
        let err = SyncError::Http { status: 503, reason: "Service Unavailable".to_string() };
        assert_eq!(err.to_string(), "503: Service Unavailable");
        assert!(!err.is_up_to_date());
        assert!(SyncError::NotYetAvailable(Halt::UpToDate).is_up_to_date());
    }
}
