use chrono_tz::Tz;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, SyncError};

pub struct Config {
    pub data_dir: PathBuf,
    pub download_dir: Option<PathBuf>,
    pub base_url: String,
    pub warmup_path: String,
    pub referer: String,
    pub request_timeout: Duration,
    pub warmup_timeout: Duration,
    pub publish_cutoff_hour: u32,
    pub exchange_tz: Option<Tz>,  // None 时使用本机时区
}

impl Config {
    pub fn new() -> Self {
        Self {
            data_dir: PathBuf::from("eod_data"),
            download_dir: None,
            base_url: "https://www.nseindia.com".to_string(),
            warmup_path: "/option-chain".to_string(),
            referer: "https://www1.nseindia.com".to_string(),
            request_timeout: Duration::from_secs(15),
            warmup_timeout: Duration::from_secs(10),
            publish_cutoff_hour: 19,
            exchange_tz: None,
        }
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_download_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.download_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_warmup_path(mut self, path: &str) -> Self {
        self.warmup_path = path.to_string();
        self
    }

    pub fn with_referer(mut self, referer: &str) -> Self {
        self.referer = referer.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_warmup_timeout(mut self, timeout: Duration) -> Self {
        self.warmup_timeout = timeout;
        self
    }

    pub fn with_publish_cutoff_hour(mut self, hour: u32) -> Self {
        self.publish_cutoff_hour = hour;
        self
    }

    pub fn with_exchange_tz(mut self, tz: Tz) -> Self {
        self.exchange_tz = Some(tz);
        self
    }

    /// 解析 IANA 时区名，例如 "Asia/Kolkata"
    pub fn with_exchange_tz_name(self, name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|e| SyncError::ConfigError(format!("Unknown time zone {}: {}", name, e)))?;
        Ok(self.with_exchange_tz(tz))
    }

    /// 上次同步日期文件
    pub fn marker_path(&self) -> PathBuf {
        self.data_dir.join("lastupdate.txt")
    }

    /// Cookie 持久化文件
    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir.join("cookies.json")
    }

    pub fn download_dir(&self) -> &Path {
        self.download_dir.as_deref().unwrap_or(&self.data_dir)
    }

    pub fn warmup_url(&self) -> String {
        format!("{}{}", self.base_url, self.warmup_path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_data_dir() {
        let config = Config::new().with_data_dir("/tmp/eod");
        assert_eq!(config.marker_path(), PathBuf::from("/tmp/eod/lastupdate.txt"));
        assert_eq!(config.cookie_path(), PathBuf::from("/tmp/eod/cookies.json"));
        assert_eq!(config.download_dir(), Path::new("/tmp/eod"));

        let config = config.with_download_dir("/tmp/archives");
        assert_eq!(config.download_dir(), Path::new("/tmp/archives"));
    }

    #[test]
    fn warmup_url_joins_base_and_path() {
        let config = Config::new().with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.warmup_url(), "http://127.0.0.1:9000/option-chain");
    }

    #[test]
    fn unknown_time_zone_is_a_config_error() {
        assert!(Config::new().with_exchange_tz_name("Asia/Kolkata").is_ok());
        let err = Config::new().with_exchange_tz_name("Mars/Olympus").err().unwrap();
        assert!(matches!(err, SyncError::ConfigError(_)));
    }
}
