use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;

use crate::errors::Result;

// 日期格式
pub const ISO_DATE: &str = "%Y-%m-%d";
pub const COMPACT_DATE: &str = "%Y%m%d";
pub const NSE_REPORT_DATE: &str = "%d%m%Y";

/// 2024-01-05 -> "2024-01-05T00:00:00"
pub fn date_to_iso_timestamp(date: &NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00").to_string()
}

/// 解析 ISO-8601 日期或日期时间，只保留日期部分
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.date());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    NaiveDate::parse_from_str(text, ISO_DATE).ok()
}

/// 整文件替换：先写临时文件再 rename，读者看不到写了一半的内容
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;

    debug!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(())
}
