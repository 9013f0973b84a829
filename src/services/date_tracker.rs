use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use chrono_tz::Tz;
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::errors::{Halt, Result, SyncError};
use crate::util;

/// 计算下一个待同步的交易日。
///
/// 日终数据在收盘后才发布：候选日在未来、或是当天但未到截止时间，都返回
/// `Halt`。周六、周日顺延到下周一，顺延后的日期同样要满足上面的条件。
/// 不考虑交易所节假日。
pub fn next_trading_date(current: NaiveDate, now: NaiveDateTime, cutoff_hour: u32) -> Result<NaiveDate> {
    let candidate = current + Duration::days(1);
    check_available(candidate, now, cutoff_hour)?;

    // Monday = 0
    let weekday = candidate.weekday().num_days_from_monday();
    if weekday > 4 {
        let monday = candidate + Duration::days(7 - weekday as i64);
        check_available(monday, now, cutoff_hour)?;
        return Ok(monday);
    }

    Ok(candidate)
}

fn check_available(date: NaiveDate, now: NaiveDateTime, cutoff_hour: u32) -> Result<()> {
    let today = now.date();
    if date > today {
        return Err(SyncError::NotYetAvailable(Halt::UpToDate));
    }
    if date == today && now.hour() < cutoff_hour {
        return Err(SyncError::NotYetAvailable(Halt::AwaitingPublish { cutoff_hour }));
    }
    Ok(())
}

/// 上次同步日期的读写
pub struct DateTracker {
    file: PathBuf,
    marker: NaiveDate,
    cutoff_hour: u32,
    tz: Option<Tz>,
}

impl DateTracker {
    pub fn new(config: &Config) -> Result<Self> {
        let file = config.marker_path();
        let now = exchange_now(config.exchange_tz);
        let marker = Self::load(&file, now.date())?;
        info!("Last synced trading date: {}", marker);

        Ok(Self {
            file,
            marker,
            cutoff_hour: config.publish_cutoff_hour,
            tz: config.exchange_tz,
        })
    }

    /// 读取标记文件；文件不存在时返回昨天，内容无法解析时报错
    pub fn load(file: &Path, today: NaiveDate) -> Result<NaiveDate> {
        let text = match fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} not found, starting from yesterday", file.display());
                return Ok(today - Duration::days(1));
            }
            Err(e) => return Err(e.into()),
        };

        util::parse_iso_date(&text).ok_or_else(|| SyncError::CorruptState {
            path: file.to_path_buf(),
            content: text.trim().to_string(),
        })
    }

    pub fn marker(&self) -> NaiveDate {
        self.marker
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    pub fn now(&self) -> NaiveDateTime {
        exchange_now(self.tz)
    }

    pub fn next_date(&self) -> Result<NaiveDate> {
        self.next_date_at(self.now())
    }

    pub fn next_date_at(&self, now: NaiveDateTime) -> Result<NaiveDate> {
        next_trading_date(self.marker, now, self.cutoff_hour)
    }

    /// 写入新的同步日期（整文件替换），不允许回退
    pub fn save(&mut self, date: NaiveDate) -> Result<()> {
        if date < self.marker {
            return Err(SyncError::MarkerRegression {
                current: self.marker,
                requested: date,
            });
        }

        util::write_atomic(&self.file, util::date_to_iso_timestamp(&date).as_bytes())?;
        self.marker = date;
        info!("Sync marker set to {}", date);
        Ok(())
    }
}

/// 交易所时区的当前时间；未配置时区时使用本机时间
pub fn exchange_now(tz: Option<Tz>) -> NaiveDateTime {
    match tz {
        Some(tz) => Utc::now().with_timezone(&tz).naive_local(),
        None => Local::now().naive_local(),
    }
}
