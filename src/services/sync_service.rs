use crate::errors::{Result, SyncError};
use crate::scrapers::base::EodScraper;
use crate::services::date_tracker::DateTracker;
use crate::session::SessionClient;
use chrono::NaiveDate;
use log::{info, warn};
use std::path::PathBuf;

/// 一个交易日的同步结果
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub date: NaiveDate,
    pub files: Vec<PathBuf>,
}

/// 同步服务：取下一个交易日，下载所有归档，全部成功后才更新标记
pub struct SyncService {
    scrapers: Vec<Box<dyn EodScraper>>,
}

impl SyncService {
    pub fn new(scrapers: Vec<Box<dyn EodScraper>>) -> Self {
        Self { scrapers }
    }

    /// 同步下一个交易日
    pub fn sync_next(&self, tracker: &mut DateTracker, session: &SessionClient) -> Result<SyncOutcome> {
        if self.scrapers.is_empty() {
            return Err(SyncError::ConfigError("No archive sources configured".to_string()));
        }

        let date = tracker.next_date()?;
        info!("Syncing EOD data for {}", date);

        let mut files = Vec::with_capacity(self.scrapers.len());
        for scraper in &self.scrapers {
            info!("Fetching {} archive", scraper.exchange_code());
            files.push(scraper.fetch_day(session, &date)?);
        }

        // 标记只在全部下载成功后写入
        tracker.save(date)?;

        info!("Successfully synced {} files for {}", files.len(), date);
        Ok(SyncOutcome { date, files })
    }

    /// 逐日同步直到最新，`max_days` 限制本次最多同步的天数。
    ///
    /// 一天都没有同步时原样返回 "已是最新" 错误，由调用方决定如何提示。
    pub fn sync_until_current(
        &self,
        tracker: &mut DateTracker,
        session: &SessionClient,
        max_days: Option<usize>,
    ) -> Result<Vec<SyncOutcome>> {
        let mut outcomes = Vec::new();

        loop {
            if max_days.map_or(false, |max| outcomes.len() >= max) {
                info!("Reached limit of {} days", outcomes.len());
                break;
            }

            match self.sync_next(tracker, session) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_up_to_date() && !outcomes.is_empty() => {
                    info!("{}", e);
                    break;
                }
                Err(e) => {
                    if !outcomes.is_empty() {
                        warn!("Stopped after syncing {} days", outcomes.len());
                    }
                    return Err(e);
                }
            }
        }

        Ok(outcomes)
    }
}
