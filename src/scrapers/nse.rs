use crate::scrapers::base::EodScraper;
use crate::util::{COMPACT_DATE, ISO_DATE, NSE_REPORT_DATE};
use chrono::NaiveDate;

const EQUITY_BHAVCOPY: &str =
    "https://nsearchives.nseindia.com/content/cm/BhavCopy_NSE_CM_0_0_0_{date}_F_0000.csv.zip";
const DELIVERY_REPORT: &str =
    "https://nsearchives.nseindia.com/products/content/sec_bhavdata_full_{ddmmyyyy}.csv";

/// NSE 日终归档文件。
///
/// URL 模板支持的占位符：
/// - `{date}`     -> 20240105
/// - `{iso}`      -> 2024-01-05
/// - `{ddmmyyyy}` -> 05012024
#[derive(Debug, Clone)]
pub struct NseArchive {
    code: String,
    url_template: String,
}

impl NseArchive {
    pub fn new(code: &str, url_template: &str) -> Self {
        Self {
            code: code.to_string(),
            url_template: url_template.to_string(),
        }
    }

    /// 股票现货 bhavcopy（zip 压缩的 CSV）
    pub fn equity_bhavcopy() -> Self {
        Self::new("NSE-CM", EQUITY_BHAVCOPY)
    }

    /// 逐只证券的交割数据
    pub fn delivery_report() -> Self {
        Self::new("NSE-DELIVERY", DELIVERY_REPORT)
    }
}

impl EodScraper for NseArchive {
    fn exchange_code(&self) -> &str {
        &self.code
    }

    fn archive_url(&self, date: &NaiveDate) -> String {
        self.url_template
            .replace("{date}", &date.format(COMPACT_DATE).to_string())
            .replace("{iso}", &date.format(ISO_DATE).to_string())
            .replace("{ddmmyyyy}", &date.format(NSE_REPORT_DATE).to_string())
    }
}
