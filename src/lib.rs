// 公开导出的模块
pub mod config;
pub mod errors;
pub mod models;
pub mod scrapers;
pub mod services;
pub mod session;
pub mod util;

// 重新导出常用类型，方便使用
pub use config::Config;
pub use errors::{Halt, Result, SyncError};
pub use models::cookie::{CookieJar, StoredCookie};
pub use scrapers::base::EodScraper;
pub use scrapers::nse::NseArchive;
pub use services::date_tracker::{next_trading_date, DateTracker};
pub use services::sync_service::{SyncOutcome, SyncService};
pub use session::{Payload, SessionClient};
