use log::{debug, info, warn};
use reqwest::blocking::Response;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::errors::Result;
use crate::models::cookie::{latest_expiry, CookieJar, StoredCookie, COOKIE_JAR_VERSION};
use crate::util;

/// Cookie 文件的读写。文件只作缓存：缺失、损坏或版本不符都按"没有"处理。
pub struct CookieCache {
    path: PathBuf,
}

impl CookieCache {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<CookieJar> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No cookie file at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Cannot read cookie file {}: {}", self.path.display(), e);
                return None;
            }
        };

        let jar: CookieJar = match serde_json::from_slice(&bytes) {
            Ok(jar) => jar,
            Err(e) => {
                warn!("Discarding unreadable cookie file {}: {}", self.path.display(), e);
                return None;
            }
        };

        if jar.version != COOKIE_JAR_VERSION {
            warn!(
                "Discarding cookie file {} with version {} (expected {})",
                self.path.display(),
                jar.version,
                COOKIE_JAR_VERSION
            );
            return None;
        }

        Some(jar)
    }

    /// 整体覆盖写入
    pub fn store(&self, jar: &CookieJar) -> Result<()> {
        let json = serde_json::to_vec_pretty(jar)?;
        util::write_atomic(&self.path, &json)?;
        info!("Saved {} cookies to {}", jar.len(), self.path.display());
        Ok(())
    }
}

/// 从响应的 Set-Cookie 头收集 Cookie。
///
/// Max-Age 优先于 Expires；缺省 Domain 取响应主机名，缺省 Path 为 "/"。
pub fn harvest(response: &Response, now: SystemTime) -> CookieJar {
    let host = response.url().host_str().unwrap_or_default().to_string();

    let cookies = response
        .cookies()
        .map(|c| {
            let expires = match c.max_age() {
                // Max-Age 可能大到溢出 SystemTime
                Some(max_age) => Some(now.checked_add(max_age).unwrap_or_else(latest_expiry)),
                None => c.expires(),
            };
            StoredCookie::new(
                c.name(),
                c.value(),
                c.domain().unwrap_or(&host),
                c.path().unwrap_or("/"),
                expires,
            )
        })
        .collect::<Vec<_>>();

    debug!("Harvested {} cookies from {}", cookies.len(), response.url());
    CookieJar::new(cookies)
}
