use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cookie 文件格式版本，格式变化时递增
pub const COOKIE_JAR_VERSION: u32 = 1;

// httpdate 只支持 1970..=9999 年
const MAX_HTTP_DATE_SECS: u64 = 253_402_300_799;

/// 可持久化的最晚过期时间 (9999-12-31T23:59:59Z)
pub fn latest_expiry() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS)
}

/// 单个持久化的 Cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    /// 无过期时间即会话 Cookie，永不过期
    #[serde(default, skip_serializing_if = "Option::is_none", with = "http_date_opt")]
    pub expires: Option<SystemTime>,
}

impl StoredCookie {
    pub fn new(name: &str, value: &str, domain: &str, path: &str, expires: Option<SystemTime>) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            domain: domain.trim_start_matches('.').to_ascii_lowercase(),
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            expires: expires.map(clamp_expiry),
        }
    }

    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.expires.map_or(false, |expires| now > expires)
    }

    /// 按 RFC 6265 的域名与路径规则判断是否随请求发送
    pub fn matches(&self, host: &str, path: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let domain_ok = self.domain.is_empty()
            || host == self.domain
            || host.ends_with(&format!(".{}", self.domain));

        domain_ok && self.path_matches(path)
    }

    // "/api" 匹配 "/api" 和 "/api/x"，不匹配 "/apiary"
    fn path_matches(&self, path: &str) -> bool {
        if path == self.path {
            return true;
        }
        path.starts_with(&self.path)
            && (self.path.ends_with('/') || path[self.path.len()..].starts_with('/'))
    }
}

/// 整体替换的 Cookie 集合
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieJar {
    pub version: u32,
    pub cookies: Vec<StoredCookie>,
}

impl CookieJar {
    pub fn new(cookies: Vec<StoredCookie>) -> Self {
        Self {
            version: COOKIE_JAR_VERSION,
            cookies,
        }
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// 只要有一个过期就视为整个 jar 失效
    pub fn has_expired_at(&self, now: SystemTime) -> bool {
        self.cookies.iter().any(|c| c.is_expired_at(now))
    }

    /// 生成 `Cookie` 请求头，没有匹配项时返回 None
    pub fn header_value(&self, host: &str, path: &str) -> Option<String> {
        let pairs: Vec<String> = self
            .cookies
            .iter()
            .filter(|c| c.matches(host, path))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect();

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

fn clamp_expiry(t: SystemTime) -> SystemTime {
    let max = latest_expiry();
    if t < UNIX_EPOCH {
        UNIX_EPOCH
    } else if t > max {
        max
    } else {
        t
    }
}

mod http_date_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(value: &Option<SystemTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_some(&httpdate::fmt_http_date(*t)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<SystemTime>, D::Error> {
        let text: Option<String> = Option::deserialize(deserializer)?;
        text.map(|s| httpdate::parse_http_date(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn session_cookie_never_expires() {
        let cookie = StoredCookie::new("nsit", "abc", "nseindia.com", "/", None);
        assert!(!cookie.is_expired_at(at(MAX_HTTP_DATE_SECS)));
    }

    #[test]
    fn expiry_is_strictly_after_declared_instant() {
        let cookie = StoredCookie::new("bm_sv", "x", "nseindia.com", "/", Some(at(1_000)));
        assert!(!cookie.is_expired_at(at(1_000)));
        assert!(cookie.is_expired_at(at(1_001)));
    }

    #[test]
    fn one_expired_cookie_spoils_the_jar() {
        let jar = CookieJar::new(vec![
            StoredCookie::new("nsit", "a", "nseindia.com", "/", None),
            StoredCookie::new("ak_bmsc", "b", "nseindia.com", "/", Some(at(10))),
        ]);
        assert!(!jar.has_expired_at(at(5)));
        assert!(jar.has_expired_at(at(11)));
    }

    #[test]
    fn domain_and_path_matching() {
        let cookie = StoredCookie::new("nsit", "a", ".NSEIndia.com", "/api", None);
        assert_eq!(cookie.domain, "nseindia.com");
        assert!(cookie.matches("www.nseindia.com", "/api/option-chain"));
        assert!(cookie.matches("nseindia.com", "/api"));
        assert!(!cookie.matches("nseindia.com", "/content"));
        assert!(!cookie.matches("evilnseindia.com", "/api"));
    }

    #[test]
    fn path_prefix_must_end_on_a_segment_boundary() {
        let api = StoredCookie::new("nsit", "a", "nseindia.com", "/api", None);
        assert!(!api.matches("nseindia.com", "/apiary"));
        assert!(!api.matches("nseindia.com", "/ap"));
        assert!(api.matches("nseindia.com", "/api/"));

        let slash = StoredCookie::new("nsit", "a", "nseindia.com", "/api/", None);
        assert!(slash.matches("nseindia.com", "/api/quote-equity"));
        assert!(!slash.matches("nseindia.com", "/api"));

        let root = StoredCookie::new("nsit", "a", "nseindia.com", "/", None);
        assert!(root.matches("nseindia.com", "/apiary"));
    }

    #[test]
    fn header_value_joins_matching_cookies() {
        let jar = CookieJar::new(vec![
            StoredCookie::new("nsit", "a", "nseindia.com", "/", None),
            StoredCookie::new("nseappid", "b", "nseindia.com", "/", None),
            StoredCookie::new("other", "c", "example.com", "/", None),
        ]);
        assert_eq!(
            jar.header_value("www.nseindia.com", "/"),
            Some("nsit=a; nseappid=b".to_string())
        );
        assert_eq!(jar.header_value("bseindia.com", "/"), None);
    }

    #[test]
    fn persisted_form_is_versioned_json_with_http_dates() {
        let jar = CookieJar::new(vec![
            StoredCookie::new("nsit", "a", "nseindia.com", "/", Some(at(784_111_777))),
            StoredCookie::new("session", "s", "nseindia.com", "/", None),
        ]);
        let json = serde_json::to_value(&jar).unwrap();

        assert_eq!(json["version"], 1);
        assert_eq!(json["cookies"][0]["expires"], "Sun, 06 Nov 1994 08:49:37 GMT");
        assert!(json["cookies"][1].get("expires").is_none());

        let back: CookieJar = serde_json::from_value(json).unwrap();
        assert_eq!(back, jar);
    }

    #[test]
    fn out_of_range_expiry_is_clamped() {
        let far = UNIX_EPOCH + Duration::from_secs(MAX_HTTP_DATE_SECS * 2);
        let cookie = StoredCookie::new("x", "y", "d", "/", Some(far));
        assert_eq!(cookie.expires, Some(at(MAX_HTTP_DATE_SECS)));
    }
}
