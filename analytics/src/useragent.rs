//! Coarse user-agent classification for request events.

use crate::events::Device;

/// Browser family from a raw User-Agent header. Order matters: Chromium
/// derivatives also advertise "Chrome" and "Safari".
pub fn browser(user_agent: &str) -> &'static str {
    let ua = user_agent.to_ascii_lowercase();
    if ua.is_empty() {
        "Unknown"
    } else if ua.contains("bot") || ua.contains("spider") || ua.contains("crawl") {
        "Bot"
    } else if ua.contains("edg/") || ua.contains("edge/") {
        "Edge"
    } else if ua.contains("opr/") || ua.contains("opera") {
        "Opera"
    } else if ua.contains("firefox/") || ua.contains("fxios") {
        "Firefox"
    } else if ua.contains("chrome/") || ua.contains("crios") || ua.contains("chromium") {
        "Chrome"
    } else if ua.contains("safari/") {
        "Safari"
    } else if ua.starts_with("curl/") {
        "curl"
    } else {
        "Unknown"
    }
}

pub fn device(user_agent: &str) -> Device {
    let ua = user_agent.to_ascii_lowercase();
    if ["mobile", "android", "iphone", "ipad"].iter().any(|kw| ua.contains(kw)) {
        Device::Mobile
    } else {
        Device::Desktop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";
    const FIREFOX_ANDROID: &str = "Mozilla/5.0 (Android 14; Mobile; rv:121.0) Gecko/121.0 Firefox/121.0";

    #[test]
    fn browsers() {
        assert_eq!(browser(CHROME_LINUX), "Chrome");
        assert_eq!(browser(EDGE_WIN), "Edge");
        assert_eq!(browser(SAFARI_IPHONE), "Safari");
        assert_eq!(browser(FIREFOX_ANDROID), "Firefox");
        assert_eq!(browser("curl/8.4.0"), "curl");
        assert_eq!(browser(""), "Unknown");
        assert_eq!(browser("Googlebot/2.1"), "Bot");
    }

    #[test]
    fn devices() {
        assert_eq!(device(CHROME_LINUX), Device::Desktop);
        assert_eq!(device(SAFARI_IPHONE), Device::Mobile);
        assert_eq!(device(FIREFOX_ANDROID), Device::Mobile);
    }
}
