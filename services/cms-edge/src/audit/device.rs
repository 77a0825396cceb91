//! User-agent classification.
//!
//! Keyword heuristics only. The result is for audit display and risk
//! scoring, never for access decisions.

use std::sync::LazyLock;

use http::HeaderMap;
use regex::Regex;

use super::request::{HEADER_USER_AGENT, client_id};
use crate::proto::{DeviceInfo, DeviceType, UserTokenPayload};

/// Native Android app
pub const PLATFORM_ANDROID_APP: &str = "AndroidApp";
/// Native iOS app
pub const PLATFORM_IOS_APP: &str = "iOSApp";
/// Desktop app on Windows
pub const PLATFORM_DESKTOP_WINDOWS: &str = "DesktopWindows";
/// Desktop app on macOS
pub const PLATFORM_DESKTOP_MAC: &str = "DesktopMac";
/// Desktop app on Linux
pub const PLATFORM_DESKTOP_LINUX: &str = "DesktopLinux";
/// Browser
pub const PLATFORM_WEB: &str = "Web";
/// Unknown
pub const PLATFORM_OTHER: &str = "Other";

static ANDROID_PACKAGE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\bcom\.[a-z0-9_.]+").ok());

const BOT_MARKERS: &[&str] = &["bot", "crawler", "spider", "slurp", "headless"];

/// Parsed user agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserAgent {
    /// Browser or client name
    pub name: String,
    /// Browser version
    pub version: String,
    /// Operating system
    pub os: String,
    /// Operating system version
    pub os_version: String,
    /// Device model when the UA names one
    pub device: String,
    /// Phone
    pub mobile: bool,
    /// Tablet
    pub tablet: bool,
    /// Desktop
    pub desktop: bool,
    /// Crawler
    pub bot: bool,
}

impl UserAgent {
    /// Classify a raw `User-Agent` string.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let s = raw.to_lowercase();
        let mut ua = Self::default();

        ua.bot = BOT_MARKERS.iter().any(|m| s.contains(m));
        (ua.os, ua.os_version) = detect_os(&s);
        (ua.name, ua.version) = detect_browser(&s);

        if s.contains("ipad") {
            ua.tablet = true;
            ua.device = "iPad".into();
        } else if s.contains("iphone") {
            ua.mobile = true;
            ua.device = "iPhone".into();
        } else if s.contains("ipod") {
            ua.mobile = true;
            ua.device = "iPod".into();
        } else if s.contains("android") {
            if s.contains("mobile") {
                ua.mobile = true;
            } else {
                ua.tablet = true;
            }
            ua.device = android_model(raw);
        } else if s.contains("tablet") {
            ua.tablet = true;
        } else if s.contains("mobile") {
            ua.mobile = true;
        } else if !ua.bot
            && ["windows", "macintosh", "x11", "linux", "cros"]
                .iter()
                .any(|m| s.contains(m))
        {
            ua.desktop = true;
        }

        ua
    }

    /// Coarse device class, checked desktop, tablet, mobile, bot.
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        if self.desktop {
            DeviceType::Desktop
        } else if self.tablet {
            DeviceType::Tablet
        } else if self.mobile {
            DeviceType::Mobile
        } else if self.bot {
            DeviceType::Bot
        } else {
            DeviceType::Other
        }
    }
}

fn version_after(s: &str, marker: &str) -> Option<String> {
    let start = s.find(marker)? + marker.len();
    let version: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .collect();
    Some(version.replace('_', "."))
}

fn detect_os(s: &str) -> (String, String) {
    let found = if s.contains("windows") {
        Some(("Windows", version_after(s, "windows nt ")))
    } else if s.contains("iphone") || s.contains("ipad") || s.contains("ipod") {
        let version = version_after(s, "iphone os ").or_else(|| version_after(s, "cpu os "));
        Some(("iOS", version))
    } else if s.contains("android") {
        Some(("Android", version_after(s, "android ")))
    } else if s.contains("mac os x") || s.contains("macintosh") {
        Some(("macOS", version_after(s, "mac os x ")))
    } else if s.contains("cros") {
        Some(("ChromeOS", None))
    } else if s.contains("linux") || s.contains("x11") {
        Some(("Linux", None))
    } else {
        None
    };
    found.map_or_else(Default::default, |(os, version)| {
        (os.to_string(), version.unwrap_or_default())
    })
}

fn detect_browser(s: &str) -> (String, String) {
    const LADDER: &[(&str, &str)] = &[
        ("edg/", "Edge"),
        ("opr/", "Opera"),
        ("firefox/", "Firefox"),
        ("chrome/", "Chrome"),
        ("crios/", "Chrome"),
        ("okhttp/", "okhttp"),
        ("curl/", "curl"),
    ];
    for (marker, name) in LADDER {
        if let Some(version) = version_after(s, marker) {
            return ((*name).to_string(), version);
        }
    }
    if s.contains("safari/") {
        return ("Safari".into(), version_after(s, "version/").unwrap_or_default());
    }
    (String::new(), String::new())
}

fn android_model(raw: &str) -> String {
    // "(Linux; Android 14; Pixel 8 Build/XYZ)" -> "Pixel 8"
    let Some(open) = raw.find('(') else {
        return String::new();
    };
    let inner = raw[open + 1..].split(')').next().unwrap_or_default();
    inner
        .split(';')
        .map(str::trim)
        .skip_while(|part| !part.to_lowercase().starts_with("android"))
        .nth(1)
        .map(|model| model.split(" Build/").next().unwrap_or(model).trim())
        .filter(|model| !model.is_empty() && *model != "wv" && *model != "K")
        .unwrap_or_default()
        .to_string()
}

/// Platform label from keyword heuristics over the lowercased UA.
#[must_use]
pub fn detect_platform(user_agent: &str) -> &'static str {
    let s = user_agent.trim().to_lowercase();
    if s.is_empty() {
        return PLATFORM_OTHER;
    }
    let has = |needle: &str| s.contains(needle);
    let any = |needles: &[&str]| needles.iter().any(|n| s.contains(n));

    if any(&["okhttp", "dalvik", "; wv", " ;wv", "build/"]) {
        return PLATFORM_ANDROID_APP;
    }
    if has("android") {
        let package = ANDROID_PACKAGE.as_ref().is_some_and(|re| re.is_match(&s));
        if package || has("wv") {
            return PLATFORM_ANDROID_APP;
        }
    }

    if any(&["iphone", "ipad", "ipod", "cfnetwork", "darwin", "cpu iphone os"]) {
        return PLATFORM_IOS_APP;
    }

    if any(&["electron", "nwjs", "node.js", "nodejs", "desktop", "appname"]) {
        if any(&["windows nt", "win64", "win32", "windows"]) {
            return PLATFORM_DESKTOP_WINDOWS;
        }
        if any(&["macintosh", "mac os x", "darwin"]) {
            return PLATFORM_DESKTOP_MAC;
        }
        if any(&["x11", "linux", "ubuntu", "debian", "fedora"]) {
            return PLATFORM_DESKTOP_LINUX;
        }
        if has("win") {
            return PLATFORM_DESKTOP_WINDOWS;
        }
        if any(&["mac", "os x"]) {
            return PLATFORM_DESKTOP_MAC;
        }
        return PLATFORM_OTHER;
    }

    if has("mozilla")
        && any(&["windows nt", "macintosh", "x11", "linux", "android", "iphone"])
        && !any(&["okhttp", "dalvik", "cfnetwork", "electron"])
    {
        return PLATFORM_WEB;
    }

    PLATFORM_OTHER
}

/// Device section of an audit record.
#[must_use]
pub fn device_info(headers: &HeaderMap, payload: Option<&UserTokenPayload>) -> DeviceInfo {
    let raw = headers
        .get(HEADER_USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let ua = UserAgent::parse(raw);

    let client_name = if !ua.device.is_empty() {
        ua.device.clone()
    } else if ua.desktop {
        "PC".to_string()
    } else {
        String::new()
    };

    let mut info = DeviceInfo {
        user_agent: raw.to_string(),
        client_name,
        browser_name: ua.name.clone(),
        browser_version: ua.version.clone(),
        os_name: ua.os.clone(),
        os_version: ua.os_version.clone(),
        platform: detect_platform(raw).to_string(),
        client_id: client_id(headers, payload),
        ..Default::default()
    };
    info.set_device_type(ua.device_type());
    info
}
