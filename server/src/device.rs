//! User-agent derivation: device class, operating system, browser.
//!
//! Order matters — Edge advertises Chrome, Chrome advertises Safari.

#[derive(Debug, Clone, serde::Serialize)]
pub struct DeviceInfo {
    pub dispositivo: String,
    pub sistema_operacional: String,
    pub navegador: String,
}

pub fn detect(user_agent: &str) -> DeviceInfo {
    DeviceInfo {
        dispositivo: detect_device(user_agent).to_string(),
        sistema_operacional: detect_os(user_agent).to_string(),
        navegador: detect_browser(user_agent).to_string(),
    }
}

fn detect_device(ua: &str) -> &'static str {
    if ua.contains("Tablet") || ua.contains("iPad") {
        "Tablet"
    } else if ua.contains("Mobile") || ua.contains("Android") || ua.contains("iPhone") {
        "Mobile"
    } else {
        "Desktop"
    }
}

fn detect_os(ua: &str) -> &'static str {
    if ua.contains("Windows NT 10") {
        "Windows 10"
    } else if ua.contains("Windows NT") {
        "Windows"
    } else if ua.contains("Mac OS X") && !ua.contains("iPhone") && !ua.contains("iPad") {
        "macOS"
    } else if ua.contains("Android") {
        "Android"
    } else if ua.contains("iPhone") || ua.contains("iPad") {
        "iOS"
    } else if ua.contains("Linux") {
        "Linux"
    } else {
        "Desconhecido"
    }
}

fn detect_browser(ua: &str) -> &'static str {
    if ua.contains("Edg") {
        "Edge"
    } else if ua.contains("Chrome") {
        "Chrome"
    } else if ua.contains("Firefox") {
        "Firefox"
    } else if ua.contains("Safari") {
        "Safari"
    } else {
        "Desconhecido"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WIN: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36";
    const EDGE_WIN: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";
    const SAFARI_IPHONE: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 \
         (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn edge_wins_over_chrome() {
        assert_eq!(detect(EDGE_WIN).navegador, "Edge");
        assert_eq!(detect(CHROME_WIN).navegador, "Chrome");
    }

    #[test]
    fn iphone_is_mobile_ios_safari() {
        let info = detect(SAFARI_IPHONE);
        assert_eq!(info.dispositivo, "Mobile");
        assert_eq!(info.sistema_operacional, "iOS");
        assert_eq!(info.navegador, "Safari");
    }

    #[test]
    fn desktop_windows_chrome() {
        let info = detect(CHROME_WIN);
        assert_eq!(info.dispositivo, "Desktop");
        assert_eq!(info.sistema_operacional, "Windows 10");
    }

    #[test]
    fn unknown_agent_falls_through() {
        let info = detect("curl/8.0");
        assert_eq!(info.dispositivo, "Desktop");
        assert_eq!(info.sistema_operacional, "Desconhecido");
        assert_eq!(info.navegador, "Desconhecido");
    }
}
