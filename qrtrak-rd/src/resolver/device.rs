//! Device classification from the scanning client's user-agent

/// Device class recorded on each scan event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    /// Stable string form persisted in scan_events.device_type
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a user-agent string.
///
/// iPad wins over the mobile signatures (iPad user agents also
/// contain "Mobile"); anything without a mobile signature is desktop.
pub fn classify(user_agent: &str) -> DeviceType {
    if user_agent.contains("iPad") {
        return DeviceType::Tablet;
    }

    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        DeviceType::Mobile
    } else {
        DeviceType::Desktop
    }
}
