use serde::Serialize;

/// Client operating system inferred from a User-Agent string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientOs {
    Windows,
    Mac,
    Linux,
    Unknown,
}

pub fn detect_os(user_agent: &str) -> ClientOs {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("win") {
        ClientOs::Windows
    } else if ua.contains("mac") || ua.contains("darwin") {
        ClientOs::Mac
    } else if ua.contains("linux") && !ua.contains("android") {
        ClientOs::Linux
    } else {
        ClientOs::Unknown
    }
}
