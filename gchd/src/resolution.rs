use std::fmt;
use std::str::FromStr;

/// Output standard the device is initialized for. Picked once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolutionKey {
    #[default]
    Hd720p,
    Hd1080p,
    Sd576i,
    Component576p,
    Component720p,
    Component1080i,
    Component1080p,
}

impl ResolutionKey {
    pub const ALL: [ResolutionKey; 7] = [
        ResolutionKey::Hd720p,
        ResolutionKey::Hd1080p,
        ResolutionKey::Sd576i,
        ResolutionKey::Component576p,
        ResolutionKey::Component720p,
        ResolutionKey::Component1080i,
        ResolutionKey::Component1080p,
    ];

    /// Command line token.
    pub fn token(self) -> &'static str {
        match self {
            ResolutionKey::Hd720p => "720p",
            ResolutionKey::Hd1080p => "1080p",
            ResolutionKey::Sd576i => "576i",
            ResolutionKey::Component576p => "c576p",
            ResolutionKey::Component720p => "c720p",
            ResolutionKey::Component1080i => "c1080i",
            ResolutionKey::Component1080p => "c1080p",
        }
    }

    /// Name of the initialization script replayed for this standard.
    pub fn script_name(self) -> &'static str {
        match self {
            ResolutionKey::Hd720p => "init_720p",
            ResolutionKey::Hd1080p => "init_1080p",
            ResolutionKey::Sd576i => "init_576i",
            ResolutionKey::Component576p => "init_component_576p",
            ResolutionKey::Component720p => "init_component_720p",
            ResolutionKey::Component1080i => "init_component_1080i",
            ResolutionKey::Component1080p => "init_component_1080p",
        }
    }
}

impl fmt::Display for ResolutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported resolution `{0}` (expected one of 720p, 1080p, 576i, c576p, c720p, c1080i, c1080p)")]
pub struct UnsupportedResolution(pub String);

impl FromStr for ResolutionKey {
    type Err = UnsupportedResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResolutionKey::ALL
            .into_iter()
            .find(|key| key.token() == s)
            .ok_or_else(|| UnsupportedResolution(s.to_string()))
    }
}
