/// Failures while talking to the metadata API. Envelope errors (`Remote`)
/// are normally logged and turned into "nothing found" by the provider.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("douban API error: {code}-{msg}")]
    Remote { code: i64, msg: String },

    #[error("Cover download from {url} failed: {reason}")]
    Cover { url: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No config directory available on this platform")]
    NoConfigDir,

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
