pub mod token;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no config directory available")]
    NoConfigDir,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}
