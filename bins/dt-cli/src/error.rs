#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config: {0}")]
    Config(#[from] dt_core::ConfigError),

    #[error("input {path}: {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },

    #[error("{0}")]
    Sdk(#[from] dt_sdk::SdkError),
}
