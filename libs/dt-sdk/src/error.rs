use dt_api::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
