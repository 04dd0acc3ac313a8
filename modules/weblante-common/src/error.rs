use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeblanteError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Activity log error: {0}")]
    ActivityLog(String),
}
