/// Errors that can occur during simulator operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    #[error("storage image too large: {0} bytes")]
    ImageTooLarge(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
