use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("linear system is singular or nearly singular")]
    Singular,
    #[error("linear system contains non-finite coefficients")]
    NonFinite,
}
