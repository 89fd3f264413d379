use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur while building or running a [Tracker](crate::Tracker).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The configuration was rejected by [Config::validate](crate::config::Config::validate).
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The projected covariance of the motion filter is not positive definite.
    #[error("Projected covariance is not positive definite")]
    SingularCovariance,
}
