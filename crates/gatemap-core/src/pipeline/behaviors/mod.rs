//! Built-in behaviors

pub mod authentication;
pub mod error_capture;
pub mod outcome_logging;
pub mod timing;
pub mod validation;

pub use authentication::AuthenticationBehavior;
pub use error_capture::ErrorCaptureBehavior;
pub use outcome_logging::OutcomeLoggingBehavior;
pub use timing::TimingBehavior;
pub use validation::ValidationBehavior;
