mod errors;
mod limiter;
mod models;
mod resolver;

pub use errors::VerifyError;
pub use limiter::{AttemptLimits, InFlightGuard, LimitExceeded};
pub use models::{LinkRewrite, MutationRequests, Resolution, ResolutionResult, ResolveRequest};
pub use resolver::resolve;
