//! Behavioral constants for chart requests.

/// Interval selector applied when a request does not name one.
pub const DEFAULT_INTERVAL: &str = "M";

/// Upper bound on repos accepted in a single chart request.
pub const MAX_REPOS_PER_REQUEST: usize = 500;
