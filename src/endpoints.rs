//! The API endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/transactions/{transaction_id}',
//! use [format_endpoint].

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register a user.
pub const USERS: &str = "/api/users";
/// The route to look up the currently logged in user.
pub const USERS_ME: &str = "/api/users/me";
/// The route to list and create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to list transactions grouped by month with totals.
pub const TRANSACTIONS_GROUPED: &str = "/api/transactions/grouped";
/// The route to long-poll for transaction changes.
pub const TRANSACTION_EVENTS: &str = "/api/transactions/events";
/// The route for the monthly income and expense totals of a year.
pub const CASHFLOW: &str = "/api/cashflow";
/// The route to look up a conversion rate.
pub const FX: &str = "/api/fx";
/// The route to read and update profile settings.
pub const PROFILE_API: &str = "/api/profile";
/// The route to upload an avatar image.
pub const PROFILE_AVATAR: &str = "/api/profile/avatar";
/// The route for serving uploaded avatar images.
pub const AVATARS: &str = "/avatars";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/transactions/{transaction_id}',
/// '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
