//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{auth_guard, get_current_user, get_log_out, post_log_in, register_user},
    endpoints,
    fx::get_rate,
    profile::{get_profile_endpoint, put_profile, upload_avatar},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_cashflow,
        get_grouped_transactions, get_transactions, poll_transaction_events,
        update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::USERS, post(register_user));

    let protected_routes = Router::new()
        .route(endpoints::USERS_ME, get(get_current_user))
        .route(
            endpoints::TRANSACTIONS_API,
            get(get_transactions).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(update_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::TRANSACTIONS_GROUPED, get(get_grouped_transactions))
        .route(endpoints::TRANSACTION_EVENTS, get(poll_transaction_events))
        .route(endpoints::CASHFLOW, get(get_cashflow))
        .route(endpoints::FX, get(get_rate))
        .route(
            endpoints::PROFILE_API,
            get(get_profile_endpoint).put(put_profile),
        )
        .route(endpoints::PROFILE_AVATAR, post(upload_avatar))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::AVATARS, ServeDir::new(&state.avatar_dir))
        .with_state(state)
}
