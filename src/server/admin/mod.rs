mod iterations;
mod question_sets;
mod settings;
mod units;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::server::AppState;

pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        // Iteration lifecycle
        .route("/iterations", get(iterations::list_iterations))
        .route("/iterations", post(iterations::create_iteration))
        .route("/iterations/active", get(iterations::get_active_iteration))
        .route("/iterations/next", post(iterations::create_next_iteration))
        .route("/iterations/close", post(iterations::close_iteration))
        .route("/iterations/{id}", get(iterations::get_iteration))
        .route("/iterations/{id}", delete(iterations::delete_iteration))
        // Organization units
        .route("/units", get(units::list_units))
        .route("/units", post(units::create_unit))
        .route("/units/{id}", get(units::get_unit))
        .route("/units/{id}", patch(units::update_unit))
        .route("/units/{id}", delete(units::delete_unit))
        .route("/units/{id}/subordinates", get(units::list_subordinates))
        // Settings
        .route("/settings/{key}", get(settings::get_setting))
        .route("/settings/{key}", put(settings::update_setting))
        // Question sets
        .route("/question-sets", get(question_sets::list_question_sets))
        .route("/question-sets/{name}", get(question_sets::get_question_set))
}
