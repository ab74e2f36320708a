pub mod access;
mod calculate;
mod people;
mod roles;
mod surveys;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};

use crate::server::AppState;

pub fn user_router() -> Router<Arc<AppState>> {
    Router::new()
        // People
        .route("/people", get(people::list_people))
        .route("/people", post(people::create_person))
        .route("/people/{id}", get(people::get_person))
        .route("/people/{id}", delete(people::delete_person))
        .route("/login", post(people::login))
        // Person roles
        .route("/roles", get(roles::list_roles))
        .route("/roles", post(roles::create_role))
        .route("/roles/{id}", get(roles::get_role))
        .route("/roles/{id}", patch(roles::update_role))
        .route("/roles/{id}", delete(roles::delete_role))
        // Surveys
        .route("/surveys", get(surveys::list_surveys))
        .route("/surveys", post(surveys::submit_survey))
        .route("/surveys/role/{id}", get(surveys::get_role_survey))
        .route("/surveys/unit/{id}", get(surveys::get_unit_survey))
        // Aggregation
        .route("/calculate", post(calculate::calculate))
}
