//! HTTP inbound adapter exposing REST endpoints.

use actix_web::web;

use crate::domain::Error;

pub mod audit_records;
pub mod correlation;
pub mod error;
pub mod health;
pub mod patient_tests;
pub mod patients;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

/// Register the record endpoints on a scope mounted at `/api/v1`.
///
/// Malformed JSON bodies are answered with `invalid_request`.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use backend::inbound::http::configure_api;
///
/// let app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        Error::invalid_request(err.to_string()).into()
    }))
    .service(patients::create_patient)
    .service(patients::get_patient)
    .service(patients::update_patient)
    .service(patient_tests::create_test)
    .service(patient_tests::list_tests)
    .service(patient_tests::get_test)
    .service(audit_records::create_audit_record);
}
