//! Changesets: validated request bodies that double as the input of store writes.
use chrono::NaiveDateTime;
use serde::Deserialize;
use validator::Validate;

use crate::constants::{RE_PHONE, RE_USERNAME};
use crate::models::{JobState, Role};

/// Body of `POST /users/:actorId`.
#[derive(Debug, Clone, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(
        length(min = 1, max = 64, message = "Minimum length is 1 character, maximum is 64"),
        regex(
            path = "RE_USERNAME",
            message = "Can only contain letters, numbers, spaces, dashes (-), periods (.), and underscores (_)"
        )
    )]
    pub name: String,
    #[validate(length(min = 8, max = 128, message = "Minimum length is 8 characters, maximum is 128"))]
    pub pass: String,
    #[serde(default)]
    pub rol: Role,
    #[validate(regex(path = "RE_PHONE", message = "Must be a phone number."))]
    pub tlf: Option<String>,
    #[validate(email(message = "Must be a valid email address."))]
    pub email: Option<String>,
    #[validate(range(min = 0.0, message = "Rate cannot be negative."))]
    #[serde(default)]
    pub rate: f64,
}

/// The action by which a user is updated.
///
/// Every field is optional: whatever is left out keeps its stored value.
#[derive(Debug, Clone, Default, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[validate(
        length(min = 1, max = 64, message = "Minimum length is 1 character, maximum is 64"),
        regex(
            path = "RE_USERNAME",
            message = "Can only contain letters, numbers, spaces, dashes (-), periods (.), and underscores (_)"
        )
    )]
    pub name: Option<String>,
    #[validate(length(min = 8, max = 128, message = "Minimum length is 8 characters, maximum is 128"))]
    pub pass: Option<String>,
    pub rol: Option<Role>,
    #[validate(regex(path = "RE_PHONE", message = "Must be a phone number."))]
    pub tlf: Option<String>,
    #[validate(email(message = "Must be a valid email address."))]
    pub email: Option<String>,
    #[validate(range(min = 0.0, message = "Rate cannot be negative."))]
    pub rate: Option<f64>,
}

/// The writable columns of a job. Used whole on create and on update.
#[derive(Debug, Clone, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobFields {
    pub date_job: NaiveDateTime,
    #[validate(length(min = 1, max = 200, message = "Minimum length is 1 character, maximum is 200"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub state: JobState,
    #[validate(regex(path = "RE_PHONE", message = "Must be a phone number."))]
    pub tlf: Option<String>,
    #[serde(default = "on_site_default")]
    pub on_site: bool,
}

fn on_site_default() -> bool {
    true
}

/// Body of `PUT /jobs/:userId`: a full overwrite of an existing job.
#[derive(Debug, Clone, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJob {
    pub id_job: i64,
    #[serde(flatten)]
    #[validate]
    pub fields: JobFields,
}

/// Body of `POST /createTaller`.
#[derive(Debug, Clone, Validate, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkshop {
    pub id_job: i64,
    #[validate(length(min = 1, message = "Client is required."))]
    pub client: String,
    #[validate(length(min = 1, message = "Equipment is required."))]
    pub equipment: String,
    #[serde(default)]
    pub fault: String,
    #[serde(default)]
    pub incident: String,
}
