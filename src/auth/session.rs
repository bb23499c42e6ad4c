//! Session login

use super::types::{Credentials, Session};
use crate::decode::decode_one;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use serde::Deserialize;
use tracing::{debug, info};

/// Login endpoint, relative to the API root
pub const LOGIN_ENDPOINT: &str = "Login.json";

#[derive(Debug, Deserialize)]
struct LoginData {
    #[serde(rename = "sessionId", default)]
    session_id: Option<String>,
}

/// Log in and open a session
///
/// A rejected login surfaces the platform's error code. A successful
/// envelope without a session id is treated as an auth failure.
pub async fn login(http: &HttpClient, credentials: &Credentials) -> Result<Session> {
    credentials.validate()?;
    debug!(
        user = %credentials.user_name,
        org = %credentials.org_id,
        "Logging in"
    );

    let body = http
        .post_form(LOGIN_ENDPOINT, &credentials.login_form())
        .await
        .map_err(|e| match e {
            Error::Api { code, message, .. } => {
                Error::auth(format!("Unable to log in ({code}): {message}"))
            }
            other => other,
        })?;

    let data: LoginData = decode_one(&body)?;
    let session_id = data
        .session_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::auth("Login response did not contain a session id"))?;

    info!(org = %credentials.org_id, "Logged in");
    Ok(Session::new(session_id, credentials.dev_key.clone()))
}
