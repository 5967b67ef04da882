//! Login input arriving as query parameters.
//!
//! After an external sign-in the backend redirects to the app with the new
//! session in the query string. Parameter names differ between login
//! flows, so both spellings are accepted.

use dealgate_token::{Role, Session};

use crate::SessionError;

const TOKEN_PARAMS: [&str; 2] = ["token", "access_token"];
const USER_ID_PARAMS: [&str; 2] = ["userId", "user_id"];
const REFRESH_PARAMS: [&str; 2] = ["refreshToken", "refresh_token"];

/// Builds a session from `(name, value)` query pairs.
///
/// Returns `Ok(None)` if there is no non-empty token parameter: the page
/// was not reached through a login redirect.
///
/// # Errors
/// - [`SessionError::MissingParameter`] if a token is present but the user
///   id or role is not.
/// - [`SessionError::InvalidRole`] if the role is not a known role.
pub fn session_from_query<I, K, V>(pairs: I) -> Result<Option<Session>, SessionError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut access_token = None;
    let mut user_id = None;
    let mut role = None;
    let mut refresh_token = None;

    for (name, value) in pairs {
        let name = name.as_ref();
        let value = value.as_ref().trim();
        if value.is_empty() {
            continue;
        }
        let slot = if TOKEN_PARAMS.contains(&name) {
            &mut access_token
        } else if USER_ID_PARAMS.contains(&name) {
            &mut user_id
        } else if name == "role" {
            &mut role
        } else if REFRESH_PARAMS.contains(&name) {
            &mut refresh_token
        } else {
            continue;
        };
        // First occurrence wins.
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
    }

    let Some(access_token) = access_token else {
        return Ok(None);
    };
    let user_id = user_id.ok_or(SessionError::MissingParameter("userId"))?;
    let raw_role = role.ok_or(SessionError::MissingParameter("role"))?;
    let role = raw_role
        .parse::<Role>()
        .map_err(|_| SessionError::InvalidRole(raw_role))?;

    Ok(Some(Session {
        access_token,
        refresh_token,
        user_id,
        role,
    }))
}
