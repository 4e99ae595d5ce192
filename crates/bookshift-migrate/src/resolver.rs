//! Identity resolution: user id to display token.

use bookshift_parse::{MasterKey, RecordStore, User};
use tracing::debug;

use crate::error::ResolveError;

/// The token a user is shown as inside URLs: email, else username.
///
/// Empty strings count as absent.
pub fn display_token(user: &User) -> Option<&str> {
    user.email
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| user.username.as_deref().filter(|s| !s.is_empty()))
}

/// Fetch a user with elevated privilege and return its display token.
pub async fn resolve_display_token<S>(
    store: &S,
    master_key: &MasterKey,
    user_id: &str,
) -> Result<String, ResolveError>
where
    S: RecordStore + ?Sized,
{
    let user = store.fetch_user(user_id, master_key.elevated()).await?;
    let token = display_token(&user).ok_or_else(|| ResolveError::NoDisplayToken {
        user_id: user_id.to_string(),
    })?;
    debug!(user_id, token, "resolved display token");
    Ok(token.to_string())
}
