//! Health and session commands.

use std::io::BufRead;

use secrecy::SecretString;
use tracing::info;

use cartify_client::Cartify;

use super::{CommandError, require_session};

/// Probe the API and print the result.
pub async fn health(cartify: &Cartify) -> Result<(), CommandError> {
    let health = cartify.api().health().await;
    let state = if health.healthy { "healthy" } else { "unreachable" };
    println!(
        "{} {state} ({} ms){}",
        cartify.api().base_url(),
        health.latency.as_millis(),
        health
            .status
            .map(|s| format!(" - {s}"))
            .unwrap_or_default()
    );
    Ok(())
}

/// Resolve the login password without it ever appearing on the command line.
///
/// With `from_stdin` the first line of `input` is used; otherwise `env_value`
/// (normally `CARTIFY_PASSWORD`).
pub fn read_password(
    from_stdin: bool,
    env_value: Option<String>,
    mut input: impl BufRead,
) -> Result<SecretString, CommandError> {
    let password = if from_stdin {
        let mut line = String::new();
        input.read_line(&mut line)?;
        line.trim_end_matches(['\r', '\n']).to_string()
    } else {
        env_value.unwrap_or_default()
    };
    if password.is_empty() {
        return Err(CommandError::MissingPassword);
    }
    Ok(SecretString::from(password))
}

pub async fn login(
    cartify: &Cartify,
    email: &str,
    password: &SecretString,
) -> Result<(), CommandError> {
    let user = cartify.login(email, password).await?;
    println!("Signed in as {} ({})", user.email, user.role);
    Ok(())
}

pub async fn logout(cartify: &Cartify) {
    cartify.logout().await;
    println!("Signed out");
}

/// Print the signed-in user, optionally re-fetching it first.
pub async fn whoami(cartify: &Cartify, refresh: bool) -> Result<(), CommandError> {
    require_session(cartify)?;
    let user = if refresh {
        cartify.refresh_user().await?
    } else {
        cartify
            .auth()
            .current_user()
            .ok_or(CommandError::NotSignedIn)?
    };
    info!(user_id = %user.id, "Resolved current user");
    let name = if user.name.is_empty() { "-" } else { &user.name };
    println!("{name} <{}> {}", user.email, user.role);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Cursor;

    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_password_from_env() {
        let password = read_password(false, Some("hunter22".to_string()), Cursor::new("")).unwrap();
        assert_eq!(password.expose_secret(), "hunter22");
    }

    #[test]
    fn test_password_from_stdin_first_line() {
        let input = Cursor::new("s3cret pass\r\nignored\n");
        let password = read_password(true, Some("from-env".to_string()), input).unwrap();
        assert_eq!(password.expose_secret(), "s3cret pass");
    }

    #[test]
    fn test_missing_password() {
        assert!(matches!(
            read_password(false, None, Cursor::new("")),
            Err(CommandError::MissingPassword)
        ));
        assert!(matches!(
            read_password(true, None, Cursor::new("\n")),
            Err(CommandError::MissingPassword)
        ));
    }
}
