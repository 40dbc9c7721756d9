//! Session commands: login, status, refresh, logout, watch.

use color_eyre::eyre::eyre;
use color_eyre::Result;

use crate::auth::{Credential, SessionIdentity, UserProfile};
use crate::session::SessionManager;

pub fn handle_login_command(
    manager: &SessionManager,
    access_token: String,
    refresh_token: Option<String>,
    subject: Option<String>,
    username: Option<String>,
) -> Result<()> {
    let profile = username.map(UserProfile::new);
    let credential = manager
        .login(access_token, refresh_token, subject, profile)
        .map_err(|e| eyre!("{} ({})", e.user_message(), e.error_code()))?;

    println!("Signed in as {}", credential.subject);
    print_credential(&credential);
    if credential.is_expired() {
        println!("Warning: this access token is already expired");
    }
    Ok(())
}

pub async fn handle_status_command(manager: &SessionManager) -> Result<()> {
    match manager.guard().verify_on_load().await {
        Some(credential) => {
            println!("Signed in as {}", credential.subject);
            print_credential(&credential);
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn handle_refresh_command(manager: &SessionManager) -> Result<()> {
    if manager.guard().verify_on_load().await.is_none() {
        return Err(eyre!("Not signed in"));
    }
    let credential = manager
        .guard()
        .verify_before_sensitive_action()
        .await
        .map_err(|e| eyre!("{} ({})", e.user_message(), e.error_code()))?;

    println!("Session is fresh");
    print_credential(&credential);
    Ok(())
}

pub fn handle_logout_command(manager: &SessionManager) -> Result<()> {
    manager.logout()?;
    println!("Signed out");
    Ok(())
}

/// Restore the session, keep it fresh, and print every transition until
/// Ctrl-C or sign-out.
pub async fn handle_watch_command(manager: &SessionManager) -> Result<()> {
    let mut updates = manager.subscribe();
    let restored = manager.verify_on_load().await;
    let _ = updates.borrow_and_update();

    let Some(credential) = restored else {
        println!("Not signed in");
        return Ok(());
    };
    println!(
        "Watching session for {} (checking every {}s)",
        credential.subject,
        manager.config().check_interval.as_secs()
    );

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let identity = updates.borrow_and_update().clone();
                print_transition(identity.as_ref(), manager);
                if identity.is_none() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("Interrupted");
                break;
            }
        }
    }

    manager.scheduler().stop();
    Ok(())
}

fn print_transition(identity: Option<&SessionIdentity>, manager: &SessionManager) {
    match (identity, manager.current()) {
        (Some(identity), Some(credential)) => {
            println!(
                "Session renewed for {} (expires {})",
                identity.subject,
                credential.expires_at.to_rfc3339()
            );
        }
        _ => println!("Session ended; sign in again"),
    }
}

fn print_credential(credential: &Credential) {
    if let Some(profile) = &credential.profile {
        match &profile.display_name {
            Some(name) => println!("  user:    {} ({})", profile.username, name),
            None => println!("  user:    {}", profile.username),
        }
    }
    println!("  expires: {}", credential.expires_at.to_rfc3339());
    println!("  remains: {}s", credential.seconds_remaining().max(0));
    println!(
        "  refresh: {}",
        if credential.has_refresh_token() { "yes" } else { "no" }
    );
}
