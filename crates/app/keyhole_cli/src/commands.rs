//! Subcommand implementations. Output goes to stdout; diagnostics go
//! through `log`.

use keyhole_client::models::UserProfile;
use keyhole_client::{AuthClient, ClientError};

use crate::Result;
use crate::cli::{LoginArgs, RegisterArgs};

pub async fn register(client: &AuthClient, args: &RegisterArgs) -> Result<()> {
    let user = client
        .register(&args.username, &args.email, &args.password)
        .await?;
    println!("Registered {} (id {})", user.username, user.id);
    Ok(())
}

pub async fn login(client: &AuthClient, args: &LoginArgs) -> Result<()> {
    let user = client.login(&args.username, &args.password).await?;
    println!("Logged in as {}", user.username);
    Ok(())
}

pub async fn profile(client: &AuthClient) -> Result<()> {
    let user = client.profile().await?;
    print_profile(&user);
    Ok(())
}

pub async fn logout(client: &AuthClient) -> Result<()> {
    match client.logout().await {
        Ok(()) => println!("Logged out"),
        Err(ClientError::NotLoggedIn) => println!("Not logged in"),
        Err(e) => {
            log::warn!("server logout failed, local session removed: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}

/// Never fails on an unreachable server; reports it instead.
pub async fn status(client: &AuthClient) -> Result<()> {
    println!("server:   {}", client.base_url());
    match client.session()? {
        Some(session) => println!(
            "session:  logged in as {} (id {})",
            session.user.username, session.user.id
        ),
        None => println!("session:  not logged in"),
    }
    match client.health().await {
        Ok(health) => println!(
            "health:   {} (database: {}, cache: {})",
            health.status,
            up_down(health.database),
            up_down(health.cache)
        ),
        Err(e) => {
            log::debug!("health check failed: {e}");
            println!("health:   unreachable");
        }
    }
    Ok(())
}

fn up_down(ok: bool) -> &'static str {
    if ok { "up" } else { "down" }
}

fn print_profile(user: &UserProfile) {
    println!("id:         {}", user.id);
    println!("username:   {}", user.username);
    println!("email:      {}", user.email);
    println!("created_at: {}", user.created_at.to_rfc3339());
    println!("updated_at: {}", user.updated_at.to_rfc3339());
}
