//! Account session commands.

#![allow(clippy::print_stdout)]

use nexus_market_client::Marketplace;
use nexus_market_client::session::{Identity, Registration};
use nexus_market_core::Role;

use super::{CommandError, password_or_prompt};

/// Sign in and store the session.
pub async fn login(
    market: &Marketplace,
    username: &str,
    password: Option<String>,
) -> Result<(), CommandError> {
    let password = password_or_prompt(password)?;
    let identity = market.session().login(username, &password).await?;

    match identity {
        Some(identity) => println!("Signed in as {}", describe(&identity)),
        None => println!("Signed in"),
    }
    Ok(())
}

/// Forget the stored session.
pub fn logout(market: &Marketplace) {
    market.session().logout();
    println!("Signed out");
}

/// Print the signed-in account.
pub fn whoami(market: &Marketplace) {
    match market.session().current_identity() {
        Some(identity) => println!("{}", describe(&identity)),
        None if market.session().is_authenticated() => {
            println!("Signed in (account details unavailable)");
        }
        None => println!("Not signed in"),
    }
}

/// Create an account. Sellers open their shop afterwards with `shops create`.
pub async fn register(
    market: &Marketplace,
    username: String,
    email: String,
    password: Option<String>,
    role: Role,
) -> Result<(), CommandError> {
    if role == Role::Staff {
        return Err(CommandError::InvalidInput(
            "staff accounts are created by shop owners".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(CommandError::InvalidInput(format!("invalid email: {email}")));
    }

    let password = password_or_prompt(password)?;
    let registered = market
        .session()
        .register(&Registration {
            username,
            email,
            password,
            role,
        })
        .await?;

    println!("Account '{}' created. Sign in with `nm-cli login`.", registered.username);
    if role.is_seller() {
        println!("Then open your shop with `nm-cli shops create`.");
    }
    Ok(())
}

fn describe(identity: &Identity) -> String {
    let mut description = format!("{} ({})", identity.username, identity.role);
    if let Some(ref shop) = identity.tenant_name {
        description.push_str(&format!(" of {shop}"));
    } else if let Some(tenant_id) = identity.tenant_id {
        description.push_str(&format!(" of shop #{tenant_id}"));
    }
    description
}
