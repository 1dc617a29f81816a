// Admin login flow.
//
// The server checks passwords; the client only remembers who got in. A
// per-auction admin flag and a global super-admin flag live in the local
// store and skip the prompt on later visits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use gavel_core::db::LocalStore;

use crate::api::AuctionApi;
use crate::snapshot::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Granted,
    Denied,
}

/// Server-side password checks.
#[async_trait]
pub trait AdminVerifier: Send + Sync {
    async fn verify_admin(&self, auction_id: &str, password: &str) -> Result<bool, FetchError>;
    async fn super_admin_login(&self, password: &str) -> Result<bool, FetchError>;
}

#[async_trait]
impl AdminVerifier for AuctionApi {
    async fn verify_admin(&self, auction_id: &str, password: &str) -> Result<bool, FetchError> {
        AuctionApi::verify_admin(self, auction_id, password).await
    }

    async fn super_admin_login(&self, password: &str) -> Result<bool, FetchError> {
        AuctionApi::super_admin_login(self, password).await
    }
}

/// True when the console for `auction_id` can open without a prompt.
pub fn has_admin_access(store: &LocalStore, auction_id: &str) -> Result<bool> {
    Ok(store.is_admin(auction_id)? || store.is_super_admin()?)
}

/// Check an auction password and remember a successful login.
pub async fn login_admin(
    verifier: &dyn AdminVerifier,
    store: &LocalStore,
    auction_id: &str,
    password: &str,
) -> Result<AuthOutcome> {
    let ok = verifier
        .verify_admin(auction_id, password)
        .await
        .with_context(|| format!("verifying admin password for auction {auction_id}"))?;
    if !ok {
        warn!("admin login rejected for auction {auction_id}");
        return Ok(AuthOutcome::Denied);
    }
    store.grant_admin(auction_id)?;
    info!("admin access granted for auction {auction_id}");
    Ok(AuthOutcome::Granted)
}

pub async fn login_super_admin(
    verifier: &dyn AdminVerifier,
    store: &LocalStore,
    password: &str,
) -> Result<AuthOutcome> {
    let ok = verifier
        .super_admin_login(password)
        .await
        .context("verifying super-admin password")?;
    if !ok {
        warn!("super-admin login rejected");
        return Ok(AuthOutcome::Denied);
    }
    store.set_super_admin(true)?;
    info!("super-admin access granted");
    Ok(AuthOutcome::Granted)
}

/// Open an auction's console as super admin, recording the per-auction
/// grant. Denied for anyone who is not a super admin.
pub fn enter_as_super_admin(store: &LocalStore, auction_id: &str) -> Result<AuthOutcome> {
    if !store.is_super_admin()? {
        return Ok(AuthOutcome::Denied);
    }
    store.grant_admin(auction_id)?;
    Ok(AuthOutcome::Granted)
}

/// Forget every local grant.
pub fn logout(store: &LocalStore) -> Result<()> {
    for grant in store.admin_grants()? {
        store.revoke_admin(&grant.auction_id)?;
    }
    store.set_super_admin(false)?;
    info!("local admin grants cleared");
    Ok(())
}
