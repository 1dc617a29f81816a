// REST client for the auction server.
//
// One method per endpoint. Every call is a single request with no retry;
// failures surface as `FetchError` and the caller decides what to show.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use gavel_core::config::Config;
use gavel_core::model::{
    Auction, AuctionUpdate, NewAuction, NewPlayer, NewTeam, Player, Snapshot, Team,
};

use crate::snapshot::{FetchError, SnapshotSource};

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyAdminRequest<'a> {
    auction_id: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SuperAdminRequest<'a> {
    password: &'a str,
}

/// HTTP client bound to one server base URL.
#[derive(Debug, Clone)]
pub struct AuctionApi {
    http: reqwest::Client,
    base_url: String,
}

impl AuctionApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Network {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            config.api_base(),
            Duration::from_secs(config.server.request_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ------------------------------------------------------------------
    // Auctions
    // ------------------------------------------------------------------

    pub async fn list_auctions(&self) -> Result<Vec<Auction>, FetchError> {
        self.get_json("/api/auctions").await
    }

    pub async fn create_auction(&self, auction: &NewAuction) -> Result<(), FetchError> {
        let path = "/api/create-auction";
        self.send_discard(self.http.post(self.url(path)).json(auction), path)
            .await
    }

    pub async fn update_auction(&self, id: &str, update: &AuctionUpdate) -> Result<(), FetchError> {
        let path = format!("/api/auctions/{id}");
        self.send_discard(self.http.put(self.url(&path)).json(update), &path)
            .await
    }

    pub async fn set_auction_active(&self, id: &str, active: bool) -> Result<(), FetchError> {
        let update = AuctionUpdate {
            is_active: Some(active),
            ..Default::default()
        };
        self.update_auction(id, &update).await
    }

    pub async fn delete_auction(&self, id: &str) -> Result<(), FetchError> {
        let path = format!("/api/auctions/{id}");
        self.send_discard(self.http.delete(self.url(&path)), &path).await
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// `Ok(true)` only when the server answers `{success: true}`. A rejected
    /// password is `Ok(false)`, whatever status code carries it.
    pub async fn verify_admin(&self, auction_id: &str, password: &str) -> Result<bool, FetchError> {
        let body = VerifyAdminRequest {
            auction_id,
            password,
        };
        self.post_success("/api/verify-admin", &body).await
    }

    pub async fn super_admin_login(&self, password: &str) -> Result<bool, FetchError> {
        self.post_success("/api/super-admin/login", &SuperAdminRequest { password })
            .await
    }

    // ------------------------------------------------------------------
    // Teams and players
    // ------------------------------------------------------------------

    pub async fn create_team(&self, team: &NewTeam) -> Result<Option<Team>, FetchError> {
        self.post_optional("/api/teams", team).await
    }

    pub async fn delete_team(&self, id: &str) -> Result<(), FetchError> {
        let path = format!("/api/teams/{id}");
        self.send_discard(self.http.delete(self.url(&path)), &path).await
    }

    pub async fn create_player(&self, player: &NewPlayer) -> Result<Option<Player>, FetchError> {
        self.post_optional("/api/players", player).await
    }

    pub async fn delete_player(&self, id: &str) -> Result<(), FetchError> {
        let path = format!("/api/players/{id}");
        self.send_discard(self.http.delete(self.url(&path)), &path).await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = self.url(path);
        debug!("GET {url}");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(resp, &url)?;
        let text = resp.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|e| FetchError::Decode {
            url,
            message: e.to_string(),
        })
    }

    async fn send_discard(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> Result<(), FetchError> {
        let url = self.url(path);
        debug!("request {url}");
        let resp = request.send().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        check_status(resp, &url)?;
        Ok(())
    }

    /// POST and decode the created document if the server returns one.
    async fn post_optional<B, T>(&self, path: &str, body: &B) -> Result<Option<T>, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("POST {url}");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;
        let resp = check_status(resp, &url)?;
        let text = resp.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&text).ok())
    }

    async fn post_success<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<bool, FetchError> {
        let url = self.url(path);
        debug!("POST {url}");
        let resp = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| FetchError::Network {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        let text = resp.text().await.map_err(|source| FetchError::Network {
            url: url.clone(),
            source,
        })?;
        Ok(parse_success(status.is_success(), &text))
    }
}

#[async_trait]
impl SnapshotSource for AuctionApi {
    async fn load_snapshot(&self, auction_id: &str) -> Result<Snapshot, FetchError> {
        self.get_json(&format!("/api/init/{auction_id}")).await
    }
}

fn check_status(resp: reqwest::Response, url: &str) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Interpret a login response body. Anything but a 2xx with
/// `{"success": true}` is a denial.
pub(crate) fn parse_success(status_ok: bool, body: &str) -> bool {
    status_ok
        && serde_json::from_str::<SuccessResponse>(body)
            .map(|r| r.success)
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let api = AuctionApi::new("http://localhost:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://localhost:5000");
        assert_eq!(api.url("/api/init/a1"), "http://localhost:5000/api/init/a1");
    }

    #[test]
    fn success_requires_ok_status_and_flag() {
        assert!(parse_success(true, r#"{"success":true}"#));
        assert!(!parse_success(true, r#"{"success":false}"#));
        assert!(!parse_success(false, r#"{"success":true}"#));
        assert!(!parse_success(true, "not json"));
        assert!(!parse_success(true, "{}"));
    }

    #[test]
    fn verify_admin_body_shape() {
        let body = VerifyAdminRequest {
            auction_id: "a1",
            password: "pw",
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"auctionId":"a1","password":"pw"}"#
        );
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let api = AuctionApi::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = api.load_snapshot("a1").await.unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "got {err}");
    }
}
