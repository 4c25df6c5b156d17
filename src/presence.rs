//! Identity sync with the hosted chat/video provider

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{config::Stream, crypto::sign_hs256, error::Error};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PresenceUser {
    pub id: String,
    pub name: String,
    pub image: String,
}

#[async_trait]
pub trait PresenceSync: Send + Sync {
    async fn upsert_user(&self, user: &PresenceUser) -> Result<(), Error>;

    /// Token the client uses to connect to the provider as `user_uuid`
    fn issue_token(&self, user_uuid: Uuid) -> Result<String, Error>;
}

/// Upserts `user` without waiting for it, failures are logged and dropped
pub fn sync_in_background(presence: Arc<dyn PresenceSync>, user: PresenceUser) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(error) = presence.upsert_user(&user).await {
            warn!("failed to sync user {} with chat provider: {}", user.id, error);
        }
    })
}

#[derive(Serialize)]
struct ServerClaims {
    server: bool,
}

#[derive(Serialize)]
struct UserClaims {
    user_id: String,
    iat: i64,
}

#[derive(Serialize)]
struct UpsertUsers<'a> {
    users: HashMap<&'a str, &'a PresenceUser>,
}

pub struct StreamPresence {
    client: reqwest::Client,
    config: Stream,
}

impl StreamPresence {
    pub fn new(config: Stream) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    fn server_token(&self) -> Result<String, Error> {
        sign_hs256(
            self.config.api_secret.as_bytes(),
            &ServerClaims { server: true },
        )
    }
}

#[async_trait]
impl PresenceSync for StreamPresence {
    async fn upsert_user(&self, user: &PresenceUser) -> Result<(), Error> {
        let mut url = self.config.base_url.join("users")?;
        url.query_pairs_mut()
            .append_pair("api_key", &self.config.api_key);

        let body = UpsertUsers {
            users: HashMap::from([(user.id.as_str(), user)]),
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", self.server_token()?)
            .header("stream-auth-type", "jwt")
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        debug!(
            "chat provider upsert of {} returned {}",
            user.id,
            response.status()
        );

        Ok(())
    }

    fn issue_token(&self, user_uuid: Uuid) -> Result<String, Error> {
        sign_hs256(
            self.config.api_secret.as_bytes(),
            &UserClaims {
                user_id: user_uuid.to_string(),
                iat: Utc::now().timestamp(),
            },
        )
    }
}

/// Used when no provider is configured
pub struct DisabledPresence;

#[async_trait]
impl PresenceSync for DisabledPresence {
    async fn upsert_user(&self, user: &PresenceUser) -> Result<(), Error> {
        debug!("chat provider disabled, not syncing user {}", user.id);

        Ok(())
    }

    fn issue_token(&self, _user_uuid: Uuid) -> Result<String, Error> {
        Err(Error::Unavailable(
            "Chat is not configured on this instance".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{crypto::verify_hs256, testing::RecordingPresence};
    use url::Url;

    fn stream() -> StreamPresence {
        StreamPresence::new(Stream {
            api_key: "key".to_string(),
            api_secret: "stream secret".to_string(),
            base_url: Url::parse("http://127.0.0.1:9").unwrap(),
        })
        .unwrap()
    }

    #[derive(Deserialize)]
    struct Claims {
        user_id: String,
        iat: i64,
    }

    #[test]
    fn stream_tokens_are_signed_with_the_api_secret() {
        let uuid = Uuid::now_v7();
        let before = Utc::now().timestamp();
        let token = stream().issue_token(uuid).unwrap();

        let claims: Claims = verify_hs256(b"stream secret", &token).unwrap();
        assert_eq!(claims.user_id, uuid.to_string());
        assert!((before..=Utc::now().timestamp()).contains(&claims.iat));
    }

    #[test]
    fn disabled_presence_has_no_tokens() {
        assert!(matches!(
            DisabledPresence.issue_token(Uuid::now_v7()),
            Err(Error::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn background_sync_swallows_failures() {
        let presence = RecordingPresence::failing();
        let user = PresenceUser {
            id: Uuid::now_v7().to_string(),
            name: "Ana".to_string(),
            image: String::new(),
        };

        sync_in_background(presence.clone(), user.clone())
            .await
            .unwrap();

        assert_eq!(*presence.upserts.lock().unwrap(), vec![user]);
    }

    #[tokio::test]
    async fn unreachable_provider_is_an_error() {
        let result = stream()
            .upsert_user(&PresenceUser {
                id: "1".to_string(),
                name: "Ana".to_string(),
                image: String::new(),
            })
            .await;

        assert!(matches!(result, Err(Error::ReqwestError(_))));
    }
}
