//! Fixtures shared by the test modules

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Error,
    objects::{Me, NewUser, Profile},
    presence::{PresenceSync, PresenceUser},
    store::Store,
};

pub async fn user(store: &dyn Store, name: &str) -> Me {
    let email = format!("{}@example.com", Uuid::now_v7().simple());

    store
        .create_user(NewUser::new(name, &email, "not-a-real-hash".to_string()))
        .await
        .unwrap()
}

pub async fn onboarded_user(store: &dyn Store, name: &str) -> Me {
    let me = user(store, name).await;

    store
        .update_profile(
            me.uuid,
            &Profile {
                name: name.to_string(),
                bio: "Learning every day".to_string(),
                native_language: "english".to_string(),
                learning_language: "spanish".to_string(),
                location: "Lisbon".to_string(),
            },
        )
        .await
        .unwrap()
}

/// Remembers every upsert, optionally failing all of them
#[derive(Default)]
pub struct RecordingPresence {
    pub fail: bool,
    pub upserts: Mutex<Vec<PresenceUser>>,
}

impl RecordingPresence {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            upserts: Mutex::default(),
        })
    }
}

#[async_trait]
impl PresenceSync for RecordingPresence {
    async fn upsert_user(&self, user: &PresenceUser) -> Result<(), Error> {
        self.upserts.lock().unwrap().push(user.clone());

        if self.fail {
            return Err(Error::Unavailable("presence provider is down".to_string()));
        }

        Ok(())
    }

    fn issue_token(&self, user_uuid: Uuid) -> Result<String, Error> {
        Ok(format!("token-for-{user_uuid}"))
    }
}
