use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::Error,
    objects::{
        Credentials, FriendRequest, IncomingRequest, Me, NewUser, OutgoingRequest, Profile,
        RequestStatus, User,
    },
};

use super::{Audience, Slice, Store, UserSearch};

/// Process local store, every operation runs under a single lock so each one is atomic
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, Row>,
    friend_requests: BTreeMap<Uuid, FriendRequest>,
}

struct Row {
    me: Me,
    password: String,
}

fn name_matches(name: &str, search: Option<&str>) -> bool {
    match search {
        Some(search) => name.to_lowercase().contains(&search.to_lowercase()),
        None => true,
    }
}

fn paginate<T>(items: Vec<T>, offset: i64, limit: i64) -> Slice<T> {
    let total = items.len() as i64;

    let items = items
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();

    Slice { items, total }
}

impl Tables {
    fn public_user(&self, user_uuid: Uuid) -> Result<User, Error> {
        self.users
            .get(&user_uuid)
            .map(|row| User::from(&row.me))
            .ok_or(Error::NotFound("User not found.".to_string()))
    }

    fn add_friend(&mut self, user_uuid: Uuid, friend_uuid: Uuid) -> Result<(), Error> {
        if !self.users.contains_key(&friend_uuid) {
            return Err(Error::NotFound("User not found.".to_string()));
        }

        let row = self
            .users
            .get_mut(&user_uuid)
            .ok_or(Error::NotFound("User not found.".to_string()))?;

        if !row.me.friends.contains(&friend_uuid) {
            row.me.friends.push(friend_uuid);
        }

        Ok(())
    }

    fn pending_between(&self, user_a: Uuid, user_b: Uuid) -> Option<&FriendRequest> {
        self.friend_requests.values().find(|request| {
            request.status == RequestStatus::Pending
                && ((request.sender == user_a && request.recipient == user_b)
                    || (request.sender == user_b && request.recipient == user_a))
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, user_uuid: Uuid) -> Result<Option<Me>, Error> {
        let tables = self.tables.read().await;

        Ok(tables.users.get(&user_uuid).map(|row| row.me.clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Me>, Error> {
        let email = email.trim().to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables
            .users
            .values()
            .find(|row| row.me.email == email)
            .map(|row| row.me.clone()))
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, Error> {
        let email = email.trim().to_lowercase();
        let tables = self.tables.read().await;

        Ok(tables
            .users
            .values()
            .find(|row| row.me.email == email)
            .map(|row| Credentials {
                uuid: row.me.uuid,
                password: row.password.clone(),
            }))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<Me, Error> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .values()
            .any(|row| row.me.email == new_user.email)
        {
            return Err(Error::Conflict(
                "Email already exist, please use a different email".to_string(),
            ));
        }

        let me = Me {
            uuid: new_user.uuid,
            name: new_user.name,
            email: new_user.email,
            profile_picture: new_user.profile_picture,
            bio: String::new(),
            native_language: String::new(),
            learning_language: String::new(),
            location: String::new(),
            onboarded: false,
            created_at: Utc::now(),
            friends: Vec::new(),
        };

        tables.users.insert(
            me.uuid,
            Row {
                me: me.clone(),
                password: new_user.password,
            },
        );

        Ok(me)
    }

    async fn update_profile(&self, user_uuid: Uuid, profile: &Profile) -> Result<Me, Error> {
        let mut tables = self.tables.write().await;

        let row = tables
            .users
            .get_mut(&user_uuid)
            .ok_or(Error::NotFound("User not found.".to_string()))?;

        row.me.name = profile.name.clone();
        row.me.bio = profile.bio.clone();
        row.me.native_language = profile.native_language.clone();
        row.me.learning_language = profile.learning_language.clone();
        row.me.location = profile.location.clone();
        row.me.onboarded = true;

        Ok(row.me.clone())
    }

    async fn add_friend(&self, user_uuid: Uuid, friend_uuid: Uuid) -> Result<(), Error> {
        self.tables.write().await.add_friend(user_uuid, friend_uuid)
    }

    async fn search_users(&self, search: &UserSearch<'_>) -> Result<Slice<User>, Error> {
        let tables = self.tables.read().await;

        let viewer_friends = tables
            .users
            .get(&search.viewer)
            .map(|row| row.me.friends.clone())
            .unwrap_or_default();

        // BTreeMap iteration keeps the uuid order
        let matching: Vec<User> = tables
            .users
            .values()
            .filter(|row| match search.audience {
                Audience::Candidates => {
                    row.me.uuid != search.viewer
                        && !viewer_friends.contains(&row.me.uuid)
                        && row.me.onboarded
                }
                Audience::Friends => viewer_friends.contains(&row.me.uuid),
            })
            .filter(|row| name_matches(&row.me.name, search.name))
            .map(|row| User::from(&row.me))
            .collect();

        Ok(paginate(matching, search.offset, search.limit))
    }

    async fn find_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error> {
        let tables = self.tables.read().await;

        Ok(tables.friend_requests.get(&request_uuid).cloned())
    }

    async fn find_pending_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<FriendRequest>, Error> {
        let tables = self.tables.read().await;

        Ok(tables.pending_between(user_a, user_b).cloned())
    }

    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        if request.status == RequestStatus::Pending
            && tables
                .pending_between(request.sender, request.recipient)
                .is_some()
        {
            return Err(Error::Conflict("Friend request already exists.".to_string()));
        }

        tables
            .friend_requests
            .insert(request.uuid, request.clone());

        Ok(())
    }

    async fn delete_request(&self, request_uuid: Uuid) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;

        Ok(tables.friend_requests.remove(&request_uuid).is_some())
    }

    async fn complete_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut tables = self.tables.write().await;

        if !tables.friend_requests.contains_key(&request.uuid) {
            return Err(Error::NotFound("Friend request not found.".to_string()));
        }

        tables.add_friend(request.sender, request.recipient)?;
        tables.add_friend(request.recipient, request.sender)?;
        tables.friend_requests.remove(&request.uuid);

        Ok(())
    }

    async fn incoming_requests(
        &self,
        recipient: Uuid,
        sender_name: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Slice<IncomingRequest>, Error> {
        let tables = self.tables.read().await;

        let mut joined = Vec::new();

        for request in tables.friend_requests.values() {
            if request.recipient != recipient || request.status != RequestStatus::Pending {
                continue;
            }

            let sender = tables.public_user(request.sender)?;

            if name_matches(&sender.name, sender_name) {
                joined.push(IncomingRequest::new(request.clone(), sender));
            }
        }

        joined.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.uuid.cmp(&a.uuid))
        });

        Ok(paginate(joined, offset, limit))
    }

    async fn outgoing_requests(&self, sender: Uuid) -> Result<Vec<OutgoingRequest>, Error> {
        let tables = self.tables.read().await;

        tables
            .friend_requests
            .values()
            .filter(|request| request.sender == sender && request.status == RequestStatus::Pending)
            .map(|request| {
                Ok(OutgoingRequest::new(
                    request.clone(),
                    tables.public_user(request.recipient)?,
                ))
            })
            .collect()
    }

    async fn count_incoming(&self, recipient: Uuid) -> Result<i64, Error> {
        let tables = self.tables.read().await;

        Ok(tables
            .friend_requests
            .values()
            .filter(|request| {
                request.recipient == recipient && request.status == RequestStatus::Pending
            })
            .count() as i64)
    }
}
