//! Persistence for the user directory and the friend request ledger

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::Error,
    objects::{
        Credentials, FriendRequest, IncomingRequest, Me, NewUser, OutgoingRequest, Profile, User,
    },
};

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which users a search runs over, relative to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Onboarded users that are neither the viewer nor one of their friends
    Candidates,
    /// The viewer's friends
    Friends,
}

#[derive(Debug, Clone)]
pub struct UserSearch<'a> {
    pub viewer: Uuid,
    pub audience: Audience,
    /// Case-insensitive substring of the name
    pub name: Option<&'a str>,
    pub offset: i64,
    pub limit: i64,
}

/// Results of a paginated query along with the size of the whole filtered set
#[derive(Debug)]
pub struct Slice<T> {
    pub items: Vec<T>,
    pub total: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_user(&self, user_uuid: Uuid) -> Result<Option<Me>, Error>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Me>, Error>;

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, Error>;

    /// Fails with [`Error::Conflict`] when the email is taken
    async fn create_user(&self, new_user: NewUser) -> Result<Me, Error>;

    /// Sets the profile fields and marks the user as onboarded
    async fn update_profile(&self, user_uuid: Uuid, profile: &Profile) -> Result<Me, Error>;

    /// Set-union insert of `friend_uuid` into the friends of `user_uuid`
    async fn add_friend(&self, user_uuid: Uuid, friend_uuid: Uuid) -> Result<(), Error>;

    /// Results are ordered by uuid
    async fn search_users(&self, search: &UserSearch<'_>) -> Result<Slice<User>, Error>;

    async fn find_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error>;

    /// Pending request between the two users, in either direction
    async fn find_pending_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<FriendRequest>, Error>;

    /// Fails with [`Error::Conflict`] when a pending request already exists for the pair
    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error>;

    /// Returns false when there was nothing to delete
    async fn delete_request(&self, request_uuid: Uuid) -> Result<bool, Error>;

    /// Adds the recipient to the sender's friends, the sender to the recipient's friends
    /// and then deletes the request, in that order and as one unit.
    /// Fails with [`Error::NotFound`] if the request is gone by the time it is deleted.
    async fn complete_request(&self, request: &FriendRequest) -> Result<(), Error>;

    /// Pending requests sent to `recipient`, newest first, joined with the sender
    /// and filtered on the sender name before paginating
    async fn incoming_requests(
        &self,
        recipient: Uuid,
        sender_name: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Slice<IncomingRequest>, Error>;

    async fn outgoing_requests(&self, sender: Uuid) -> Result<Vec<OutgoingRequest>, Error>;

    async fn count_incoming(&self, recipient: Uuid) -> Result<i64, Error>;
}
