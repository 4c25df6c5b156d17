use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::Error, schema::friend_requests, store::Store};

use super::{PAGE_LIMIT, PageQuery, User};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            other => Err(Error::InvalidState(format!(
                "Unknown friend request status: {other}"
            ))),
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug)]
#[diesel(table_name = friend_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FriendRequestBuilder {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequestBuilder {
    pub fn build(self) -> Result<FriendRequest, Error> {
        Ok(FriendRequest {
            uuid: self.uuid,
            sender: self.sender,
            recipient: self.recipient,
            status: self.status.parse()?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl From<&FriendRequest> for FriendRequestBuilder {
    fn from(request: &FriendRequest) -> Self {
        Self {
            uuid: request.uuid,
            sender: request.sender,
            recipient: request.recipient,
            status: request.status.to_string(),
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub recipient: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    pub uuid: Uuid,
    pub sender: User,
    pub recipient: Uuid,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl IncomingRequest {
    pub fn new(request: FriendRequest, sender: User) -> Self {
        Self {
            uuid: request.uuid,
            sender,
            recipient: request.recipient,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingRequest {
    pub uuid: Uuid,
    pub sender: Uuid,
    pub recipient: User,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutgoingRequest {
    pub fn new(request: FriendRequest, recipient: User) -> Self {
        Self {
            uuid: request.uuid,
            sender: request.sender,
            recipient,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequests {
    pub incoming_requests: Vec<IncomingRequest>,
    pub total_request: i64,
}

impl FriendRequest {
    pub fn new(sender: Uuid, recipient: Uuid) -> Self {
        let now = Utc::now();

        Self {
            uuid: Uuid::now_v7(),
            sender,
            recipient,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn send(
        store: &dyn Store,
        sender_uuid: Uuid,
        recipient_uuid: Uuid,
    ) -> Result<Self, Error> {
        if sender_uuid == recipient_uuid {
            return Err(Error::InvalidOperation(
                "You cannot send a friend request to yourself.".to_string(),
            ));
        }

        let recipient = store
            .find_user(recipient_uuid)
            .await?
            .ok_or(Error::NotFound("Recipient not found.".to_string()))?;

        if recipient.is_friends_with(sender_uuid) {
            return Err(Error::Conflict(
                "You are already friends with this user.".to_string(),
            ));
        }

        if store
            .find_pending_between(sender_uuid, recipient_uuid)
            .await?
            .is_some()
        {
            return Err(Error::Conflict("Friend request already exists.".to_string()));
        }

        let request = Self::new(sender_uuid, recipient_uuid);

        store.insert_request(&request).await?;

        debug!(
            "friend request {} sent from {} to {}",
            request.uuid, sender_uuid, recipient_uuid
        );

        Ok(request)
    }

    /// Fetches a request that `acting_uuid` is allowed to accept or decline
    async fn fetch_resolvable(
        store: &dyn Store,
        request_uuid: Uuid,
        acting_uuid: Uuid,
    ) -> Result<Self, Error> {
        let request = store
            .find_request(request_uuid)
            .await?
            .ok_or(Error::NotFound("Friend request not found.".to_string()))?;

        if request.status != RequestStatus::Pending {
            return Err(Error::InvalidState(
                "Friend request is not pending.".to_string(),
            ));
        }

        if request.recipient != acting_uuid {
            return Err(Error::Forbidden(
                "You are not authorized to respond to this friend request.".to_string(),
            ));
        }

        Ok(request)
    }

    /// Links both users as friends and removes the request.
    ///
    /// A second accept of the same request fails with [`Error::NotFound`], callers
    /// retrying after a partial failure can treat that as success when both users
    /// already list each other as friends.
    pub async fn accept(
        store: &dyn Store,
        request_uuid: Uuid,
        acting_uuid: Uuid,
    ) -> Result<Self, Error> {
        let request = Self::fetch_resolvable(store, request_uuid, acting_uuid).await?;

        store.complete_request(&request).await?;

        debug!(
            "friend request {} accepted, {} and {} are now friends",
            request.uuid, request.sender, request.recipient
        );

        Ok(Self {
            status: RequestStatus::Accepted,
            updated_at: Utc::now(),
            ..request
        })
    }

    /// Declined requests are deleted, no history of them is kept
    pub async fn decline(
        store: &dyn Store,
        request_uuid: Uuid,
        acting_uuid: Uuid,
    ) -> Result<(), Error> {
        let request = Self::fetch_resolvable(store, request_uuid, acting_uuid).await?;

        if !store.delete_request(request.uuid).await? {
            return Err(Error::NotFound("Friend request not found.".to_string()));
        }

        debug!("friend request {} declined", request.uuid);

        Ok(())
    }

    pub async fn incoming(
        store: &dyn Store,
        recipient: Uuid,
        query: &PageQuery,
    ) -> Result<IncomingRequests, Error> {
        let slice = store
            .incoming_requests(recipient, query.search(), query.offset(), PAGE_LIMIT)
            .await?;

        Ok(IncomingRequests {
            incoming_requests: slice.items,
            total_request: slice.total,
        })
    }

    // NOTE: Unpaginated, unlike the incoming listing
    pub async fn outgoing(store: &dyn Store, sender: Uuid) -> Result<Vec<OutgoingRequest>, Error> {
        store.outgoing_requests(sender).await
    }

    pub async fn count_incoming(store: &dyn Store, recipient: Uuid) -> Result<i64, Error> {
        store.count_incoming(recipient).await
    }
}
