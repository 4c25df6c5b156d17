use async_trait::async_trait;
use diesel::{
    BoolExpressionMethods, Connection, ExpressionMethods, JoinOnDsl, OptionalExtension,
    PgTextExpressionMethods, QueryDsl, SelectableHelper, delete, insert_into,
    pg::Pg,
    result::{DatabaseErrorKind, Error as DieselError},
    update,
};
use diesel_async::{
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
    async_connection_wrapper::AsyncConnectionWrapper,
    pooled_connection::{AsyncDieselConnectionManager, deadpool::Pool},
    scoped_futures::ScopedFutureExt,
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use log::info;
use tokio::task;
use uuid::Uuid;

use crate::{
    config::Database,
    error::Error,
    objects::{
        Credentials, FriendRequest, FriendRequestBuilder, IncomingRequest, Me, MeBuilder,
        NewUser, OutgoingRequest, Profile, RequestStatus, User,
    },
    schema::{friend_requests, friends, users},
    utils::like_pattern,
};

use super::{Audience, Slice, Store, UserSearch};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

pub type Conn =
    deadpool::managed::Object<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
}

impl PgStore {
    /// Runs pending migrations and builds the connection pool
    pub async fn connect(database: &Database) -> Result<Self, Error> {
        Self::connect_url(database.url()).await
    }

    async fn connect_url(url: String) -> Result<Self, Error> {
        let migration_url = url.clone();
        task::spawn_blocking(move || -> Result<(), Error> {
            let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&migration_url)?;

            let applied = conn
                .run_pending_migrations(MIGRATIONS)
                .map_err(|error| Error::MigrationError(error.to_string()))?;

            for migration in applied {
                info!("applied migration {migration}");
            }

            Ok(())
        })
        .await??;

        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(url);
        let pool = Pool::builder(manager).build()?;

        Ok(Self { pool })
    }

    async fn load_friends(conn: &mut Conn, user_uuid: Uuid) -> Result<Vec<Uuid>, Error> {
        use friends::dsl;
        let friends: Vec<Uuid> = dsl::friends
            .filter(dsl::user_uuid.eq(user_uuid))
            .order(dsl::since.asc())
            .select(dsl::friend_uuid)
            .load(conn)
            .await?;

        Ok(friends)
    }

    async fn build_me(conn: &mut Conn, builder: MeBuilder) -> Result<Me, Error> {
        let friends = Self::load_friends(conn, builder.uuid).await?;

        Ok(builder.build(friends))
    }
}

async fn add_friend_edge(
    conn: &mut AsyncPgConnection,
    user_uuid: Uuid,
    friend_uuid: Uuid,
) -> Result<(), Error> {
    use friends::dsl;
    insert_into(friends::table)
        .values((dsl::user_uuid.eq(user_uuid), dsl::friend_uuid.eq(friend_uuid)))
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;

    Ok(())
}

fn user_search_query<'a>(search: &UserSearch<'a>) -> users::BoxedQuery<'a, Pg> {
    let friend_uuids = friends::table
        .filter(friends::user_uuid.eq(search.viewer))
        .select(friends::friend_uuid);

    let mut query = users::table.into_boxed();

    query = match search.audience {
        Audience::Candidates => query
            .filter(users::uuid.ne(search.viewer))
            .filter(users::uuid.ne_all(friend_uuids))
            .filter(users::onboarded.eq(true)),
        Audience::Friends => query.filter(users::uuid.eq_any(friend_uuids)),
    };

    if let Some(name) = search.name {
        query = query.filter(users::name.ilike(like_pattern(name)));
    }

    query
}

fn unique_violation_as_conflict(error: DieselError, message: &str) -> Error {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            Error::Conflict(message.to_string())
        }
        error => Error::from(error),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, user_uuid: Uuid) -> Result<Option<Me>, Error> {
        let mut conn = self.pool.get().await?;

        use users::dsl;
        let builder: Option<MeBuilder> = dsl::users
            .filter(dsl::uuid.eq(user_uuid))
            .select(MeBuilder::as_select())
            .get_result(&mut conn)
            .await
            .optional()?;

        match builder {
            Some(builder) => Ok(Some(Self::build_me(&mut conn, builder).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<Me>, Error> {
        let mut conn = self.pool.get().await?;

        use users::dsl;
        let builder: Option<MeBuilder> = dsl::users
            .filter(dsl::email.eq(email.trim().to_lowercase()))
            .select(MeBuilder::as_select())
            .get_result(&mut conn)
            .await
            .optional()?;

        match builder {
            Some(builder) => Ok(Some(Self::build_me(&mut conn, builder).await?)),
            None => Ok(None),
        }
    }

    async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, Error> {
        let mut conn = self.pool.get().await?;

        use users::dsl;
        let credentials = dsl::users
            .filter(dsl::email.eq(email.trim().to_lowercase()))
            .select(Credentials::as_select())
            .get_result(&mut conn)
            .await
            .optional()?;

        Ok(credentials)
    }

    async fn create_user(&self, new_user: NewUser) -> Result<Me, Error> {
        let mut conn = self.pool.get().await?;

        let builder: MeBuilder = insert_into(users::table)
            .values(&new_user)
            .returning(MeBuilder::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(|error| {
                unique_violation_as_conflict(
                    error,
                    "Email already exist, please use a different email",
                )
            })?;

        Ok(builder.build(Vec::new()))
    }

    async fn update_profile(&self, user_uuid: Uuid, profile: &Profile) -> Result<Me, Error> {
        let mut conn = self.pool.get().await?;

        use users::dsl;
        let builder: MeBuilder = update(users::table)
            .filter(dsl::uuid.eq(user_uuid))
            .set((profile, dsl::onboarded.eq(true)))
            .returning(MeBuilder::as_returning())
            .get_result(&mut conn)
            .await
            .optional()?
            .ok_or(Error::NotFound("User not found.".to_string()))?;

        Self::build_me(&mut conn, builder).await
    }

    async fn add_friend(&self, user_uuid: Uuid, friend_uuid: Uuid) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;

        add_friend_edge(&mut conn, user_uuid, friend_uuid).await
    }

    async fn search_users(&self, search: &UserSearch<'_>) -> Result<Slice<User>, Error> {
        let mut conn = self.pool.get().await?;

        let total: i64 = user_search_query(search)
            .count()
            .get_result(&mut conn)
            .await?;

        let items: Vec<User> = user_search_query(search)
            .order(users::uuid.asc())
            .offset(search.offset)
            .limit(search.limit)
            .select(User::as_select())
            .load(&mut conn)
            .await?;

        Ok(Slice { items, total })
    }

    async fn find_request(&self, request_uuid: Uuid) -> Result<Option<FriendRequest>, Error> {
        let mut conn = self.pool.get().await?;

        use friend_requests::dsl;
        let builder: Option<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::uuid.eq(request_uuid))
            .select(FriendRequestBuilder::as_select())
            .get_result(&mut conn)
            .await
            .optional()?;

        builder.map(FriendRequestBuilder::build).transpose()
    }

    async fn find_pending_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<FriendRequest>, Error> {
        let mut conn = self.pool.get().await?;

        use friend_requests::dsl;
        let builder: Option<FriendRequestBuilder> = dsl::friend_requests
            .filter(dsl::status.eq(RequestStatus::Pending.as_str()))
            .filter(
                (dsl::sender.eq(user_a).and(dsl::recipient.eq(user_b)))
                    .or(dsl::sender.eq(user_b).and(dsl::recipient.eq(user_a))),
            )
            .select(FriendRequestBuilder::as_select())
            .first(&mut conn)
            .await
            .optional()?;

        builder.map(FriendRequestBuilder::build).transpose()
    }

    async fn insert_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;

        insert_into(friend_requests::table)
            .values(FriendRequestBuilder::from(request))
            .execute(&mut conn)
            .await
            .map_err(|error| unique_violation_as_conflict(error, "Friend request already exists."))?;

        Ok(())
    }

    async fn delete_request(&self, request_uuid: Uuid) -> Result<bool, Error> {
        let mut conn = self.pool.get().await?;

        use friend_requests::dsl;
        let deleted = delete(friend_requests::table)
            .filter(dsl::uuid.eq(request_uuid))
            .execute(&mut conn)
            .await?;

        Ok(deleted > 0)
    }

    async fn complete_request(&self, request: &FriendRequest) -> Result<(), Error> {
        let mut conn = self.pool.get().await?;

        let (request_uuid, sender, recipient) = (request.uuid, request.sender, request.recipient);

        conn.transaction::<_, Error, _>(|conn| {
            async move {
                add_friend_edge(conn, sender, recipient).await?;
                add_friend_edge(conn, recipient, sender).await?;

                use friend_requests::dsl;
                let deleted = delete(friend_requests::table)
                    .filter(dsl::uuid.eq(request_uuid))
                    .execute(conn)
                    .await?;

                // Someone else resolved it first, roll the edges back
                if deleted == 0 {
                    return Err(Error::NotFound("Friend request not found.".to_string()));
                }

                Ok(())
            }
            .scope_boxed()
        })
        .await
    }

    async fn incoming_requests(
        &self,
        recipient: Uuid,
        sender_name: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<Slice<IncomingRequest>, Error> {
        let mut conn = self.pool.get().await?;

        let pattern = sender_name.map(like_pattern);

        let mut count_query = friend_requests::table
            .inner_join(users::table.on(users::uuid.eq(friend_requests::sender)))
            .filter(friend_requests::recipient.eq(recipient))
            .filter(friend_requests::status.eq(RequestStatus::Pending.as_str()))
            .into_boxed();

        if let Some(pattern) = &pattern {
            count_query = count_query.filter(users::name.ilike(pattern.clone()));
        }

        let total: i64 = count_query.count().get_result(&mut conn).await?;

        let mut page_query = friend_requests::table
            .inner_join(users::table.on(users::uuid.eq(friend_requests::sender)))
            .filter(friend_requests::recipient.eq(recipient))
            .filter(friend_requests::status.eq(RequestStatus::Pending.as_str()))
            .select((FriendRequestBuilder::as_select(), User::as_select()))
            .into_boxed();

        if let Some(pattern) = pattern {
            page_query = page_query.filter(users::name.ilike(pattern));
        }

        let rows: Vec<(FriendRequestBuilder, User)> = page_query
            .order((friend_requests::created_at.desc(), friend_requests::uuid.desc()))
            .offset(offset)
            .limit(limit)
            .load(&mut conn)
            .await?;

        let items = rows
            .into_iter()
            .map(|(request, sender)| Ok(IncomingRequest::new(request.build()?, sender)))
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Slice { items, total })
    }

    async fn outgoing_requests(&self, sender: Uuid) -> Result<Vec<OutgoingRequest>, Error> {
        let mut conn = self.pool.get().await?;

        let rows: Vec<(FriendRequestBuilder, User)> = friend_requests::table
            .inner_join(users::table.on(users::uuid.eq(friend_requests::recipient)))
            .filter(friend_requests::sender.eq(sender))
            .filter(friend_requests::status.eq(RequestStatus::Pending.as_str()))
            .order(friend_requests::created_at.asc())
            .select((FriendRequestBuilder::as_select(), User::as_select()))
            .load(&mut conn)
            .await?;

        rows.into_iter()
            .map(|(request, recipient)| Ok(OutgoingRequest::new(request.build()?, recipient)))
            .collect()
    }

    async fn count_incoming(&self, recipient: Uuid) -> Result<i64, Error> {
        let mut conn = self.pool.get().await?;

        use friend_requests::dsl;
        let count: i64 = dsl::friend_requests
            .filter(dsl::recipient.eq(recipient))
            .filter(dsl::status.eq(RequestStatus::Pending.as_str()))
            .count()
            .get_result(&mut conn)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::{
        objects::{PageQuery, User},
        testing::{onboarded_user, user},
    };

    async fn store() -> PgStore {
        let url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        PgStore::connect_url(url).await.unwrap()
    }

    /// Names carry a per-test tag so runs against a shared database don't see each other
    fn tag() -> String {
        Uuid::now_v7().simple().to_string()
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn pending_pairs_conflict_in_both_directions() {
        let store = store().await;
        let ana = user(&store, "Ana").await;
        let ben = user(&store, "Ben").await;

        FriendRequest::send(&store, ana.uuid, ben.uuid).await.unwrap();

        let again = FriendRequest::send(&store, ben.uuid, ana.uuid).await;
        assert!(matches!(again, Err(Error::Conflict(_))));

        // Skips the pre-check, so only the unique pair index stands in the way
        for request in [
            FriendRequest::new(ana.uuid, ben.uuid),
            FriendRequest::new(ben.uuid, ana.uuid),
        ] {
            let result = store.insert_request(&request).await;
            assert!(matches!(result, Err(Error::Conflict(_))));
        }

        assert_eq!(store.count_incoming(ben.uuid).await.unwrap(), 1);
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn accept_links_both_users_once() {
        let store = store().await;
        let ana = user(&store, "Ana").await;
        let ben = user(&store, "Ben").await;

        let request = FriendRequest::send(&store, ana.uuid, ben.uuid).await.unwrap();
        FriendRequest::accept(&store, request.uuid, ben.uuid).await.unwrap();

        assert_eq!(store.find_request(request.uuid).await.unwrap(), None);
        assert_eq!(Me::get(&store, ana.uuid).await.unwrap().friends, vec![ben.uuid]);
        assert_eq!(Me::get(&store, ben.uuid).await.unwrap().friends, vec![ana.uuid]);

        // The request row is gone, so the transaction rolls back
        let repeat = store.complete_request(&request).await;
        assert!(matches!(repeat, Err(Error::NotFound(_))));
        assert_eq!(Me::get(&store, ana.uuid).await.unwrap().friends, vec![ben.uuid]);
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn completing_a_missing_request_adds_no_friends() {
        let store = store().await;
        let ana = user(&store, "Ana").await;
        let ben = user(&store, "Ben").await;

        let result = store
            .complete_request(&FriendRequest::new(ana.uuid, ben.uuid))
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(Me::get(&store, ana.uuid).await.unwrap().friends.is_empty());
        assert!(Me::get(&store, ben.uuid).await.unwrap().friends.is_empty());
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn decline_deletes_the_request() {
        let store = store().await;
        let ana = user(&store, "Ana").await;
        let ben = user(&store, "Ben").await;

        let request = FriendRequest::send(&store, ana.uuid, ben.uuid).await.unwrap();
        FriendRequest::decline(&store, request.uuid, ben.uuid).await.unwrap();

        assert_eq!(store.find_request(request.uuid).await.unwrap(), None);
        assert!(Me::get(&store, ben.uuid).await.unwrap().friends.is_empty());

        FriendRequest::send(&store, ana.uuid, ben.uuid).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn incoming_search_filters_before_paginating() {
        let store = store().await;
        let tag = tag();
        let recipient = user(&store, "Recipient").await;

        for name in ["Ana", "Anabel", "Ben", "Chidi"] {
            let sender = user(&store, &format!("{name} {tag}")).await;
            FriendRequest::send(&store, sender.uuid, recipient.uuid)
                .await
                .unwrap();
        }

        let all = FriendRequest::incoming(&store, recipient.uuid, &PageQuery::default())
            .await
            .unwrap();
        assert_eq!(all.total_request, 4);
        assert_eq!(
            all.incoming_requests[0].sender.name,
            format!("Chidi {tag}")
        );

        let matching = FriendRequest::incoming(
            &store,
            recipient.uuid,
            &PageQuery::new(Some(1), Some("ANA")),
        )
        .await
        .unwrap();
        assert_eq!(matching.total_request, 2);
        assert!(
            matching
                .incoming_requests
                .iter()
                .all(|request| request.sender.name.starts_with("Ana"))
        );

        let wildcard = FriendRequest::incoming(
            &store,
            recipient.uuid,
            &PageQuery::new(Some(1), Some("%")),
        )
        .await
        .unwrap();
        assert_eq!(wildcard.total_request, 0);
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL server in DATABASE_URL"]
    async fn recommendations_exclude_self_friends_and_unonboarded_users() {
        let store = store().await;
        let tag = tag();

        let viewer = onboarded_user(&store, &format!("Viewer {tag}")).await;
        let friend = onboarded_user(&store, &format!("Friend {tag}")).await;
        let stranger = onboarded_user(&store, &format!("Stranger {tag}")).await;
        user(&store, &format!("Newcomer {tag}")).await;

        let request = FriendRequest::send(&store, viewer.uuid, friend.uuid)
            .await
            .unwrap();
        FriendRequest::accept(&store, request.uuid, friend.uuid)
            .await
            .unwrap();

        let query = PageQuery::new(Some(1), Some(tag.as_str()));

        let recommended = User::fetch_recommended(&store, viewer.uuid, &query)
            .await
            .unwrap();
        assert_eq!(recommended.pagination.total.count(), 1);
        assert_eq!(
            recommended.data.iter().map(|user| user.uuid).collect::<Vec<_>>(),
            vec![stranger.uuid]
        );

        let friends = User::fetch_friends(&store, viewer.uuid, &query).await.unwrap();
        assert_eq!(
            friends.data.iter().map(|user| user.uuid).collect::<Vec<_>>(),
            vec![friend.uuid]
        );
    }
}
