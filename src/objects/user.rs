use diesel::{Queryable, Selectable};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error,
    schema::users,
    store::{Audience, Store, UserSearch},
};

use super::{Me, PAGE_LIMIT, PageQuery, Paged, Pagination, Total};

/// Public profile, what other users get to see
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uuid: Uuid,
    pub name: String,
    pub profile_picture: String,
    pub native_language: String,
    pub learning_language: String,
}

impl From<&Me> for User {
    fn from(me: &Me) -> Self {
        Self {
            uuid: me.uuid,
            name: me.name.clone(),
            profile_picture: me.profile_picture.clone(),
            native_language: me.native_language.clone(),
            learning_language: me.learning_language.clone(),
        }
    }
}

impl User {
    /// Onboarded users that `viewer` could befriend, ordered by registration
    pub async fn fetch_recommended(
        store: &dyn Store,
        viewer: Uuid,
        query: &PageQuery,
    ) -> Result<Paged<Self>, Error> {
        let slice = store
            .search_users(&UserSearch {
                viewer,
                audience: Audience::Candidates,
                name: query.search(),
                offset: query.offset(),
                limit: PAGE_LIMIT,
            })
            .await?;

        Ok(Paged::new(
            slice.items,
            Pagination::new(query.page(), Total::TotalUsers(slice.total)),
        ))
    }

    pub async fn fetch_friends(
        store: &dyn Store,
        viewer: Uuid,
        query: &PageQuery,
    ) -> Result<Paged<Self>, Error> {
        let slice = store
            .search_users(&UserSearch {
                viewer,
                audience: Audience::Friends,
                name: query.search(),
                offset: query.offset(),
                limit: PAGE_LIMIT,
            })
            .await?;

        Ok(Paged::new(
            slice.items,
            Pagination::new(query.page(), Total::TotalFriends(slice.total)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{
        objects::FriendRequest,
        store::MemoryStore,
        testing::{onboarded_user, user},
    };

    async fn befriend(store: &MemoryStore, a: Uuid, b: Uuid) {
        let request = FriendRequest::send(store, a, b).await.unwrap();
        FriendRequest::accept(store, request.uuid, b).await.unwrap();
    }

    #[tokio::test]
    async fn recommendations_exclude_self_friends_and_unonboarded_users() {
        let store = MemoryStore::default();
        let me = onboarded_user(&store, "Me").await;
        let friend = onboarded_user(&store, "Friend").await;
        let stranger = onboarded_user(&store, "Stranger").await;
        let newcomer = user(&store, "Newcomer").await;

        befriend(&store, me.uuid, friend.uuid).await;

        let page = User::fetch_recommended(&store, me.uuid, &PageQuery::default())
            .await
            .unwrap();

        let uuids: Vec<Uuid> = page.data.iter().map(|user| user.uuid).collect();
        assert_eq!(uuids, vec![stranger.uuid]);
        assert!(!uuids.contains(&newcomer.uuid));
        assert_eq!(page.pagination.total, Total::TotalUsers(1));
    }

    #[tokio::test]
    async fn recommendation_pages_cover_every_candidate_once() {
        let store = MemoryStore::default();
        let me = onboarded_user(&store, "Me").await;
        let mut friends = HashSet::new();

        for index in 0..23 {
            let other = onboarded_user(&store, &format!("Learner {index}")).await;
            if index % 5 == 0 {
                befriend(&store, other.uuid, me.uuid).await;
                friends.insert(other.uuid);
            }
        }

        let first = User::fetch_recommended(&store, me.uuid, &PageQuery::default())
            .await
            .unwrap();
        let total_users = first.pagination.total.count();
        assert_eq!(total_users, 23 - friends.len() as i64);
        assert_eq!(first.pagination.total_pages, 2);
        assert!(!first.pagination.has_prev_page);

        let mut seen = HashSet::new();
        let mut sum = 0;

        for page in 1..=first.pagination.total_pages {
            let result = User::fetch_recommended(&store, me.uuid, &PageQuery::new(Some(page), None))
                .await
                .unwrap();

            sum += result.data.len() as i64;

            for user in &result.data {
                assert_ne!(user.uuid, me.uuid);
                assert!(!friends.contains(&user.uuid));
                assert!(seen.insert(user.uuid), "duplicate across pages");
            }

            if page == result.pagination.total_pages {
                assert!(!result.pagination.has_next_page);
                assert_eq!(result.pagination.next_page, None);
            } else {
                assert_eq!(result.pagination.next_page, Some(page + 1));
            }
        }

        assert_eq!(sum, total_users);

        let beyond = User::fetch_recommended(&store, me.uuid, &PageQuery::new(Some(9), None))
            .await
            .unwrap();
        assert!(beyond.data.is_empty());
        assert!(!beyond.has_more);
    }

    #[tokio::test]
    async fn search_is_a_case_insensitive_substring() {
        let store = MemoryStore::default();
        let me = onboarded_user(&store, "Me").await;
        let maria = onboarded_user(&store, "Maria Lopez").await;
        let mario = onboarded_user(&store, "Super Mario").await;
        onboarded_user(&store, "Jonas").await;
        onboarded_user(&store, "100% Real").await;

        let page = User::fetch_recommended(&store, me.uuid, &PageQuery::new(None, Some("MAR")))
            .await
            .unwrap();
        let uuids: Vec<Uuid> = page.data.iter().map(|user| user.uuid).collect();
        assert_eq!(uuids, vec![maria.uuid, mario.uuid]);

        // no pattern semantics
        let page = User::fetch_recommended(&store, me.uuid, &PageQuery::new(None, Some("m.r")))
            .await
            .unwrap();
        assert!(page.data.is_empty());

        let page = User::fetch_recommended(&store, me.uuid, &PageQuery::new(None, Some("0%")))
            .await
            .unwrap();
        assert_eq!(page.data.len(), 1);
    }

    #[tokio::test]
    async fn search_without_matches_is_empty() {
        let store = MemoryStore::default();
        let me = onboarded_user(&store, "Me").await;
        onboarded_user(&store, "Ana").await;

        let page = User::fetch_recommended(&store, me.uuid, &PageQuery::new(None, Some("zzz")))
            .await
            .unwrap();

        assert!(page.data.is_empty());
        assert_eq!(page.pagination.total, Total::TotalUsers(0));
        assert_eq!(page.pagination.total_pages, 0);
        assert!(!page.pagination.has_next_page);
    }

    #[tokio::test]
    async fn friends_listing_is_scoped_to_friends() {
        let store = MemoryStore::default();
        let me = onboarded_user(&store, "Me").await;
        let ana = onboarded_user(&store, "Ana").await;
        let anabel = user(&store, "Anabel").await;
        onboarded_user(&store, "Anders").await;

        befriend(&store, me.uuid, ana.uuid).await;
        befriend(&store, anabel.uuid, me.uuid).await;

        let page = User::fetch_friends(&store, me.uuid, &PageQuery::default())
            .await
            .unwrap();
        let uuids: Vec<Uuid> = page.data.iter().map(|user| user.uuid).collect();
        assert_eq!(uuids, vec![ana.uuid, anabel.uuid]);
        assert_eq!(page.pagination.total, Total::TotalFriends(2));

        let page = User::fetch_friends(&store, me.uuid, &PageQuery::new(None, Some("bel")))
            .await
            .unwrap();
        assert_eq!(page.data, vec![User::from(&anabel)]);
    }
}
