use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Insertable, Queryable, Selectable};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::{error::Error, presence::PresenceUser, schema::users, store::Store};

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MeBuilder {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture: String,
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub onboarded: bool,
    pub created_at: DateTime<Utc>,
}

impl MeBuilder {
    pub fn build(self, friends: Vec<Uuid>) -> Me {
        Me {
            uuid: self.uuid,
            name: self.name,
            email: self.email,
            profile_picture: self.profile_picture,
            bio: self.bio,
            native_language: self.native_language,
            learning_language: self.learning_language,
            location: self.location,
            onboarded: self.onboarded,
            created_at: self.created_at,
            friends,
        }
    }
}

/// The full profile of the signed in user, never shown to anyone else
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Me {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub profile_picture: String,
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
    pub onboarded: bool,
    pub created_at: DateTime<Utc>,
    pub friends: Vec<Uuid>,
}

impl Me {
    pub async fn get(store: &dyn Store, user_uuid: Uuid) -> Result<Self, Error> {
        store
            .find_user(user_uuid)
            .await?
            .ok_or(Error::NotFound("User not found.".to_string()))
    }

    pub fn is_friends_with(&self, user_uuid: Uuid) -> bool {
        self.friends.contains(&user_uuid)
    }

    pub fn presence_user(&self) -> PresenceUser {
        PresenceUser {
            id: self.uuid.to_string(),
            name: self.name.clone(),
            image: self.profile_picture.clone(),
        }
    }
}

#[derive(Insertable, Clone, Debug)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub profile_picture: String,
}

impl NewUser {
    /// `password` must already be hashed
    pub fn new(name: &str, email: &str, password: String) -> Self {
        let avatar = rand::rng().random_range(1..=100);

        Self {
            uuid: Uuid::now_v7(),
            name: name.trim().to_string(),
            email: email.trim().to_lowercase(),
            password,
            profile_picture: format!("https://avatar.iran.liara.run/public/{avatar}"),
        }
    }
}

/// Fields set during onboarding
#[derive(AsChangeset, Clone, Debug, PartialEq)]
#[diesel(table_name = users)]
pub struct Profile {
    pub name: String,
    pub bio: String,
    pub native_language: String,
    pub learning_language: String,
    pub location: String,
}

#[derive(Queryable, Selectable, Clone, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Credentials {
    pub uuid: Uuid,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_normalized() {
        let user = NewUser::new("  Ana ", " Ana@Example.COM ", "hash".to_string());

        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@example.com");
        assert!(
            user.profile_picture
                .starts_with("https://avatar.iran.liara.run/public/")
        );

        let avatar: u32 = user
            .profile_picture
            .rsplit('/')
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!((1..=100).contains(&avatar));
    }

    #[test]
    fn password_is_not_serialized() {
        let me = MeBuilder {
            uuid: Uuid::now_v7(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            profile_picture: String::new(),
            bio: String::new(),
            native_language: String::new(),
            learning_language: String::new(),
            location: String::new(),
            onboarded: false,
            created_at: Utc::now(),
        }
        .build(vec![]);

        let json = serde_json::to_value(&me).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["onboarded"], false);
        assert_eq!(json["friends"], serde_json::json!([]));
    }
}
