//! Registration and profile edits.  The only writer of the users collection
//! besides seeding.

use linkheart_shared::constants::{
    DEFAULT_USER_AGE, DEFAULT_USER_BIO, DEFAULT_USER_LOCATION, DEFAULT_USER_NAME,
    DEFAULT_USER_PHOTO,
};
use linkheart_shared::{Gender, UserId};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::models::{NewUser, User};
use crate::store::{Batch, Store};

/// Look `id` up in an already loaded users collection.
pub(crate) fn find_user<'a>(users: &'a [User], id: &UserId) -> Result<&'a User> {
    users
        .iter()
        .find(|u| &u.id == id)
        .ok_or_else(|| StoreError::UserNotFound(id.clone()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl Store {
    pub fn create_user(&self, input: NewUser) -> Result<User> {
        let mut photos = input.photos;
        photos.retain(|p| !p.trim().is_empty());
        if photos.is_empty() {
            photos.push(DEFAULT_USER_PHOTO.to_string());
        }

        let user = User {
            id: UserId::generate(),
            name: non_blank(input.name).unwrap_or_else(|| DEFAULT_USER_NAME.to_string()),
            age: input.age.unwrap_or(DEFAULT_USER_AGE),
            gender: input.gender.unwrap_or(Gender::Male),
            location: non_blank(input.location)
                .unwrap_or_else(|| DEFAULT_USER_LOCATION.to_string()),
            bio: non_blank(input.bio).unwrap_or_else(|| DEFAULT_USER_BIO.to_string()),
            interests: input.interests,
            photos,
            is_admin: false,
        };

        self.write_txn(|store| {
            let mut users = store.snapshot::<User>()?;
            users.items.push(user.clone());
            let mut batch = Batch::new();
            batch.put(&users)?;
            store.commit(batch)
        })?;

        info!(user_id = %user.id, name = %user.name, "user registered");
        Ok(user)
    }

    /// Replace a profile.  The admin flag cannot be changed through an edit.
    pub fn update_user(&self, updated: User) -> Result<User> {
        let stored = self.write_txn(|store| {
            let mut users = store.snapshot::<User>()?;
            let slot = users
                .items
                .iter_mut()
                .find(|u| u.id == updated.id)
                .ok_or_else(|| StoreError::UserNotFound(updated.id.clone()))?;

            let is_admin = slot.is_admin;
            *slot = User {
                is_admin,
                ..updated.clone()
            };
            let stored = slot.clone();

            let mut batch = Batch::new();
            batch.put(&users)?;
            store.commit(batch)?;
            Ok(stored)
        })?;

        info!(user_id = %stored.id, "profile updated");
        Ok(stored)
    }

    pub fn get_user(&self, id: &UserId) -> Result<User> {
        let users = self.load::<User>()?;
        find_user(&users, id).cloned()
    }

    /// All users in registration order.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.load::<User>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::seeded;

    #[test]
    fn registration_fills_demo_defaults() {
        let (store, _clock) = seeded();
        let user = store.create_user(NewUser::default()).unwrap();

        assert!(user.id.as_str().starts_with("user_"));
        assert_eq!(user.name, DEFAULT_USER_NAME);
        assert_eq!(user.age, DEFAULT_USER_AGE);
        assert_eq!(user.bio, DEFAULT_USER_BIO);
        assert_eq!(user.primary_photo(), Some(DEFAULT_USER_PHOTO));
        assert!(!user.is_admin);

        let users = store.list_users().unwrap();
        assert_eq!(users.len(), 6);
        assert_eq!(users.last().unwrap(), &user);
    }

    #[test]
    fn registration_keeps_supplied_fields() {
        let (store, _clock) = seeded();
        let user = store
            .create_user(NewUser {
                name: Some("Sora".into()),
                age: Some(31),
                gender: Some(Gender::Female),
                interests: vec!["旅行".into(), "写真".into()],
                photos: vec!["p1".into(), "p2".into()],
                ..Default::default()
            })
            .unwrap();

        assert_eq!(user.name, "Sora");
        assert_eq!(user.age, 31);
        assert_eq!(user.gender, Gender::Female);
        assert_eq!(user.interests, vec!["旅行", "写真"]);
        assert_eq!(user.primary_photo(), Some("p1"));
    }

    #[test]
    fn update_replaces_profile_but_not_admin_flag() {
        let (store, _clock) = seeded();
        let mut kenji = store.get_user(&"user_1".into()).unwrap();
        kenji.bio = "Updated bio".into();
        kenji.is_admin = true;

        let stored = store.update_user(kenji).unwrap();
        assert_eq!(stored.bio, "Updated bio");
        assert!(!stored.is_admin);
        assert_eq!(store.get_user(&"user_1".into()).unwrap(), stored);
    }

    #[test]
    fn update_unknown_user_fails() {
        let (store, _clock) = seeded();
        let mut ghost = store.get_user(&"user_1".into()).unwrap();
        ghost.id = "ghost".into();

        let err = store.update_user(ghost).unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(id) if id.as_str() == "ghost"));
    }
}
