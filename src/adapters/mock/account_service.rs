use crate::domain::value_objects::UserId;
use crate::ports::{account_service::AccountService as AccountServiceTrait, lookup::Lookup};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock implementation of AccountService
///
/// Supports stateful testing by storing user IDs and email addresses.
/// Can be switched to answer `Unavailable` for every lookup.
pub struct AccountService {
    users: Mutex<HashMap<UserId, Option<String>>>,
    unavailable: Mutex<bool>,
}

impl AccountService {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
        }
    }

    /// Add a user without an email address
    pub fn add_user(&self, user_id: UserId) {
        self.users.lock().unwrap().entry(user_id).or_insert(None);
    }

    /// Add a user with an email address
    pub fn add_user_with_email(&self, user_id: UserId, email: impl Into<String>) {
        self.users
            .lock()
            .unwrap()
            .insert(user_id, Some(email.into()));
    }

    /// Simulate the account service being down
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    fn is_unavailable(&self) -> bool {
        *self.unavailable.lock().unwrap()
    }
}

impl Default for AccountService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountServiceTrait for AccountService {
    async fn find_user(&self, user_id: UserId) -> Lookup<()> {
        if self.is_unavailable() {
            return Lookup::Unavailable("mock account service is down".to_string());
        }
        if self.users.lock().unwrap().contains_key(&user_id) {
            Lookup::Found(())
        } else {
            Lookup::Missing
        }
    }

    async fn get_email(&self, user_id: UserId) -> Lookup<String> {
        if self.is_unavailable() {
            return Lookup::Unavailable("mock account service is down".to_string());
        }
        match self.users.lock().unwrap().get(&user_id) {
            Some(Some(email)) => Lookup::Found(email.clone()),
            _ => Lookup::Missing,
        }
    }
}
