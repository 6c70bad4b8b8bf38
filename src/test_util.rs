use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;

use crate::app_state::AppState;
use crate::config::{Config, CreatedAtPolicy, UpdatePolicy};
use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskChanges, UpdateOutcome, User};
use crate::task_store::TaskStore;
use crate::user_directory::UserDirectory;

pub fn test_config() -> Config {
    Config {
        mongo_uri: "mongodb://localhost:27017".to_string(),
        database_name: "Task-manager-test".to_string(),
        jwt_secret: "test-secret".to_string(),
        port: 0,
        allowed_origins: vec!["http://localhost:5173".to_string()],
        production: false,
        session_ttl_hours: 10,
        update_policy: UpdatePolicy::Upsert,
        created_at_policy: CreatedAtPolicy::Preserve,
    }
}

pub fn test_state() -> AppState {
    AppState::new(
        test_config(),
        Arc::new(MemoryTaskStore::default()),
        Arc::new(MemoryUserDirectory::default()),
    )
}

/// Task store kept in insertion order.
#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn backdate(&self, id: ObjectId, by: chrono::Duration) {
        let mut tasks = self.tasks.lock().unwrap();
        if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
            task.created_at = task.created_at.map(|at| at - by);
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: NewTask) -> Result<ObjectId, StoreError> {
        let id = ObjectId::new();
        self.tasks.lock().unwrap().push(Task {
            id,
            created_at: Some(task.created_at),
            fields: task.fields,
        });
        Ok(id)
    }

    async fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn find_by_id(&self, id: ObjectId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn update(&self, id: ObjectId, changes: &TaskChanges, upsert: bool) -> Result<UpdateOutcome, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                let before = task.clone();
                for (key, value) in &changes.fields {
                    task.fields.insert(key.clone(), value.clone());
                }
                if changes.reset_created_at {
                    task.created_at = Some(changes.now);
                }
                Ok(UpdateOutcome {
                    matched_count: 1,
                    modified_count: u64::from(*task != before),
                    upserted_id: None,
                })
            }
            None if upsert => {
                tasks.push(Task {
                    id,
                    created_at: Some(changes.now),
                    fields: changes.fields.clone(),
                });
                Ok(UpdateOutcome { matched_count: 0, modified_count: 0, upserted_id: Some(id) })
            }
            None => Ok(UpdateOutcome::default()),
        }
    }

    async fn delete(&self, id: ObjectId) -> Result<u64, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok((before - tasks.len()) as u64)
    }
}

/// User directory keyed by email. Lookups can be hidden to simulate losing a
/// first-login race.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<Vec<User>>,
    hidden_lookups: AtomicUsize,
}

impl MemoryUserDirectory {
    pub fn count(&self) -> usize {
        self.users.lock().unwrap().len()
    }

    /// The next `count` lookups report no record.
    pub fn hide_lookups(&self, count: usize) {
        self.hidden_lookups.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let hidden = self.hidden_lookups.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if hidden.is_ok() {
            return Ok(None);
        }
        Ok(self.users.lock().unwrap().iter().find(|u| u.email == email).cloned())
    }

    async fn insert_if_absent(&self, user: &User) -> Result<bool, StoreError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.email == user.email) {
            return Ok(false);
        }
        users.push(user.clone());
        Ok(true)
    }
}

/// Fails every storage call.
pub struct BrokenStore;

fn unavailable() -> StoreError {
    StoreError::Malformed("store unavailable".to_string())
}

#[async_trait]
impl TaskStore for BrokenStore {
    async fn insert(&self, _task: NewTask) -> Result<ObjectId, StoreError> {
        Err(unavailable())
    }

    async fn find_all(&self) -> Result<Vec<Task>, StoreError> {
        Err(unavailable())
    }

    async fn find_by_id(&self, _id: ObjectId) -> Result<Option<Task>, StoreError> {
        Err(unavailable())
    }

    async fn update(&self, _id: ObjectId, _changes: &TaskChanges, _upsert: bool) -> Result<UpdateOutcome, StoreError> {
        Err(unavailable())
    }

    async fn delete(&self, _id: ObjectId) -> Result<u64, StoreError> {
        Err(unavailable())
    }
}

#[async_trait]
impl UserDirectory for BrokenStore {
    async fn find_by_email(&self, _email: &str) -> Result<Option<User>, StoreError> {
        Err(unavailable())
    }

    async fn insert_if_absent(&self, _user: &User) -> Result<bool, StoreError> {
        Err(unavailable())
    }
}
