pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskChanges, UpdateOutcome};
pub use user::{Identity, LoginRequest, User};
