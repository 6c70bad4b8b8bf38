use chrono::{DateTime, Utc};
use log::info;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};

use crate::error::StoreError;

pub const USERS: &str = "users";
pub const TASKS: &str = "tasks";

const DUPLICATE_KEY: i32 = 11000;

pub struct MongoDB {
    pub client: Client,
    pub db: Database,
}

impl MongoDB {
    /// Connects and pings the deployment so a bad URI fails at startup.
    pub async fn init(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(MongoDB { client, db })
    }

    /// At most one user per email.
    pub async fn ensure_indexes(&self) -> Result<(), StoreError> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.db.collection::<Document>(USERS).create_index(unique_email).await?;
        Ok(())
    }

    pub async fn shutdown(self) {
        self.client.shutdown().await;
        info!("MongoDB client closed");
    }
}

pub fn to_bson_datetime(at: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(at.timestamp_millis())
}

pub fn from_bson_datetime(at: BsonDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(at.timestamp_millis())
}

pub fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == DUPLICATE_KEY,
        ErrorKind::Command(command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}
