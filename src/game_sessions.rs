use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::store::{KvStore, keys};

/// A running table-top game, shown on the admin screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// Dungeon master's name.
    #[serde(default)]
    pub dm: String,
    #[serde(default)]
    pub players: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct GameSessionStore {
    kv: KvStore,
    write_lock: Arc<Mutex<()>>,
}

impl GameSessionStore {
    pub fn new(kv: KvStore) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list(&self) -> Result<Vec<GameSession>, AppError> {
        self.kv.get_list(keys::ACTIVE_SESSIONS).await
    }

    pub async fn count(&self) -> Result<usize, AppError> {
        Ok(self.list().await?.len())
    }

    /// Writes the demo sessions, but only if the key has never been written.
    /// An emptied list stays empty.
    #[instrument(skip(self))]
    pub async fn seed_if_absent(&self) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        if self.kv.contains(keys::ACTIVE_SESSIONS).await? {
            return Ok(false);
        }

        let now = Utc::now();
        let seed = vec![
            GameSession {
                id: 1,
                name: "Поход в Подгорье".to_string(),
                dm: "Гэндальф".to_string(),
                players: 4,
                created_at: now,
            },
            GameSession {
                id: 2,
                name: "Осада Драконьей горы".to_string(),
                dm: "Эльминстер".to_string(),
                players: 3,
                created_at: now - Duration::days(1),
            },
        ];

        self.kv.set(keys::ACTIVE_SESSIONS, &seed).await?;
        info!(count = seed.len(), "Seeded game sessions");
        Ok(true)
    }

    /// Ends (removes) a session. Returns false when no session had that id.
    #[instrument(skip(self))]
    pub async fn end(&self, id: i64) -> Result<bool, AppError> {
        let _guard = self.write_lock.lock().await;
        let mut sessions = self.list().await?;
        let before = sessions.len();
        sessions.retain(|session| session.id != id);

        if sessions.len() == before {
            return Ok(false);
        }

        self.kv.set(keys::ACTIVE_SESSIONS, &sessions).await?;
        info!("Game session ended");
        Ok(true)
    }
}
