use common::model::user::Session;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Logged-in sessions keyed by token, shared across request handlers.
#[derive(Clone, Default)]
pub struct SessionState {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionState {
    pub async fn insert(&self, session: Session) {
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions.read().await.get(token).cloned()
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }

    /// Ends every session of `user_id`, returning how many there were. Used
    /// whenever an account or its grants change, so that the next request
    /// has to log in again and picks up the new permissions.
    pub async fn remove_user(&self, user_id: i64) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        before - sessions.len()
    }
}
