use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// The signed-in user stamped on every write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub uid: String,
    pub display_name: Option<String>,
}

impl Actor {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Identity trait exposing the current session
#[async_trait]
pub trait Identity: Send + Sync + 'static {
    /// The signed-in actor, `None` when signed out
    async fn current_user(&self) -> Option<Actor>;

    /// Whether the session is still being restored
    async fn is_loading(&self) -> bool;
}

#[async_trait]
impl<T: Identity + ?Sized> Identity for Arc<T> {
    async fn current_user(&self) -> Option<Actor> {
        (**self).current_user().await
    }

    async fn is_loading(&self) -> bool {
        (**self).is_loading().await
    }
}

/// An identity whose session is set explicitly, from configuration or by tests
pub struct StaticIdentity {
    user: RwLock<Option<Actor>>,
    loading: AtomicBool,
}

impl StaticIdentity {
    pub fn signed_in(actor: Actor) -> Self {
        Self {
            user: RwLock::new(Some(actor)),
            loading: AtomicBool::new(false),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            user: RwLock::new(None),
            loading: AtomicBool::new(false),
        }
    }

    /// A session that is still being restored
    pub fn loading() -> Self {
        Self {
            user: RwLock::new(None),
            loading: AtomicBool::new(true),
        }
    }

    pub fn sign_in(&self, actor: Actor) {
        if let Ok(mut user) = self.user.write() {
            *user = Some(actor);
        }
        self.loading.store(false, Ordering::SeqCst);
    }

    pub fn sign_out(&self) {
        if let Ok(mut user) = self.user.write() {
            *user = None;
        }
    }

    pub fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    async fn current_user(&self) -> Option<Actor> {
        self.user.read().ok().and_then(|user| user.clone())
    }

    async fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_identity_follows_sign_in_and_out() {
        let identity = StaticIdentity::loading();
        assert!(identity.is_loading().await);
        assert!(identity.current_user().await.is_none());

        identity.sign_in(Actor::new("u1").with_display_name("Ada"));
        assert!(!identity.is_loading().await);
        assert_eq!(
            identity.current_user().await.map(|actor| actor.uid),
            Some("u1".to_string())
        );

        identity.sign_out();
        assert!(identity.current_user().await.is_none());
    }
}
