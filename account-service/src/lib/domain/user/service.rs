use std::sync::Arc;

use async_trait::async_trait;
use auth::IssuedToken;
use auth::PasswordError;
use auth::TokenCodec;
use auth::TokenError;
use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::domain::cache::errors::CacheError;
use crate::domain::cache::ports::KeyValueStore;
use crate::domain::user::events::ResetPasswordEvent;
use crate::domain::user::models::reset_ticket_key;
use crate::domain::user::models::validate_password;
use crate::domain::user::models::AuthenticatedSession;
use crate::domain::user::models::DeleteProfileCommand;
use crate::domain::user::models::LoginCommand;
use crate::domain::user::models::RegisterCommand;
use crate::domain::user::models::ResetPasswordCommand;
use crate::domain::user::models::UpdateProfileCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::ValidatedUser;
use crate::domain::user::models::RESET_TICKET_TTL_SECS;
use crate::user::errors::AuthError;
use crate::user::ports::AuthenticateServicePort;
use crate::user::ports::EventPublisher;
use crate::user::ports::UserRepository;

/// Domain service orchestrating sessions, profiles and the reset protocol.
///
/// Holds no per-user state of its own: users live in the repository and the
/// only outstanding reset token of a user lives in the key-value store.
pub struct AuthenticateService<UR, KV, EP>
where
    UR: UserRepository,
    KV: KeyValueStore,
    EP: EventPublisher,
{
    repository: Arc<UR>,
    store: Arc<KV>,
    event_publisher: Arc<EP>,
    tokens: Arc<TokenCodec>,
    password_hasher: auth::PasswordHasher,
}

impl<UR, KV, EP> AuthenticateService<UR, KV, EP>
where
    UR: UserRepository,
    KV: KeyValueStore,
    EP: EventPublisher,
{
    /// Create a new authenticate service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - User persistence implementation
    /// * `store` - Ephemeral store holding reset tickets
    /// * `event_publisher` - Domain event publishing implementation
    /// * `tokens` - Codec for access, refresh and reset tokens
    pub fn new(
        repository: Arc<UR>,
        store: Arc<KV>,
        event_publisher: Arc<EP>,
        tokens: Arc<TokenCodec>,
    ) -> Self {
        Self {
            repository,
            store,
            event_publisher,
            tokens,
            password_hasher: auth::PasswordHasher::new(),
        }
    }

    async fn find_user(&self, id: &UserId) -> Result<User, AuthError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<User, AuthError> {
        self.repository
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthError::UserNotFound(email.to_string()))
    }

    fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        validate_password(password)?;
        self.password_hasher
            .hash(password)
            .map_err(|e| AuthError::Password(e.to_string()))
    }

    fn check_password(&self, password: &str, hash: &str) -> Result<(), AuthError> {
        match self.password_hasher.compare(password, hash) {
            Ok(()) => Ok(()),
            Err(PasswordError::Mismatch) => Err(AuthError::InvalidCredentials),
            Err(e) => Err(AuthError::Password(e.to_string())),
        }
    }

    fn issue_access(&self, user: &User) -> Result<IssuedToken, AuthError> {
        self.tokens
            .issue_access(user.id, &user.name, &user.email)
            .map_err(signing_error)
    }

    fn open_session(&self, user: User) -> Result<AuthenticatedSession, AuthError> {
        let access_token = self.issue_access(&user)?;
        let refresh_token = self
            .tokens
            .issue_refresh(user.id)
            .map_err(signing_error)?;

        Ok(AuthenticatedSession {
            user,
            access_token,
            refresh_token,
        })
    }
}

fn signing_error(err: TokenError) -> AuthError {
    AuthError::Signing(err.to_string())
}

fn invalid_token(err: TokenError) -> AuthError {
    AuthError::InvalidToken(err.to_string())
}

/// Constant-time equality of the stored ticket and the presented token.
fn ticket_matches(stored: &str, presented: &str) -> bool {
    stored.as_bytes().ct_eq(presented.as_bytes()).into()
}

fn subject_id(id: &str) -> Result<UserId, AuthError> {
    UserId::from_string(id).map_err(|e| AuthError::InvalidToken(e.to_string()))
}

#[async_trait]
impl<UR, KV, EP> AuthenticateServicePort for AuthenticateService<UR, KV, EP>
where
    UR: UserRepository,
    KV: KeyValueStore,
    EP: EventPublisher,
{
    async fn register(&self, command: RegisterCommand) -> Result<AuthenticatedSession, AuthError> {
        let password_hash = self.hash_password(&command.password)?;
        let now = Utc::now();

        let user = ValidatedUser::new(User {
            id: UserId::new(),
            name: command.name.trim().to_string(),
            email: command.email.trim().to_string(),
            password_hash,
            created_at: now,
            updated_at: now,
        })?;

        let created_user = self.repository.create(user).await?;
        tracing::info!(user_id = %created_user.id, "User registered");

        self.open_session(created_user)
    }

    async fn login(&self, command: LoginCommand) -> Result<AuthenticatedSession, AuthError> {
        let user = self.find_user_by_email(command.email.trim()).await?;

        if let Err(e) = self.check_password(&command.password, &user.password_hash) {
            tracing::warn!(user_id = %user.id, "Login rejected");
            return Err(e);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.open_session(user)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<IssuedToken, AuthError> {
        let claims = self
            .tokens
            .verify_refresh(refresh_token)
            .map_err(invalid_token)?;
        let user = self.find_user(&subject_id(&claims.id)?).await?;

        self.issue_access(&user)
    }

    async fn authenticate_access_token(&self, access_token: &str) -> Result<User, AuthError> {
        let claims = self
            .tokens
            .verify_access(access_token)
            .map_err(invalid_token)?;

        self.find_user(&subject_id(&claims.id)?).await
    }

    async fn profile(&self, user_id: &UserId) -> Result<User, AuthError> {
        self.find_user(user_id).await
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        command: UpdateProfileCommand,
    ) -> Result<User, AuthError> {
        let current = self.find_user(user_id).await?;

        let current_password = command.current_password.filter(|p| !p.is_empty());
        let password_hash = match current_password {
            Some(current_password) => {
                self.check_password(&current_password, &current.password_hash)?;
                let new_password = command.new_password.unwrap_or_default();
                self.hash_password(&new_password)?
            }
            None => {
                if command.new_password.is_some() {
                    tracing::debug!(
                        user_id = %user_id,
                        "New password ignored without current password"
                    );
                }
                current.password_hash.clone()
            }
        };

        let user = ValidatedUser::new(User {
            name: command
                .name
                .map(|name| name.trim().to_string())
                .unwrap_or(current.name),
            email: command
                .email
                .map(|email| email.trim().to_string())
                .unwrap_or(current.email),
            password_hash,
            updated_at: Utc::now(),
            ..current
        })?;

        let updated_user = self.repository.update(user).await?;
        tracing::info!(user_id = %updated_user.id, "Profile updated");

        Ok(updated_user)
    }

    async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let user = self.find_user_by_email(email.trim()).await?;

        let issued = self.tokens.issue_reset(&user.email).map_err(signing_error)?;

        // Overwrites any outstanding ticket, which invalidates its token
        let key = reset_ticket_key(&user.id);
        self.store
            .set(&key, &issued.token, RESET_TICKET_TTL_SECS)
            .await?;
        tracing::info!(user_id = %user.id, key = %key, "Reset ticket stored");

        let event = ResetPasswordEvent::new(&user, issued.token, issued.expires_at);
        self.event_publisher
            .publish_password_reset(&event)
            .await
            .map_err(|e| {
                tracing::error!(
                    user_id = %user.id,
                    error = %e,
                    "Failed to publish reset event; ticket left to expire"
                );
                AuthError::from(e)
            })
    }

    async fn reset_password_with_token(
        &self,
        command: ResetPasswordCommand,
    ) -> Result<(), AuthError> {
        let claims = self.tokens.verify_reset(&command.token).map_err(|e| {
            tracing::warn!(error = %e, "Reset token failed verification");
            invalid_token(e)
        })?;

        let user = self.find_user_by_email(&claims.email).await?;
        let key = reset_ticket_key(&user.id);

        let stored = match self.store.get(&key).await {
            Ok(stored) => stored,
            Err(CacheError::NotFound(_)) => return Err(AuthError::TokenConsumedOrExpired),
            Err(e) => return Err(e.into()),
        };

        // Only the most recently issued token matches; the ticket stays intact otherwise
        if !ticket_matches(&stored, &command.token) {
            tracing::warn!(user_id = %user.id, "Reset token is not the live ticket");
            return Err(AuthError::InvalidToken(
                "reset token superseded".to_string(),
            ));
        }

        let password_hash = self.hash_password(&command.new_password)?;
        let user = ValidatedUser::new(User {
            password_hash,
            updated_at: Utc::now(),
            ..user
        })?;

        // Claim the ticket before writing so concurrent redemptions cannot both win
        if !self.store.compare_and_delete(&key, &command.token).await? {
            return Err(AuthError::TokenConsumedOrExpired);
        }

        let updated_user = self.repository.update(user).await?;
        tracing::info!(user_id = %updated_user.id, "Password reset redeemed");

        Ok(())
    }

    async fn delete_profile(
        &self,
        user_id: &UserId,
        command: DeleteProfileCommand,
    ) -> Result<(), AuthError> {
        let user = self.find_user(user_id).await?;
        self.check_password(&command.password, &user.password_hash)?;

        self.repository.delete(&user.id).await?;
        tracing::info!(user_id = %user.id, "User deleted");

        if let Err(e) = self.store.delete(&[reset_ticket_key(&user.id)]).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to drop reset ticket");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use auth::TokenSecrets;
    use mockall::mock;

    use super::*;
    use crate::outbound::cache::InMemoryKeyValueStore;
    use crate::user::errors::EventPublisherError;

    mock! {
        pub TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: ValidatedUser) -> Result<User, AuthError>;
            async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
            async fn update(&self, user: ValidatedUser) -> Result<User, AuthError>;
            async fn delete(&self, id: &UserId) -> Result<(), AuthError>;
        }
    }

    mock! {
        pub TestEventPublisher {}

        #[async_trait]
        impl EventPublisher for TestEventPublisher {
            async fn publish_password_reset(&self, event: &ResetPasswordEvent) -> Result<(), EventPublisherError>;
        }
    }

    mock! {
        pub TestKeyValueStore {}

        #[async_trait]
        impl KeyValueStore for TestKeyValueStore {
            async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<(), CacheError>;
            async fn get(&self, key: &str) -> Result<String, CacheError>;
            async fn delete(&self, keys: &[String]) -> Result<u64, CacheError>;
            async fn exists(&self, key: &str) -> Result<bool, CacheError>;
            async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<bool, CacheError>;
            async fn ttl(&self, key: &str) -> Result<Option<u64>, CacheError>;
            async fn increment(&self, key: &str) -> Result<i64, CacheError>;
            async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;
            async fn hget(&self, key: &str, field: &str) -> Result<String, CacheError>;
            async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError>;
            async fn lpush(&self, key: &str, value: &str) -> Result<u64, CacheError>;
            async fn lrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, CacheError>;
            async fn compare_and_delete(&self, key: &str, expected: &str) -> Result<bool, CacheError>;
        }
    }

    fn codec() -> Arc<TokenCodec> {
        let secrets = TokenSecrets::new(
            "test-access-secret-at-least-32-bytes",
            "test-refresh-secret-at-least-32-bytes",
            "test-reset-secret-at-least-32-bytes!",
        )
        .unwrap();
        Arc::new(TokenCodec::new(&secrets))
    }

    fn stored_user(password: &str) -> User {
        User {
            id: UserId::new(),
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: auth::PasswordHasher::new().hash(password).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repository_with(user: &User) -> MockTestUserRepository {
        let mut repository = MockTestUserRepository::new();

        let by_id = user.clone();
        repository
            .expect_find_by_id()
            .returning(move |id| Ok((*id == by_id.id).then(|| by_id.clone())));

        let by_email = user.clone();
        repository
            .expect_find_by_email()
            .returning(move |email| Ok((email == by_email.email).then(|| by_email.clone())));

        repository
    }

    fn recording_publisher() -> (MockTestEventPublisher, Arc<Mutex<Vec<ResetPasswordEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);

        let mut publisher = MockTestEventPublisher::new();
        publisher
            .expect_publish_password_reset()
            .returning(move |event| {
                sink.lock().unwrap().push(event.clone());
                Ok(())
            });

        (publisher, events)
    }

    #[tokio::test]
    async fn test_register_hashes_password_and_opens_session() {
        let mut repository = MockTestUserRepository::new();
        repository
            .expect_create()
            .withf(|user| {
                let user = user.user();
                user.name == "Alice"
                    && user.email == "alice@example.com"
                    && user.password_hash.starts_with("$argon2")
                    && user.password_hash != "correct-password"
            })
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let tokens = codec();
        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            Arc::clone(&tokens),
        );

        let session = service
            .register(RegisterCommand {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await
            .unwrap();

        let claims = tokens.verify_access(&session.access_token.token).unwrap();
        assert_eq!(claims.id, session.user.id.to_string());
        assert_eq!(claims.email, "alice@example.com");

        let refresh = tokens.verify_refresh(&session.refresh_token.token).unwrap();
        assert_eq!(refresh.id, session.user.id.to_string());
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_fields() {
        let mut repository = MockTestUserRepository::new();
        repository.expect_create().times(0);

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let cases = [
            ("", "alice@example.com", "pw"),
            ("Alice", "not-an-email", "pw"),
            ("Alice", "alice@example.com", ""),
        ];

        for (name, email, password) in cases {
            let result = service
                .register(RegisterCommand {
                    name: name.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await;
            assert!(matches!(result, Err(AuthError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestUserRepository::new();
        repository.expect_create().times(1).returning(|user| {
            Err(AuthError::EmailAlreadyExists(user.user().email.clone()))
        });

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let result = service
            .register(RegisterCommand {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::EmailAlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_login_distinguishes_unknown_email_and_wrong_password() {
        let user = stored_user("correct-password");
        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let ok = service
            .login(LoginCommand {
                email: "alice@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await;
        assert_eq!(ok.unwrap().user.id, user.id);

        let wrong_password = service
            .login(LoginCommand {
                email: "alice@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(wrong_password, Err(AuthError::InvalidCredentials)));

        let unknown = service
            .login(LoginCommand {
                email: "bob@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await;
        assert!(matches!(unknown, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_refresh_and_authenticate_tokens() {
        let user = stored_user("pw");
        let tokens = codec();
        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            Arc::clone(&tokens),
        );

        let refresh = tokens.issue_refresh(user.id).unwrap();
        let access = service.refresh_access_token(&refresh.token).await.unwrap();

        let authenticated = service
            .authenticate_access_token(&access.token)
            .await
            .unwrap();
        assert_eq!(authenticated.id, user.id);

        // An access token is not a refresh token
        let result = service.refresh_access_token(&access.token).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_update_profile_without_current_password_keeps_hash() {
        let user = stored_user("correct-password");
        let original_hash = user.password_hash.clone();

        let mut repository = repository_with(&user);
        let expected_hash = original_hash.clone();
        repository
            .expect_update()
            .withf(move |updated| {
                let updated = updated.user();
                updated.name == "Alice Liddell"
                    && updated.email == "alice@example.com"
                    && updated.password_hash == expected_hash
            })
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let updated = service
            .update_profile(
                &user.id,
                UpdateProfileCommand {
                    name: Some("Alice Liddell".to_string()),
                    email: None,
                    current_password: None,
                    new_password: Some("sneaky".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.password_hash, original_hash);
    }

    #[tokio::test]
    async fn test_update_profile_password_change_requires_matching_current() {
        let user = stored_user("correct-password");

        let mut repository = repository_with(&user);
        repository
            .expect_update()
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let rejected = service
            .update_profile(
                &user.id,
                UpdateProfileCommand {
                    name: None,
                    email: None,
                    current_password: Some("wrong-password".to_string()),
                    new_password: Some("new-pass".to_string()),
                },
            )
            .await;
        assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));

        let missing_new = service
            .update_profile(
                &user.id,
                UpdateProfileCommand {
                    name: None,
                    email: None,
                    current_password: Some("correct-password".to_string()),
                    new_password: None,
                },
            )
            .await;
        assert!(matches!(missing_new, Err(AuthError::Validation(_))));

        let updated = service
            .update_profile(
                &user.id,
                UpdateProfileCommand {
                    name: None,
                    email: None,
                    current_password: Some("correct-password".to_string()),
                    new_password: Some("new-pass".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(auth::PasswordHasher::new()
            .compare("new-pass", &updated.password_hash)
            .is_ok());
    }

    #[tokio::test]
    async fn test_request_reset_stores_ticket_then_publishes() {
        let user = stored_user("pw");
        let store = Arc::new(InMemoryKeyValueStore::new());
        let (publisher, events) = recording_publisher();
        let tokens = codec();

        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::clone(&store),
            Arc::new(publisher),
            Arc::clone(&tokens),
        );

        service
            .request_password_reset("alice@example.com")
            .await
            .unwrap();

        let key = reset_ticket_key(&user.id);
        let stored = store.get(&key).await.unwrap();
        let ttl = store.ttl(&key).await.unwrap().unwrap();
        assert!(ttl > RESET_TICKET_TTL_SECS - 5 && ttl <= RESET_TICKET_TTL_SECS);

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].email, "alice@example.com");
        assert_eq!(events[0].token, stored);
        assert_eq!(tokens.verify_reset(&stored).unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn test_request_reset_unknown_email() {
        let user = stored_user("pw");
        let mut publisher = MockTestEventPublisher::new();
        publisher.expect_publish_password_reset().times(0);

        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(publisher),
            codec(),
        );

        let result = service.request_password_reset("bob@example.com").await;
        assert!(matches!(result, Err(AuthError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_request_reset_store_failure_skips_publish() {
        let user = stored_user("pw");

        let mut store = MockTestKeyValueStore::new();
        store
            .expect_set()
            .times(1)
            .returning(|_, _, _| Err(CacheError::Transport("connection refused".to_string())));

        let mut publisher = MockTestEventPublisher::new();
        publisher.expect_publish_password_reset().times(0);

        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(store),
            Arc::new(publisher),
            codec(),
        );

        let result = service.request_password_reset("alice@example.com").await;
        assert!(matches!(
            result,
            Err(AuthError::Cache(CacheError::Transport(_)))
        ));
    }

    #[tokio::test]
    async fn test_request_reset_publish_failure_surfaces_and_keeps_ticket() {
        let user = stored_user("pw");
        let store = Arc::new(InMemoryKeyValueStore::new());

        let mut publisher = MockTestEventPublisher::new();
        publisher
            .expect_publish_password_reset()
            .times(1)
            .returning(|_| Err(EventPublisherError::PublishFailed("broker down".to_string())));

        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::clone(&store),
            Arc::new(publisher),
            codec(),
        );

        let result = service.request_password_reset("alice@example.com").await;

        assert!(matches!(result, Err(AuthError::EventBus(_))));
        assert!(store.exists(&reset_ticket_key(&user.id)).await.unwrap());
    }

    #[tokio::test]
    async fn test_redeem_reset_exactly_once() {
        let user = stored_user("correct-password");
        let store = Arc::new(InMemoryKeyValueStore::new());
        let (publisher, events) = recording_publisher();

        let mut repository = repository_with(&user);
        repository
            .expect_update()
            .withf(|updated| {
                auth::PasswordHasher::new()
                    .compare("new-pass", &updated.user().password_hash)
                    .is_ok()
            })
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::clone(&store),
            Arc::new(publisher),
            codec(),
        );

        service
            .request_password_reset("alice@example.com")
            .await
            .unwrap();
        let token = events.lock().unwrap()[0].token.clone();

        let command = ResetPasswordCommand {
            token,
            new_password: "new-pass".to_string(),
        };

        service
            .reset_password_with_token(command.clone())
            .await
            .unwrap();
        assert!(!store.exists(&reset_ticket_key(&user.id)).await.unwrap());

        let second = service.reset_password_with_token(command).await;
        assert!(matches!(second, Err(AuthError::TokenConsumedOrExpired)));
    }

    #[tokio::test]
    async fn test_second_reset_request_supersedes_first() {
        let user = stored_user("pw");
        let store = Arc::new(InMemoryKeyValueStore::new());
        let (publisher, events) = recording_publisher();

        let mut repository = repository_with(&user);
        repository
            .expect_update()
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::clone(&store),
            Arc::new(publisher),
            codec(),
        );

        service.request_password_reset("alice@example.com").await.unwrap();
        service.request_password_reset("alice@example.com").await.unwrap();

        let (first, second) = {
            let events = events.lock().unwrap();
            (events[0].token.clone(), events[1].token.clone())
        };
        assert_ne!(first, second);

        let stale = service
            .reset_password_with_token(ResetPasswordCommand {
                token: first,
                new_password: "new-pass".to_string(),
            })
            .await;
        assert!(matches!(stale, Err(AuthError::InvalidToken(_))));

        // The wrong guess leaves the live ticket redeemable
        service
            .reset_password_with_token(ResetPasswordCommand {
                token: second,
                new_password: "new-pass".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_redeem_with_forged_token() {
        let user = stored_user("pw");
        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let result = service
            .reset_password_with_token(ResetPasswordCommand {
                token: "not.a.token".to_string(),
                new_password: "new-pass".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn test_redeem_without_ticket() {
        let user = stored_user("pw");
        let tokens = codec();
        let service = AuthenticateService::new(
            Arc::new(repository_with(&user)),
            Arc::new(InMemoryKeyValueStore::new()),
            Arc::new(MockTestEventPublisher::new()),
            Arc::clone(&tokens),
        );

        // Validly signed, but never stored
        let issued = tokens.issue_reset("alice@example.com").unwrap();
        let result = service
            .reset_password_with_token(ResetPasswordCommand {
                token: issued.token,
                new_password: "new-pass".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::TokenConsumedOrExpired)));
    }

    #[tokio::test]
    async fn test_redeem_loses_race_on_ticket_claim() {
        let user = stored_user("pw");
        let tokens = codec();
        let issued = tokens.issue_reset("alice@example.com").unwrap();

        let mut store = MockTestKeyValueStore::new();
        let live = issued.token.clone();
        store
            .expect_get()
            .returning(move |_| Ok(live.clone()));
        store
            .expect_compare_and_delete()
            .times(1)
            .returning(|_, _| Ok(false));

        let mut repository = repository_with(&user);
        repository.expect_update().times(0);

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::new(store),
            Arc::new(MockTestEventPublisher::new()),
            tokens,
        );

        let result = service
            .reset_password_with_token(ResetPasswordCommand {
                token: issued.token,
                new_password: "new-pass".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::TokenConsumedOrExpired)));
    }

    #[test]
    fn test_ticket_matches_only_exact_token() {
        assert!(ticket_matches("abc.def.ghi", "abc.def.ghi"));
        assert!(!ticket_matches("abc.def.ghi", "abc.def.ghj"));
        assert!(!ticket_matches("abc.def.ghi", "abc.def"));
        assert!(!ticket_matches("abc.def.ghi", ""));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_redemptions_have_single_winner() {
        let user = stored_user("pw");
        let store = Arc::new(InMemoryKeyValueStore::new());
        let (publisher, events) = recording_publisher();

        let mut repository = repository_with(&user);
        repository
            .expect_update()
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = Arc::new(AuthenticateService::new(
            Arc::new(repository),
            Arc::clone(&store),
            Arc::new(publisher),
            codec(),
        ));

        service.request_password_reset("alice@example.com").await.unwrap();
        let token = events.lock().unwrap()[0].token.clone();

        let redeem = |new_password: &str| {
            let service = Arc::clone(&service);
            let command = ResetPasswordCommand {
                token: token.clone(),
                new_password: new_password.to_string(),
            };
            tokio::spawn(async move { service.reset_password_with_token(command).await })
        };
        let (first, second) = tokio::join!(redeem("new-pass"), redeem("other-pass"));
        let outcomes = [first.unwrap(), second.unwrap()];

        assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|outcome| matches!(outcome, Err(AuthError::TokenConsumedOrExpired)))
                .count(),
            1
        );
        assert!(!store.exists(&reset_ticket_key(&user.id)).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_reset_requests_leave_one_live_ticket() {
        let user = stored_user("pw");
        let store = Arc::new(InMemoryKeyValueStore::new());
        let (publisher, events) = recording_publisher();

        let mut repository = repository_with(&user);
        repository
            .expect_update()
            .times(1)
            .returning(|user| Ok(user.into_inner()));

        let service = Arc::new(AuthenticateService::new(
            Arc::new(repository),
            Arc::clone(&store),
            Arc::new(publisher),
            codec(),
        ));

        let request = || {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.request_password_reset("alice@example.com").await })
        };
        let (first, second) = tokio::join!(request(), request());
        first.unwrap().unwrap();
        second.unwrap().unwrap();

        let tokens: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .map(|event| event.token.clone())
            .collect();
        assert_eq!(tokens.len(), 2);

        let live = store.get(&reset_ticket_key(&user.id)).await.unwrap();
        let (live_tokens, stale_tokens): (Vec<String>, Vec<String>) =
            tokens.into_iter().partition(|token| *token == live);
        assert_eq!(live_tokens.len(), 1);
        assert_eq!(stale_tokens.len(), 1);

        let stale = service
            .reset_password_with_token(ResetPasswordCommand {
                token: stale_tokens[0].clone(),
                new_password: "new-pass".to_string(),
            })
            .await;
        assert!(matches!(stale, Err(AuthError::InvalidToken(_))));

        service
            .reset_password_with_token(ResetPasswordCommand {
                token: live_tokens[0].clone(),
                new_password: "new-pass".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_profile_requires_password() {
        let user = stored_user("correct-password");
        let store = Arc::new(InMemoryKeyValueStore::new());
        store
            .set(&reset_ticket_key(&user.id), "outstanding", RESET_TICKET_TTL_SECS)
            .await
            .unwrap();

        let mut repository = repository_with(&user);
        let user_id = user.id;
        repository
            .expect_delete()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));

        let service = AuthenticateService::new(
            Arc::new(repository),
            Arc::clone(&store),
            Arc::new(MockTestEventPublisher::new()),
            codec(),
        );

        let rejected = service
            .delete_profile(
                &user.id,
                DeleteProfileCommand {
                    password: "wrong-password".to_string(),
                },
            )
            .await;
        assert!(matches!(rejected, Err(AuthError::InvalidCredentials)));

        service
            .delete_profile(
                &user.id,
                DeleteProfileCommand {
                    password: "correct-password".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(!store.exists(&reset_ticket_key(&user.id)).await.unwrap());
    }
}
