#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use account_service::domain::events::EventHandler;
use account_service::domain::events::Topic;
use account_service::domain::notification::errors::MailError;
use account_service::domain::notification::ports::MailSender;
use account_service::domain::user::errors::AuthError;
use account_service::domain::user::errors::EventPublisherError;
use account_service::domain::user::events::ResetPasswordEvent;
use account_service::domain::user::models::User;
use account_service::domain::user::models::UserId;
use account_service::domain::user::models::ValidatedUser;
use account_service::domain::user::ports::EventPublisher;
use account_service::domain::user::ports::UserRepository;
use account_service::domain::user::service::AuthenticateService;
use account_service::inbound::events::NotificationDispatcher;
use account_service::inbound::http::router::create_router;
use account_service::outbound::cache::InMemoryKeyValueStore;
use account_service::domain::user::events::ResetPasswordMessage;
use async_trait::async_trait;
use auth::TokenCodec;
use auth::TokenSecrets;
use serde_json::json;
use serde_json::Value;
use tokio::sync::Mutex;

pub const RESET_LINK_BASE: &str = "https://app.example.com/reset";
pub const FROM_ADDRESS: &str = "no-reply@example.com";

/// User repository backed by a map, enforcing unique emails.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: Mutex<HashMap<UserId, User>>,
}

impl InMemoryUserRepository {
    pub async fn find(&self, email: &str) -> Option<User> {
        self.users
            .lock()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: ValidatedUser) -> Result<User, AuthError> {
        let user = user.into_inner();
        let mut users = self.users.lock().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(AuthError::EmailAlreadyExists(user.email));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError> {
        Ok(self.users.lock().await.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        Ok(self.find(email).await)
    }

    async fn update(&self, user: ValidatedUser) -> Result<User, AuthError> {
        let user = user.into_inner();
        let mut users = self.users.lock().await;
        if users
            .values()
            .any(|existing| existing.email == user.email && existing.id != user.id)
        {
            return Err(AuthError::EmailAlreadyExists(user.email));
        }
        match users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(user)
            }
            None => Err(AuthError::UserNotFound(user.id.to_string())),
        }
    }

    async fn delete(&self, id: &UserId) -> Result<(), AuthError> {
        self.users
            .lock()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AuthError::UserNotFound(id.to_string()))
    }
}

/// Publisher that keeps every event it is given.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<ResetPasswordEvent>>,
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish_password_reset(
        &self,
        event: &ResetPasswordEvent,
    ) -> Result<(), EventPublisherError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

/// Mail sender that keeps every message instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

#[async_trait]
impl MailSender for RecordingMailer {
    async fn send(
        &self,
        from: &str,
        to: &[String],
        subject: &str,
        html_body: &str,
    ) -> Result<(), MailError> {
        self.sent.lock().await.push(SentMail {
            from: from.to_string(),
            to: to.to_vec(),
            subject: subject.to_string(),
            html_body: html_body.to_string(),
        });
        Ok(())
    }
}

/// Test application that serves the real router over in-memory adapters
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub repository: Arc<InMemoryUserRepository>,
    pub store: Arc<InMemoryKeyValueStore>,
    pub publisher: Arc<RecordingEventPublisher>,
    pub mailer: Arc<RecordingMailer>,
    pub dispatcher: NotificationDispatcher<RecordingMailer>,
    pub tokens: Arc<TokenCodec>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let secrets = TokenSecrets::new(
            "test-access-secret",
            "test-refresh-secret",
            "test-reset-secret",
        )
        .expect("Failed to build token secrets");
        let tokens = Arc::new(TokenCodec::new(&secrets));

        let repository = Arc::new(InMemoryUserRepository::default());
        let store = Arc::new(InMemoryKeyValueStore::new());
        let publisher = Arc::new(RecordingEventPublisher::default());
        let mailer = Arc::new(RecordingMailer::default());

        let service = Arc::new(AuthenticateService::new(
            Arc::clone(&repository),
            Arc::clone(&store),
            Arc::clone(&publisher),
            Arc::clone(&tokens),
        ));
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&mailer),
            FROM_ADDRESS.to_string(),
            RESET_LINK_BASE.to_string(),
        );

        let router = create_router(service);

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            repository,
            store,
            publisher,
            mailer,
            dispatcher,
            tokens,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PATCH request with Bearer token
    pub fn patch_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .patch(format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    /// Register a user and return the response body
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .post("/api/v1/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    /// Register a user and return its access token
    pub async fn access_token_for(&self, name: &str, email: &str, password: &str) -> String {
        let body = self.register(name, email, password).await;
        body["data"]["access_token"]["token"]
            .as_str()
            .expect("Missing access token")
            .to_string()
    }

    /// Log in and return the HTTP status
    pub async fn login_status(&self, email: &str, password: &str) -> reqwest::StatusCode {
        self.post("/api/v1/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
            .status()
    }

    /// Ask for a password reset and return the HTTP status
    pub async fn request_reset(&self, email: &str) -> reqwest::StatusCode {
        self.post("/api/v1/reset-password")
            .json(&json!({ "email": email }))
            .send()
            .await
            .expect("Failed to execute request")
            .status()
    }

    /// Redeem a reset token and return the response
    pub async fn redeem(&self, token: &str, new_password: &str) -> reqwest::Response {
        self.post("/api/v1/reset-password-with-token")
            .json(&json!({ "token": token, "new_password": new_password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn published_events(&self) -> Vec<ResetPasswordEvent> {
        self.publisher.events.lock().await.clone()
    }

    /// Token of the most recent reset event
    pub async fn last_reset_token(&self) -> String {
        self.published_events()
            .await
            .last()
            .map(|event| event.token.clone())
            .expect("No reset event published")
    }

    /// Feed every published event through the dispatcher as it would arrive on the bus
    pub async fn deliver_events(&self) {
        for event in self.published_events().await {
            let payload = serde_json::to_vec(&ResetPasswordMessage::from(&event))
                .expect("Failed to encode event");
            self.dispatcher
                .handle(
                    Topic::ResetPassword.as_str(),
                    Some(event.email.as_bytes()),
                    &payload,
                )
                .await
                .expect("Dispatcher rejected event");
        }
    }

    pub async fn sent_mail(&self) -> Vec<SentMail> {
        self.mailer.sent.lock().await.clone()
    }
}
