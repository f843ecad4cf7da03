//! Typed HTTP client for the gateway
//!
//! Every call goes through [`ApiClient::send`], which attaches the session's
//! bearer token when one is held and turns non-success responses into
//! [`ClientError::Api`].

use crate::error::{ClientError, Result};
use crate::session::{Session, SessionStore};
use casebook_common::{
    dto::{
        AuthResponse, CaseDto, CreateCaseRequest, CreateDocumentRequest, CreateMessageRequest,
        CreateNotificationRequest, DocumentDto, LoginRequest, MessageDto, NotificationDto,
        RegisterRequest, UpdateCaseRequest, UpdateDocumentRequest, UpdateMessageRequest,
        UpdateNotificationRequest, UserProfile,
    },
    API_PREFIX,
};
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ApiClient {
    base_url: String,
    http: Client,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Client for the gateway at `base_url` (scheme, host and port)
    pub fn new(base_url: &str, session: Arc<SessionStore>) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let request = match self.session.token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "Request rejected");
            return Err(ClientError::from_body(status, &body));
        }

        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.http.get(self.url(path))).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send(self.http.put(self.url(path)).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.http.delete(self.url(path))).await
    }

    // ==================== Account ====================

    /// Sign in and persist the session
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth: AuthResponse = self.post("/login", &request).await?;
        self.start_session(&auth).await?;
        info!(email = %auth.email, "Signed in");
        Ok(auth)
    }

    /// Create an account; the new user is signed in straight away
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse> {
        let auth: AuthResponse = self.post("/register", request).await?;
        self.start_session(&auth).await?;
        info!(email = %auth.email, "Registered");
        Ok(auth)
    }

    async fn start_session(&self, auth: &AuthResponse) -> Result<()> {
        self.session
            .set(Session {
                email: auth.email.clone(),
                token: auth.token.clone(),
                user: None,
            })
            .await?;

        match self.me().await {
            Ok(profile) => self.session.set_user(profile).await?,
            Err(e) => warn!(error = %e, "Signed in without a profile"),
        }
        Ok(())
    }

    /// Drop the session locally. Tokens are stateless, so the server is not told.
    pub async fn logout(&self) -> Result<()> {
        self.session.clear().await?;
        info!("Signed out");
        Ok(())
    }

    pub async fn me(&self) -> Result<UserProfile> {
        self.get("/account/me").await
    }

    /// Admin only
    pub async fn delete_user(&self, user_id: &str) -> Result<UserProfile> {
        self.delete(&format!("/users/{}", user_id)).await
    }

    // ==================== Cases ====================

    pub async fn list_cases(&self) -> Result<Vec<CaseDto>> {
        self.get("/cases").await
    }

    pub async fn get_case(&self, case_id: i32) -> Result<CaseDto> {
        self.get(&format!("/cases/{}", case_id)).await
    }

    pub async fn create_case(&self, request: &CreateCaseRequest) -> Result<CaseDto> {
        self.post("/cases", request).await
    }

    pub async fn update_case(&self, case_id: i32, request: &UpdateCaseRequest) -> Result<CaseDto> {
        self.put(&format!("/cases/{}", case_id), request).await
    }

    pub async fn delete_case(&self, case_id: i32) -> Result<CaseDto> {
        self.delete(&format!("/cases/{}", case_id)).await
    }

    pub async fn case_documents(&self, case_id: i32) -> Result<Vec<DocumentDto>> {
        self.get(&format!("/cases/{}/documents", case_id)).await
    }

    pub async fn case_messages(&self, case_id: i32) -> Result<Vec<MessageDto>> {
        self.get(&format!("/cases/{}/messages", case_id)).await
    }

    // ==================== Documents ====================

    pub async fn list_documents(&self) -> Result<Vec<DocumentDto>> {
        self.get("/documents").await
    }

    pub async fn get_document(&self, document_id: i32) -> Result<DocumentDto> {
        self.get(&format!("/documents/{}", document_id)).await
    }

    pub async fn create_document(&self, request: &CreateDocumentRequest) -> Result<DocumentDto> {
        self.post("/documents", request).await
    }

    pub async fn update_document(
        &self,
        document_id: i32,
        request: &UpdateDocumentRequest,
    ) -> Result<DocumentDto> {
        self.put(&format!("/documents/{}", document_id), request).await
    }

    pub async fn delete_document(&self, document_id: i32) -> Result<DocumentDto> {
        self.delete(&format!("/documents/{}", document_id)).await
    }

    // ==================== Messages ====================

    pub async fn list_messages(&self) -> Result<Vec<MessageDto>> {
        self.get("/messages").await
    }

    pub async fn get_message(&self, message_id: i32) -> Result<MessageDto> {
        self.get(&format!("/messages/{}", message_id)).await
    }

    pub async fn create_message(&self, request: &CreateMessageRequest) -> Result<MessageDto> {
        self.post("/messages", request).await
    }

    pub async fn update_message(
        &self,
        message_id: i32,
        request: &UpdateMessageRequest,
    ) -> Result<MessageDto> {
        self.put(&format!("/messages/{}", message_id), request).await
    }

    pub async fn delete_message(&self, message_id: i32) -> Result<MessageDto> {
        self.delete(&format!("/messages/{}", message_id)).await
    }

    // ==================== Notifications ====================

    pub async fn list_notifications(&self) -> Result<Vec<NotificationDto>> {
        self.get("/notifications").await
    }

    pub async fn user_notifications(&self, user_id: &str) -> Result<Vec<NotificationDto>> {
        self.get(&format!("/users/{}/notifications", user_id)).await
    }

    pub async fn get_notification(&self, notification_id: i32) -> Result<NotificationDto> {
        self.get(&format!("/notifications/{}", notification_id)).await
    }

    pub async fn create_notification(
        &self,
        request: &CreateNotificationRequest,
    ) -> Result<NotificationDto> {
        self.post("/notifications", request).await
    }

    pub async fn update_notification(
        &self,
        notification_id: i32,
        request: &UpdateNotificationRequest,
    ) -> Result<NotificationDto> {
        self.put(&format!("/notifications/{}", notification_id), request).await
    }

    pub async fn mark_notification_read(&self, notification_id: i32) -> Result<NotificationDto> {
        self.send(
            self.http
                .post(self.url(&format!("/notifications/{}/read", notification_id))),
        )
        .await
    }

    pub async fn delete_notification(&self, notification_id: i32) -> Result<NotificationDto> {
        self.delete(&format!("/notifications/{}", notification_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{header, HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;

    const TOKEN: &str = "stub-token";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            == Some(format!("Bearer {}", TOKEN).as_str())
    }

    fn unauthorized() -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "code": "UNAUTHORIZED", "message": "Missing authorization header" } })),
        )
            .into_response()
    }

    async fn login(Json(body): Json<LoginRequest>) -> Response {
        if body.password != "Str0ng!pw" {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": "UNAUTHORIZED", "message": "Invalid email or password." } })),
            )
                .into_response();
        }
        Json(json!({ "email": body.email, "token": TOKEN })).into_response()
    }

    async fn me(headers: HeaderMap) -> Response {
        if !authorized(&headers) {
            return unauthorized();
        }
        Json(json!({
            "id": "u1",
            "email": "a@x.com",
            "firstName": "A",
            "lastName": "B",
            "phoneNumber": null,
            "roles": ["User"]
        }))
        .into_response()
    }

    async fn get_case(headers: HeaderMap, Path(id): Path<i32>) -> Response {
        if !authorized(&headers) {
            return unauthorized();
        }
        if id != 7 {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": { "code": "NOT_FOUND", "message": "case not found" } })),
            )
                .into_response();
        }
        Json(json!({
            "caseId": 7,
            "title": "Smith v. Jones",
            "description": "",
            "createdById": "u1",
            "assignedToId": null,
            "dateCreated": "2024-01-01T00:00:00Z",
            "dateClosed": null
        }))
        .into_response()
    }

    async fn stub_server() -> String {
        let app = Router::new()
            .route("/api/v1/login", post(login))
            .route("/api/v1/account/me", get(me))
            .route("/api/v1/cases/{id}", get(get_case));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn client() -> ApiClient {
        ApiClient::new(&stub_server().await, Arc::new(SessionStore::in_memory())).unwrap()
    }

    #[tokio::test]
    async fn test_calls_without_session_carry_no_token() {
        let client = client().await;
        let err = client.get_case(7).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_login_stores_session_and_sends_bearer() {
        let client = client().await;
        let auth = client.login("a@x.com", "Str0ng!pw").await.unwrap();
        assert_eq!(auth.token, TOKEN);

        assert!(client.session().is_logged_in().await);
        assert_eq!(client.session().user().await.unwrap().id, "u1");

        let case = client.get_case(7).await.unwrap();
        assert_eq!(case.title, "Smith v. Jones");

        let missing = client.get_case(8).await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_failed_login_leaves_session_empty() {
        let client = client().await;
        let err = client.login("a@x.com", "nope").await.unwrap_err();

        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("Invalid email or password."));
        assert!(!client.session().is_logged_in().await);
    }

    #[tokio::test]
    async fn test_logout_drops_token() {
        let client = client().await;
        client.login("a@x.com", "Str0ng!pw").await.unwrap();
        client.logout().await.unwrap();

        assert!(!client.session().is_logged_in().await);
        assert!(client.get_case(7).await.unwrap_err().is_unauthorized());
    }

    #[tokio::test]
    async fn test_restored_session_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let base_url = stub_server().await;

        let storage = Arc::new(crate::session::FileStorage::new(&path));
        let first = ApiClient::new(&base_url, Arc::new(SessionStore::load(storage).await.unwrap())).unwrap();
        first.login("a@x.com", "Str0ng!pw").await.unwrap();

        let storage = Arc::new(crate::session::FileStorage::new(&path));
        let second = ApiClient::new(&base_url, Arc::new(SessionStore::load(storage).await.unwrap())).unwrap();
        assert_eq!(second.me().await.unwrap().email, "a@x.com");
    }
}
