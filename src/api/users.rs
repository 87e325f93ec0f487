use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder};

use super::model::{Role, User};
use super::{ApiError, ResponseEnvelope, USERS_API, build_client, error_from_response};

/// Upload chunk size; one progress event fires per chunk
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

/// Field mapping for add/update/profile-image submissions. The multipart
/// field names are the backend's contract; note the lock flag keeps its
/// legacy `isNotLocked` spelling on this path even though entity bodies
/// use `notLocked`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserSubmission {
    /// Username of the session performing the edit
    pub current_username: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub enabled: bool,
    pub not_locked: bool,
    pub image: Option<PathBuf>,
}

impl UserSubmission {
    pub fn from_user(current_username: &str, user: &User, image: Option<PathBuf>) -> Self {
        Self {
            current_username: current_username.to_string(),
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            role: user.role,
            enabled: user.enabled,
            not_locked: user.not_locked,
            image,
        }
    }

    /// Deterministic name-to-value mapping of the text fields. The image
    /// part is handled separately and omitted entirely when no file was
    /// chosen.
    pub fn text_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("currentUsername", self.current_username.clone()),
            ("username", self.username.clone()),
            ("firstName", self.first_name.clone()),
            ("lastName", self.last_name.clone()),
            ("email", self.email.clone()),
            ("role", self.role.as_str().to_string()),
            ("isEnabled", self.enabled.to_string()),
            ("isNotLocked", self.not_locked.to_string()),
        ]
    }

    async fn read_image(path: &Path) -> Result<(Vec<u8>, String), ApiError> {
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Network(format!("reading {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Ok((content, file_name))
    }

    /// Build the multipart form for add/update
    async fn to_form(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }

        if let Some(path) = &self.image {
            let (content, file_name) = Self::read_image(path).await?;
            form = form.part("profileImage", Part::bytes(content).file_name(file_name));
        }

        Ok(form)
    }

    /// Build the multipart form for the profile-image endpoint, streaming
    /// the file in chunks so `on_progress` sees incremental
    /// (loaded, total) events before the terminal response.
    async fn to_progress_form<F>(&self, on_progress: Arc<F>) -> Result<Form, ApiError>
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        let mut form = Form::new();
        for (name, value) in self.text_fields() {
            form = form.text(name, value);
        }

        let Some(path) = &self.image else {
            return Ok(form);
        };

        let (content, file_name) = Self::read_image(path).await?;
        let total = content.len() as u64;
        let stream = progress_stream(content, on_progress);

        let part = Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
            .file_name(file_name);
        Ok(form.part("profileImage", part))
    }
}

/// Chunked byte stream that reports cumulative progress as each chunk is
/// pulled by the request body
fn progress_stream<F>(
    content: Vec<u8>,
    on_progress: Arc<F>,
) -> impl futures_util::Stream<Item = Result<Bytes, std::io::Error>>
where
    F: Fn(UploadProgress) + Send + Sync + 'static,
{
    let total = content.len() as u64;
    let chunks: Vec<Bytes> = content
        .chunks(UPLOAD_CHUNK_SIZE)
        .map(Bytes::copy_from_slice)
        .collect();

    let mut loaded = 0u64;
    futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        on_progress(UploadProgress { loaded, total });
        Ok::<Bytes, std::io::Error>(chunk)
    }))
}

/// Thin wrapper around the user directory endpoints. No retries, no
/// recovery; every failure is forwarded to the caller verbatim.
pub struct UserGateway {
    client: Client,
    host: String,
    token: Option<String>,
}

impl UserGateway {
    pub fn new(host: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        Ok(Self {
            client: build_client()?,
            host: host.into(),
            token,
        })
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.host, USERS_API, path)
    }

    /// Fetch the full directory listing. No pagination; the caller owns
    /// caching.
    pub async fn list(&self) -> Result<Vec<User>, ApiError> {
        let response = self
            .request(Method::GET, self.url("list"))
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<Vec<User>>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }

    pub async fn add(&self, submission: &UserSubmission) -> Result<User, ApiError> {
        self.submit_user(Method::POST, self.url("add"), submission)
            .await
    }

    pub async fn update(&self, submission: &UserSubmission) -> Result<User, ApiError> {
        self.submit_user(Method::PUT, self.url("update"), submission)
            .await
    }

    async fn submit_user(
        &self,
        method: Method,
        url: String,
        submission: &UserSubmission,
    ) -> Result<User, ApiError> {
        let form = submission.to_form().await?;

        let response = self
            .request(method, url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<User>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }

    pub async fn delete(&self, id_or_username: &str) -> Result<ResponseEnvelope, ApiError> {
        let url = self.url(&format!("delete/{}", urlencoding::encode(id_or_username)));
        let response = self
            .request(Method::DELETE, url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<ResponseEnvelope>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }

    /// Ask the backend to mail a new password. Acceptance of the request
    /// is all the client gets to see.
    pub async fn reset_password(&self, email: &str) -> Result<ResponseEnvelope, ApiError> {
        let url = self.url(&format!("reset-password/{}", urlencoding::encode(email)));
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<ResponseEnvelope>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }

    /// Upload a new profile image, reporting incremental progress while
    /// the request body streams out.
    pub async fn update_profile_image<F>(
        &self,
        submission: &UserSubmission,
        on_progress: F,
    ) -> Result<User, ApiError>
    where
        F: Fn(UploadProgress) + Send + Sync + 'static,
    {
        let form = submission.to_progress_form(Arc::new(on_progress)).await?;

        let response = self
            .request(Method::POST, self.url("update-profile-image"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        response
            .json::<User>()
            .await
            .map_err(|e| ApiError::Json(e.to_string()))
    }
}
