//! Remote replica stored as a file in a private GitHub gist.

use std::collections::HashMap;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{HandleStore, RemoteStore};
use crate::auth::github::{GITHUB_ACCEPT, USER_AGENT};
use crate::auth::{parse_api_error, AccessToken, AuthProvider};
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::models::Record;

const GIST_LIST_PAGE_SIZE: u32 = 100;

/// [`RemoteStore`] backed by the GitHub Gist API.
///
/// The gist id is cached in a [`HandleStore`]. Without one, the store looks
/// for an existing gist carrying the configured file name before creating a
/// new gist, so a lost handle does not fork the remote copy.
pub struct GistStore<A, H> {
    client: Client,
    api_base_url: String,
    file_name: String,
    description: String,
    auth: A,
    handles: H,
}

impl<A: AuthProvider, H: HandleStore> GistStore<A, H> {
    pub fn new(config: &RemoteConfig, auth: A, handles: H) -> Result<Self> {
        Ok(Self {
            client: Client::builder().user_agent(USER_AGENT).build()?,
            api_base_url: config.api_base_url.clone(),
            file_name: config.file_name.clone(),
            description: config.description.clone(),
            auth,
            handles,
        })
    }

    pub const fn auth(&self) -> &A {
        &self.auth
    }

    pub const fn handles(&self) -> &H {
        &self.handles
    }

    fn token(&self) -> Result<AccessToken> {
        self.auth
            .token()
            .ok_or_else(|| Error::Auth("not signed in to GitHub".to_string()))
    }

    fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.api_base_url))
            .header(AUTHORIZATION, format!("token {}", token.secret()))
            .header(ACCEPT, GITHUB_ACCEPT)
    }

    /// Cached handle, or the id of the first listed gist that carries our file.
    async fn resolve_handle(&self, token: &AccessToken) -> Result<Option<String>> {
        if let Some(handle) = self.handles.load_handle().await? {
            return Ok(Some(handle));
        }

        let response = self
            .request(
                Method::GET,
                &format!("/gists?per_page={GIST_LIST_PAGE_SIZE}"),
                token,
            )
            .send()
            .await?;
        let gists = check_status(response).await?.json::<Vec<GistPayload>>().await?;

        let Some(found) = gists
            .into_iter()
            .find(|gist| gist.files.contains_key(&self.file_name))
        else {
            return Ok(None);
        };

        tracing::debug!("Found existing gist {}", found.id);
        self.handles.save_handle(&found.id).await?;
        Ok(Some(found.id))
    }

    async fn fetch(&self, token: &AccessToken, handle: &str) -> Result<Option<Record>> {
        let response = self
            .request(Method::GET, &format!("/gists/{handle}"), token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::warn!("Gist {handle} no longer exists; forgetting it");
            self.handles.clear_handle().await?;
            return Ok(None);
        }

        let gist = check_status(response).await?.json::<GistPayload>().await?;
        let Some(file) = gist.files.get(&self.file_name) else {
            return Ok(None);
        };

        let content = match (&file.content, file.truncated, &file.raw_url) {
            (Some(content), false, _) => content.clone(),
            (_, _, Some(raw_url)) => {
                let response = self
                    .client
                    .get(raw_url)
                    .header(AUTHORIZATION, format!("token {}", token.secret()))
                    .send()
                    .await?;
                check_status(response).await?.text().await?
            }
            (Some(content), true, None) => content.clone(),
            (None, _, None) => return Ok(None),
        };

        Record::from_json(&content).map(Some)
    }

    async fn create(&self, token: &AccessToken, content: &str) -> Result<()> {
        let payload = CreateGistRequest {
            description: &self.description,
            public: false,
            files: self.files_payload(content),
        };
        let response = self
            .request(Method::POST, "/gists", token)
            .json(&payload)
            .send()
            .await?;
        let created = check_status(response).await?.json::<GistPayload>().await?;

        tracing::info!("Created gist {}", created.id);
        self.handles.save_handle(&created.id).await
    }

    /// Returns `false` when the gist is gone.
    async fn update(&self, token: &AccessToken, handle: &str, content: &str) -> Result<bool> {
        let payload = UpdateGistRequest {
            files: self.files_payload(content),
        };
        let response = self
            .request(Method::PATCH, &format!("/gists/{handle}"), token)
            .json(&payload)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(response).await?;
        Ok(true)
    }

    fn files_payload<'a>(&'a self, content: &'a str) -> HashMap<&'a str, FileContent<'a>> {
        HashMap::from([(self.file_name.as_str(), FileContent { content })])
    }
}

impl<A: AuthProvider, H: HandleStore> RemoteStore for GistStore<A, H> {
    fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    async fn read(&self) -> Result<Option<Record>> {
        let token = self.token()?;
        let Some(handle) = self.resolve_handle(&token).await? else {
            return Ok(None);
        };
        self.fetch(&token, &handle).await
    }

    async fn write(&self, record: &Record) -> Result<()> {
        let token = self.token()?;
        let content = record.to_json_pretty()?;

        let Some(handle) = self.resolve_handle(&token).await? else {
            return self.create(&token, &content).await;
        };

        if self.update(&token, &handle, &content).await? {
            return Ok(());
        }

        tracing::warn!("Gist {handle} was deleted remotely; creating a new one");
        self.handles.clear_handle().await?;
        self.create(&token, &content).await
    }
}

/// Map a non-success response to an auth or network error.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_api_error(status, &body);
    let rate_limited = body.to_ascii_lowercase().contains("rate limit");
    match status {
        StatusCode::UNAUTHORIZED => Err(Error::Auth(message)),
        StatusCode::FORBIDDEN if !rate_limited => Err(Error::Auth(message)),
        _ => Err(Error::Network(message)),
    }
}

#[derive(Debug, Deserialize)]
struct GistPayload {
    id: String,
    #[serde(default)]
    files: HashMap<String, GistFile>,
}

#[derive(Debug, Deserialize)]
struct GistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileContent<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateGistRequest<'a> {
    description: &'a str,
    public: bool,
    files: HashMap<&'a str, FileContent<'a>>,
}

#[derive(Debug, Serialize)]
struct UpdateGistRequest<'a> {
    files: HashMap<&'a str, FileContent<'a>>,
}
