//! Enterprise file-share client.
//!
//! Talks to the tenant's public REST API (`/pubapi/v1`). Every uniform path
//! is placed below the drive's tenant root on the way out and stripped of
//! it on the way back. Folders are real objects with ids that survive
//! renames and moves.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, info};

use folio_core::error::{AppError, ErrorKind};
use folio_core::result::AppResult;
use folio_core::traits::storage::{ByteStream, StorageClient, VirtualFile, VirtualFolder};
use folio_core::types::path;

use super::check_name;
use super::http;

/// A file-system entry as returned by the share API.
#[derive(Debug, Deserialize)]
struct ShareEntry {
    name: String,
    path: String,
    is_folder: bool,
    #[serde(default)]
    folder_id: Option<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    group_id: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    last_modified: Option<String>,
    #[serde(default)]
    folders: Vec<ShareEntry>,
    #[serde(default)]
    files: Vec<ShareEntry>,
}

#[derive(Debug, Deserialize)]
struct CreatedFolder {
    #[serde(default)]
    folder_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    group_id: String,
    #[serde(default)]
    last_modified: Option<String>,
}

/// Timestamps come back as RFC 2822 strings.
fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|raw| DateTime::parse_from_rfc2822(raw).ok())
        .map(|t| t.with_timezone(&Utc))
}

/// Client for one enterprise-share tenant.
#[derive(Debug, Clone)]
pub struct EnterpriseShareClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    /// Tenant folder mapped to the uniform root, e.g. `/Shared/Research`.
    root: String,
}

impl EnterpriseShareClient {
    /// Create a client for a tenant.
    pub fn new(base_url: &str, api_token: &str, root_path: &str, timeout: Duration) -> AppResult<Self> {
        if api_token.trim().is_empty() {
            return Err(AppError::configuration("Enterprise share drive has no API token"));
        }
        Ok(Self {
            http: http::build_client(timeout)?,
            base: http::parse_base(base_url)?,
            token: api_token.to_string(),
            root: path::normalize(root_path)?,
        })
    }

    fn tenant_path(&self, uniform: &str) -> AppResult<String> {
        let uniform = path::normalize(uniform)?;
        Ok(if self.root == path::ROOT {
            uniform
        } else if uniform == path::ROOT {
            self.root.clone()
        } else {
            format!("{}{}", self.root, uniform)
        })
    }

    fn uniform_path(&self, tenant: &str) -> AppResult<String> {
        let tenant = path::normalize(tenant)?;
        if tenant == self.root {
            return Ok(path::ROOT.to_string());
        }
        if self.root == path::ROOT {
            return Ok(tenant);
        }
        match tenant.strip_prefix(&self.root) {
            Some(rest) if rest.starts_with('/') => Ok(rest.to_string()),
            _ => Err(AppError::not_found(format!(
                "'{tenant}' lies outside the drive root {}",
                self.root
            ))),
        }
    }

    fn api_url(&self, area: &str, uniform: &str) -> AppResult<Url> {
        let tenant = self.tenant_path(uniform)?;
        http::url_with_segments(
            &self.base,
            ["pubapi", "v1", area]
                .into_iter()
                .chain(path::segments(&tenant)),
        )
    }

    fn id_url(&self, kind: &str, id: &str) -> AppResult<Url> {
        http::url_with_segments(&self.base, ["pubapi", "v1", "fs", "ids", kind, id])
    }

    fn navigate_url(&self, kind: &str, id: &str) -> Option<String> {
        http::url_with_segments(&self.base, ["navigate", kind, id])
            .ok()
            .map(String::from)
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> AppResult<Response> {
        request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| http::transport_error(e, context))
    }

    async fn get_entry(&self, url: Url, context: &str) -> AppResult<ShareEntry> {
        let resp = self.send(self.http.get(url), context).await?;
        let resp = http::check(resp, context).await?;
        http::json(resp, context).await
    }

    async fn entry_by_path(&self, uniform: &str, load_contents: bool) -> AppResult<ShareEntry> {
        let mut url = self.api_url("fs", uniform)?;
        url.query_pairs_mut()
            .append_pair("list_content", if load_contents { "true" } else { "false" });
        self.get_entry(url, &format!("Lookup of {uniform}")).await
    }

    fn to_folder(&self, entry: ShareEntry, load_contents: bool) -> AppResult<VirtualFolder> {
        if !entry.is_folder {
            return Err(AppError::not_found(format!("Not a folder: {}", entry.path)));
        }
        let uniform = self.uniform_path(&entry.path)?;
        let id = entry.folder_id.ok_or_else(|| {
            AppError::backend_unavailable(format!("Folder {} came back without an id", entry.path))
        })?;
        let url = self.navigate_url("folder", &id);
        let folder = VirtualFolder::new(uniform, id)
            .with_url(url)
            .with_parent_id(entry.parent_id);
        if !load_contents {
            return Ok(folder);
        }

        let parent_id = Some(folder.folder_id.clone());
        let mut folders = Vec::with_capacity(entry.folders.len());
        for child in entry.folders {
            folders.push(self.to_folder(child, false)?.with_parent_id(parent_id.clone()));
        }
        let mut files = Vec::with_capacity(entry.files.len());
        for child in entry.files {
            files.push(self.to_file(child)?);
        }
        Ok(folder.with_contents(folders, files))
    }

    fn to_file(&self, entry: ShareEntry) -> AppResult<VirtualFile> {
        if entry.is_folder {
            return Err(AppError::not_found(format!("Not a file: {}", entry.path)));
        }
        let uniform = self.uniform_path(&entry.path)?;
        let id = entry.group_id.ok_or_else(|| {
            AppError::backend_unavailable(format!("File {} came back without an id", entry.path))
        })?;
        Ok(VirtualFile {
            name: entry.name,
            path: uniform,
            url: self.navigate_url("file", &id),
            file_id: id,
            size: entry.size.unwrap_or(0),
            last_modified: parse_timestamp(entry.last_modified.as_deref()),
        })
    }

    /// Move or rename the folder at `source` to the uniform path `target`.
    async fn move_to(&self, source: &str, target: &str) -> AppResult<VirtualFolder> {
        let context = format!("Move of {source} to {target}");
        let body = serde_json::json!({
            "action": "move",
            "destination": self.tenant_path(target)?,
        });
        let resp = self
            .send(self.http.post(self.api_url("fs", source)?).json(&body), &context)
            .await?;
        duplicate_aware(resp, &context).await?;

        info!(from = %source, to = %target, "Moved folder on enterprise share");
        let entry = self.entry_by_path(target, false).await?;
        self.to_folder(entry, false)
    }
}

/// Pass successful responses through, reporting the share's native
/// duplicate errors (409, or 403 mentioning an existing item) as
/// `AlreadyExists`.
async fn duplicate_aware(resp: Response, context: &str) -> AppResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let exists = status == StatusCode::CONFLICT
        || (status == StatusCode::FORBIDDEN && body.to_lowercase().contains("already exists"));
    if exists {
        return Err(AppError::new(
            ErrorKind::AlreadyExists,
            format!("{context}: target already exists"),
        ));
    }
    Err(http::status_error(status, &body, context))
}

#[async_trait]
impl StorageClient for EnterpriseShareClient {
    fn provider_type(&self) -> &str {
        "enterprise_share"
    }

    async fn health_check(&self) -> AppResult<bool> {
        let url = http::url_with_segments(&self.base, ["pubapi", "v1", "userinfo"])?;
        let resp = self.send(self.http.get(url), "Health check").await?;
        Ok(resp.status().is_success())
    }

    async fn find_folder_by_path(&self, path: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let entry = self.entry_by_path(path, load_contents).await?;
        self.to_folder(entry, load_contents)
    }

    async fn find_folder_by_id(&self, id: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let mut url = self.id_url("folder", id)?;
        url.query_pairs_mut()
            .append_pair("list_content", if load_contents { "true" } else { "false" });
        let entry = self.get_entry(url, &format!("Lookup of folder {id}")).await?;
        self.to_folder(entry, load_contents)
    }

    async fn find_file_by_path(&self, path: &str) -> AppResult<VirtualFile> {
        let entry = self.entry_by_path(path, false).await?;
        self.to_file(entry)
    }

    async fn find_file_by_id(&self, id: &str) -> AppResult<VirtualFile> {
        let url = self.id_url("file", id)?;
        let entry = self.get_entry(url, &format!("Lookup of file {id}")).await?;
        self.to_file(entry)
    }

    async fn create_folder(&self, parent_path: &str, name: &str) -> AppResult<VirtualFolder> {
        check_name(name)?;
        let parent = self.find_folder_by_path(parent_path, false).await?;
        let target = path::join(&parent.path, name);
        let context = format!("Creation of {target}");

        let resp = self
            .send(
                self.http
                    .post(self.api_url("fs", &target)?)
                    .json(&serde_json::json!({ "action": "add_folder" })),
                &context,
            )
            .await?;
        let resp = duplicate_aware(resp, &context).await?;
        let created: CreatedFolder = http::json(resp, &context).await?;

        debug!(path = %target, "Created folder on enterprise share");
        match created.folder_id {
            Some(id) => Ok(VirtualFolder::new(target, id.clone())
                .with_url(self.navigate_url("folder", &id))
                .with_parent_id(Some(parent.folder_id))),
            None => self.find_folder_by_path(&target, false).await,
        }
    }

    /// Uploading over an existing file stores a new version of it.
    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        check_name(name)?;
        let parent = self.find_folder_by_path(parent_path, false).await?;
        let target = path::join(&parent.path, name);
        let context = format!("Upload of {target}");
        let size = data.len() as u64;

        let resp = self
            .send(self.http.post(self.api_url("fs-content", &target)?).body(data), &context)
            .await?;
        let resp = http::check(resp, &context).await?;
        let uploaded: UploadedFile = http::json(resp, &context).await?;

        debug!(path = %target, bytes = size, "Uploaded file to enterprise share");
        Ok(VirtualFile {
            name: name.to_string(),
            path: target,
            url: self.navigate_url("file", &uploaded.group_id),
            last_modified: parse_timestamp(uploaded.last_modified.as_deref()),
            file_id: uploaded.group_id,
            size,
        })
    }

    async fn rename_folder(&self, path: &str, new_name: &str) -> AppResult<VirtualFolder> {
        check_name(new_name)?;
        let source = path::normalize(path)?;
        let parent = path::parent(&source)
            .ok_or_else(|| AppError::validation("The drive root cannot be renamed"))?;
        self.move_to(&source, &path::join(&parent, new_name)).await
    }

    async fn move_folder(&self, path: &str, new_parent_path: &str) -> AppResult<VirtualFolder> {
        let source = path::normalize(path)?;
        let new_parent = path::normalize(new_parent_path)?;
        let target = path::join(&new_parent, path::name(&source));
        if source == path::ROOT || target == source || path::is_descendant(&target, &source) {
            return Err(AppError::validation(format!(
                "Cannot move '{source}' to '{target}'"
            )));
        }
        self.move_to(&source, &target).await
    }

    async fn fetch_file(&self, path: &str) -> AppResult<ByteStream> {
        let context = format!("Download of {path}");
        let resp = self
            .send(self.http.get(self.api_url("fs-content", path)?), &context)
            .await?;
        let resp = http::check(resp, &context).await?;
        Ok(http::body_stream(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> EnterpriseShareClient {
        EnterpriseShareClient::new(&server.url(), "secret", "/Shared/Research", Duration::from_secs(5))
            .unwrap()
    }

    fn folder_json(path: &str, id: &str) -> String {
        let name = path.rsplit('/').next().unwrap_or_default();
        serde_json::json!({
            "name": name,
            "path": path,
            "folder_id": id,
            "is_folder": true
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_lookup_strips_tenant_root_and_lists_contents() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pubapi/v1/fs/Shared/Research/Studies")
            .match_query(Matcher::UrlEncoded("list_content".into(), "true".into()))
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "name": "Studies",
                    "path": "/Shared/Research/Studies",
                    "folder_id": "f-studies",
                    "parent_id": "f-root",
                    "is_folder": true,
                    "folders": [{
                        "name": "CPA-10001",
                        "path": "/Shared/Research/Studies/CPA-10001",
                        "folder_id": "f-cpa",
                        "is_folder": true
                    }],
                    "files": [{
                        "name": "protocol.pdf",
                        "path": "/Shared/Research/Studies/protocol.pdf",
                        "group_id": "g-1",
                        "is_folder": false,
                        "size": 2048,
                        "last_modified": "Mon, 05 Oct 2020 12:00:00 GMT"
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let folder = client(&server)
            .find_folder_by_path("/Studies", true)
            .await
            .unwrap();
        mock.assert_async().await;

        assert_eq!(folder.path, "/Studies");
        assert_eq!(folder.folder_id, "f-studies");
        assert_eq!(folder.parent.as_ref().unwrap().folder_id.as_deref(), Some("f-root"));
        assert_eq!(folder.folders[0].path, "/Studies/CPA-10001");
        assert_eq!(folder.files[0].file_id, "g-1");
        assert_eq!(folder.files[0].size, 2048);
        assert!(folder.files[0].last_modified.is_some());
        assert!(folder.url.unwrap().ends_with("/navigate/folder/f-studies"));
    }

    #[tokio::test]
    async fn test_forbidden_already_exists_maps_to_already_exists() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(folder_json("/Shared/Research", "f-root"))
            .create_async()
            .await;
        server
            .mock("POST", "/pubapi/v1/fs/Shared/Research/Studies")
            .with_status(403)
            .with_body(r#"{"errorMessage":"A folder with this name already exists."}"#)
            .create_async()
            .await;

        let err = client(&server).create_folder("/", "Studies").await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn test_create_folder_returns_new_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(folder_json("/Shared/Research", "f-root"))
            .create_async()
            .await;
        let create = server
            .mock("POST", "/pubapi/v1/fs/Shared/Research/Studies")
            .match_body(Matcher::Json(serde_json::json!({ "action": "add_folder" })))
            .with_status(201)
            .with_body(r#"{"path":"/Shared/Research/Studies","folder_id":"f-new"}"#)
            .create_async()
            .await;

        let folder = client(&server).create_folder("/", "Studies").await.unwrap();
        create.assert_async().await;
        assert_eq!(folder.path, "/Studies");
        assert_eq!(folder.folder_id, "f-new");
        assert_eq!(folder.parent.unwrap().folder_id.as_deref(), Some("f-root"));
    }

    #[tokio::test]
    async fn test_upload_reports_server_timestamp() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research/Studies")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(folder_json("/Shared/Research/Studies", "f-studies"))
            .create_async()
            .await;
        server
            .mock("POST", "/pubapi/v1/fs-content/Shared/Research/Studies/dosing.csv")
            .with_status(200)
            .with_body(r#"{"group_id":"g-7","last_modified":"Tue, 06 Oct 2020 08:30:00 GMT"}"#)
            .create_async()
            .await;
        server
            .mock("POST", "/pubapi/v1/fs-content/Shared/Research/Studies/notes.txt")
            .with_status(200)
            .with_body(r#"{"group_id":"g-8"}"#)
            .create_async()
            .await;

        let client = client(&server);
        let file = client
            .upload_file("/Studies", "dosing.csv", Bytes::from_static(b"a,b\n"))
            .await
            .unwrap();
        assert_eq!(file.file_id, "g-7");
        assert_eq!(file.path, "/Studies/dosing.csv");
        assert_eq!(
            file.last_modified.unwrap().to_rfc3339(),
            "2020-10-06T08:30:00+00:00"
        );

        let file = client
            .upload_file("/Studies", "notes.txt", Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert!(file.last_modified.is_none());
    }

    #[tokio::test]
    async fn test_rename_keeps_folder_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/pubapi/v1/fs/Shared/Research/Old")
            .match_body(Matcher::Json(serde_json::json!({
                "action": "move",
                "destination": "/Shared/Research/New"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research/New")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(folder_json("/Shared/Research/New", "f-42"))
            .create_async()
            .await;

        let folder = client(&server).rename_folder("/Old", "New").await.unwrap();
        assert_eq!(folder.path, "/New");
        assert_eq!(folder.folder_id, "f-42");
    }

    #[tokio::test]
    async fn test_status_translation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research/Missing")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/pubapi/v1/fs/Shared/Research/Locked")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let client = client(&server);
        let err = client.find_folder_by_path("/Missing", false).await.unwrap_err();
        assert!(err.is_not_found());
        let err = client.find_folder_by_path("/Locked", false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::BackendUnavailable);
    }
}
