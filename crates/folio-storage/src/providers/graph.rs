//! Cloud-drive client over a graph-style API.
//!
//! Items are addressed by id. A uniform path is derived backwards from an
//! item's `parentReference.path`, and a lookup by path walks children from
//! the drive root, matching names case-insensitively the way the service
//! does.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use reqwest::{RequestBuilder, Response, Url};
use serde::Deserialize;
use tracing::{debug, info};

use folio_core::error::AppError;
use folio_core::result::AppResult;
use folio_core::traits::storage::{ByteStream, StorageClient, VirtualFile, VirtualFolder};
use folio_core::types::path;
use folio_entity::ConflictBehavior;

use super::check_name;
use super::http;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveItem {
    id: String,
    name: String,
    #[serde(default)]
    web_url: Option<String>,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    last_modified_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    folder: Option<serde_json::Value>,
    #[serde(default)]
    root: Option<serde_json::Value>,
    #[serde(default)]
    parent_reference: Option<ParentReference>,
}

impl DriveItem {
    fn is_folder(&self) -> bool {
        self.folder.is_some() || self.root.is_some()
    }

    fn parent_id(&self) -> Option<String> {
        self.parent_reference.as_ref().and_then(|p| p.id.clone())
    }

    /// Path of the item inside the drive, reconstructed from its parent.
    fn drive_path(&self) -> String {
        if self.root.is_some() {
            return path::ROOT.to_string();
        }
        let parent = self
            .parent_reference
            .as_ref()
            .and_then(|p| p.path.as_deref())
            .and_then(|p| p.split_once("root:").map(|(_, rest)| rest))
            .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
            .unwrap_or_default();
        path::join(if parent.is_empty() { path::ROOT } else { &parent }, &self.name)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ParentReference {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ItemPage {
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink", default)]
    next_link: Option<String>,
}

/// Client for one cloud drive.
#[derive(Debug, Clone)]
pub struct CloudDriveClient {
    http: reqwest::Client,
    graph: Url,
    drive_id: String,
    token: String,
    /// Folder inside the drive mapped to the uniform root.
    root: String,
    conflict: ConflictBehavior,
}

impl CloudDriveClient {
    /// Create a client for a drive.
    pub fn new(
        graph_url: &str,
        drive_id: &str,
        access_token: &str,
        root_path: &str,
        conflict: ConflictBehavior,
        timeout: Duration,
    ) -> AppResult<Self> {
        if access_token.trim().is_empty() {
            return Err(AppError::configuration("Cloud drive has no access token"));
        }
        Ok(Self {
            http: http::build_client(timeout)?,
            graph: http::parse_base(graph_url)?,
            drive_id: drive_id.to_string(),
            token: access_token.to_string(),
            root: path::normalize(root_path)?,
            conflict,
        })
    }

    fn drive_url<'a>(&'a self, segments: impl IntoIterator<Item = &'a str>) -> AppResult<Url> {
        http::url_with_segments(
            &self.graph,
            ["drives", self.drive_id.as_str()].into_iter().chain(segments),
        )
    }

    fn drive_path(&self, uniform: &str) -> AppResult<String> {
        let uniform = path::normalize(uniform)?;
        Ok(if self.root == path::ROOT {
            uniform
        } else if uniform == path::ROOT {
            self.root.clone()
        } else {
            format!("{}{}", self.root, uniform)
        })
    }

    fn uniform_path(&self, drive_path: &str) -> AppResult<String> {
        let drive_path = path::normalize(drive_path)?;
        if self.root == path::ROOT {
            return Ok(drive_path);
        }
        let outside = || {
            AppError::not_found(format!(
                "'{drive_path}' lies outside the drive root {}",
                self.root
            ))
        };
        let head = drive_path.get(..self.root.len()).ok_or_else(outside)?;
        if !head.eq_ignore_ascii_case(&self.root) {
            return Err(outside());
        }
        match &drive_path[self.root.len()..] {
            "" => Ok(path::ROOT.to_string()),
            rest if rest.starts_with('/') => Ok(rest.to_string()),
            _ => Err(outside()),
        }
    }

    async fn send(&self, request: RequestBuilder, context: &str) -> AppResult<Response> {
        request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| http::transport_error(e, context))
    }

    async fn get_item(&self, url: Url, context: &str) -> AppResult<DriveItem> {
        let resp = self.send(self.http.get(url), context).await?;
        let resp = http::check(resp, context).await?;
        http::json(resp, context).await
    }

    async fn children(&self, item_id: &str) -> AppResult<Vec<DriveItem>> {
        let context = format!("Listing of item {item_id}");
        let mut url = self.drive_url(["items", item_id, "children"])?;
        let mut items = Vec::new();
        loop {
            let resp = self.send(self.http.get(url), &context).await?;
            let resp = http::check(resp, &context).await?;
            let page: ItemPage = http::json(resp, &context).await?;
            items.extend(page.value);
            match page.next_link {
                Some(next) => {
                    url = Url::parse(&next).map_err(|e| {
                        AppError::backend_unavailable(format!("{context}: bad next link: {e}"))
                    })?;
                }
                None => break,
            }
        }
        Ok(items)
    }

    /// Walk from the drive root to the item at a uniform path.
    async fn item_by_path(&self, uniform: &str) -> AppResult<DriveItem> {
        let full = self.drive_path(uniform)?;
        let mut current = self
            .get_item(self.drive_url(["root"])?, "Lookup of drive root")
            .await?;
        for segment in path::segments(&full) {
            let children = self.children(&current.id).await?;
            current = children
                .into_iter()
                .find(|child| child.name.eq_ignore_ascii_case(segment))
                .ok_or_else(|| AppError::not_found(format!("Nothing at {uniform}")))?;
        }
        Ok(current)
    }

    async fn folder_item(&self, uniform: &str) -> AppResult<DriveItem> {
        let item = self.item_by_path(uniform).await?;
        if !item.is_folder() {
            return Err(AppError::not_found(format!("Not a folder: {uniform}")));
        }
        Ok(item)
    }

    async fn to_folder(&self, item: DriveItem, load_contents: bool) -> AppResult<VirtualFolder> {
        if !item.is_folder() {
            return Err(AppError::not_found(format!("Item {} is not a folder", item.id)));
        }
        let uniform = self.uniform_path(&item.drive_path())?;
        let folder = VirtualFolder::new(uniform.clone(), item.id.clone())
            .with_url(item.web_url.clone())
            .with_parent_id(item.parent_id());
        if !load_contents {
            return Ok(folder);
        }

        let mut folders = Vec::new();
        let mut files = Vec::new();
        for child in self.children(&item.id).await? {
            let child_path = path::join(&uniform, &child.name);
            if child.is_folder() {
                folders.push(
                    VirtualFolder::new(child_path, child.id)
                        .with_url(child.web_url)
                        .with_parent_id(Some(item.id.clone())),
                );
            } else {
                files.push(file_at(child_path, child));
            }
        }
        Ok(folder.with_contents(folders, files))
    }

    async fn patch_folder(
        &self,
        item: &DriveItem,
        body: serde_json::Value,
        target: &str,
        context: &str,
    ) -> AppResult<VirtualFolder> {
        let url = self.drive_url(["items", item.id.as_str()])?;
        let resp = self.send(self.http.patch(url).json(&body), context).await?;
        let resp = http::check(resp, context).await?;
        let updated: DriveItem = http::json(resp, context).await?;
        Ok(VirtualFolder::new(target.to_string(), updated.id.clone())
            .with_url(updated.web_url.clone())
            .with_parent_id(updated.parent_id()))
    }
}

fn file_at(path: String, item: DriveItem) -> VirtualFile {
    VirtualFile {
        name: item.name,
        path,
        file_id: item.id,
        url: item.web_url,
        size: item.size.unwrap_or(0),
        last_modified: item.last_modified_date_time,
    }
}

#[async_trait]
impl StorageClient for CloudDriveClient {
    fn provider_type(&self) -> &str {
        "cloud_drive"
    }

    async fn health_check(&self) -> AppResult<bool> {
        let resp = self
            .send(self.http.get(self.drive_url([])?), "Health check")
            .await?;
        Ok(resp.status().is_success())
    }

    async fn find_folder_by_path(&self, path: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let item = self.folder_item(path).await?;
        self.to_folder(item, load_contents).await
    }

    async fn find_folder_by_id(&self, id: &str, load_contents: bool) -> AppResult<VirtualFolder> {
        let item = self
            .get_item(self.drive_url(["items", id])?, &format!("Lookup of item {id}"))
            .await?;
        self.to_folder(item, load_contents).await
    }

    async fn find_file_by_path(&self, path: &str) -> AppResult<VirtualFile> {
        let item = self.item_by_path(path).await?;
        if item.is_folder() {
            return Err(AppError::not_found(format!("Not a file: {path}")));
        }
        Ok(file_at(path::normalize(path)?, item))
    }

    async fn find_file_by_id(&self, id: &str) -> AppResult<VirtualFile> {
        let item = self
            .get_item(self.drive_url(["items", id])?, &format!("Lookup of item {id}"))
            .await?;
        if item.is_folder() {
            return Err(AppError::not_found(format!("Item {id} is not a file")));
        }
        let uniform = self.uniform_path(&item.drive_path())?;
        Ok(file_at(uniform, item))
    }

    /// With `replace` conflict behaviour the service would silently replace
    /// an existing folder, so existence is checked first.
    async fn create_folder(&self, parent_path: &str, name: &str) -> AppResult<VirtualFolder> {
        check_name(name)?;
        let parent_path = path::normalize(parent_path)?;
        let parent = self.folder_item(&parent_path).await?;
        let target = path::join(&parent_path, name);
        let context = format!("Creation of {target}");

        if self.conflict == ConflictBehavior::Replace {
            let taken = self
                .children(&parent.id)
                .await?
                .iter()
                .any(|child| child.name.eq_ignore_ascii_case(name));
            if taken {
                return Err(AppError::already_exists(format!(
                    "Folder already exists: {target}"
                )));
            }
        }

        let body = serde_json::json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": self.conflict.as_str(),
        });
        let url = self.drive_url(["items", parent.id.as_str(), "children"])?;
        let resp = self.send(self.http.post(url).json(&body), &context).await?;
        let resp = http::check(resp, &context).await?;
        let created: DriveItem = http::json(resp, &context).await?;

        debug!(path = %target, id = %created.id, "Created folder on cloud drive");
        Ok(VirtualFolder::new(path::join(&parent_path, &created.name), created.id)
            .with_url(created.web_url)
            .with_parent_id(Some(parent.id)))
    }

    /// Uploading replaces the content of an existing file.
    async fn upload_file(&self, parent_path: &str, name: &str, data: Bytes) -> AppResult<VirtualFile> {
        check_name(name)?;
        let parent_path = path::normalize(parent_path)?;
        let parent = self.folder_item(&parent_path).await?;
        let context = format!("Upload of {name} into {parent_path}");
        let size = data.len();

        let parent_segment = format!("{}:", parent.id);
        let name_segment = format!("{name}:");
        let url = self.drive_url([
            "items",
            parent_segment.as_str(),
            name_segment.as_str(),
            "content",
        ])?;
        let resp = self.send(self.http.put(url).body(data), &context).await?;
        let resp = http::check(resp, &context).await?;
        let item: DriveItem = http::json(resp, &context).await?;

        debug!(parent = %parent_path, name, bytes = size, "Uploaded file to cloud drive");
        Ok(file_at(path::join(&parent_path, &item.name), item))
    }

    async fn rename_folder(&self, path: &str, new_name: &str) -> AppResult<VirtualFolder> {
        check_name(new_name)?;
        let source = path::normalize(path)?;
        let parent = path::parent(&source)
            .ok_or_else(|| AppError::validation("The drive root cannot be renamed"))?;
        let item = self.folder_item(&source).await?;
        let target = path::join(&parent, new_name);
        let context = format!("Rename of {source} to {new_name}");

        let folder = self
            .patch_folder(&item, serde_json::json!({ "name": new_name }), &target, &context)
            .await?;
        info!(from = %source, to = %target, id = %folder.folder_id, "Renamed folder on cloud drive");
        Ok(folder)
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
        let item = self.folder_item(&source).await?;
        let parent = self.folder_item(&new_parent).await?;
        let context = format!("Move of {source} to {new_parent}");

        let folder = self
            .patch_folder(
                &item,
                serde_json::json!({ "parentReference": { "id": parent.id } }),
                &target,
                &context,
            )
            .await?;
        info!(from = %source, to = %target, id = %folder.folder_id, "Moved folder on cloud drive");
        Ok(folder)
    }

    async fn fetch_file(&self, path: &str) -> AppResult<ByteStream> {
        let item = self.item_by_path(path).await?;
        if item.is_folder() {
            return Err(AppError::not_found(format!("Not a file: {path}")));
        }
        let context = format!("Download of {path}");
        let url = self.drive_url(["items", item.id.as_str(), "content"])?;
        let resp = self.send(self.http.get(url), &context).await?;
        let resp = http::check(resp, &context).await?;
        Ok(http::body_stream(resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::ErrorKind;
    use mockito::Matcher;

    fn client(server: &mockito::Server, conflict: ConflictBehavior) -> CloudDriveClient {
        CloudDriveClient::new(
            &server.url(),
            "d1",
            "token",
            "/Research",
            conflict,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    async fn mock_tree(server: &mut mockito::Server) {
        server
            .mock("GET", "/drives/d1/root")
            .with_status(200)
            .with_body(r#"{"id":"root-id","name":"root","root":{},"folder":{}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/drives/d1/items/root-id/children")
            .with_status(200)
            .with_body(
                r#"{"value":[{"id":"r1","name":"research","folder":{"childCount":1},
                    "parentReference":{"id":"root-id","path":"/drive/root:"}}]}"#,
            )
            .create_async()
            .await;
        server
            .mock("GET", "/drives/d1/items/r1/children")
            .with_status(200)
            .with_body(
                r#"{"value":[{"id":"s1","name":"CPA-10001","folder":{"childCount":0},
                    "webUrl":"https://drive.example.com/s1",
                    "parentReference":{"id":"r1","path":"/drive/root:/research"}}]}"#,
            )
            .create_async()
            .await;
    }

    #[test]
    fn test_item_path_decodes_parent_reference() {
        let item: DriveItem = serde_json::from_str(
            r#"{"id":"a1","name":"PK Panel","folder":{},
                "parentReference":{"id":"s1","path":"/drive/root:/Research/CPA-10001%20-%20First%20In%20Human"}}"#,
        )
        .unwrap();
        assert_eq!(
            item.drive_path(),
            "/Research/CPA-10001 - First In Human/PK Panel"
        );
    }

    #[tokio::test]
    async fn test_lookup_walks_children_case_insensitively() {
        let mut server = mockito::Server::new_async().await;
        mock_tree(&mut server).await;

        let folder = client(&server, ConflictBehavior::Fail)
            .find_folder_by_path("/cpa-10001", false)
            .await
            .unwrap();
        assert_eq!(folder.path, "/CPA-10001");
        assert_eq!(folder.folder_id, "s1");
        assert_eq!(folder.parent.unwrap().folder_id.as_deref(), Some("r1"));
        assert_eq!(folder.url.as_deref(), Some("https://drive.example.com/s1"));
    }

    #[tokio::test]
    async fn test_children_follow_next_link() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/drives/d1/items/r1")
            .with_status(200)
            .with_body(
                r#"{"id":"r1","name":"Research","folder":{},
                    "parentReference":{"id":"root-id","path":"/drive/root:"}}"#,
            )
            .create_async()
            .await;
        let next = format!("{}/drives/d1/items/r1/children?$skiptoken=abc", server.url());
        server
            .mock("GET", "/drives/d1/items/r1/children")
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "value": [{"id": "a", "name": "A", "folder": {}}],
                    "@odata.nextLink": next
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/drives/d1/items/r1/children")
            .match_query(Matcher::UrlEncoded("$skiptoken".into(), "abc".into()))
            .with_status(200)
            .with_body(r#"{"value":[{"id":"b","name":"b.txt","file":{},"size":3}]}"#)
            .create_async()
            .await;

        let folder = client(&server, ConflictBehavior::Fail)
            .find_folder_by_id("r1", true)
            .await
            .unwrap();
        assert_eq!(folder.path, "/");
        assert_eq!(folder.folders.len(), 1);
        assert_eq!(folder.folders[0].path, "/A");
        assert_eq!(folder.files[0].path, "/b.txt");
        assert_eq!(folder.files[0].size, 3);
    }

    #[tokio::test]
    async fn test_conflict_on_create_is_already_exists() {
        let mut server = mockito::Server::new_async().await;
        mock_tree(&mut server).await;
        server
            .mock("POST", "/drives/d1/items/r1/children")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "name": "CPA-10001",
                "@microsoft.graph.conflictBehavior": "fail"
            })))
            .with_status(409)
            .with_body(r#"{"error":{"code":"nameAlreadyExists"}}"#)
            .create_async()
            .await;

        let err = client(&server, ConflictBehavior::Fail)
            .create_folder("/", "CPA-10001")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_replace_mode_checks_existence_first() {
        let mut server = mockito::Server::new_async().await;
        mock_tree(&mut server).await;
        let post = server
            .mock("POST", "/drives/d1/items/r1/children")
            .expect(0)
            .create_async()
            .await;

        let err = client(&server, ConflictBehavior::Replace)
            .create_folder("/", "cpa-10001")
            .await
            .unwrap_err();
        assert!(err.is_already_exists());
        post.assert_async().await;
    }

    #[tokio::test]
    async fn test_rename_keeps_item_id() {
        let mut server = mockito::Server::new_async().await;
        mock_tree(&mut server).await;
        server
            .mock("PATCH", "/drives/d1/items/s1")
            .match_body(Matcher::Json(serde_json::json!({ "name": "CPA-10001 - Renamed" })))
            .with_status(200)
            .with_body(
                r#"{"id":"s1","name":"CPA-10001 - Renamed","folder":{},
                    "parentReference":{"id":"r1","path":"/drive/root:/research"}}"#,
            )
            .create_async()
            .await;

        let folder = client(&server, ConflictBehavior::Fail)
            .rename_folder("/CPA-10001", "CPA-10001 - Renamed")
            .await
            .unwrap();
        assert_eq!(folder.folder_id, "s1");
        assert_eq!(folder.path, "/CPA-10001 - Renamed");
    }
}
