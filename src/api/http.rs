//! HTTP client for the DocHub REST API
//!
//! The category/course structure comes from a single `GET /api/tree/`
//! downloaded at connect time (catalog unreachable there means the mount
//! never happens). Course pages and document bytes are fetched lazily.

use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{CatalogClient, CatalogError, ChildRecord, NodeId, NodeKind};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
    #[serde(default)]
    children: Vec<RawCategory>,
    #[serde(default)]
    courses: Vec<RawCourse>,
}

#[derive(Debug, Deserialize)]
struct RawCourse {
    slug: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawCoursePage {
    #[serde(default)]
    document_set: Vec<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    id: i64,
    name: String,
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    file_size: u64,
    #[serde(default)]
    date: Option<String>,
    /// Slug of the course the document claims to belong to.
    #[serde(default)]
    course: Option<String>,
}

/// Production catalog client speaking the DocHub REST API.
pub struct HttpCatalogClient {
    base_url: Url,
    http: Client,
    /// Category structure snapshot taken at connect time. Categories have
    /// no server-side identity, so their listings are stable for the
    /// session and never re-fetched.
    tree: HashMap<NodeId, Vec<ChildRecord>>,
    mount_time: SystemTime,
}

impl HttpCatalogClient {
    /// Build a client and download the catalog tree. Errors here are
    /// fatal to the mount.
    pub async fn connect(base_url: Url, token: &str) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {token}"))
            .map_err(|_| CatalogError::Malformed("token is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        let agent = format!(
            "dochubfs/{} {} {}",
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent)
                .map_err(|_| CatalogError::Malformed("bad user agent".into()))?,
        );
        let http = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        info!(%base_url, "downloading catalog tree");
        let roots: Vec<RawCategory> = get_json(&http, &base_url, "/api/tree/").await?;
        let mount_time = SystemTime::now();
        let tree = flatten_tree(roots, mount_time);

        Ok(Self {
            base_url,
            http,
            tree,
            mount_time,
        })
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn list_children(&self, node: &NodeId) -> Result<Vec<ChildRecord>, CatalogError> {
        match node {
            NodeId::Root | NodeId::Category(_) => {
                Ok(self.tree.get(node).cloned().unwrap_or_default())
            }
            NodeId::Course(slug) => {
                debug!(%slug, "downloading course page");
                let page: RawCoursePage =
                    get_json(&self.http, &self.base_url, &format!("/api/courses/{slug}/")).await?;
                Ok(page
                    .document_set
                    .into_iter()
                    .map(|doc| document_record(doc, self.mount_time))
                    .collect())
            }
            NodeId::Document(_) => Err(CatalogError::NotAFolder(node.clone())),
        }
    }

    async fn fetch_content(&self, node: &NodeId) -> Result<Vec<u8>, CatalogError> {
        let NodeId::Document(id) = node else {
            return Err(CatalogError::NotADocument(node.clone()));
        };

        info!(doc = *id, "downloading document");
        let url = join_url(&self.base_url, &format!("/api/documents/{id}/original/"))?;
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            return Err(CatalogError::Status(
                status,
                response.text().await.unwrap_or_default(),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

fn join_url(base: &Url, path: &str) -> Result<Url, CatalogError> {
    base.join(path)
        .map_err(|err| CatalogError::Malformed(format!("bad api path {path}: {err}")))
}

async fn get_json<T: DeserializeOwned>(
    http: &Client,
    base: &Url,
    path: &str,
) -> Result<T, CatalogError> {
    let response = http.get(join_url(base, path)?).send().await?;
    if !response.status().is_success() {
        let status = response.status();
        return Err(CatalogError::Status(
            status,
            response.text().await.unwrap_or_default(),
        ));
    }
    Ok(response.json().await?)
}

/// Flatten the nested tree payload into per-folder child records.
///
/// Category identity is the slash-joined path of category names from the
/// root. A single top-level category is treated as the root itself,
/// matching how the service reports its tree.
fn flatten_tree(
    mut roots: Vec<RawCategory>,
    mount_time: SystemTime,
) -> HashMap<NodeId, Vec<ChildRecord>> {
    let mut tree = HashMap::new();
    if roots.len() == 1 {
        let root = roots.remove(0);
        flatten_category(NodeId::Root, "", root.children, root.courses, mount_time, &mut tree);
    } else {
        flatten_category(NodeId::Root, "", roots, Vec::new(), mount_time, &mut tree);
    }
    tree
}

fn flatten_category(
    id: NodeId,
    path: &str,
    children: Vec<RawCategory>,
    courses: Vec<RawCourse>,
    mount_time: SystemTime,
    tree: &mut HashMap<NodeId, Vec<ChildRecord>>,
) {
    let mut records = Vec::with_capacity(children.len() + courses.len());

    for child in children {
        let child_path = if path.is_empty() {
            child.name.clone()
        } else {
            format!("{path}/{}", child.name)
        };
        let child_id = NodeId::Category(child_path.clone());
        records.push(ChildRecord {
            id: child_id.clone(),
            name: child.name.clone(),
            kind: NodeKind::Folder,
            size: 0,
            mtime: mount_time,
            parent: Some(id.clone()),
        });
        flatten_category(
            child_id,
            &child_path,
            child.children,
            child.courses,
            mount_time,
            tree,
        );
    }

    for course in courses {
        records.push(ChildRecord {
            id: NodeId::Course(course.slug.clone()),
            // Courses list under "<slug> <name>", e.g. "PHYS-F-101 Physique".
            name: format!("{} {}", course.slug, course.name),
            kind: NodeKind::Folder,
            size: 0,
            mtime: mount_time,
            parent: Some(id.clone()),
        });
    }

    tree.insert(id, records);
}

fn document_record(doc: RawDocument, mount_time: SystemTime) -> ChildRecord {
    let mtime = match doc.date.as_deref() {
        Some(raw) => match DateTime::parse_from_rfc3339(raw) {
            Ok(parsed) => SystemTime::from(parsed),
            Err(err) => {
                warn!(doc = doc.id, %raw, %err, "unparseable document date");
                mount_time
            }
        },
        None => mount_time,
    };

    ChildRecord {
        id: NodeId::Document(doc.id),
        // Documents list under "<name><file_type>", e.g. "Notes.pdf".
        name: format!("{}{}", doc.name, doc.file_type),
        kind: NodeKind::Document,
        size: doc.file_size,
        mtime,
        parent: doc.course.map(NodeId::Course),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_tree(json: &str) -> Vec<RawCategory> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_flatten_single_root() {
        let roots = parse_tree(
            r#"[{
                "name": "ULB",
                "children": [
                    {"name": "Sciences", "children": [], "courses": [
                        {"slug": "phys-f-101", "name": "Physique"}
                    ]}
                ],
                "courses": []
            }]"#,
        );
        let tree = flatten_tree(roots, SystemTime::UNIX_EPOCH);

        let root = tree.get(&NodeId::Root).unwrap();
        assert_eq!(root.len(), 1);
        assert_eq!(root[0].name, "Sciences");
        assert_eq!(root[0].id, NodeId::Category("Sciences".to_string()));
        assert_eq!(root[0].kind, NodeKind::Folder);

        let sciences = tree.get(&NodeId::Category("Sciences".to_string())).unwrap();
        assert_eq!(sciences.len(), 1);
        assert_eq!(sciences[0].name, "phys-f-101 Physique");
        assert_eq!(sciences[0].id, NodeId::Course("phys-f-101".to_string()));
    }

    #[test]
    fn test_flatten_nested_category_paths() {
        let roots = parse_tree(
            r#"[{
                "name": "root",
                "children": [
                    {"name": "a", "children": [{"name": "b", "children": [], "courses": []}], "courses": []}
                ],
                "courses": []
            }]"#,
        );
        let tree = flatten_tree(roots, SystemTime::UNIX_EPOCH);

        let a = tree.get(&NodeId::Category("a".to_string())).unwrap();
        assert_eq!(a[0].id, NodeId::Category("a/b".to_string()));
        assert!(tree.contains_key(&NodeId::Category("a/b".to_string())));
    }

    #[test]
    fn test_flatten_multiple_roots_become_root_children() {
        let roots = parse_tree(
            r#"[
                {"name": "x", "children": [], "courses": []},
                {"name": "y", "children": [], "courses": []}
            ]"#,
        );
        let tree = flatten_tree(roots, SystemTime::UNIX_EPOCH);

        let root = tree.get(&NodeId::Root).unwrap();
        let names: Vec<_> = root.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_document_record_naming_and_date() {
        let doc: RawDocument = serde_json::from_str(
            r#"{"id": 42, "name": "Notes", "file_type": ".pdf",
                "file_size": 500, "date": "2017-05-13T09:00:00.000000Z"}"#,
        )
        .unwrap();
        let record = document_record(doc, SystemTime::UNIX_EPOCH);

        assert_eq!(record.id, NodeId::Document(42));
        assert_eq!(record.name, "Notes.pdf");
        assert_eq!(record.size, 500);
        assert_ne!(record.mtime, SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_document_record_bad_date_falls_back() {
        let doc: RawDocument = serde_json::from_str(
            r#"{"id": 1, "name": "x", "file_type": ".txt", "date": "not a date"}"#,
        )
        .unwrap();
        let record = document_record(doc, SystemTime::UNIX_EPOCH);
        assert_eq!(record.mtime, SystemTime::UNIX_EPOCH);
    }
}
