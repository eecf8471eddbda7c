use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::Result;
use crate::types::ContainerFileRef;
use crate::unpack::ContainerFiles;
use crate::utils::http::send_checked;

/// Fetches cited container files over HTTP and stores them under a local
/// directory, one uniquely named file per citation.
#[derive(Clone)]
pub struct ContainerFileClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    dir: PathBuf,
}

impl ContainerFileClient {
    pub fn new(api_key: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .expect("reqwest client build should not fail");

        Self {
            http,
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: api_key.into(),
            dir: dir.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn content_url(&self, file: &ContainerFileRef) -> String {
        let base = self.base_url.trim_end_matches('/');
        format!(
            "{base}/containers/{}/files/{}/content",
            file.container_id, file.file_id
        )
    }
}

/// The file id is server-supplied; anything that could act as a path
/// component is replaced before it becomes part of a local file name.
fn local_file_name(file_id: &str) -> String {
    let sanitized: String = file_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{sanitized}-{}", uuid::Uuid::new_v4())
}

#[async_trait]
impl ContainerFiles for ContainerFileClient {
    async fn download(&self, files: &[ContainerFileRef]) -> Result<Vec<PathBuf>> {
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            let response = send_checked(
                self.http
                    .get(self.content_url(file))
                    .bearer_auth(&self.api_key),
            )
            .await?;
            let bytes: bytes::Bytes = response.bytes().await?;

            let path = self.dir.join(local_file_name(&file.file_id));
            tokio::fs::write(&path, &bytes).await?;
            debug!(path = %path.display(), "container file stored");
            out.push(path);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    #[tokio::test]
    async fn downloads_each_cited_file_to_disk() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/containers/cont_1/files/file_1/content")
                    .header("authorization", "Bearer sk-test");
                then.status(200).body("csv,data");
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let client =
            ContainerFileClient::new("sk-test", dir.path()).with_base_url(server.base_url());
        let refs = vec![ContainerFileRef {
            container_id: "cont_1".to_string(),
            file_id: "file_1".to_string(),
        }];
        let paths = client.download(&refs).await?;

        mock.assert_async().await;
        assert_eq!(paths.len(), 1);
        assert_eq!(tokio::fs::read(&paths[0]).await?, b"csv,data");
        Ok(())
    }

    #[test]
    fn file_ids_with_path_separators_stay_in_the_directory() {
        let name = local_file_name("../../etc/passwd");
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
        assert!(name.starts_with(".._.._etc_passwd-"));

        let plain = local_file_name("file_1");
        assert!(plain.starts_with("file_1-"));
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_as_api_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET);
                then.status(404).body("gone");
            })
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let client =
            ContainerFileClient::new("sk-test", dir.path()).with_base_url(server.base_url());
        let refs = vec![ContainerFileRef {
            container_id: "cont_1".to_string(),
            file_id: "missing".to_string(),
        }];
        let err = client.download(&refs).await.expect_err("must fail");
        assert!(matches!(err, crate::ColloquyError::Api { .. }));
    }
}
