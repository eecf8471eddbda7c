use std::path::PathBuf;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, error};

use crate::model::Mode;
use crate::reply::{Annotation, Reply, ReplyContent, ReplyItem};
use crate::types::{ContainerFileRef, ContextRecord};
use crate::{ColloquyError, Result};

/// Supplies a unique local path per generated image.
pub trait ImagePaths: Send + Sync {
    fn unique_path(&self, ext: &str) -> PathBuf;
}

/// Directory-based path generator with uuid file names.
#[derive(Debug, Clone)]
pub struct DirImagePaths {
    dir: PathBuf,
}

impl DirImagePaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ImagePaths for DirImagePaths {
    fn unique_path(&self, ext: &str) -> PathBuf {
        self.dir.join(format!("{}.{ext}", uuid::Uuid::new_v4()))
    }
}

/// Downloads cited container files. Failures are logged by the unpacker and
/// never abort the unpack.
#[async_trait]
pub trait ContainerFiles: Send + Sync {
    async fn download(&self, files: &[ContainerFileRef]) -> Result<Vec<PathBuf>>;
}

/// Walk a reply and populate the context record: output text, tool calls,
/// message id, token usage, plus (in chat mode) generated images, code
/// interpreter transcripts and citations.
pub async fn unpack_response(
    mode: Mode,
    reply: &Reply,
    ctx: &mut ContextRecord,
    images: &dyn ImagePaths,
    container: Option<&dyn ContainerFiles>,
) -> Result<()> {
    let text = reply.output_text();

    if matches!(mode, Mode::Chat | Mode::Vision | Mode::Research) {
        ctx.output = text.trim().to_string();
        ctx.tool_calls = reply.tool_calls();
    }

    ctx.msg_id = reply.id.clone();
    ctx.input_tokens = reply.usage.input_tokens;
    ctx.output_tokens = reply.usage.output_tokens;

    if mode != Mode::Chat {
        return Ok(());
    }

    if let Some(data) = first_image_result(reply) {
        let decoded = STANDARD.decode(data).map_err(|err| {
            ColloquyError::InvalidResponse(format!("invalid image_generation_call payload: {err}"))
        })?;
        let path = images.unique_path("png");
        tokio::fs::write(&path, decoded).await?;
        ctx.images = vec![path];
    }

    let mut files = Vec::<ContainerFileRef>::new();
    for item in &reply.output {
        match item {
            ReplyItem::CodeInterpreterCall { code } => {
                ctx.output = format!(
                    "\n\n**Code interpreter**\n```python\n{code}\n\n```\n-----------\n{}",
                    text.trim()
                );
            }
            ReplyItem::Message { content } => {
                collect_citations(content, ctx, &mut files);
            }
            _ => {}
        }
    }

    if !files.is_empty() {
        debug!(count = files.len(), "container files cited, downloading");
        ctx.files = files.clone();
        if let Some(container) = container {
            // Best effort: a failed download leaves the rest of the record
            // intact.
            match container.download(&files).await {
                Ok(paths) => {
                    debug!(count = paths.len(), "container files downloaded");
                }
                Err(err) => {
                    error!(error = %err, "container file download failed");
                }
            }
        }
    }

    Ok(())
}

fn first_image_result(reply: &Reply) -> Option<&str> {
    reply.output.iter().find_map(|item| match item {
        ReplyItem::ImageGenerationCall { result } if !result.is_empty() => Some(result.as_str()),
        _ => None,
    })
}

fn collect_citations(
    content: &[ReplyContent],
    ctx: &mut ContextRecord,
    files: &mut Vec<ContainerFileRef>,
) {
    for part in content {
        let ReplyContent::OutputText { annotations, .. } = part else {
            continue;
        };
        for annotation in annotations {
            match annotation {
                Annotation::UrlCitation { url } => {
                    ctx.urls.get_or_insert_with(Vec::new).push(url.clone());
                }
                Annotation::ContainerFileCitation {
                    container_id,
                    file_id,
                } => {
                    files.push(ContainerFileRef {
                        container_id: container_id.clone(),
                        file_id: file_id.clone(),
                    });
                }
                Annotation::Unknown => {}
            }
        }
    }
}

/// Test/offline stand-in writing nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContainerFiles;

#[async_trait]
impl ContainerFiles for NoopContainerFiles {
    async fn download(&self, _files: &[ContainerFileRef]) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }
}
