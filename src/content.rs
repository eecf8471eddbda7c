use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::types::{AudioData, ContentPart, MessageContent};

/// Image attachment supplied with a prompt.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub source: AttachmentSource,
}

#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Url(String),
    Bytes { media_type: String, data: Vec<u8> },
}

/// Recorded audio carried alongside a prompt.
#[derive(Debug, Clone)]
pub struct AudioPayload {
    pub data: Vec<u8>,
    pub format: String,
}

/// Build structured content for an image-input model: the prompt text plus
/// one `input_image` part per attachment. Local bytes travel as data URLs.
pub fn vision_content(prompt: &str, attachments: &[Attachment]) -> MessageContent {
    let mut parts = vec![ContentPart::InputText {
        text: prompt.to_string(),
    }];
    for attachment in attachments {
        let image_url = match &attachment.source {
            AttachmentSource::Url(url) => url.clone(),
            AttachmentSource::Bytes { media_type, data } => {
                format!("data:{media_type};base64,{}", STANDARD.encode(data))
            }
        };
        parts.push(ContentPart::InputImage { image_url });
    }
    MessageContent::Parts(parts)
}

/// Append an `input_audio` part for an audio-input model. Plain-text content
/// is promoted to a part list first.
pub fn audio_content(content: MessageContent, audio: Option<&AudioPayload>) -> MessageContent {
    let Some(audio) = audio else {
        return content;
    };
    let mut parts = match content {
        MessageContent::Parts(parts) => parts,
        MessageContent::Text(text) => vec![ContentPart::InputText { text }],
    };
    parts.push(ContentPart::InputAudio {
        input_audio: AudioData {
            data: STANDARD.encode(&audio.data),
            format: audio.format.clone(),
        },
    });
    MessageContent::Parts(parts)
}
