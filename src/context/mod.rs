// src/context/mod.rs

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};

/// Inbound user request. `user_id` is absent for anonymous callers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub text: String,
    /// Image URL; not supported yet.
    #[serde(default)]
    pub image: Option<String>,
    /// Voice URL; not supported yet.
    #[serde(default)]
    pub voice: Option<String>,
    /// Model override for the free-form query path.
    #[serde(default)]
    pub model: Option<String>,
}

impl UserRequest {
    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Rejects input modalities the pipeline cannot handle yet.
    pub fn ensure_supported(&self) -> Result<(), PipelineError> {
        if is_set(&self.voice) {
            return Err(PipelineError::UnsupportedInput("Voice"));
        }
        if is_set(&self.image) {
            return Err(PipelineError::UnsupportedInput("Image"));
        }
        Ok(())
    }

    pub fn context(&self) -> RequestContext {
        RequestContext {
            text: self.text.clone(),
            user_id: self.user_id,
        }
    }
}

fn is_set(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// What handlers may know about the caller: the raw text and their own id.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestContext {
    pub text: String,
    pub user_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voice_and_image_are_rejected() {
        let mut req = UserRequest::text("Đổi giờ vé").with_user(7);
        assert!(req.ensure_supported().is_ok());

        req.image = Some("https://example.com/ticket.png".into());
        let err = req.ensure_supported().unwrap_err();
        assert_eq!(err.to_string(), "Image input not supported yet");

        req.voice = Some("https://example.com/note.ogg".into());
        assert_eq!(req.ensure_supported().unwrap_err().to_string(), "Voice input not supported yet");
    }

    #[test]
    fn blank_attachments_are_ignored() {
        let req: UserRequest =
            serde_json::from_str(r#"{"text": "hi", "voice": "", "image": null}"#).unwrap();
        assert!(req.ensure_supported().is_ok());
        assert_eq!(req.context(), RequestContext { text: "hi".into(), user_id: None });
    }
}
