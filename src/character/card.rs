use std::fmt;
use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_PERSONA;

/// Largest avatar file accepted for inlining.
pub const MAX_AVATAR_BYTES: u64 = 2 * 1024 * 1024;

/// A user-defined roleplay character.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Character {
    /// Opaque id derived from the creation time.
    pub id: String,
    pub name: String,
    /// System-prompt fragment describing the character.
    pub persona: String,
    /// Inline image data (`data:` URL), a remote URL, or empty.
    #[serde(default)]
    pub avatar: String,
}

impl Character {
    /// The persona, or the stock persona when none was given.
    pub fn effective_persona(&self) -> &str {
        if self.persona.trim().is_empty() {
            DEFAULT_PERSONA
        } else {
            &self.persona
        }
    }

    pub fn has_avatar(&self) -> bool {
        !self.avatar.is_empty()
    }
}

#[derive(Debug)]
pub enum AvatarError {
    Io(std::io::Error),
    NotAnImage(String),
    TooLarge { bytes: u64 },
}

impl fmt::Display for AvatarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvatarError::Io(err) => write!(f, "Failed to read avatar: {err}"),
            AvatarError::NotAnImage(path) => {
                write!(f, "Avatar '{path}' is not a png, jpg, gif or webp image")
            }
            AvatarError::TooLarge { bytes } => write!(
                f,
                "Avatar is {:.1} MB; the limit is 2 MB",
                *bytes as f64 / (1024.0 * 1024.0)
            ),
        }
    }
}

impl std::error::Error for AvatarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AvatarError::Io(err) => Some(err),
            _ => None,
        }
    }
}

/// Turn user avatar input into the stored representation.
///
/// `data:`/`http(s):` URLs are kept verbatim; anything else is treated as an
/// image file path and inlined as a base64 data URL.
pub fn resolve_avatar(input: &str) -> Result<String, AvatarError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(String::new());
    }
    if input.starts_with("data:") || input.starts_with("http://") || input.starts_with("https://")
    {
        return Ok(input.to_string());
    }
    avatar_data_url(Path::new(input))
}

pub fn avatar_data_url(path: &Path) -> Result<String, AvatarError> {
    let mime = image_mime(path).ok_or_else(|| AvatarError::NotAnImage(path.display().to_string()))?;
    let size = fs::metadata(path).map_err(AvatarError::Io)?.len();
    if size > MAX_AVATAR_BYTES {
        return Err(AvatarError::TooLarge { bytes: size });
    }
    let bytes = fs::read(path).map_err(AvatarError::Io)?;
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

fn image_mime(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
