//! Media attachments and their NIP-94 `imeta` tag encoding.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::events::{simple_tag, NostrTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    pub fn from_mime(mime: Option<&str>) -> Self {
        mime.and_then(Self::from_known_mime).unwrap_or(MediaKind::Image)
    }

    /// Kind named by an `image/*`, `video/*` or `audio/*` mime type.
    /// Anything else (`application/octet-stream`, …) is inconclusive.
    pub fn from_known_mime(mime: &str) -> Option<Self> {
        match mime.split_once('/')?.0 {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            _ => None,
        }
    }

    pub fn tag_name(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Parses `WxH`; zero or malformed sides are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.split_once('x')?;
        let width = w.trim().parse().ok()?;
        let height = h.trim().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub dimensions: Option<Dimensions>,
    #[serde(default)]
    pub alt: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
            mime_type: None,
            hash: None,
            size: None,
            dimensions: None,
            alt: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = Some(hash.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    fn has_metadata(&self) -> bool {
        self.mime_type.is_some()
            || self.hash.is_some()
            || self.size.is_some()
            || self.dimensions.is_some()
            || self.alt.is_some()
    }
}

/// `["imeta", "url …", "m …", "x …", "size …", "dim WxH", "alt …"]`.
pub fn imeta_tag(attachment: &Attachment) -> NostrTag {
    let mut values = vec![format!("url {}", attachment.url)];
    if let Some(mime) = &attachment.mime_type {
        values.push(format!("m {mime}"));
    }
    if let Some(hash) = &attachment.hash {
        values.push(format!("x {hash}"));
    }
    if let Some(size) = attachment.size {
        values.push(format!("size {size}"));
    }
    if let Some(dim) = attachment.dimensions {
        values.push(format!("dim {}x{}", dim.width, dim.height));
    }
    if let Some(alt) = &attachment.alt {
        values.push(format!("alt {alt}"));
    }
    NostrTag::new("imeta", values)
}

/// Decodes an `imeta` tag. Returns `None` when no `url` fragment is present.
pub fn parse_imeta(tag: &NostrTag) -> Option<Attachment> {
    if tag.name != "imeta" {
        return None;
    }

    let mut url = None;
    let mut mime_type = None;
    let mut hash = None;
    let mut size = None;
    let mut dimensions = None;
    let mut alt = None;

    for part in &tag.values {
        let Some((key, value)) = part.split_once(' ') else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        match key {
            "url" => url = Some(value.to_string()),
            "m" => mime_type = Some(value.to_string()),
            "x" => hash = Some(value.to_string()),
            "size" => size = value.trim().parse().ok(),
            "dim" => dimensions = Dimensions::parse(value),
            "alt" => alt = Some(value.to_string()),
            _ => {}
        }
    }

    let url = url.filter(|u| !u.is_empty())?;
    Some(Attachment {
        kind: MediaKind::from_mime(mime_type.as_deref()),
        url,
        mime_type,
        hash,
        size,
        dimensions,
        alt,
    })
}

/// Tags for a list of attachments: an `imeta` tag when metadata is known,
/// always followed by the plain `image`/`video`/`audio` URL tag.
pub fn media_tags(attachments: &[Attachment]) -> Vec<NostrTag> {
    let mut tags = Vec::with_capacity(attachments.len() * 2);
    for attachment in attachments.iter().filter(|a| !a.url.is_empty()) {
        if attachment.has_metadata() {
            tags.push(imeta_tag(attachment));
        }
        tags.push(simple_tag(attachment.kind.tag_name(), attachment.url.clone()));
    }
    tags
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSet {
    pub images: Vec<Attachment>,
    pub videos: Vec<Attachment>,
    pub audio: Vec<Attachment>,
}

impl MediaSet {
    pub fn len(&self) -> usize {
        self.images.len() + self.videos.len() + self.audio.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first_url(&self) -> Option<&str> {
        self.images
            .first()
            .or_else(|| self.videos.first())
            .map(|a| a.url.as_str())
    }

    /// Images, then videos, then audio.
    pub fn all(&self) -> Vec<Attachment> {
        self.images
            .iter()
            .chain(self.videos.iter())
            .chain(self.audio.iter())
            .cloned()
            .collect()
    }

    fn push(&mut self, attachment: Attachment) {
        match attachment.kind {
            MediaKind::Image => self.images.push(attachment),
            MediaKind::Video => self.videos.push(attachment),
            MediaKind::Audio => self.audio.push(attachment),
        }
    }
}

/// Collects media from `imeta` tags first, then plain URL tags not yet seen.
pub fn extract_media(tags: &[NostrTag]) -> MediaSet {
    let plain: Vec<(&str, MediaKind)> = tags
        .iter()
        .filter_map(|tag| {
            let kind = match tag.name.as_str() {
                "image" => MediaKind::Image,
                "video" => MediaKind::Video,
                "audio" => MediaKind::Audio,
                _ => return None,
            };
            tag.value().filter(|u| !u.is_empty()).map(|url| (url, kind))
        })
        .collect();

    let mut media = MediaSet::default();
    let mut seen = HashSet::new();

    for mut attachment in tags.iter().filter_map(parse_imeta) {
        let mime_known = attachment
            .mime_type
            .as_deref()
            .and_then(MediaKind::from_known_mime)
            .is_some();
        if !mime_known {
            if let Some((_, kind)) = plain.iter().find(|(url, _)| *url == attachment.url) {
                attachment.kind = *kind;
            }
        }
        if seen.insert(attachment.url.clone()) {
            media.push(attachment);
        }
    }

    for (url, kind) in plain {
        if seen.insert(url.to_string()) {
            media.push(Attachment::new(url, kind));
        }
    }

    media
}
