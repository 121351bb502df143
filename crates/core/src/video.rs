//! Turns the raw video URL typed by a teacher into something a player can embed.
//!
//! Resolution is a pure function of the string: no network access, no
//! failure mode. Anything unrecognized becomes [`EmbedKind::Unsupported`] so
//! the lesson can show a notice instead of silently dropping the video slot.

use std::fmt;

use url::Url;

const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed/";
const VIDEO_ID_LEN: usize = 11;

/// A YouTube video id: exactly 11 characters of `[A-Za-z0-9_-]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == VIDEO_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| Self(raw.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical iframe source for this video.
    #[must_use]
    pub fn embed_url(&self, options: EmbedOptions) -> String {
        let mut params = Vec::new();
        if options.suppress_related {
            params.push("rel=0");
        }
        if options.modest_branding {
            params.push("modestbranding=1");
        }

        let mut url = format!("{YOUTUBE_EMBED_BASE}{}", self.0);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }
        url
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Player parameters appended to YouTube embeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Only suggest videos from the same channel at the end (`rel=0`).
    pub suppress_related: bool,
    /// Reduce YouTube branding in the player chrome (`modestbranding=1`).
    pub modest_branding: bool,
}

impl EmbedOptions {
    #[must_use]
    pub fn plain() -> Self {
        Self {
            suppress_related: false,
            modest_branding: false,
        }
    }
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            suppress_related: true,
            modest_branding: true,
        }
    }
}

/// Renderable form of a lesson's video reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbedKind {
    YouTube(VideoId),
    /// A direct `.mp4` file, played with a native video element. Holds the URL verbatim.
    DirectFile(String),
    Unsupported,
    Empty,
}

impl EmbedKind {
    /// Source URL for the player, if there is something to play.
    #[must_use]
    pub fn player_src(&self, options: EmbedOptions) -> Option<String> {
        match self {
            EmbedKind::YouTube(id) => Some(id.embed_url(options)),
            EmbedKind::DirectFile(url) => Some(url.clone()),
            EmbedKind::Unsupported | EmbedKind::Empty => None,
        }
    }

    /// Placeholder text to show instead of a player.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            EmbedKind::Unsupported => Some("Video format not supported"),
            EmbedKind::Empty => Some("No video for this lesson"),
            EmbedKind::YouTube(_) | EmbedKind::DirectFile(_) => None,
        }
    }
}

/// Resolves an optional raw URL; `None` behaves like a blank string.
#[must_use]
pub fn resolve_opt(raw: Option<&str>) -> EmbedKind {
    raw.map_or(EmbedKind::Empty, resolve)
}

/// Classifies a raw video URL.
#[must_use]
pub fn resolve(raw: &str) -> EmbedKind {
    let raw = raw.trim();
    if raw.is_empty() {
        return EmbedKind::Empty;
    }

    let Some(url) = parse_lenient(raw) else {
        // Relative asset paths such as `/media/intro.mp4` never parse as URLs.
        return if has_mp4_extension(strip_query(raw)) {
            EmbedKind::DirectFile(raw.to_owned())
        } else {
            EmbedKind::Unsupported
        };
    };

    if let Some(host) = url.host_str() {
        if is_short_youtube_host(host) {
            return first_segment(&url)
                .and_then(VideoId::parse)
                .map_or(EmbedKind::Unsupported, EmbedKind::YouTube);
        }
        if is_youtube_host(host) {
            return youtube_id(&url).map_or(EmbedKind::Unsupported, EmbedKind::YouTube);
        }
    }

    if has_mp4_extension(url.path()) {
        EmbedKind::DirectFile(raw.to_owned())
    } else {
        EmbedKind::Unsupported
    }
}

fn parse_lenient(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        // Pasted links often lack a scheme: `youtu.be/<id>`, `www.youtube.com/watch?v=<id>`.
        Err(url::ParseError::RelativeUrlWithoutBase)
            if !raw.starts_with('/') && !raw.starts_with('.') =>
        {
            Url::parse(&format!("https://{raw}")).ok()
        }
        Err(_) => None,
    }
}

fn is_short_youtube_host(host: &str) -> bool {
    host == "youtu.be" || host == "www.youtu.be"
}

fn is_youtube_host(host: &str) -> bool {
    ["youtube.com", "youtube-nocookie.com"]
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

fn first_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.next().filter(|s| !s.is_empty())
}

fn youtube_id(url: &Url) -> Option<VideoId> {
    let mut segments = url.path_segments()?;
    match segments.next()? {
        "watch" => url
            .query_pairs()
            .find(|(key, _)| key == "v")
            .and_then(|(_, value)| VideoId::parse(&value)),
        "embed" | "v" => segments.next().and_then(VideoId::parse),
        _ => None,
    }
}

fn strip_query(raw: &str) -> &str {
    raw.split(['?', '#']).next().unwrap_or(raw)
}

fn has_mp4_extension(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".mp4")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yt(id: &str) -> EmbedKind {
        EmbedKind::YouTube(VideoId::parse(id).unwrap())
    }

    #[test]
    fn short_links_resolve() {
        assert_eq!(resolve("https://youtu.be/dQw4w9WgXcQ"), yt("dQw4w9WgXcQ"));
        assert_eq!(resolve("https://youtu.be/dQw4w9WgXcQ?t=42"), yt("dQw4w9WgXcQ"));
        assert_eq!(resolve("youtu.be/dQw4w9WgXcQ"), yt("dQw4w9WgXcQ"));
    }

    #[test]
    fn long_embed_and_v_links_resolve() {
        assert_eq!(
            resolve("https://www.youtube.com/watch?v=6Zg2cXfWJk4&list=PL1"),
            yt("6Zg2cXfWJk4")
        );
        assert_eq!(
            resolve("https://m.youtube.com/watch?feature=share&v=6Zg2cXfWJk4"),
            yt("6Zg2cXfWJk4")
        );
        assert_eq!(resolve("https://www.youtube.com/embed/4aZf9vGJ6qw"), yt("4aZf9vGJ6qw"));
        assert_eq!(resolve("http://youtube.com/v/4aZf9vGJ6qw?version=3"), yt("4aZf9vGJ6qw"));
        assert_eq!(resolve("www.youtube.com/watch?v=4aZf9vGJ6qw"), yt("4aZf9vGJ6qw"));
    }

    #[test]
    fn malformed_youtube_ids_are_unsupported() {
        assert_eq!(resolve("https://youtu.be/short"), EmbedKind::Unsupported);
        assert_eq!(resolve("https://www.youtube.com/watch?v=toolongvideoid"), EmbedKind::Unsupported);
        assert_eq!(resolve("https://www.youtube.com/channel/UCabc"), EmbedKind::Unsupported);
    }

    #[test]
    fn mp4_files_are_kept_verbatim() {
        assert_eq!(
            resolve("https://x.com/a.mp4"),
            EmbedKind::DirectFile("https://x.com/a.mp4".into())
        );
        assert_eq!(
            resolve("https://cdn.example.org/Intro.MP4?token=abc"),
            EmbedKind::DirectFile("https://cdn.example.org/Intro.MP4?token=abc".into())
        );
        assert_eq!(
            resolve("/media/lesson1.mp4"),
            EmbedKind::DirectFile("/media/lesson1.mp4".into())
        );
    }

    #[test]
    fn blank_is_empty() {
        assert_eq!(resolve(""), EmbedKind::Empty);
        assert_eq!(resolve("   "), EmbedKind::Empty);
        assert_eq!(resolve_opt(None), EmbedKind::Empty);
    }

    #[test]
    fn everything_else_is_unsupported() {
        assert_eq!(resolve("ftp://x"), EmbedKind::Unsupported);
        assert_eq!(resolve("https://vimeo.com/123456"), EmbedKind::Unsupported);
        assert_eq!(resolve("not a url at all"), EmbedKind::Unsupported);
        assert_eq!(resolve("https://x.com/a.mp4.html"), EmbedKind::Unsupported);
    }

    #[test]
    fn embed_url_carries_player_params() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(
            id.embed_url(EmbedOptions::default()),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?rel=0&modestbranding=1"
        );
        assert_eq!(
            id.embed_url(EmbedOptions::plain()),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn notices_for_unplayable_kinds() {
        assert!(EmbedKind::Unsupported.notice().is_some());
        assert!(EmbedKind::Empty.notice().is_some());
        assert!(yt("dQw4w9WgXcQ").notice().is_none());
        assert_eq!(EmbedKind::Unsupported.player_src(EmbedOptions::default()), None);
    }
}
