use std::fmt;
use std::path::PathBuf;

/// Base location for model weights or enrollment images.
///
/// Anything starting with `http://` or `https://` is remote; everything else
/// is treated as a local directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceLocation {
    Local(PathBuf),
    Remote(String),
}

impl ResourceLocation {
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Remote(value.trim_end_matches('/').to_string())
        } else {
            Self::Local(PathBuf::from(value))
        }
    }

    /// Appends relative path segments, e.g. `join(&["chen", "chen.jpg"])`.
    pub fn join(&self, segments: &[&str]) -> Self {
        match self {
            Self::Local(dir) => {
                let mut path = dir.clone();
                for segment in segments {
                    path.push(segment);
                }
                Self::Local(path)
            }
            Self::Remote(base) => {
                let mut url = base.clone();
                for segment in segments {
                    url.push('/');
                    url.push_str(segment.trim_matches('/'));
                }
                Self::Remote(url)
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

impl From<&str> for ResourceLocation {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://example.com/models/", true)]
    #[case("http://localhost:8080/models", true)]
    #[case("./models", false)]
    #[case("/opt/facelens/models", false)]
    fn test_parse_detects_remote(#[case] value: &str, #[case] remote: bool) {
        assert_eq!(ResourceLocation::parse(value).is_remote(), remote);
    }

    #[test]
    fn test_join_remote_uses_slashes() {
        let base = ResourceLocation::parse("https://example.com/images/");
        assert_eq!(
            base.join(&["chen", "chen.jpg"]),
            ResourceLocation::Remote("https://example.com/images/chen/chen.jpg".into())
        );
    }

    #[test]
    fn test_join_local_builds_path() {
        let base = ResourceLocation::parse("images");
        assert_eq!(
            base.join(&["james", "james.jpg"]),
            ResourceLocation::Local(PathBuf::from("images").join("james").join("james.jpg"))
        );
    }

    #[test]
    fn test_display_round_trips_remote_url() {
        let loc = ResourceLocation::parse("https://example.com/m");
        assert_eq!(loc.to_string(), "https://example.com/m");
    }
}
