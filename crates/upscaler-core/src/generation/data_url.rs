use regex::Regex;
use std::sync::OnceLock;

const DEFAULT_MIME_TYPE: &str = "image/png";

#[allow(clippy::expect_used, reason = "pattern is a compile-time constant")]
fn data_url_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"^data:image/(png|jpeg|jpg|webp);base64,").expect("valid data-url regex")
    })
}

/// Base64 image with its mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage<'a> {
    pub mime_type: String,
    pub base64: &'a str,
}

/// Strip a `data:image/...;base64,` prefix if present.
///
/// Without a prefix the payload is assumed to be PNG.
pub fn split_data_url(input: &str) -> SourceImage<'_> {
    let trimmed = input.trim();
    match data_url_prefix().captures(trimmed) {
        Some(caps) => {
            let subtype = match caps.get(1).map(|m| m.as_str()) {
                Some("jpg") | Some("jpeg") => "jpeg",
                Some(other) => other,
                None => "png",
            };
            let prefix_len = caps.get(0).map_or(0, |m| m.end());
            SourceImage { mime_type: format!("image/{}", subtype), base64: &trimmed[prefix_len..] }
        },
        None => SourceImage { mime_type: DEFAULT_MIME_TYPE.to_string(), base64: trimmed },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_png_prefix() {
        let image = split_data_url("data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64, "iVBORw0KGgo=");
    }

    #[test]
    fn test_jpg_normalized_to_jpeg() {
        let image = split_data_url("data:image/jpg;base64,/9j/4AAQ");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64, "/9j/4AAQ");
    }

    #[test]
    fn test_plain_base64_defaults_to_png() {
        let image = split_data_url("iVBORw0KGgo=");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.base64, "iVBORw0KGgo=");
    }

    #[test]
    fn test_unsupported_prefix_left_untouched() {
        let input = "data:image/gif;base64,R0lGOD";
        assert_eq!(split_data_url(input).base64, input);
    }
}
