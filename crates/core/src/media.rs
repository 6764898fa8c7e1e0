//! Media type detection from magic bytes.

/// Signatures that identify a video container at offset zero.
const VIDEO_SIGNATURES: [&[u8]; 9] = [
    b"\x00\x00\x00\x18ftypmp4",
    b"\x00\x00\x00\x20ftypmp4",
    b"\x00\x00\x00\x1cftypisom",
    b"\x00\x00\x00\x20ftypisom",
    b"\x00\x00\x00\x14ftypqt",
    b"\x1a\x45\xdf\xa3",
    b"FLV",
    b"\x00\x00\x01\xb3",
    b"\x00\x00\x01\xba",
];

/// Brand fragments accepted after a loose `ftyp` match.
const FTYP_BRANDS: [&[u8]; 7] = [b"mp4", b"isom", b"M4V", b"mp41", b"mp42", b"avc1", b"qt"];

/// Broad media category of an input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Detects the media kind of `bytes`; anything not recognised as video is an image.
    pub fn detect(bytes: &[u8]) -> Self {
        if is_video(bytes) { Self::Video } else { Self::Image }
    }

    /// MIME type sent with video uploads; images use the output format's MIME.
    pub fn video_mime() -> &'static str {
        "video/mp4"
    }
}

/// Returns true when `bytes` starts like a known video container.
pub fn is_video(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(32)];

    if head.starts_with(b"RIFF") {
        // RIFF is shared with WAV and WebP; only AVI counts.
        return contains(&bytes[..bytes.len().min(64)], b"AVI ");
    }

    if VIDEO_SIGNATURES.iter().any(|signature| head.starts_with(signature)) {
        return true;
    }

    if contains(&head[..head.len().min(16)], b"ftyp") {
        return FTYP_BRANDS.iter().any(|brand| contains(head, brand));
    }

    false
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_mp4_signatures() {
        assert!(is_video(b"\x00\x00\x00\x18ftypmp42\x00\x00\x00\x00"));
        assert!(is_video(b"\x00\x00\x00\x20ftypisom\x00\x00\x02\x00"));
    }

    #[test]
    fn test_detects_loose_ftyp_brand() {
        assert!(is_video(b"\x00\x00\x00\x24ftypavc1\x00\x00\x00\x00"));
        assert!(is_video(b"\x00\x00\x00\x1cftypM4V \x00\x00\x00\x00"));
    }

    #[test]
    fn test_unknown_ftyp_brand_is_not_video() {
        // HEIC stills also use an ftyp box.
        assert!(!is_video(b"\x00\x00\x00\x18ftypheic\x00\x00\x00\x00mif1"));
    }

    #[test]
    fn test_detects_other_containers() {
        assert!(is_video(b"\x1a\x45\xdf\xa3\x01\x00\x00\x00"));
        assert!(is_video(b"FLV\x01\x05"));
        assert!(is_video(b"\x00\x00\x01\xba\x44\x00"));
        assert!(is_video(b"RIFF\x00\x00\x00\x00AVI LIST"));
    }

    #[test]
    fn test_riff_without_avi_is_not_video() {
        assert!(!is_video(b"RIFF\x24\x00\x00\x00WEBPVP8 "));
        assert!(!is_video(b"RIFF\x24\x00\x00\x00WAVEfmt "));
    }

    #[test]
    fn test_images_are_not_video() {
        assert!(!is_video(b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR"));
        assert!(!is_video(b"\xff\xd8\xff\xe0\x00\x10JFIF\x00"));
        assert!(!is_video(b""));
    }

    #[test]
    fn test_media_kind_detect() {
        assert_eq!(MediaKind::detect(b"FLV\x01"), MediaKind::Video);
        assert_eq!(MediaKind::detect(b"\x89PNG\r\n\x1a\n"), MediaKind::Image);
    }
}
