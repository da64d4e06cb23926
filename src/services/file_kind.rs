/// Upload type detection from magic bytes (the client supplied content type is not trusted)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Webp,
    /// ZIP container: docx / pptx / xlsx
    OfficeXml,
    /// OLE compound file: legacy doc / ppt
    OfficeLegacy,
}

impl FileKind {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"%PDF") {
            return Some(FileKind::Pdf);
        }
        if data.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(FileKind::Png);
        }
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(FileKind::Jpeg);
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some(FileKind::Gif);
        }
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Some(FileKind::Webp);
        }
        if data.starts_with(b"PK\x03\x04") {
            return Some(FileKind::OfficeXml);
        }
        if data.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]) {
            return Some(FileKind::OfficeLegacy);
        }
        None
    }

    pub fn is_image(self) -> bool {
        matches!(self, FileKind::Png | FileKind::Jpeg | FileKind::Gif | FileKind::Webp)
    }

    /// Content type stored alongside the blob
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Png => "image/png",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Gif => "image/gif",
            FileKind::Webp => "image/webp",
            FileKind::OfficeXml => "application/zip",
            FileKind::OfficeLegacy => "application/x-ole-storage",
        }
    }

    /// Extension for the stored file; office containers keep the uploaded one when it matches
    pub fn extension(self, original_name: &str) -> String {
        let uploaded = std::path::Path::new(original_name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match self {
            FileKind::Pdf => "pdf".to_string(),
            FileKind::Png => "png".to_string(),
            FileKind::Jpeg => "jpg".to_string(),
            FileKind::Gif => "gif".to_string(),
            FileKind::Webp => "webp".to_string(),
            FileKind::OfficeXml => match uploaded.as_str() {
                "docx" | "pptx" | "xlsx" => uploaded,
                _ => "docx".to_string(),
            },
            FileKind::OfficeLegacy => match uploaded.as_str() {
                "doc" | "ppt" | "xls" => uploaded,
                _ => "doc".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_common_uploads() {
        assert_eq!(FileKind::detect(b"%PDF-1.7\n..."), Some(FileKind::Pdf));
        assert_eq!(FileKind::detect(b"\x89PNG\r\n\x1a\n\0\0"), Some(FileKind::Png));
        assert_eq!(FileKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(FileKind::Jpeg));
        assert_eq!(FileKind::detect(b"RIFF\0\0\0\0WEBPVP8 "), Some(FileKind::Webp));
        assert_eq!(FileKind::detect(b"PK\x03\x04rest"), Some(FileKind::OfficeXml));
    }

    #[test]
    fn test_rejects_unknown_bytes() {
        assert_eq!(FileKind::detect(b"\x7fELF\x02\x01"), None);
        assert_eq!(FileKind::detect(b""), None);
        assert_eq!(FileKind::detect(b"<html>"), None);
    }

    #[test]
    fn test_extension_choice() {
        assert_eq!(FileKind::Jpeg.extension("photo.JPEG"), "jpg");
        assert_eq!(FileKind::OfficeXml.extension("slides.PPTX"), "pptx");
        assert_eq!(FileKind::OfficeXml.extension("evil.exe"), "docx");
        assert!(FileKind::Png.is_image());
        assert!(!FileKind::Pdf.is_image());
    }
}
