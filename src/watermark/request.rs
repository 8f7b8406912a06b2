//! Watermark request model and validation

use crate::error::{Error, Result};
use axum::body::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Option name → raw form value, forwarded to the translator as-is
pub type WatermarkOptions = HashMap<String, String>;

/// Layout pattern understood by the watermark tool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Pattern {
    /// Repeat the watermark across the page
    #[default]
    Grid,
    /// Place a single watermark at a position
    Insert,
}

impl Pattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::Grid => "grid",
            Pattern::Insert => "insert",
        }
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "grid" => Ok(Pattern::Grid),
            "insert" => Ok(Pattern::Insert),
            other => Err(Error::InvalidPattern {
                pattern: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded file part
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            data: data.into(),
        }
    }

    /// Extension of the original filename including the dot, or `""`
    pub fn suffix(&self) -> String {
        Path::new(&self.filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default()
    }

    fn has_pdf_extension(&self) -> bool {
        self.filename.to_lowercase().ends_with(".pdf")
    }
}

/// Source of the watermark
#[derive(Debug, Clone)]
pub enum WatermarkMark {
    Text(String),
    Image(Upload),
}

/// Multipart fields as received, before validation
#[derive(Debug, Clone, Default)]
pub struct WatermarkForm {
    pub file: Option<Upload>,
    pub text: Option<String>,
    pub image: Option<Upload>,
    pub pattern: Option<String>,
    pub options: WatermarkOptions,
}

/// A validated watermark request
#[derive(Debug, Clone)]
pub struct WatermarkRequest {
    pub document: Upload,
    pub mark: WatermarkMark,
    pub pattern: Pattern,
    pub options: WatermarkOptions,
}

impl WatermarkRequest {
    /// Validate raw form fields.
    ///
    /// Checks run in a fixed order: document present, `.pdf` extension,
    /// watermark content present, pattern. Text takes precedence when both
    /// text and image are supplied. Nothing touches the filesystem here.
    pub fn from_form(form: WatermarkForm) -> Result<Self> {
        let document = form.file.ok_or(Error::MissingFile)?;

        if !document.has_pdf_extension() {
            return Err(Error::InvalidExtension {
                filename: document.filename,
            });
        }

        let mark = match (form.text, form.image) {
            (Some(text), _) => WatermarkMark::Text(text),
            (None, Some(image)) => WatermarkMark::Image(image),
            (None, None) => return Err(Error::MissingWatermarkContent),
        };

        let pattern = match form.pattern {
            Some(p) => p.parse()?,
            None => Pattern::default(),
        };

        Ok(Self {
            document,
            mark,
            pattern,
            options: form.options,
        })
    }

    /// Filename offered to the caller for the result
    pub fn download_name(&self) -> String {
        format!("watermarked_{}", self.document.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn pdf(name: &str) -> Upload {
        Upload::new(name, b"%PDF-1.4".to_vec())
    }

    fn text_form(file: &str) -> WatermarkForm {
        WatermarkForm {
            file: Some(pdf(file)),
            text: Some("CONFIDENTIAL".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_file() {
        let form = WatermarkForm {
            text: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            WatermarkRequest::from_form(form),
            Err(Error::MissingFile)
        ));
    }

    #[rstest]
    #[case("report.txt")]
    #[case("report.pdf.txt")]
    #[case("pdf")]
    #[case("")]
    fn test_invalid_extension(#[case] name: &str) {
        assert!(matches!(
            WatermarkRequest::from_form(text_form(name)),
            Err(Error::InvalidExtension { .. })
        ));
    }

    #[rstest]
    #[case("doc.pdf")]
    #[case("DOC.PDF")]
    #[case("scan.Pdf")]
    fn test_pdf_extension_case_insensitive(#[case] name: &str) {
        assert!(WatermarkRequest::from_form(text_form(name)).is_ok());
    }

    #[test]
    fn test_extension_checked_before_content() {
        let form = WatermarkForm {
            file: Some(pdf("report.txt")),
            ..Default::default()
        };
        assert!(matches!(
            WatermarkRequest::from_form(form),
            Err(Error::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_missing_watermark_content() {
        let form = WatermarkForm {
            file: Some(pdf("doc.pdf")),
            pattern: Some("grid".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            WatermarkRequest::from_form(form),
            Err(Error::MissingWatermarkContent)
        ));
    }

    #[test]
    fn test_content_checked_before_pattern() {
        let form = WatermarkForm {
            file: Some(pdf("doc.pdf")),
            pattern: Some("spiral".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            WatermarkRequest::from_form(form),
            Err(Error::MissingWatermarkContent)
        ));
    }

    #[rstest]
    #[case("spiral")]
    #[case("Grid")]
    #[case("")]
    fn test_invalid_pattern(#[case] pattern: &str) {
        let mut form = text_form("doc.pdf");
        form.pattern = Some(pattern.to_string());
        match WatermarkRequest::from_form(form) {
            Err(Error::InvalidPattern { pattern: got }) => assert_eq!(got, pattern),
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_pattern_defaults_to_grid() {
        let request = WatermarkRequest::from_form(text_form("doc.pdf")).unwrap();
        assert_eq!(request.pattern, Pattern::Grid);
    }

    #[test]
    fn test_insert_pattern() {
        let mut form = text_form("doc.pdf");
        form.pattern = Some("insert".to_string());
        let request = WatermarkRequest::from_form(form).unwrap();
        assert_eq!(request.pattern, Pattern::Insert);
    }

    #[test]
    fn test_text_wins_over_image() {
        let mut form = text_form("doc.pdf");
        form.image = Some(Upload::new("logo.png", b"png".to_vec()));
        let request = WatermarkRequest::from_form(form).unwrap();
        assert!(matches!(request.mark, WatermarkMark::Text(ref t) if t == "CONFIDENTIAL"));
    }

    #[test]
    fn test_image_only() {
        let form = WatermarkForm {
            file: Some(pdf("doc.pdf")),
            image: Some(Upload::new("logo.png", b"png".to_vec())),
            ..Default::default()
        };
        let request = WatermarkRequest::from_form(form).unwrap();
        assert!(matches!(request.mark, WatermarkMark::Image(ref u) if u.filename == "logo.png"));
    }

    #[test]
    fn test_empty_text_counts_as_present() {
        let mut form = text_form("doc.pdf");
        form.text = Some(String::new());
        assert!(WatermarkRequest::from_form(form).is_ok());
    }

    #[test]
    fn test_download_name() {
        let request = WatermarkRequest::from_form(text_form("doc.pdf")).unwrap();
        assert_eq!(request.download_name(), "watermarked_doc.pdf");
    }

    #[rstest]
    #[case("logo.png", ".png")]
    #[case("photo.final.JPG", ".JPG")]
    #[case("noext", "")]
    #[case(".hidden", "")]
    fn test_upload_suffix(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(Upload::new(name, Vec::<u8>::new()).suffix(), expected);
    }

    #[test]
    fn test_pattern_display() {
        assert_eq!(Pattern::Grid.to_string(), "grid");
        assert_eq!(Pattern::Insert.to_string(), "insert");
    }
}
