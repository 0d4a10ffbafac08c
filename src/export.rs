//! Export pipeline – turns a finished [`RenderSurface`] into deliverables.
//!
//! - [`to_downloadable`]: lossless PNG embedded as one full-page image in a
//!   single-page PDF (printpdf v0.8 ops-based API).
//! - [`to_printable`]: an HTML page holding only the image, sized to one
//!   physical page, which opens the print dialog once the image has loaded.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64_STD, Engine as _};
use printpdf::*;

use crate::error::{CertError, Result};
use crate::surface::RenderSurface;

const PT_TO_MM: f32 = 0.352778;

/// Page orientation for exported documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageOrientation {
    /// Portrait mode: height > width.
    Portrait,
    /// Landscape mode: width > height (default for certificates).
    #[default]
    Landscape,
}

/// Physical page used for the PDF and the print page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    /// Short edge in points (A4 = 595.28).
    pub short_edge_pt: f32,
    /// Long edge in points (A4 = 841.89).
    pub long_edge_pt: f32,
    pub orientation: PageOrientation,
}

impl Default for PageSize {
    fn default() -> Self {
        Self::a4_landscape()
    }
}

impl PageSize {
    pub fn a4_landscape() -> Self {
        Self {
            short_edge_pt: 595.28,
            long_edge_pt: 841.89,
            orientation: PageOrientation::Landscape,
        }
    }

    /// Effective page width after applying orientation.
    pub fn effective_width(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.short_edge_pt,
            PageOrientation::Landscape => self.long_edge_pt,
        }
    }

    /// Effective page height after applying orientation.
    pub fn effective_height(&self) -> f32 {
        match self.orientation {
            PageOrientation::Portrait => self.long_edge_pt,
            PageOrientation::Landscape => self.short_edge_pt,
        }
    }

    fn width_mm(&self) -> f32 {
        self.effective_width() * PT_TO_MM
    }

    fn height_mm(&self) -> f32 {
        self.effective_height() * PT_TO_MM
    }
}

/// A generated PDF ready to be saved.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Write into `dir`. A failed write leaves no partial file behind.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf> {
        write_artifact(dir, &self.filename, &self.bytes)
    }
}

/// A self-printing HTML page.
#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub html: String,
}

impl PrintDocument {
    pub fn save_to(&self, path: &Path) -> Result<PathBuf> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("certificate-print.html");
        write_artifact(dir, name, self.html.as_bytes())
    }
}

fn write_artifact(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }
    let path = dir.join(name);
    if let Err(e) = std::fs::write(&path, bytes) {
        let _ = std::fs::remove_file(&path);
        return Err(e.into());
    }
    Ok(path)
}

/// Lossless PNG encoding of the surface.
pub fn encode_png(surface: &RenderSurface) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    surface
        .to_rgba_image()
        .write_to(&mut Cursor::new(&mut buf), ::image::ImageFormat::Png)
        .map_err(|e| CertError::Export(format!("PNG encode error: {e}")))?;
    Ok(buf)
}

/// `Certificate_<name>_<epoch-millis>.pdf`, whitespace runs in the name
/// replaced by `_`.
pub fn download_filename(participant_name: &str, epoch_millis: i64) -> String {
    let name = participant_name.split_whitespace().collect::<Vec<_>>().join("_");
    format!("Certificate_{name}_{epoch_millis}.pdf")
}

/// Build a one-page PDF holding the surface as a full-page image.
pub fn to_downloadable(
    surface: &RenderSurface,
    participant_name: &str,
    page: &PageSize,
) -> Result<Download> {
    let png = encode_png(surface)?;
    let bytes = render_image_pdf(&png, surface.width(), surface.height(), page, participant_name)?;
    let filename = download_filename(participant_name, chrono::Utc::now().timestamp_millis());
    log::info!("Generated '{filename}' ({} bytes)", bytes.len());
    Ok(Download { filename, bytes })
}

fn render_image_pdf(
    png: &[u8],
    px_width: u32,
    px_height: u32,
    page: &PageSize,
    participant_name: &str,
) -> Result<Vec<u8>> {
    let mut doc = PdfDocument::new(&format!("Certificate – {participant_name}"));

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let raw = RawImage::decode_from_bytes(png, &mut warnings)
        .map_err(|e| CertError::Export(format!("PDF image error: {e}")))?;
    for w in &warnings {
        log::debug!("printpdf: {w:?}");
    }
    let xobj_id = doc.add_image(&raw);

    // At dpi=72 printpdf renders 1 px = 1 pt, so scale = page_pt / px_dim.
    let scale_x = page.effective_width() / px_width.max(1) as f32;
    let scale_y = page.effective_height() / px_height.max(1) as f32;

    let ops = vec![Op::UseXobject {
        id: xobj_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            dpi: Some(72.0),
            scale_x: Some(scale_x),
            scale_y: Some(scale_y),
            rotate: None,
        },
    }];

    let pdf_page = PdfPage::new(Mm(page.width_mm()), Mm(page.height_mm()), ops);
    doc.with_pages(vec![pdf_page]);
    Ok(doc.save(&PdfSaveOptions::default(), &mut Vec::new()))
}

/// Build the print page: only the image, scaled to exactly one page, with
/// the print dialog opened from the `load` handler.
pub fn to_printable(surface: &RenderSurface, page: &PageSize) -> Result<PrintDocument> {
    let png = encode_png(surface)?;
    let data_uri = format!("data:image/png;base64,{}", BASE64_STD.encode(png));
    let (w_mm, h_mm) = (page.width_mm().round(), page.height_mm().round());

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>Print Certificate</title>
<style>
@page {{ size: {w_mm}mm {h_mm}mm; margin: 0; }}
html, body {{ margin: 0; padding: 0; }}
body {{ width: {w_mm}mm; height: {h_mm}mm; }}
img {{ display: block; width: {w_mm}mm; height: {h_mm}mm; }}
</style>
</head>
<body onload="window.focus(); window.print();">
<img src="{data_uri}" alt="Certificate">
</body>
</html>
"#
    );
    Ok(PrintDocument { html })
}
