//! Integration tests for the certificate pipeline.
//!
//! These tests validate:
//! - Roster validation and suggestions, including fail-open behaviour
//! - Both orderings of async loads against first use
//! - Template vs fallback render paths
//! - PDF and print export, and their rejection before any render

use std::path::PathBuf;
use std::time::Duration;

use cert_forge::certificate::{generate_certificate_id, CertificateForm, CertificateRecord};
use cert_forge::error::CertError;
use cert_forge::fonts::FontManager;
use cert_forge::layout_config::{LayoutConfig, TextField};
use cert_forge::render::Renderer;
use cert_forge::roster::Roster;
use cert_forge::session::{Session, SessionConfig};
use cert_forge::surface::{Element, RenderSurface, Shape, Template};
use sha2::{Digest, Sha256};
use std::sync::Arc;

// =====================================================================
// Helpers
// =====================================================================

fn small_layout() -> LayoutConfig {
    let mut layout = LayoutConfig::default();
    layout.canvas_width = 351;
    layout.canvas_height = 248;
    layout
}

fn session_with(layout: LayoutConfig) -> Session {
    Session::new(SessionConfig {
        layout,
        export_delay: Duration::ZERO,
        ..SessionConfig::default()
    })
    .unwrap()
}

fn template_image(color: [u8; 4]) -> Template {
    let img = image::RgbaImage::from_pixel(64, 45, image::Rgba(color));
    Template::from_rgba(&img).unwrap()
}

fn write_png(dir: &tempfile::TempDir, color: [u8; 4]) -> PathBuf {
    let path = dir.path().join("template.png");
    image::RgbaImage::from_pixel(32, 24, image::Rgba(color))
        .save(&path)
        .unwrap();
    path
}

fn write_roster(dir: &tempfile::TempDir, names: &[&str]) -> PathBuf {
    let mut csv = String::from("Timestamp,Email,Full Name\n");
    for (i, name) in names.iter().enumerate() {
        csv.push_str(&format!("{i},p{i}@example.com,{name}\n"));
    }
    let path = dir.path().join("participants.csv");
    std::fs::write(&path, csv).unwrap();
    path
}

fn john_form() -> CertificateForm {
    CertificateForm::new("John Smith", "AI Day").with_date("2025-01-15")
}

fn text_ops(surface: &RenderSurface) -> Vec<(&Element, &Shape)> {
    surface
        .ops()
        .iter()
        .filter(|op| matches!(op.shape, Shape::Text { .. }))
        .map(|op| (&op.element, &op.shape))
        .collect()
}

fn has_element(surface: &RenderSurface, element: Element) -> bool {
    surface.ops().iter().any(|op| op.element == element)
}

/// Pixels in rows `ys` and columns `xs` where the two surfaces differ.
fn differing_pixels(
    a: &RenderSurface,
    b: &RenderSurface,
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
) -> usize {
    ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
        .filter(|&(x, y)| a.pixel(x, y) != b.pixel(x, y))
        .count()
}

/// Pixels in the region that are not `color`.
fn pixels_other_than(
    s: &RenderSurface,
    color: [u8; 4],
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
) -> usize {
    ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
        .filter(|&(x, y)| s.pixel(x, y) != Some(color))
        .count()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 100, "PDF too small: {} bytes", bytes.len());
    assert_eq!(&bytes[0..5], b"%PDF-", "Missing PDF header");
}

// =====================================================================
// Roster matching
// =====================================================================

#[test]
fn every_substring_of_an_entry_is_valid() {
    let roster = Roster::new(["john smith", "Fatima Zahra"]);
    for entry in roster.entries() {
        for start in 0..entry.len() {
            for end in start + 1..=entry.len() {
                let q = &entry[start..end];
                assert!(roster.is_valid(q), "{q:?} should match {entry:?}");
                assert!(roster.is_valid(&q.to_uppercase()));
            }
        }
    }
}

#[test]
fn superstring_of_an_entry_is_valid() {
    let roster = Roster::new(["ali"]);
    assert!(roster.is_valid("Alibaba"));
    assert!(roster.is_valid("Muhammad Ali Khan"));
    assert!(!roster.is_valid("Bob"));
}

#[test]
fn empty_roster_is_fail_open() {
    let roster = Roster::default();
    for name in ["", "x", "Anybody", "John Smith"] {
        assert!(roster.is_valid(name));
    }
}

#[test]
fn suggestions_are_bounded_and_contain_query() {
    let roster = Roster::new((0..20).map(|i| format!("student {i}")));
    for limit in [0, 1, 8, 50] {
        let got = roster.suggest("Stud", limit);
        assert!(got.len() <= limit);
        for s in &got {
            assert!(s.to_lowercase().contains("stud"));
        }
    }
    assert_eq!(roster.suggest("student 1", 3), ["Student 1", "Student 10", "Student 11"]);
}

// =====================================================================
// Certificate records
// =====================================================================

#[test]
fn certificate_id_shape() {
    let id = generate_certificate_id("AIS");
    let parts: Vec<&str> = id.split('/').collect();
    assert_eq!(parts.len(), 4);
    assert_eq!(parts[0], "AIS");
    for p in &parts[1..] {
        assert_eq!(p.len(), 4);
        assert!(p.chars().all(|c| c.is_ascii_digit()));
    }
}

// =====================================================================
// Async load ordering
// =====================================================================

#[tokio::test]
async fn roster_load_after_first_use_is_fail_open_until_published() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_roster(&dir, &["John Smith"]);
    let session = session_with(small_layout());

    let handle = session.spawn_roster_load(path);
    // The spawned task has not run yet on the current-thread runtime.
    assert!(session.is_valid("Mallory"));

    handle.await.unwrap();
    assert!(!session.is_valid("Mallory"));
    assert!(session.is_valid("john smith"));
}

#[tokio::test]
async fn roster_load_before_first_use() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_roster(&dir, &["John Smith", "", "Jane Doe"]);
    let session = session_with(small_layout());

    session.load_roster(&path).await;
    assert_eq!(session.roster().len(), 2);
    assert_eq!(session.suggest("jo"), ["John Smith"]);
    assert!(!session.is_valid("Mallory"));
}

#[tokio::test]
async fn template_load_after_first_render_switches_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(&dir, [0, 0, 255, 255]);
    let mut session = session_with(small_layout());

    let handle = session.spawn_template_load(path);
    let first = session.generate(&john_form()).unwrap();
    assert!(has_element(&first.surface, Element::Border));

    handle.await.unwrap();
    let second = session.generate(&john_form()).unwrap();
    assert!(has_element(&second.surface, Element::Template));
    assert!(!has_element(&second.surface, Element::Border));
    assert_eq!(second.surface.pixel(1, 1), Some([0, 0, 255, 255]));
}

#[tokio::test]
async fn corrupt_template_degrades_to_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.png");
    std::fs::write(&path, b"\x89PNG garbage").unwrap();
    let mut session = session_with(small_layout());

    session.load_template(&path).await;
    assert!(session.template().is_none());
    let rendered = session.generate(&john_form()).unwrap();
    assert!(has_element(&rendered.surface, Element::Watermark));
}

// =====================================================================
// Render paths
// =====================================================================

#[test]
fn registered_participant_on_template_gets_four_overlays() {
    let mut session = session_with(LayoutConfig::default());
    session.set_roster(Roster::new(["john smith"]));
    session.set_template(Some(template_image([250, 245, 230, 255])));

    assert!(session.is_valid("John Smith"));
    let rendered = session.generate(&john_form()).unwrap();
    assert_eq!(rendered.record.event_date(), "January 15, 2025");

    let surface = &rendered.surface;
    assert_eq!(surface.ops()[0].element, Element::Template);
    let texts = text_ops(surface);
    assert_eq!(texts.len(), 4);
    let fields: Vec<Element> = texts.iter().map(|(e, _)| **e).collect();
    assert_eq!(
        fields,
        [
            Element::Text(TextField::ParticipantName),
            Element::Text(TextField::EventLine1),
            Element::Text(TextField::EventLine2),
            Element::Text(TextField::SerialNumber),
        ]
    );
    match texts[1].1 {
        Shape::Text { text, .. } => assert_eq!(text, "For participating in the event \"AI Day\""),
        _ => unreachable!(),
    }
    match texts[3].1 {
        Shape::Text { text, align, .. } => {
            assert!(text.starts_with("Serial No: AIS/"));
            assert_eq!(*align, cert_forge::layout_config::TextAlign::Right);
        }
        _ => unreachable!(),
    }
    for element in [
        Element::Background,
        Element::Border,
        Element::Ornament,
        Element::Watermark,
        Element::NameUnderline,
        Element::SignatureRule,
        Element::SignatoryName,
    ] {
        assert!(!has_element(surface, element), "{element:?} drawn on template");
    }
    assert_eq!(surface.pixel(10, 10), Some([250, 245, 230, 255]));
}

#[test]
fn empty_roster_takes_the_same_template_path() {
    let mut session = session_with(LayoutConfig::default());
    session.set_template(Some(template_image([255, 255, 255, 255])));

    assert!(session.is_valid("John Smith"));
    let rendered = session.generate(&john_form()).unwrap();
    assert_eq!(text_ops(&rendered.surface).len(), 4);
}

#[test]
fn fallback_draws_decoration_and_minimum_underline() {
    let config = Arc::new(LayoutConfig::default());
    let renderer = Renderer::new(config.clone(), Arc::new(FontManager::default())).unwrap();
    let record = CertificateRecord::new("Jane Doe", "AI Day", "January 15, 2025", "AIS/2025/0115/4321".into());

    let surface = renderer.render(&record, None).unwrap();
    assert!(has_element(&surface, Element::Border));
    assert!(has_element(&surface, Element::Watermark));
    assert_eq!(
        surface.ops().iter().filter(|op| op.element == Element::SignatoryName).count(),
        config.signatories.len()
    );

    let underline = surface
        .ops()
        .iter()
        .find(|op| op.element == Element::NameUnderline)
        .expect("underline drawn");
    match underline.shape {
        Shape::Line { x1, x2, y1, y2, .. } => {
            let half = (x2 - x1) / 2.0;
            assert!(half >= config.fallback.underline_min_half_width);
            assert_eq!(y1, y2);
        }
        ref other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn long_name_widens_underline_past_minimum() {
    let config = Arc::new(LayoutConfig::default());
    let renderer = Renderer::new(config.clone(), Arc::new(FontManager::default())).unwrap();
    let name = "Maximilian Alexander Montgomery-Worthington the Third";
    let record = CertificateRecord::new(name, "AI Day", "January 15, 2025", "AIS/2025/0115/4321".into());

    let surface = renderer.render(&record, None).unwrap();
    let half = surface
        .ops()
        .iter()
        .find_map(|op| match op.shape {
            Shape::Line { x1, x2, .. } if op.element == Element::NameUnderline => Some((x2 - x1) / 2.0),
            _ => None,
        })
        .unwrap();
    assert!(half > config.fallback.underline_min_half_width);
}

#[test]
fn fallback_text_reaches_the_pixels() {
    let renderer =
        Renderer::new(Arc::new(LayoutConfig::default()), Arc::new(FontManager::default())).unwrap();
    let jane = CertificateRecord::new("Jane Doe", "AI Day", "January 15, 2025", "AIS/2025/0115/4321".into());
    let other = CertificateRecord::new(
        "Zz",
        "Totally Different Event",
        "March 3, 2026",
        "AIS/2026/0303/9876".into(),
    );

    let a = renderer.render(&jane, None).unwrap();
    let b = renderer.render(&other, None).unwrap();
    let white = [255, 255, 255, 255];

    // Name centred on y = 1300, event details on y = 1500 and 1560.
    assert!(pixels_other_than(&a, white, 1400..2100, 1250..1350) > 500);
    assert!(differing_pixels(&a, &b, 0..3508, 1240..1350) > 500);
    assert!(differing_pixels(&a, &b, 0..3508, 1450..1600) > 500);
    // Certificate ID, right-aligned at x = 3300.
    assert!(differing_pixels(&a, &b, 2800..3300, 2280..2320) > 50);
}

#[test]
fn template_overlays_are_painted_over_the_image() {
    let background = [250, 245, 230, 255];
    let mut session = session_with(LayoutConfig::default());
    session.set_template(Some(template_image(background)));

    let surface = &session.generate(&john_form()).unwrap().surface;
    // Participant name at (1754, 1300), serial number right-aligned at (3350, 2380).
    assert!(pixels_other_than(surface, background, 1400..2100, 1250..1350) > 500);
    assert!(pixels_other_than(surface, background, 2700..3350, 2360..2400) > 100);
    assert_eq!(surface.pixel(10, 10), Some(background));
}

#[test]
fn rendering_is_deterministic() {
    let renderer = Renderer::new(Arc::new(small_layout()), Arc::new(FontManager::default())).unwrap();
    let record = CertificateRecord::new("Jane Doe", "AI Day", "January 15, 2025", "AIS/2025/0115/4321".into());
    let hash = |s: &RenderSurface| Sha256::digest(s.to_rgba_image().as_raw()).to_vec();

    let a = renderer.render(&record, None).unwrap();
    let b = renderer.render(&record, None).unwrap();
    assert_eq!(hash(&a), hash(&b));
    assert_eq!(a.ops(), b.ops());
}

// =====================================================================
// Form errors
// =====================================================================

#[test]
fn unregistered_participant_does_not_render() {
    let mut session = session_with(small_layout());
    session.set_roster(Roster::new(["john smith"]));
    let err = session
        .generate(&CertificateForm::new("Mallory", "AI Day"))
        .err()
        .unwrap();
    assert!(matches!(err, CertError::Form(_)));
    assert!(session.rendered().is_none());
}

// =====================================================================
// Export
// =====================================================================

#[tokio::test]
async fn export_before_render_is_rejected_without_state_change() {
    let session = session_with(small_layout());
    assert!(matches!(session.download().await, Err(CertError::NotRendered)));
    assert!(matches!(session.print(), Err(CertError::NotRendered)));
    assert!(session.rendered().is_none());
}

#[tokio::test]
async fn download_writes_single_page_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = session_with(small_layout());
    session.generate(&CertificateForm::new("Jane  Doe", "AI Day")).unwrap();

    let download = session.download().await.unwrap();
    assert_valid_pdf(&download.bytes);
    assert!(download.filename.starts_with("Certificate_Jane_Doe_"));
    let millis = download
        .filename
        .trim_start_matches("Certificate_Jane_Doe_")
        .trim_end_matches(".pdf");
    assert!(millis.parse::<i64>().is_ok(), "{}", download.filename);

    let path = download.save_to(dir.path()).unwrap();
    assert_valid_pdf(&std::fs::read(path).unwrap());
}

#[tokio::test]
async fn print_page_embeds_rendered_png() {
    let mut session = session_with(small_layout());
    session.generate(&john_form()).unwrap();
    let doc = session.print().unwrap();
    assert!(doc.html.contains("data:image/png;base64,"));
    assert!(doc.html.contains("onload=\"window.focus(); window.print();\""));
    assert!(doc.html.contains("width: 297mm; height: 210mm"));
}
