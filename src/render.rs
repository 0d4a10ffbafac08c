//! Layout renderer – paints a [`CertificateRecord`] onto a [`RenderSurface`].
//!
//! Two paths, chosen only by whether a template is available:
//!
//! - **Template**: the template image is drawn full-bleed and four text
//!   fields are overlaid (name, two event lines, serial number).
//! - **Fallback**: the whole design is drawn in code – background, double
//!   border, corner ornaments, rotated watermark, logos, title block, name
//!   with underline, event lines, signatories and certificate ID.
//!
//! Drawing onto an existing surface never fails. Text that overflows its slot
//! is simply drawn as is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::certificate::CertificateRecord;
use crate::error::{CertError, Result};
use crate::fonts::FontManager;
use crate::layout_config::*;
use crate::surface::{Element, RenderSurface, Template};

static WARNED_NO_OUTLINES: AtomicBool = AtomicBool::new(false);

/// Paint `text` at `anchor`: horizontally aligned by `align`, vertically
/// centred on the anchor.
pub fn draw_text(
    surface: &mut RenderSurface,
    fonts: &FontManager,
    element: Element,
    text: &str,
    anchor: Anchor,
    font: &FontDescriptor,
    align: TextAlign,
) {
    let width = fonts.measure_text_width(text, font);
    let x = match align {
        TextAlign::Left => anchor.x,
        TextAlign::Center => anchor.x - width / 2.0,
        TextAlign::Right => anchor.x - width,
    };
    let baseline = anchor.y + fonts.middle_baseline_offset(font);
    let outline = fonts.text_path(text, font, x, baseline);
    if outline.is_none() && !text.trim().is_empty() && !WARNED_NO_OUTLINES.swap(true, Ordering::Relaxed)
    {
        log::debug!("No outline font loaded; text is laid out but not painted");
    }
    surface.fill_text(
        element,
        text,
        (anchor.x, anchor.y),
        align,
        font.size,
        font.color,
        outline,
    );
}

/// Half-width of the decorative line under the participant name.
pub fn underline_half_width(text_width: f32, style: &FallbackStyle) -> f32 {
    (text_width / 2.0 + style.underline_padding).max(style.underline_min_half_width)
}

/// Paints certificates with a fixed layout.
pub struct Renderer {
    config: Arc<LayoutConfig>,
    fonts: Arc<FontManager>,
}

impl Renderer {
    /// Validates `config`; every later lookup of an anchor or font relies on it.
    pub fn new(config: Arc<LayoutConfig>, fonts: Arc<FontManager>) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, fonts })
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// A fresh surface sized to the configured canvas.
    pub fn new_surface(&self) -> Result<RenderSurface> {
        let (w, h) = (self.config.canvas_width, self.config.canvas_height);
        RenderSurface::new(w, h)
            .ok_or_else(|| CertError::Config(format!("canvas {w}x{h} cannot be allocated")))
    }

    /// Render into a new surface.
    pub fn render(
        &self,
        record: &CertificateRecord,
        template: Option<&Template>,
    ) -> Result<RenderSurface> {
        let mut surface = self.new_surface()?;
        self.render_into(&mut surface, record, template);
        Ok(surface)
    }

    /// Reset `surface` and render a full pass into it.
    pub fn render_into(
        &self,
        surface: &mut RenderSurface,
        record: &CertificateRecord,
        template: Option<&Template>,
    ) {
        surface.reset();
        match template {
            Some(template) => {
                log::debug!("Rendering {} on template", record.certificate_id());
                surface.draw_template(template);
                self.draw_overlays(surface, record);
            }
            None => {
                log::debug!("Rendering {} with fallback layout", record.certificate_id());
                self.draw_fallback_background(surface);
                self.draw_fallback_text(surface, record);
            }
        }
    }

    fn text(&self, surface: &mut RenderSurface, field: TextField, text: &str, align: TextAlign) {
        let font = self.config.font(field.font_role());
        draw_text(
            surface,
            &self.fonts,
            Element::Text(field),
            text,
            self.config.anchor(field),
            font,
            align,
        );
    }

    // ── Template path ─────────────────────────────────────────────────────

    fn draw_overlays(&self, surface: &mut RenderSurface, record: &CertificateRecord) {
        let w = &self.config.wording;
        let (event, date) = (record.event_name(), record.event_date());

        self.text(surface, TextField::ParticipantName, record.participant_name(), TextAlign::Center);
        self.text(
            surface,
            TextField::EventLine1,
            &fill_placeholders(&w.event_line_1, event, date),
            TextAlign::Center,
        );
        self.text(
            surface,
            TextField::EventLine2,
            &fill_placeholders(&w.event_line_2, event, date),
            TextAlign::Center,
        );
        self.text(
            surface,
            TextField::SerialNumber,
            &format!("{}{}", w.serial_label, record.certificate_id()),
            TextAlign::Right,
        );
    }

    // ── Fallback path ─────────────────────────────────────────────────────

    fn draw_fallback_background(&self, surface: &mut RenderSurface) {
        let style = &self.config.fallback;
        let (w, h) = (surface.width() as f32, surface.height() as f32);

        surface.fill(Element::Background, style.background);

        let m = style.border_margin;
        surface.stroke_rect(
            Element::Border,
            m,
            m,
            w - m * 2.0,
            h - m * 2.0,
            style.outer_border_width,
            style.outer_border_color,
        );
        let inner = m + style.inner_border_inset;
        surface.stroke_rect(
            Element::Border,
            inner,
            inner,
            w - inner * 2.0,
            h - inner * 2.0,
            style.inner_border_width,
            style.inner_border_color,
        );

        let i = style.ornament_inset;
        for (cx, cy) in [(i, i), (w - i, i), (i, h - i), (w - i, h - i)] {
            surface.fill_circle(Element::Ornament, cx, cy, style.ornament_radius, style.ornament_color);
        }

        self.draw_watermark(surface);
    }

    fn draw_watermark(&self, surface: &mut RenderSurface) {
        let style = &self.config.fallback;
        let (cx, cy) = (surface.width() as f32 / 2.0, surface.height() as f32 / 2.0);
        surface.save();
        surface.set_global_alpha(style.watermark_alpha);
        surface.translate(cx, cy);
        surface.rotate(style.watermark_angle_deg);
        draw_text(
            surface,
            &self.fonts,
            Element::Watermark,
            &self.config.wording.watermark,
            Anchor::new(0.0, 0.0),
            self.config.font(FontRole::Watermark),
            TextAlign::Center,
        );
        surface.restore();
    }

    fn draw_fallback_text(&self, surface: &mut RenderSurface, record: &CertificateRecord) {
        let w = &self.config.wording;
        let style = &self.config.fallback;
        let (event, date) = (record.event_name(), record.event_date());

        self.draw_logo(surface, TextField::LeftLogo, &w.left_logo, TextAlign::Left);
        self.draw_logo(surface, TextField::RightLogo, &w.right_logo, TextAlign::Right);

        self.text(surface, TextField::CertificateTitle, &w.title, TextAlign::Center);
        self.text(surface, TextField::Subtitle, &w.subtitle, TextAlign::Center);
        self.text(surface, TextField::AwardedTo, &w.awarded_to, TextAlign::Center);

        self.text(surface, TextField::ParticipantName, record.participant_name(), TextAlign::Center);
        self.draw_name_underline(surface, record.participant_name());

        let details = self.config.anchor(TextField::EventDetails);
        let details_font = self.config.font(TextField::EventDetails.font_role());
        for (i, line) in [&w.fallback_event_line_1, &w.fallback_event_line_2]
            .into_iter()
            .enumerate()
        {
            draw_text(
                surface,
                &self.fonts,
                Element::Text(TextField::EventDetails),
                &fill_placeholders(line, event, date),
                details.offset(0.0, i as f32 * style.event_line_spacing),
                details_font,
                TextAlign::Center,
            );
        }

        self.draw_signatories(surface);

        self.text(surface, TextField::CertificateId, record.certificate_id(), TextAlign::Right);
    }

    fn draw_logo(&self, surface: &mut RenderSurface, field: TextField, text: &str, align: TextAlign) {
        let anchor = self.config.anchor(field);
        let font = self.config.font(field.font_role());
        let spacing = self.config.fallback.logo_line_spacing;
        for (i, line) in text.split('\n').enumerate() {
            draw_text(
                surface,
                &self.fonts,
                Element::Text(field),
                line,
                anchor.offset(0.0, i as f32 * spacing),
                font,
                align,
            );
        }
    }

    fn draw_name_underline(&self, surface: &mut RenderSurface, name: &str) {
        let style = &self.config.fallback;
        let font = self.config.font(FontRole::ParticipantName);
        let anchor = self.config.anchor(TextField::ParticipantName);
        let half = underline_half_width(self.fonts.measure_text_width(name, font), style);
        let y = anchor.y + style.underline_offset;
        surface.stroke_line(
            Element::NameUnderline,
            (anchor.x - half, y),
            (anchor.x + half, y),
            style.underline_width,
            style.underline_color,
            Some((0.2, 0.8)),
        );
    }

    fn draw_signatories(&self, surface: &mut RenderSurface) {
        let style = &self.config.fallback;
        let name_font = self.config.font(FontRole::SignatoryName);
        let role_font = self.config.font(FontRole::SignatoryDesignation);

        for signatory in &self.config.signatories {
            let pos = signatory.anchor;
            let rule_y = pos.y - style.signature_rule_rise;
            surface.stroke_line(
                Element::SignatureRule,
                (pos.x - style.signature_rule_half_width, rule_y),
                (pos.x + style.signature_rule_half_width, rule_y),
                style.signature_rule_width,
                style.signature_rule_color,
                None,
            );
            draw_text(
                surface,
                &self.fonts,
                Element::SignatoryName,
                &signatory.name,
                pos,
                name_font,
                TextAlign::Center,
            );
            draw_text(
                surface,
                &self.fonts,
                Element::SignatoryDesignation,
                &signatory.designation,
                pos.offset(0.0, style.designation_drop),
                role_font,
                TextAlign::Center,
            );
        }
    }
}
