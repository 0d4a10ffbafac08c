//! Layout config – the fixed geometry, fonts and wording of a certificate.
//!
//! One value is built at start-up, validated with [`LayoutConfig::validate`],
//! and shared read-only by every render pass. It serialises to JSON so a
//! deployment can ship its own coordinates without recompiling.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CertError, Result};

/// A text slot on the certificate that has its own anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    // Overlaid on the template (and reused by the fallback layout where noted).
    ParticipantName,
    EventLine1,
    EventLine2,
    SerialNumber,
    // Fallback layout only.
    LeftLogo,
    RightLogo,
    CertificateTitle,
    Subtitle,
    AwardedTo,
    EventDetails,
    CertificateId,
}

impl TextField {
    pub const ALL: [TextField; 11] = [
        TextField::ParticipantName,
        TextField::EventLine1,
        TextField::EventLine2,
        TextField::SerialNumber,
        TextField::LeftLogo,
        TextField::RightLogo,
        TextField::CertificateTitle,
        TextField::Subtitle,
        TextField::AwardedTo,
        TextField::EventDetails,
        TextField::CertificateId,
    ];

    /// The font a field is drawn with.
    pub fn font_role(self) -> FontRole {
        match self {
            TextField::ParticipantName => FontRole::ParticipantName,
            TextField::EventLine1 | TextField::EventLine2 => FontRole::EventDetails,
            TextField::SerialNumber => FontRole::SerialNumber,
            TextField::LeftLogo | TextField::RightLogo => FontRole::LogoText,
            TextField::CertificateTitle => FontRole::CertificateTitle,
            TextField::Subtitle => FontRole::Subtitle,
            TextField::AwardedTo => FontRole::AwardedTo,
            TextField::EventDetails => FontRole::FallbackEventDetails,
            TextField::CertificateId => FontRole::CertificateId,
        }
    }
}

/// A named font descriptor. Several fields may share one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontRole {
    ParticipantName,
    EventDetails,
    SerialNumber,
    LogoText,
    CertificateTitle,
    Subtitle,
    AwardedTo,
    FallbackEventDetails,
    SignatoryName,
    SignatoryDesignation,
    CertificateId,
    Watermark,
}

impl FontRole {
    pub const ALL: [FontRole; 12] = [
        FontRole::ParticipantName,
        FontRole::EventDetails,
        FontRole::SerialNumber,
        FontRole::LogoText,
        FontRole::CertificateTitle,
        FontRole::Subtitle,
        FontRole::AwardedTo,
        FontRole::FallbackEventDetails,
        FontRole::SignatoryName,
        FontRole::SignatoryDesignation,
        FontRole::CertificateId,
        FontRole::Watermark,
    ];
}

/// Horizontal text alignment relative to the anchor x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Pixel position on the canvas, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// An RGBA colour, serialised as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        let nibble = |i: usize| {
            let v = u8::from_str_radix(hex.get(i..i + 1)?, 16).ok()?;
            Some(v * 17)
        };
        match hex.len() {
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
                a: byte(6)?,
            }),
            3 => Some(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            _ => None,
        }
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: (self.a as f32 * alpha.clamp(0.0, 1.0)).round() as u8,
            ..self
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        Color::from_hex(&s).ok_or_else(|| format!("invalid colour {s:?}"))
    }
}

impl From<Color> for String {
    fn from(c: Color) -> Self {
        c.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

/// Size, weight, family list and colour for one [`FontRole`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontDescriptor {
    /// Size in canvas pixels.
    pub size: f32,
    #[serde(default)]
    pub weight: FontWeight,
    /// Comma-separated preference list, e.g. `"Georgia, serif"`.
    pub family: String,
    pub color: Color,
}

impl FontDescriptor {
    fn new(size: f32, weight: FontWeight, family: &str, color: Color) -> Self {
        Self {
            size,
            weight,
            family: family.to_string(),
            color,
        }
    }

    pub fn is_bold(&self) -> bool {
        self.weight == FontWeight::Bold
    }

    /// Individual family names, most preferred first.
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.family
            .split(',')
            .map(|f| f.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|f| !f.is_empty())
    }
}

/// Someone whose name and role appear at the foot of the fallback layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signatory {
    pub name: String,
    pub designation: String,
    /// Anchor of the name line; the rule sits above it, the designation below.
    pub anchor: Anchor,
}

/// Fixed text of the certificate. `{event}` and `{date}` are substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wording {
    pub event_line_1: String,
    pub event_line_2: String,
    pub serial_label: String,
    pub title: String,
    pub subtitle: String,
    pub awarded_to: String,
    pub fallback_event_line_1: String,
    pub fallback_event_line_2: String,
    /// Logo placeholders; `\n` separates lines.
    pub left_logo: String,
    pub right_logo: String,
    pub watermark: String,
}

impl Default for Wording {
    fn default() -> Self {
        Self {
            event_line_1: "For participating in the event \"{event}\"".to_string(),
            event_line_2: "Hosted by AI Innovation Society of the Department of \
                           Artificial Intelligence (STMU), on {date}"
                .to_string(),
            serial_label: "Serial No: ".to_string(),
            title: "CERTIFICATE".to_string(),
            subtitle: "OF PARTICIPATION".to_string(),
            awarded_to: "THIS CERTIFICATE IS AWARDED TO".to_string(),
            fallback_event_line_1:
                "For participating in the event \"{event}\" Hosted by AI Innovation Society"
                    .to_string(),
            fallback_event_line_2:
                "of the Department of Artificial Intelligence (STMU), on {date}".to_string(),
            left_logo: "AI Innovation Society".to_string(),
            right_logo: "Department of Artificial Intelligence\nShifa Tameer-e-Millat University"
                .to_string(),
            watermark: "AIS".to_string(),
        }
    }
}

/// Substitute `{event}` and `{date}` placeholders.
pub fn fill_placeholders(template: &str, event: &str, date: &str) -> String {
    template.replace("{event}", event).replace("{date}", date)
}

/// Geometry and colours of the code-drawn fallback design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStyle {
    pub background: Color,
    pub border_margin: f32,
    pub outer_border_width: f32,
    pub outer_border_color: Color,
    /// Extra inset of the inner border from the outer one.
    pub inner_border_inset: f32,
    pub inner_border_width: f32,
    pub inner_border_color: Color,
    /// Distance of each ornament centre from the two nearest canvas edges.
    pub ornament_inset: f32,
    pub ornament_radius: f32,
    pub ornament_color: Color,
    pub watermark_alpha: f32,
    pub watermark_angle_deg: f32,
    /// Vertical distance between logo lines.
    pub logo_line_spacing: f32,
    /// Vertical distance between the two event lines.
    pub event_line_spacing: f32,
    pub underline_offset: f32,
    pub underline_padding: f32,
    pub underline_min_half_width: f32,
    pub underline_width: f32,
    pub underline_color: Color,
    pub signature_rule_half_width: f32,
    /// Rule position above the signatory name.
    pub signature_rule_rise: f32,
    pub signature_rule_width: f32,
    pub signature_rule_color: Color,
    /// Designation position below the signatory name.
    pub designation_drop: f32,
}

impl Default for FallbackStyle {
    fn default() -> Self {
        let navy = Color::rgb(0x1e, 0x3a, 0x8a);
        let gold = Color::rgb(0xc9, 0xa2, 0x27);
        Self {
            background: Color::WHITE,
            border_margin: 80.0,
            outer_border_width: 40.0,
            outer_border_color: navy,
            inner_border_inset: 50.0,
            inner_border_width: 20.0,
            inner_border_color: gold,
            ornament_inset: 150.0,
            ornament_radius: 25.0,
            ornament_color: gold,
            watermark_alpha: 0.03,
            watermark_angle_deg: -30.0,
            logo_line_spacing: 40.0,
            event_line_spacing: 60.0,
            underline_offset: 70.0,
            underline_padding: 50.0,
            underline_min_half_width: 300.0,
            underline_width: 4.0,
            underline_color: gold,
            signature_rule_half_width: 150.0,
            signature_rule_rise: 40.0,
            signature_rule_width: 2.0,
            signature_rule_color: Color::rgb(0x1e, 0x3a, 0x5f),
            designation_drop: 45.0,
        }
    }
}

/// The complete certificate layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Canvas width in pixels.
    pub canvas_width: u32,
    /// Canvas height in pixels.
    pub canvas_height: u32,
    pub anchors: BTreeMap<TextField, Anchor>,
    pub fonts: BTreeMap<FontRole, FontDescriptor>,
    #[serde(default)]
    pub wording: Wording,
    #[serde(default)]
    pub signatories: Vec<Signatory>,
    #[serde(default)]
    pub fallback: FallbackStyle,
}

impl Default for LayoutConfig {
    /// A4 landscape at ~300 dpi with the AI Innovation Society layout.
    fn default() -> Self {
        let (w, h) = (3508u32, 2480u32);
        let cx = w as f32 / 2.0;

        let anchors = BTreeMap::from([
            (TextField::ParticipantName, Anchor::new(cx, 1300.0)),
            (TextField::EventLine1, Anchor::new(cx, 1480.0)),
            (TextField::EventLine2, Anchor::new(cx, 1570.0)),
            (TextField::SerialNumber, Anchor::new(3350.0, 2380.0)),
            (TextField::LeftLogo, Anchor::new(250.0, 320.0)),
            (TextField::RightLogo, Anchor::new(3258.0, 320.0)),
            (TextField::CertificateTitle, Anchor::new(cx, 620.0)),
            (TextField::Subtitle, Anchor::new(cx, 780.0)),
            (TextField::AwardedTo, Anchor::new(cx, 1020.0)),
            (TextField::EventDetails, Anchor::new(cx, 1500.0)),
            (TextField::CertificateId, Anchor::new(3300.0, 2300.0)),
        ]);

        let navy = Color::rgb(0x1e, 0x3a, 0x5f);
        let bold = FontWeight::Bold;
        let normal = FontWeight::Normal;
        let fonts = BTreeMap::from([
            (
                FontRole::ParticipantName,
                FontDescriptor::new(90.0, bold, "Georgia, serif", navy),
            ),
            (
                FontRole::EventDetails,
                FontDescriptor::new(48.0, normal, "Georgia, serif", Color::rgb(0x37, 0x41, 0x51)),
            ),
            (
                FontRole::SerialNumber,
                FontDescriptor::new(32.0, bold, "Consolas, Courier New, monospace", navy),
            ),
            (
                FontRole::LogoText,
                FontDescriptor::new(32.0, bold, "Arial, sans-serif", navy),
            ),
            (
                FontRole::CertificateTitle,
                FontDescriptor::new(140.0, bold, "Georgia, serif", Color::rgb(0x1e, 0x3a, 0x8a)),
            ),
            (
                FontRole::Subtitle,
                FontDescriptor::new(80.0, bold, "Georgia, serif", Color::rgb(0xc9, 0xa2, 0x27)),
            ),
            (
                FontRole::AwardedTo,
                FontDescriptor::new(45.0, normal, "Arial, sans-serif", Color::rgb(0x35, 0x52, 0x84)),
            ),
            (
                FontRole::FallbackEventDetails,
                FontDescriptor::new(49.0, normal, "Arial, sans-serif", Color::rgb(0, 0, 0)),
            ),
            (
                FontRole::SignatoryName,
                FontDescriptor::new(38.0, bold, "Georgia, serif", navy),
            ),
            (
                FontRole::SignatoryDesignation,
                FontDescriptor::new(28.0, normal, "Arial, sans-serif", Color::rgb(0x64, 0x74, 0x8b)),
            ),
            (
                FontRole::CertificateId,
                FontDescriptor::new(30.0, normal, "Courier New, monospace", Color::rgb(0x94, 0xa3, 0xb8)),
            ),
            (
                FontRole::Watermark,
                FontDescriptor::new(300.0, bold, "Georgia, serif", navy),
            ),
        ]);

        let sig_y = 2050.0;
        let signatories = vec![
            Signatory {
                name: "Dr. Hufsa Mohsin".to_string(),
                designation: "HOD, Department Of Artificial Intelligence".to_string(),
                anchor: Anchor::new(700.0, sig_y),
            },
            Signatory {
                name: "Sudais Khalid".to_string(),
                designation: "President, AI Innovation Society".to_string(),
                anchor: Anchor::new(cx, sig_y),
            },
            Signatory {
                name: "Muhammad Tahir".to_string(),
                designation: "Head, AI Innovation Society".to_string(),
                anchor: Anchor::new(2808.0, sig_y),
            },
        ];

        Self {
            canvas_width: w,
            canvas_height: h,
            anchors,
            fonts,
            wording: Wording::default(),
            signatories,
            fallback: FallbackStyle::default(),
        }
    }
}

impl LayoutConfig {
    /// Check that every field has an anchor and every font role a
    /// descriptor, and that the canvas is usable.
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if self.canvas_width == 0 || self.canvas_height == 0 {
            problems.push(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            ));
        }
        // RGBA rows must stay addressable with an i32 stride.
        if u64::from(self.canvas_width) * 4 > i32::MAX as u64 {
            problems.push(format!("canvas width {} is too large", self.canvas_width));
        }
        for field in TextField::ALL {
            if !self.anchors.contains_key(&field) {
                problems.push(format!("missing anchor for {field:?}"));
            }
        }
        for role in FontRole::ALL {
            match self.fonts.get(&role) {
                None => problems.push(format!("missing font for {role:?}")),
                Some(f) if !(f.size > 0.0) => {
                    problems.push(format!("font size for {role:?} must be positive"))
                }
                Some(f) if f.families().next().is_none() => {
                    problems.push(format!("font family for {role:?} is empty"))
                }
                Some(_) => {}
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(CertError::Config(problems.join(", ")))
        }
    }

    /// Anchor of `field`.
    ///
    /// Panics if the config was not validated.
    pub fn anchor(&self, field: TextField) -> Anchor {
        self.anchors[&field]
    }

    /// Font of `role`. Panics on an unvalidated config, like [`Self::anchor`].
    pub fn font(&self, role: FontRole) -> &FontDescriptor {
        &self.fonts[&role]
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| CertError::Config(e.to_string()))
    }

    /// Deserialise from JSON and validate.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CertError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
