//! Session – the context object tying roster, renderer and export together.
//!
//! Holds everything the generator needs between user actions: the validated
//! layout, loaded fonts, the roster and template (published asynchronously
//! through watch slots), and the most recent render. Until a roster load
//! publishes, validation is fail-open; until a template load publishes,
//! renders use the fallback layout.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::certificate::{CertificateForm, CertificateRecord, DEFAULT_ID_PREFIX};
use crate::error::{CertError, Result};
use crate::export::{self, Download, PageSize, PrintDocument};
use crate::fonts::FontManager;
use crate::layout_config::LayoutConfig;
use crate::render::Renderer;
use crate::roster::{self, Roster, DEFAULT_NAME_COLUMN, DEFAULT_SUGGESTION_LIMIT};
use crate::surface::{RenderSurface, Template};

/// Runtime settings for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub layout: LayoutConfig,
    /// Directory of `.ttf` / `.otf` files used for text outlines.
    pub font_dir: Option<PathBuf>,
    /// CSV column holding participant names.
    pub name_column: usize,
    pub id_prefix: String,
    pub suggestion_limit: usize,
    pub page: PageSize,
    /// Pause before PDF encoding so a progress indicator can be shown.
    pub export_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            layout: LayoutConfig::default(),
            font_dir: None,
            name_column: DEFAULT_NAME_COLUMN,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
            page: PageSize::a4_landscape(),
            export_delay: Duration::from_millis(100),
        }
    }
}

/// A value that is filled in later by an async load.
#[derive(Clone)]
pub struct Slot<T> {
    tx: Arc<watch::Sender<T>>,
}

impl<T: Clone> Slot<T> {
    fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Resolves on the next publish after this call, even if the returned
    /// future is first polled later.
    pub fn changed(&self) -> impl Future<Output = ()> + Send + 'static
    where
        T: Send + Sync + 'static,
    {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.changed().await;
        }
    }
}

/// The last completed render pass.
pub struct RenderedCertificate {
    pub record: CertificateRecord,
    pub surface: RenderSurface,
}

pub struct Session {
    config: SessionConfig,
    renderer: Renderer,
    roster: Slot<Arc<Roster>>,
    template: Slot<Option<Arc<Template>>>,
    rendered: Option<RenderedCertificate>,
}

impl Session {
    /// Validate the layout, load fonts and create an empty session.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.layout.validate()?;

        let mut fonts = FontManager::default();
        if let Some(dir) = &config.font_dir {
            match fonts.load_dir(dir) {
                Ok(n) => log::info!("Loaded {n} fonts from '{}'", dir.display()),
                Err(e) => log::warn!("Cannot read font directory '{}': {e}", dir.display()),
            }
        }

        let renderer = Renderer::new(Arc::new(config.layout.clone()), Arc::new(fonts))?;
        Ok(Self {
            config,
            renderer,
            roster: Slot::new(Arc::new(Roster::default())),
            template: Slot::new(None),
            rendered: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ── Roster ────────────────────────────────────────────────────────────

    pub fn roster(&self) -> Arc<Roster> {
        self.roster.get()
    }

    pub fn roster_slot(&self) -> &Slot<Arc<Roster>> {
        &self.roster
    }

    pub fn set_roster(&self, roster: Roster) {
        self.roster.set(Arc::new(roster));
    }

    /// Load the roster and publish it.
    pub async fn load_roster(&self, path: impl AsRef<Path>) {
        let roster = roster::load(path, self.config.name_column).await;
        self.set_roster(roster);
    }

    /// Fire-and-forget roster load on the current tokio runtime.
    pub fn spawn_roster_load(&self, path: PathBuf) -> JoinHandle<()> {
        let slot = self.roster.clone();
        let column = self.config.name_column;
        tokio::spawn(async move {
            let roster = roster::load(path, column).await;
            slot.set(Arc::new(roster));
        })
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.roster().is_valid(name)
    }

    pub fn suggest(&self, query: &str) -> Vec<String> {
        self.roster().suggest(query, self.config.suggestion_limit)
    }

    // ── Template ──────────────────────────────────────────────────────────

    pub fn template(&self) -> Option<Arc<Template>> {
        self.template.get()
    }

    pub fn template_slot(&self) -> &Slot<Option<Arc<Template>>> {
        &self.template
    }

    pub fn set_template(&self, template: Option<Template>) {
        self.template.set(template.map(Arc::new));
    }

    /// Decode the template and publish it. Failure leaves the fallback layout
    /// in place.
    pub async fn load_template(&self, path: impl AsRef<Path>) {
        if let Some(t) = load_template(path.as_ref()).await {
            self.set_template(Some(t));
        }
    }

    /// Fire-and-forget template load on the current tokio runtime.
    pub fn spawn_template_load(&self, path: PathBuf) -> JoinHandle<()> {
        let slot = self.template.clone();
        tokio::spawn(async move {
            if let Some(t) = load_template(&path).await {
                slot.set(Some(Arc::new(t)));
            }
        })
    }

    // ── Generate / export ─────────────────────────────────────────────────

    /// Validate the form, build the record and render it.
    pub fn generate(&mut self, form: &CertificateForm) -> Result<&RenderedCertificate> {
        let roster = self.roster();
        let record = form.submit(&roster, &self.config.id_prefix)?;
        self.render(record)
    }

    /// Render an already-built record, replacing the previous render.
    pub fn render(&mut self, record: CertificateRecord) -> Result<&RenderedCertificate> {
        let template = self.template();
        let mut surface = match self.rendered.take() {
            Some(previous) => previous.surface,
            None => self.renderer.new_surface()?,
        };
        self.renderer
            .render_into(&mut surface, &record, template.as_deref());
        log::info!(
            "Rendered certificate {} for '{}' ({})",
            record.certificate_id(),
            record.participant_name(),
            if template.is_some() { "template" } else { "fallback" }
        );
        Ok(self.rendered.insert(RenderedCertificate { record, surface }))
    }

    pub fn rendered(&self) -> Option<&RenderedCertificate> {
        self.rendered.as_ref()
    }

    /// Build the PDF for the last render.
    pub async fn download(&self) -> Result<Download> {
        let rendered = self.rendered.as_ref().ok_or(CertError::NotRendered)?;
        if !self.config.export_delay.is_zero() {
            tokio::time::sleep(self.config.export_delay).await;
        }
        export::to_downloadable(
            &rendered.surface,
            rendered.record.participant_name(),
            &self.config.page,
        )
    }

    /// Build the print page for the last render.
    pub fn print(&self) -> Result<PrintDocument> {
        let rendered = self.rendered.as_ref().ok_or(CertError::NotRendered)?;
        export::to_printable(&rendered.surface, &self.config.page)
    }
}

/// Read and decode a template image. Logs and returns `None` on failure.
pub async fn load_template(path: &Path) -> Option<Template> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) => {
            log::warn!(
                "Background image '{}' not found ({e}). Using fallback design.",
                path.display()
            );
            return None;
        }
    };
    match Template::decode(&bytes) {
        Ok(t) => {
            log::info!("Background image loaded ({}x{})", t.width(), t.height());
            Some(t)
        }
        Err(e) => {
            log::warn!(
                "Background image '{}' unusable ({e}). Using fallback design.",
                path.display()
            );
            None
        }
    }
}
