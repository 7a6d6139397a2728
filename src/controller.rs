//! Page and button orchestration.
//!
//! The [`Controller`] owns the pages, the current page, the action bindings
//! and the device session. Every operation validates first, then touches
//! hardware, then mutates memory, then persists. Key presses are dispatched
//! through [`Controller::on_key_event`], which never fails outward.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::device::{DeviceSession, ImageEncoding};
use crate::error::{DeckError, Result};
use crate::launcher::BoxedLauncher;
use crate::model::{
    Action, ActionBinding, ActionType, Bindings, ButtonConfig, ButtonRequest, DEFAULT_FONT_SIZE,
    MAIN_PAGE, Page, PageBindings, Pages, Rgb,
};
use crate::render::{BoxedImageBackend, clamp_font_size};
use crate::store::PersistenceStore;
use crate::validate::{validate_action, validate_color_or, validate_key, validate_page_name};

/// Snapshot of the device and controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckInfo {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firmware: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_count: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub columns: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_size: Option<(u32, u32)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_format: Option<ImageEncoding>,
    pub current_page: String,
    pub brightness: u8,
}

/// One row of [`Controller::list_pages`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageSummary {
    pub name: String,
    pub buttons: usize,
    pub actions: usize,
    pub current: bool,
}

pub struct Controller {
    store: PersistenceStore,
    pages: Pages,
    bindings: Bindings,
    current_page: String,
    session: DeviceSession,
    renderer: BoxedImageBackend,
    launcher: BoxedLauncher,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("current_page", &self.current_page)
            .field("pages", &self.pages.len())
            .field("session", &self.session)
            .field("renderer", &self.renderer.name())
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Build a controller from persisted state; the current page is `main`.
    pub fn new(
        store: PersistenceStore,
        session: DeviceSession,
        renderer: BoxedImageBackend,
        launcher: BoxedLauncher,
    ) -> Self {
        store.ensure_dir();
        let snapshot = store.load();
        debug!(
            pages = snapshot.pages.len(),
            renderer = renderer.name(),
            "Controller initialised"
        );

        Self {
            store,
            pages: snapshot.pages,
            bindings: snapshot.bindings,
            current_page: MAIN_PAGE.to_string(),
            session,
            renderer,
            launcher,
        }
    }

    // === Accessors ===

    pub fn current_page(&self) -> &str {
        &self.current_page
    }

    pub fn pages(&self) -> &Pages {
        &self.pages
    }

    /// Button configs of a page.
    pub fn page(&self, name: &str) -> Option<&Page> {
        self.pages.get(name)
    }

    /// Action bindings of a page.
    pub fn bindings(&self, name: &str) -> Option<&PageBindings> {
        self.bindings.get(name)
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut DeviceSession {
        &mut self.session
    }

    fn save(&self) {
        self.store.save(&self.pages, &self.bindings);
    }

    // === Connection ===

    /// Connect to the first device and draw the current page on it.
    #[instrument(skip(self))]
    pub fn connect(&mut self) -> Result<DeckInfo> {
        self.session.connect()?;
        let drawn = self.render_current_page();
        debug!(drawn, page = %self.current_page, "Current page drawn after connect");
        Ok(self.info())
    }

    /// Reset and release the device.
    pub fn disconnect(&mut self) {
        self.session.disconnect();
    }

    /// Disconnect and drop the event sink so the event loop can finish.
    pub fn shutdown(&mut self) {
        self.session.disconnect();
        self.session.detach_event_sink();
    }

    pub fn info(&self) -> DeckInfo {
        let device = self.session.info();
        DeckInfo {
            connected: device.is_some(),
            model: device.map(|d| d.kind.clone()),
            product_name: device.map(|d| d.product_name.clone()),
            serial: device.map(|d| d.serial.clone()),
            firmware: device.map(|d| d.firmware_version.clone()),
            key_count: device.map(|d| d.key_count),
            columns: device.map(|d| d.cols),
            rows: device.map(|d| d.rows),
            key_size: device.map(|d| d.image_format.size()),
            key_format: device.map(|d| d.image_format.encoding),
            current_page: self.current_page.clone(),
            brightness: self.session.brightness(),
        }
    }

    pub fn set_brightness(&mut self, percent: i64) -> Result<u8> {
        self.session.set_brightness(percent)
    }

    // === Buttons ===

    /// Render and push one button on the current page.
    #[instrument(skip(self, request), fields(key = request.key, page = %self.current_page))]
    pub fn set_button(&mut self, request: &ButtonRequest, persist: bool) -> Result<()> {
        self.session.health_check()?;

        let key = validate_key(request.key, self.session.key_count())?;
        let bg_color = validate_color_or(request.bg_color.as_deref(), "bg_color", Rgb::BLACK)?;
        let text_color =
            validate_color_or(request.text_color.as_deref(), "text_color", Rgb::WHITE)?;
        if let Some(action) = &request.action {
            validate_action(action)?;
        }

        let format = self
            .session
            .key_image_format()
            .ok_or(DeckError::DeviceNotConnected)?;
        let config = ButtonConfig {
            text: request.text.clone(),
            image_path: request.image_path.clone(),
            bg_color,
            text_color,
            font_size: clamp_font_size(
                request.font_size.unwrap_or(DEFAULT_FONT_SIZE),
                format.height,
            ),
        };

        let image = self.renderer.render(&format, &config)?;
        self.session.push_key_image(key, Some(&image))?;

        self.pages
            .entry(self.current_page.clone())
            .or_default()
            .insert(key, config);

        if let Some(action) = &request.action {
            self.bind(key, Action::decode(action, ActionType::Command));
        }

        if persist {
            self.save();
        }
        info!(key, "Button set");
        Ok(())
    }

    /// Apply many buttons, skipping the ones that fail, and persist once.
    ///
    /// Fails only when the device is unreachable before the first button.
    #[instrument(skip_all, fields(count = requests.len()))]
    pub fn set_buttons(&mut self, requests: &[ButtonRequest]) -> Result<usize> {
        self.session.health_check()?;

        let mut applied = 0;
        for request in requests {
            match self.set_button(request, false) {
                Ok(()) => applied += 1,
                Err(e) => warn!(key = request.key, error = %e, "Skipping button"),
            }
        }

        self.save();
        info!(applied, requested = requests.len(), "Buttons set");
        Ok(applied)
    }

    /// Bind an action to a key on the current page.
    ///
    /// Works without a device; the key is then only checked for sign and
    /// width.
    pub fn set_action(
        &mut self,
        key: i64,
        action: &str,
        kind: ActionType,
        persist: bool,
    ) -> Result<Action> {
        let key = validate_key(key, self.session.key_count())?;
        validate_action(action)?;

        let action = Action::decode(action, kind);
        self.bind(key, action.clone());
        if persist {
            self.save();
        }
        info!(key, %action, page = %self.current_page, "Action set");
        Ok(action)
    }

    fn bind(&mut self, key: u8, action: Action) {
        self.bindings
            .entry(self.current_page.clone())
            .or_default()
            .insert(key, ActionBinding::new(action));
    }

    /// Blank one key and forget its appearance and action on this page.
    pub fn clear_button(&mut self, key: i64) -> Result<()> {
        self.session.health_check()?;
        let key = validate_key(key, self.session.key_count())?;
        self.session.push_key_image(key, None)?;

        if let Some(page) = self.pages.get_mut(&self.current_page) {
            page.remove(&key);
        }
        if let Some(bindings) = self.bindings.get_mut(&self.current_page) {
            bindings.remove(&key);
        }

        self.save();
        info!(key, page = %self.current_page, "Button cleared");
        Ok(())
    }

    /// Blank every key and forget the current page's buttons and actions.
    pub fn clear_all(&mut self) -> Result<()> {
        self.session.health_check()?;
        self.session.clear_all_keys()?;

        if let Some(page) = self.pages.get_mut(&self.current_page) {
            page.clear();
        }
        self.bindings.remove(&self.current_page);

        self.save();
        info!(page = %self.current_page, "All buttons cleared");
        Ok(())
    }

    // === Pages ===

    /// Create an empty page; `false` when it already exists.
    pub fn create_page(&mut self, name: &str) -> Result<bool> {
        validate_page_name(name)?;
        if self.pages.contains_key(name) {
            debug!(page = name, "Page already exists");
            return Ok(false);
        }

        self.pages.insert(name.to_string(), Page::new());
        self.save();
        info!(page = name, "Page created");
        Ok(true)
    }

    /// Make `name` current and redraw it on the device.
    ///
    /// Without a device only the current page changes.
    #[instrument(skip(self))]
    pub fn switch_page(&mut self, name: &str) -> Result<()> {
        if !self.pages.contains_key(name) {
            return Err(DeckError::UnknownPage {
                name: name.to_string(),
            });
        }

        if self.session.is_connected() {
            self.session.health_check()?;
        }

        self.current_page = name.to_string();
        let drawn = self.render_current_page();
        info!(page = name, drawn, "Switched page");
        Ok(())
    }

    /// Blank the device and draw every stored button of the current page.
    ///
    /// Returns how many keys were drawn. Failures are logged per key.
    fn render_current_page(&mut self) -> usize {
        let (Some(format), Some(key_count)) =
            (self.session.key_image_format(), self.session.key_count())
        else {
            return 0;
        };

        if let Err(e) = self.session.clear_all_keys() {
            warn!(error = %e, "Failed to blank keys before redraw");
            return 0;
        }

        let Some(page) = self.pages.get(&self.current_page) else {
            return 0;
        };

        let mut drawn = 0;
        for (&key, config) in page {
            if key >= key_count {
                warn!(key, key_count, "Stored button is beyond this device, skipping");
                continue;
            }
            let pushed = self
                .renderer
                .render(&format, config)
                .and_then(|image| self.session.push_key_image(key, Some(&image)));
            match pushed {
                Ok(()) => drawn += 1,
                Err(e) => warn!(key, error = %e, "Failed to draw stored button"),
            }
        }
        drawn
    }

    /// Delete a page and its actions; falls back to `main` if it was current.
    pub fn delete_page(&mut self, name: &str) -> Result<()> {
        if name == MAIN_PAGE {
            return Err(DeckError::CannotDeleteMain);
        }
        if self.pages.remove(name).is_none() {
            return Err(DeckError::UnknownPage {
                name: name.to_string(),
            });
        }
        self.bindings.remove(name);

        if self.current_page == name {
            self.current_page = MAIN_PAGE.to_string();
            if self.session.is_connected() {
                match self.session.health_check() {
                    Ok(_) => {
                        self.render_current_page();
                    }
                    Err(e) => warn!(error = %e, "Could not redraw main page"),
                }
            }
        }

        self.save();
        info!(page = name, "Page deleted");
        Ok(())
    }

    /// All pages in name order.
    pub fn list_pages(&self) -> Vec<PageSummary> {
        self.pages
            .iter()
            .map(|(name, page)| PageSummary {
                name: name.clone(),
                buttons: page.len(),
                actions: self.bindings.get(name).map_or(0, PageBindings::len),
                current: *name == self.current_page,
            })
            .collect()
    }

    // === Dispatch ===

    /// Handle a hardware key event. Releases are ignored.
    pub fn on_key_event(&mut self, key: u8, pressed: bool) {
        if !pressed {
            return;
        }

        let Some(binding) = self
            .bindings
            .get(&self.current_page)
            .and_then(|page| page.get(&key))
        else {
            debug!(key, page = %self.current_page, "No action bound");
            return;
        };

        match binding.action.clone() {
            Action::SwitchPage(target) => {
                if let Err(e) = self.switch_page(&target) {
                    warn!(key, target = %target, error = %e, "Page switch action failed");
                }
            }
            Action::Command(command) => {
                debug!(key, command = %command, "Dispatching command");
                self.launcher.launch(&command);
            }
        }
    }
}
