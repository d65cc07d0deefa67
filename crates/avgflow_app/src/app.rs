use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use avgflow_core::{
    boundary::{CaughtFault, ErrorBoundary},
    engagement::WishDraft,
    feed::{FeedIcon, FeedRow, FeedView},
    notification::Notification,
    seed::Seed,
    service::CenterError,
    storage::{JsonFileStore, KeyValueStore, MemoryStore},
    store::InMemoryNotificationStore,
    theme::{Theme, ThemeStore, ThemeSurface},
    toast::{Toast, ToastLevel, ToastQueue},
    NotificationCenter,
};
use chrono::{Local, Utc};
use egui::{Color32, RichText};
use tracing::{debug, info, warn};

const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) data_dir: PathBuf,
    pub(crate) seed_path: Option<PathBuf>,
    pub(crate) viewer_id: Option<String>,
    pub(crate) admin_emails: Vec<String>,
    pub(crate) toast_seconds: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var("AVGFLOW_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(seed) = std::env::var("AVGFLOW_SEED") {
            let path = PathBuf::from(seed.trim());
            anyhow::ensure!(path.is_file(), "seed file `{}` does not exist", path.display());
            config.seed_path = Some(path);
        }
        if let Ok(viewer) = std::env::var("AVGFLOW_VIEWER") {
            let viewer = viewer.trim();
            if !viewer.is_empty() {
                config.viewer_id = Some(viewer.to_string());
            }
        }
        if let Ok(list) = std::env::var("AVGFLOW_ADMIN_EMAILS") {
            config.admin_emails = parse_email_list(&list);
        }
        if let Ok(seconds) = std::env::var("AVGFLOW_TOAST_SECONDS") {
            match parse_toast_seconds(&seconds) {
                Some(value) => config.toast_seconds = value,
                None => warn!(value = %seconds, "ignoring AVGFLOW_TOAST_SECONDS"),
            }
        }
        info!(
            data_dir = %config.data_dir.display(),
            seeded = config.seed_path.is_some(),
            admins = config.admin_emails.len(),
            "configuration loaded"
        );
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".avgflow"),
            seed_path: None,
            viewer_id: None,
            admin_emails: Vec::new(),
            toast_seconds: 4,
        }
    }
}

fn parse_email_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(String::from)
        .collect()
}

/// Positive whole seconds that fit a `chrono::Duration`.
fn parse_toast_seconds(raw: &str) -> Option<i64> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .filter(|value| *value > 0 && chrono::Duration::try_seconds(*value).is_some())
}

fn open_preferences(data_dir: &Path) -> Arc<dyn KeyValueStore> {
    let path = data_dir.join(PREFERENCES_FILE);
    match JsonFileStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(%err, "preferences unavailable, keeping them in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

/// Applies the theme by switching egui's light/dark preference.
pub struct EguiThemeSurface {
    ctx: egui::Context,
}

impl ThemeSurface for EguiThemeSurface {
    fn apply(&mut self, theme: Theme) {
        let preference = match theme {
            Theme::Dark => egui::Theme::Dark,
            Theme::Light => egui::Theme::Light,
        };
        self.ctx.set_theme(preference);
    }
}

enum UiAction {
    ToggleTheme,
    ToggleFeed,
    Activate(String),
    MarkAllRead,
    ClearAll,
    CloseDetail,
    EditDraft(String),
    QuickInsert(usize),
    SendWish,
    CancelCompose,
    DismissToast(u64),
    ResetBoundary,
}

struct AvgFlowApp {
    center: NotificationCenter,
    themes: ThemeStore<EguiThemeSurface>,
    toasts: ToastQueue,
    boundary: ErrorBoundary,
    show_feed: bool,
}

impl AvgFlowApp {
    fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Result<Self> {
        let seed = match &config.seed_path {
            Some(path) => Seed::load(path)?,
            None => {
                info!("no seed configured, using demo data");
                Seed::demo(Utc::now())
            }
        };
        let store = Arc::new(InMemoryNotificationStore::from_seed(&seed));
        let mut builder = NotificationCenter::builder()
            .with_store(store)
            .with_users(seed.users)
            .with_admin_emails(config.admin_emails.iter().cloned());
        if let Some(viewer) = &config.viewer_id {
            builder = builder.with_viewer(viewer.clone());
        }
        let center = builder
            .build()
            .context("failed to initialize notification center")?;

        let surface = EguiThemeSurface {
            ctx: cc.egui_ctx.clone(),
        };
        let themes = ThemeStore::load(open_preferences(&config.data_dir), surface);

        Ok(Self {
            center,
            themes,
            toasts: ToastQueue::new(
                chrono::Duration::try_seconds(config.toast_seconds)
                    .unwrap_or_else(|| chrono::Duration::seconds(4)),
            ),
            boundary: ErrorBoundary::new(),
            show_feed: false,
        })
    }

    fn apply(&mut self, action: UiAction) -> Result<(), CenterError> {
        let now = Utc::now();
        match action {
            UiAction::ToggleTheme => {
                let theme = self.themes.toggle();
                debug!(%theme, "theme toggled from header");
            }
            UiAction::ToggleFeed => self.show_feed = !self.show_feed,
            UiAction::Activate(id) => {
                self.center.activate(&id)?;
                if self.center.engagement().is_open() {
                    self.show_feed = false;
                }
            }
            UiAction::MarkAllRead => {
                let changed = self.center.mark_all_read();
                debug!(changed, "marked all notifications read");
            }
            UiAction::ClearAll => {
                let removed = self.center.clear_all()?;
                self.toasts.push(
                    ToastLevel::Info,
                    format!("Đã xóa {removed} thông báo"),
                    now,
                );
            }
            UiAction::CloseDetail => self.center.close_detail(),
            UiAction::EditDraft(text) => self.center.set_draft_message(text),
            UiAction::QuickInsert(index) => {
                self.center.quick_insert(index);
            }
            UiAction::SendWish => {
                let sent = self.center.send_wish(now)?;
                self.toasts.push(ToastLevel::Success, sent.confirmation, now);
            }
            UiAction::CancelCompose => self.center.cancel_compose(),
            UiAction::DismissToast(id) => self.toasts.dismiss(id),
            UiAction::ResetBoundary => {
                info!("retrying after render failure");
                self.boundary.reset();
            }
        }
        Ok(())
    }
}

impl eframe::App for AvgFlowApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Utc::now();
        let mut actions: Vec<UiAction> = Vec::new();

        let feed = self.center.feed(&Local);
        let center = &self.center;
        let theme = self.themes.theme();
        let show_feed = self.show_feed;
        let rendered = self
            .boundary
            .render(|| render_shell(ctx, center, theme, &feed, show_feed, &mut actions));
        if !rendered {
            render_fallback(ctx, self.boundary.fault(), &mut actions);
        }

        let toasts = self.toasts.visible(now).to_vec();
        if !toasts.is_empty() {
            render_toasts(ctx, &toasts, &mut actions);
            ctx.request_repaint_after(std::time::Duration::from_millis(500));
        }

        for action in actions {
            if let Err(err) = self.apply(action) {
                warn!(%err, "header action failed");
                self.toasts.push(ToastLevel::Error, err.to_string(), now);
            }
        }
    }
}

pub fn run(config: AppConfig) -> Result<()> {
    info!("starting eframe runtime");
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("AVGFlow")
            .with_inner_size([1024.0, 680.0]),
        ..Default::default()
    };
    eframe::run_native(
        "AVGFlow",
        options,
        Box::new(move |cc| {
            let app = AvgFlowApp::new(cc, config)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|err| anyhow::anyhow!("{err}"))
}

fn render_shell(
    ctx: &egui::Context,
    center: &NotificationCenter,
    theme: Theme,
    feed: &FeedView,
    show_feed: bool,
    actions: &mut Vec<UiAction>,
) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading("AVGFlow");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let theme_label = match theme {
                    Theme::Light => "🌙 Tối",
                    Theme::Dark => "☀ Sáng",
                };
                if ui.button(theme_label).clicked() {
                    actions.push(UiAction::ToggleTheme);
                }
                let bell = match feed.badge_label() {
                    Some(badge) => format!("🔔 {badge}"),
                    None => "🔔".to_string(),
                };
                if ui.add(egui::Button::new(bell).selected(show_feed)).clicked() {
                    actions.push(UiAction::ToggleFeed);
                }
                ui.label(center.viewer().name.as_str());
            });
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading(format!("Xin chào, {}", center.viewer().name));
        ui.label(format!("Bạn có {} thông báo chưa đọc.", feed.unread_count));
        ui.separator();
        ui.strong("Lời chúc gần đây");
        let wishes = center.store().wishes();
        if wishes.is_empty() {
            ui.weak("Chưa có lời chúc nào.");
        }
        for wish in wishes.iter().rev().take(10) {
            let to = center
                .user_name(&wish.to_user_id)
                .unwrap_or(wish.to_user_id.as_str());
            ui.label(format!(
                "{} → {} ({}): {}",
                wish.from_user_name,
                to,
                wish.kind.label(),
                wish.message
            ));
        }
    });

    if show_feed {
        render_feed(ctx, feed, actions);
    }
    if let Some(notification) = center.detail() {
        render_detail(ctx, notification, actions);
    }
    if let Some(draft) = center.engagement().draft() {
        render_compose(ctx, center, draft, actions);
    }
}

fn render_feed(ctx: &egui::Context, feed: &FeedView, actions: &mut Vec<UiAction>) {
    egui::Window::new("Thông báo")
        .anchor(egui::Align2::RIGHT_TOP, [-8.0, 40.0])
        .collapsible(false)
        .resizable(false)
        .default_width(360.0)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("{} chưa đọc", feed.unread_count));
                if ui.small_button("Đánh dấu tất cả đã đọc").clicked() {
                    actions.push(UiAction::MarkAllRead);
                }
                if feed.can_clear_all && ui.small_button("Xóa tất cả").clicked() {
                    actions.push(UiAction::ClearAll);
                }
            });
            ui.separator();
            if feed.is_empty() {
                ui.weak("Không có thông báo nào");
                return;
            }
            egui::ScrollArea::vertical()
                .max_height(380.0)
                .show(ui, |ui| {
                    for row in &feed.rows {
                        render_feed_row(ui, row, actions);
                    }
                });
        });
}

fn render_feed_row(ui: &mut egui::Ui, row: &FeedRow, actions: &mut Vec<UiAction>) {
    let title = if row.read {
        RichText::new(row.title.as_str())
    } else {
        RichText::new(row.title.as_str()).strong()
    };
    let response = ui
        .horizontal(|ui| {
            ui.label(RichText::new(row.icon.glyph()).color(icon_color(row.icon)));
            ui.vertical(|ui| {
                ui.label(title);
                ui.label(RichText::new(row.message.as_str()).small());
                if !row.display_time.is_empty() {
                    ui.label(RichText::new(row.display_time.as_str()).small().weak());
                }
            });
        })
        .response
        .interact(egui::Sense::click());
    if response.clicked() {
        actions.push(UiAction::Activate(row.id.clone()));
    }
    ui.separator();
}

fn render_detail(ctx: &egui::Context, notification: &Notification, actions: &mut Vec<UiAction>) {
    let mut open = true;
    egui::Window::new(notification.title.as_str())
        .id(egui::Id::new("notification-detail"))
        .open(&mut open)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(notification.message.as_str());
            if let Some(time) = notification.time.as_deref() {
                ui.weak(time);
            }
            if ui.button("Đóng").clicked() {
                actions.push(UiAction::CloseDetail);
            }
        });
    if !open {
        actions.push(UiAction::CloseDetail);
    }
}

fn render_compose(
    ctx: &egui::Context,
    center: &NotificationCenter,
    draft: &WishDraft,
    actions: &mut Vec<UiAction>,
) {
    let recipient = center
        .user_name(&draft.target_user_id)
        .unwrap_or("(không rõ)");
    let can_send = center.can_send();
    let modal = egui::Modal::new(egui::Id::new("wish-compose")).show(ctx, |ui| {
        ui.set_width(400.0);
        ui.heading(format!("Gửi lời chúc {}", draft.kind.label()));
        ui.label(format!("Tới: {recipient}"));
        let mut text = draft.message.clone();
        let edit = egui::TextEdit::multiline(&mut text)
            .desired_rows(5)
            .desired_width(f32::INFINITY);
        if ui.add(edit).changed() {
            actions.push(UiAction::EditDraft(text));
        }
        ui.horizontal(|ui| {
            for (index, suffix) in draft.kind.quick_inserts().iter().enumerate() {
                if ui.button(*suffix).clicked() {
                    actions.push(UiAction::QuickInsert(index));
                }
            }
        });
        ui.separator();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(can_send, egui::Button::new("Gửi lời chúc"))
                .clicked()
            {
                actions.push(UiAction::SendWish);
            }
            if ui.button("Hủy").clicked() {
                actions.push(UiAction::CancelCompose);
            }
        });
    });
    if modal.should_close() {
        actions.push(UiAction::CancelCompose);
    }
}

fn render_fallback(ctx: &egui::Context, fault: Option<&CaughtFault>, actions: &mut Vec<UiAction>) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Đã xảy ra lỗi");
        ui.label("Giao diện gặp sự cố và không thể hiển thị. Vui lòng thử lại.");
        if let Some(fault) = fault {
            ui.collapsing("Chi tiết", |ui| {
                ui.monospace(fault.message.as_str());
            });
        }
        if ui.button("Thử lại").clicked() {
            actions.push(UiAction::ResetBoundary);
        }
    });
}

fn render_toasts(ctx: &egui::Context, toasts: &[Toast], actions: &mut Vec<UiAction>) {
    egui::Area::new(egui::Id::new("toasts"))
        .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
        .show(ctx, |ui| {
            for toast in toasts {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.horizontal(|ui| {
                        ui.colored_label(toast_color(toast.level), toast.text.as_str());
                        if ui.small_button("✕").clicked() {
                            actions.push(UiAction::DismissToast(toast.id));
                        }
                    });
                });
            }
        });
}

fn icon_color(icon: FeedIcon) -> Color32 {
    match icon {
        FeedIcon::Alert => Color32::from_rgb(0xf5, 0x9e, 0x0b),
        FeedIcon::Success => Color32::from_rgb(0x22, 0xc5, 0x5e),
        FeedIcon::Info => Color32::from_rgb(0x3b, 0x82, 0xf6),
        FeedIcon::Error => Color32::from_rgb(0xef, 0x44, 0x44),
    }
}

fn toast_color(level: ToastLevel) -> Color32 {
    match level {
        ToastLevel::Success => icon_color(FeedIcon::Success),
        ToastLevel::Info => icon_color(FeedIcon::Info),
        ToastLevel::Error => icon_color(FeedIcon::Error),
    }
}
