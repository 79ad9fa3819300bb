//! Main application UI and state management.
//! Handles the word list, word editing, review sessions and import/export.

use crate::database::db;
use crate::export::json::{export_json_to_path, import_json};
use crate::models::{NewWord, ReviewSession, Stats, Word, WordPage, WordUpdate};
use crate::{Result, VocabError};
use chrono::{DateTime, Utc};
use eframe::egui;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{error, warn};

/// Application screen states
#[derive(Default)]
enum AppScreen {
    #[default]
    Main,
    Review,
}

/// Word being edited in the edit window
struct EditForm {
    id: i64,
    text: String,
    definition: String,
    source: String,
}

impl EditForm {
    fn from_word(word: &Word) -> Self {
        Self {
            id: word.id,
            text: word.text.clone(),
            definition: word.definition.clone().unwrap_or_default(),
            source: word.source.clone().unwrap_or_default(),
        }
    }
}

/// Actions collected while rendering, executed afterwards to avoid borrowing conflicts
enum ListAction {
    Edit(usize),
    Delete(i64),
}

/// Main application state
pub struct MyApp {
    show_confirmation_dialog: bool,
    allowed_to_close: bool,
    conn: Arc<Mutex<Connection>>,

    current_screen: AppScreen,
    review_session: Option<ReviewSession>,

    current_date_display: String,
    stats: Stats,

    search_query: String,
    page: WordPage,
    page_skip: usize,

    new_text: String,
    new_definition: String,
    new_source: String,
    editing: Option<EditForm>,

    show_message_dialog: bool,
    message: String,
}

/// Formats a date as YYYY-MM-DD
fn format_date(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d").to_string()
}

/// Offset of the page holding the last of `total` items, if `skip` is past it.
fn clamp_page_skip(skip: usize, total: usize, page_size: usize) -> usize {
    if skip < total {
        return skip;
    }
    total.saturating_sub(1) / page_size * page_size
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl eframe::App for MyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.current_screen {
            AppScreen::Main => self.render_main_screen(ctx),
            AppScreen::Review => self.render_review_screen(ctx),
        }

        // Handle window close requests with confirmation dialog
        if ctx.input(|i| i.viewport().close_requested()) && !self.allowed_to_close {
            ctx.send_viewport_cmd(egui::ViewportCommand::CancelClose);
            self.show_confirmation_dialog = true;
        }

        if self.show_confirmation_dialog {
            egui::Window::new("Do you want to quit?")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.horizontal(|ui| {
                        if ui.button("No").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = false;
                        }

                        if ui.button("Yes").clicked() {
                            self.show_confirmation_dialog = false;
                            self.allowed_to_close = true;
                            ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                });
        }

        self.render_edit_window(ctx);

        if self.show_message_dialog {
            egui::Window::new("Vocabulary")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    ui.label(&self.message);
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_message_dialog = false;
                    }
                });
        }
    }
}

impl MyApp {
    /// Creates a new application instance backed by the given database
    pub fn new(conn: Connection) -> Self {
        let mut app = Self {
            show_confirmation_dialog: false,
            allowed_to_close: false,
            conn: Arc::new(Mutex::new(conn)),
            current_screen: AppScreen::Main,
            review_session: None,
            current_date_display: "Unknown".to_string(),
            stats: Stats::default(),
            search_query: String::new(),
            page: WordPage::default(),
            page_skip: 0,
            new_text: String::new(),
            new_definition: String::new(),
            new_source: String::new(),
            editing: None,
            show_message_dialog: false,
            message: String::new(),
        };
        app.refresh();
        app
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().map_err(|_| VocabError::LockPoisoned)?;
        f(&conn)
    }

    fn show_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
        self.show_message_dialog = true;
    }

    /// Reloads date, stats and the current page of words from the database
    ///
    /// If the page fell past the end (e.g. its last word was deleted), the
    /// last non-empty page is loaded instead.
    fn refresh(&mut self) {
        let query = non_empty(&self.search_query);
        let skip = self.page_skip;
        let loaded = self.with_conn(|conn| {
            let now = db::get_current_date(conn)?;
            let stats = db::stats(now, conn)?;
            let mut skip = skip;
            let mut page = db::list_words(query.as_deref(), skip, db::DEFAULT_PAGE_SIZE, conn)?;
            let clamped = clamp_page_skip(skip, page.total, db::DEFAULT_PAGE_SIZE);
            if page.items.is_empty() && clamped != skip {
                skip = clamped;
                page = db::list_words(query.as_deref(), skip, db::DEFAULT_PAGE_SIZE, conn)?;
            }
            Ok((now, stats, skip, page))
        });

        match loaded {
            Ok((now, stats, skip, page)) => {
                self.current_date_display = format_date(now);
                self.stats = stats;
                self.page_skip = skip;
                self.page = page;
            }
            Err(e) => {
                error!(error = %e, "failed to load words");
                self.show_message(format!("Failed to load words: {}", e));
            }
        }
    }

    /// Renders the main screen with the word list and word management
    fn render_main_screen(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.current_date_display);

                if ui.button("Next Day").clicked() {
                    if let Err(e) = self.with_conn(db::advance_day) {
                        error!(error = %e, "failed to advance day");
                    }
                    self.refresh();
                }
            });
            ui.label(format!(
                "{} words, {} reviewed, {} due today",
                self.stats.total, self.stats.reviewed, self.stats.due_today
            ));
            ui.separator();

            ui.horizontal(|ui| {
                if ui.button("Review due words").clicked() {
                    self.start_review_session();
                }
                if ui.button("Export").clicked() {
                    self.handle_export();
                }
                if ui.button("Import").clicked() {
                    self.handle_import();
                }
            });

            ui.separator();

            ui.heading("Add Word");
            egui::Grid::new("add_word_form").num_columns(2).show(ui, |ui| {
                ui.label("Word:");
                ui.text_edit_singleline(&mut self.new_text);
                ui.end_row();
                ui.label("Definition:");
                ui.text_edit_singleline(&mut self.new_definition);
                ui.end_row();
                ui.label("Source:");
                ui.text_edit_singleline(&mut self.new_source);
                ui.end_row();
            });
            if ui.button("Add Word").clicked() {
                self.add_word();
            }

            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Search:");
                if ui.text_edit_singleline(&mut self.search_query).changed() {
                    self.page_skip = 0;
                    self.refresh();
                }
            });

            ui.heading(format!("Words ({})", self.page.total));

            let mut action: Option<ListAction> = None;
            egui::ScrollArea::vertical()
                .id_salt("words_list")
                .max_height(320.0)
                .show(ui, |ui| {
                    for (i, word) in self.page.items.iter().enumerate() {
                        ui.group(|ui| {
                            ui.horizontal(|ui| {
                                ui.strong(&word.text);
                                if ui.small_button("Edit").clicked() {
                                    action = Some(ListAction::Edit(i));
                                }
                                if ui.small_button("Delete").clicked() {
                                    action = Some(ListAction::Delete(word.id));
                                }
                            });
                            if let Some(definition) = &word.definition {
                                ui.label(definition);
                            }
                            let due = word
                                .scheduling
                                .due_date
                                .map(format_date)
                                .unwrap_or_else(|| "new".to_string());
                            ui.small(format!(
                                "reviews: {}  easiness: {:.2}  due: {}",
                                word.scheduling.review_count, word.scheduling.easiness_factor, due
                            ));
                        });
                    }
                });

            let mut page_change: Option<usize> = None;
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(self.page_skip > 0, egui::Button::new("Prev"))
                    .clicked()
                {
                    page_change = Some(self.page_skip.saturating_sub(db::DEFAULT_PAGE_SIZE));
                }
                let next = self.page_skip + db::DEFAULT_PAGE_SIZE;
                if ui
                    .add_enabled(next < self.page.total, egui::Button::new("Next"))
                    .clicked()
                {
                    page_change = Some(next);
                }
            });

            // Execute deferred actions
            if let Some(skip) = page_change {
                self.page_skip = skip;
                self.refresh();
            }
            match action {
                Some(ListAction::Edit(i)) => {
                    self.editing = self.page.items.get(i).map(EditForm::from_word);
                }
                Some(ListAction::Delete(id)) => self.delete_word(id),
                None => {}
            }
        });
    }

    fn render_edit_window(&mut self, ctx: &egui::Context) {
        let mut save = false;
        let mut cancel = false;

        if let Some(form) = &mut self.editing {
            egui::Window::new("Edit Word")
                .collapsible(false)
                .resizable(false)
                .show(ctx, |ui| {
                    egui::Grid::new("edit_word_form").num_columns(2).show(ui, |ui| {
                        ui.label("Word:");
                        ui.text_edit_singleline(&mut form.text);
                        ui.end_row();
                        ui.label("Definition:");
                        ui.text_edit_singleline(&mut form.definition);
                        ui.end_row();
                        ui.label("Source:");
                        ui.text_edit_singleline(&mut form.source);
                        ui.end_row();
                    });
                    ui.horizontal(|ui| {
                        save = ui.button("Save").clicked();
                        cancel = ui.button("Cancel").clicked();
                    });
                });
        }

        if save {
            self.save_edit();
        } else if cancel {
            self.editing = None;
        }
    }

    fn add_word(&mut self) {
        let new_word = NewWord {
            text: self.new_text.clone(),
            definition: non_empty(&self.new_definition),
            source: non_empty(&self.new_source),
        };
        let created = self.with_conn(|conn| {
            let now = db::get_current_date(conn)?;
            db::create_word(&new_word, now, conn)
        });

        match created {
            Ok(_) => {
                self.new_text.clear();
                self.new_definition.clear();
                self.new_source.clear();
                self.refresh();
            }
            Err(e) => {
                warn!(error = %e, "word not added");
                self.show_message(format!("Could not add word: {}", e));
            }
        }
    }

    fn save_edit(&mut self) {
        let Some(form) = self.editing.take() else {
            return;
        };
        let update = WordUpdate {
            text: Some(form.text.clone()),
            definition: non_empty(&form.definition),
            source: non_empty(&form.source),
        };

        match self.with_conn(|conn| db::update_word(form.id, &update, conn)) {
            Ok(_) => self.refresh(),
            Err(e) => {
                warn!(id = form.id, error = %e, "word not updated");
                self.editing = Some(form);
                self.show_message(format!("Could not update word: {}", e));
            }
        }
    }

    fn delete_word(&mut self, id: i64) {
        if let Err(e) = self.with_conn(|conn| db::delete_word(id, conn)) {
            warn!(id, error = %e, "word not deleted");
            self.show_message(format!("Could not delete word: {}", e));
        }
        self.refresh();
    }

    /// Renders the review screen with the current word and grade buttons
    fn render_review_screen(&mut self, ctx: &egui::Context) {
        let mut action_back = false;
        let mut failure: Option<String> = None;

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(session) = &mut self.review_session else {
                action_back = true;
                return;
            };
            ui.heading("Review");
            ui.label(session.phase_message());
            ui.label(format!(
                "Progress: {} / {} recalled ({} remaining)",
                session.learned_count(),
                session.total_count(),
                session.remaining_count()
            ));

            ui.add_space(20.0);

            if session.is_completed() {
                ui.heading("Well done!");
                ui.label("Every due word has been reviewed.");
                ui.add_space(20.0);
                if ui.button("Back to Main Screen").clicked() {
                    action_back = true;
                }
                return;
            }

            let Some(card) = session.current_card() else {
                return;
            };
            // Clone values to avoid borrowing issues
            let show_def = session.show_definition;
            let text = card.word.text.clone();
            let definition = card
                .word
                .definition
                .clone()
                .unwrap_or_else(|| "(no definition)".to_string());
            let source = card.word.source.clone();

            ui.group(|ui| {
                ui.set_min_height(200.0);
                ui.vertical_centered(|ui| {
                    ui.add_space(20.0);
                    ui.heading(&text);
                    ui.add_space(20.0);

                    if show_def {
                        ui.label(&definition);
                        if let Some(source) = &source {
                            ui.small(format!("Source: {}", source));
                        }
                    } else {
                        ui.label("(Click 'Show Definition' to reveal)");
                    }
                    ui.add_space(20.0);
                });
            });

            ui.add_space(20.0);

            let mut action_toggle_def = false;
            let mut action_grade: Option<i32> = None;

            if !show_def {
                if ui.button("Show Definition").clicked() {
                    action_toggle_def = true;
                }
            } else {
                ui.label("Rate your recall:");
                ui.horizontal(|ui| {
                    for (quality, label) in [(0, "0 - Blackout"), (1, "1 - Wrong"), (2, "2 - Wrong (familiar)")] {
                        if ui.button(label).clicked() {
                            action_grade = Some(quality);
                        }
                    }
                });
                ui.horizontal(|ui| {
                    for (quality, label) in [(3, "3 - Difficult"), (4, "4 - Correct"), (5, "5 - Perfect")] {
                        if ui.button(label).clicked() {
                            action_grade = Some(quality);
                        }
                    }
                });
            }

            ui.add_space(20.0);
            if ui.button("Back to Main Screen").clicked() {
                action_back = true;
            }

            // Execute deferred actions
            if action_toggle_def {
                session.toggle_definition();
            }
            if let Some(quality) = action_grade {
                match session.grade_current_word(quality) {
                    Ok(()) => session.next_word(),
                    Err(e) => {
                        error!(error = %e, "failed to record review");
                        failure = Some(format!("Failed to record review: {}", e));
                    }
                }
            }
        });

        if let Some(message) = failure {
            self.show_message(message);
        }
        if action_back {
            self.current_screen = AppScreen::Main;
            self.review_session = None;
            self.refresh();
        }
    }

    /// Starts a review session with words due at the current date
    fn start_review_session(&mut self) {
        let due = self.with_conn(|conn| {
            let now = db::get_current_date(conn)?;
            db::due_words(now, conn)
        });

        match due {
            Ok(words) if words.is_empty() => self.show_message("No words are due for review."),
            Ok(words) => {
                self.review_session = Some(ReviewSession::new_from_due_words(
                    words,
                    Arc::clone(&self.conn),
                ));
                self.current_screen = AppScreen::Review;
            }
            Err(e) => {
                error!(error = %e, "failed to load due words");
                self.show_message(format!("Failed to load due words: {}", e));
            }
        }
    }

    /// Handles export of all words to a JSON file
    fn handle_export(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_file_name("vocabulary.json")
            .add_filter("JSON files", &["json"])
            .save_file()
        else {
            return;
        };

        let result = self
            .with_conn(db::all_words)
            .and_then(|words| export_json_to_path(&words, &path).map(|_| words.len()));
        match result {
            Ok(count) => self.show_message(format!("Exported {} words.", count)),
            Err(e) => {
                error!(error = %e, "export failed");
                self.show_message(format!("Export failed: {}", e));
            }
        }
    }

    /// Handles import of words from a JSON file
    fn handle_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON files", &["json"])
            .pick_file()
        else {
            return;
        };

        let result = import_json(&path).and_then(|vocabulary| {
            self.with_conn(|conn| {
                let now = db::get_current_date(conn)?;
                db::import_words(&vocabulary.words, now, conn)
            })
        });

        match result {
            Ok(summary) => {
                self.show_message(format!(
                    "Imported {} words ({} already existed).",
                    summary.imported, summary.skipped
                ));
                self.refresh();
            }
            Err(e) => {
                error!(error = %e, "import failed");
                self.show_message(format!(
                    "Import failed: {}\n\nExpected structure:\n{{\n  \"words\": [{{ \"text\": \"...\" }}]\n}}",
                    e
                ));
            }
        }
    }
}
