mod app;
use vocab_app::*;

use app::MyApp;
use config::Config;
use database::db;
use tracing::{error, info};

const SAMPLE_WORDS: [(&str, &str); 3] = [
    ("serendipity", "finding something good without looking for it"),
    ("ephemeral", "lasting for a very short time"),
    ("ubiquitous", "present everywhere"),
];

fn seed_sample_words(conn: &rusqlite::Connection) -> Result<()> {
    let now = db::get_current_date(conn)?;
    if db::stats(now, conn)?.total > 0 {
        return Ok(());
    }
    let words: Vec<NewWord> = SAMPLE_WORDS
        .iter()
        .map(|(text, definition)| NewWord::new(*text).with_definition(*definition))
        .collect();
    db::import_words(&words, now, conn)?;
    info!("Sample data created");
    Ok(())
}

fn main() -> eframe::Result<()> {
    let config = Config::from_env();
    logging::init_tracing(&config.log_level);

    let conn = match db::init_database(&config.database_path) {
        Ok(conn) => conn,
        Err(e) => {
            error!(error = %e, path = %config.database_path.display(), "failed to open database");
            std::process::exit(1);
        }
    };

    if config.seed_sample_words {
        if let Err(e) = seed_sample_words(&conn) {
            error!(error = %e, "failed to seed sample words");
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([560.0, 760.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Vocabulary Tracker",
        options,
        Box::new(|_cc| Ok(Box::new(MyApp::new(conn)))),
    )
}
