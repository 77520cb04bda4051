use tracing::info;

use crate::cli::Context;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, settings_path, shellexpand_path, Settings};

pub fn run(ctx: &Context, data_dir: Option<String>) -> Result<()> {
    let settings = match data_dir {
        Some(dir) => {
            let settings = Settings {
                data_dir: shellexpand_path(&dir),
                ..ctx.settings.clone()
            };
            save_settings(&settings)?;
            println!("Saved settings to {}", settings_path().display());
            settings
        }
        None => ctx.settings.clone(),
    };

    let db_path = settings.db_path(ctx.db_override.as_deref());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let existed = db_path.exists();
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    info!(path = %db_path.display(), "database ready");

    if existed {
        println!("Database already initialized at {}", db_path.display());
    } else {
        println!("Initialized database at {}", db_path.display());
    }
    Ok(())
}
