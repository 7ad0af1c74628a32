use std::env;
use std::path::PathBuf;
use storyboard::{logger, manifest::Manifest, Config, Session};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(logger::LoggerConfig::from_env())?;
    if dotenv_loaded {
        log::info!("✅ .env file loaded successfully");
    } else {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let mut args = env::args().skip(1);
    let manifest_path = match args.next() {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: storyboard <manifest.json> [output-dir]");
            std::process::exit(2);
        }
    };
    let out_dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("storyboard-output"));

    let config = Config::from_env();
    logger::log_config_info(&config);

    log::info!("📖 Loading manifest {}", manifest_path.display());
    let manifest = Manifest::load(&manifest_path).await?;

    let mut session = Session::new(config);
    manifest.apply(&mut session).await?;
    log::info!(
        "🎭 {} reference characters active, {} prompts",
        session.characters().active().count(),
        session.prompts().len()
    );

    log::info!("🎨 Generating storyboard...");
    let slots = match session.generate_all().await {
        Ok(slots) => slots,
        Err(e) if e.is_preflight() => {
            log::error!("❌ Batch not started: {}", e);
            return Err(e.into());
        }
        Err(e) => {
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };
    logger::log_batch_summary(&slots);

    let total = slots.len();
    let completed = session.completed_count();
    log::info!("📊 {}/{} images completed", completed, total);

    let saved = session.save_all(&out_dir).await?;
    log::info!("💾 Saved {} images to {}", saved.len(), out_dir.display());

    if completed < total {
        log::warn!(
            "💡 Failed scenes can be re-run with a new manifest containing only those prompts"
        );
    }

    Ok(())
}
