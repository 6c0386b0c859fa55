use anyhow::Result;
use inquire::{InquireError, Select};
use std::sync::Arc;

use story2audio::core::config::Config;
use story2audio::core::history::HistoryStore;
use story2audio::core::io::{NativeStorage, Storage};
use story2audio::core::settings::{JsonSettingsStore, SettingsStore};
use story2audio::services::llm::ProviderConnector;
use story2audio::services::reveal::SystemOpener;
use story2audio::services::setup;
use story2audio::services::workflow::StoryWorkflow;
use story2audio::utils::console::SpinnerProgress;

const GENERATE: &str = "Generate";
const HISTORY: &str = "History";
const SETTINGS: &str = "Settings";
const QUIT: &str = "Quit";

fn is_cancel(e: &anyhow::Error) -> bool {
    matches!(
        e.downcast_ref::<InquireError>(),
        Some(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

async fn generate(
    config: &Config,
    settings: &Arc<dyn SettingsStore>,
    storage: &Arc<dyn Storage>,
) -> Result<()> {
    let Some(request) =
        setup::collect_request(config, settings.as_ref(), storage.as_ref()).await?
    else {
        return Ok(());
    };

    let spinner = Arc::new(SpinnerProgress::new());
    let workflow = StoryWorkflow::new(
        config,
        Box::new(ProviderConnector::new(&config.llm)),
        settings.clone(),
        storage.clone(),
    )
    .with_opener(Box::new(SystemOpener))
    .with_progress(spinner.clone());

    let result = workflow.run(&request).await;
    spinner.finish();

    match (result.success, result.project_path) {
        (true, Some(path)) => println!("Generation finished: {}", path.display()),
        _ => eprintln!(
            "Error: {}",
            result.error.as_deref().unwrap_or("generation failed")
        ),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            return Err(e);
        }
    };

    let settings: Arc<dyn SettingsStore> =
        Arc::new(JsonSettingsStore::at_path(&config.settings_file));
    let storage: Arc<dyn Storage> = Arc::new(NativeStorage::new());
    let history =
        HistoryStore::new(settings.clone()).with_max_entries(config.pipeline.history_limit);

    loop {
        let menu = vec![GENERATE, HISTORY, SETTINGS, QUIT];
        let choice = match Select::new("story2audio", menu).prompt() {
            Ok(choice) => choice,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => return Err(e.into()),
        };

        let outcome = match choice {
            GENERATE => generate(&config, &settings, &storage).await,
            HISTORY => setup::show_history(&history, &SystemOpener),
            SETTINGS => setup::configure(settings.as_ref(), storage.as_ref()).await,
            _ => break,
        };

        if let Err(e) = outcome {
            if !is_cancel(&e) {
                eprintln!("Error: {:#}", e);
            }
        }
    }

    Ok(())
}
