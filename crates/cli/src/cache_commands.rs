use {
    anyhow::Result,
    clap::Subcommand,
    picker_config::PickerConfig,
    picker_coordinator::{ResultCache, cache_file::FileCache},
};

#[derive(Subcommand)]
pub enum CacheAction {
    /// Print the persisted request state as JSON.
    Show,
    /// Delete the persisted request state.
    Clear,
}

pub async fn handle_cache(config: &PickerConfig, action: CacheAction) -> Result<()> {
    let cache = FileCache::new(config.storage.cache_path());
    match action {
        CacheAction::Show => match cache.get().await? {
            Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
            None => eprintln!("No persisted state at {}.", cache.path().display()),
        },
        CacheAction::Clear => {
            cache.clear().await?;
            eprintln!("Cleared {}.", cache.path().display());
        },
    }
    Ok(())
}
