//! Example: Profile page against in-memory adapters
//!
//! Signs up, signs in, edits and saves a profile, then signs out, printing
//! the synchronizer state after each step. No backend is needed.
//!
//! Run with: ```bash RUST_LOG=debug cargo run -p accountsync-infra --example
//! profile_demo ```

use std::sync::Arc;

use accountsync_core::{AuthFlow, ProfileSynchronizer, SyncView};
use accountsync_domain::constants::MIN_PASSWORD_LENGTH;
use accountsync_infra::{init_tracing, LogFormat, MemoryProfileRepository, MemorySessionOracle};

fn show(step: &str, view: &SyncView) {
    println!("{step:<12} state={:<10} notice={:?}", view.state.name(), view.notice.as_ref().map(|n| &n.text));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(LogFormat::Pretty);

    let oracle = Arc::new(MemorySessionOracle::new());
    let repository = Arc::new(MemoryProfileRepository::new());
    let flow = AuthFlow::new(oracle.clone(), MIN_PASSWORD_LENGTH);
    let sync = Arc::new(ProfileSynchronizer::new(oracle.clone(), repository.clone()));

    println!("sign up:  {}", flow.sign_up("ada@example.com", "correct horse").await.text);
    println!("sign in:  {}", flow.sign_in("ada@example.com", "correct horse").await.text);

    sync.mount().await?;
    show("mounted", &sync.view());

    sync.edit("full_name", "Ada Obi")?;
    sync.edit("location", "Lagos")?;
    sync.edit("date_of_birth", "1990-04-12")?;
    show("edited", &sync.view());

    let saved = sync.save().await?;
    show("saved", &sync.view());
    println!("stored row: {}", serde_json::to_string_pretty(&saved)?);

    if let Err(err) = sync.edit("email", "other@example.com") {
        println!("email edit rejected: {err}");
    }

    sync.sign_out().await?;
    show("signed out", &sync.view());

    sync.unmount();
    Ok(())
}
