//! Answer a pending decision for a run using the file decision source.

use anyhow::Result;

use stagegate::context::ProjectContext;
use stagegate::gates::answer_pending;
use stagegate::store::FsArtifactStore;

pub fn cmd_decide(ctx: &ProjectContext, choice: &str, summary: Option<&str>) -> Result<()> {
    let store = FsArtifactStore::new(ctx.state_dir());
    let (request, choice) = answer_pending(&store, summary, choice)?;
    println!(
        "Answered '{}' with {}",
        request.summary,
        console::style(&choice).green().bold()
    );
    println!("The waiting run picks this up on its next poll.");
    Ok(())
}
