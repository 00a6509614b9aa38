//! Render command - Print a resolved document.

use anyhow::Result;
use clap::Args;
use tracing::info;

use strata_config::Materializer;

use super::source::{SourceArgs, Workspace};

#[derive(Args)]
pub struct RenderArgs {
    /// Document path relative to `{environment}/{version}`
    document: String,

    /// Print the parsed document as JSON without null fields
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    source: SourceArgs,
}

pub async fn execute(args: RenderArgs) -> Result<()> {
    let workspace = Workspace::open(&args.source)?;
    let request = workspace.source().request(&args.document);
    let document = workspace.resolver.resolve(&request, &workspace.context)?;
    info!("Rendered {}", document.path);

    if args.json {
        let tree = Materializer::parse_tree(&document.path, &document.text)?;
        println!("{}", Materializer::to_json(&tree)?);
    } else {
        print!("{}", document.text);
        if !document.text.ends_with('\n') {
            println!();
        }
    }
    Ok(())
}
