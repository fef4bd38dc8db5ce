//! Print the tags a page would render.

use crate::cli::{ProjectArgs, TagsArgs};
use crate::error::Result;

pub async fn execute(project: &ProjectArgs, args: TagsArgs) -> Result<()> {
    let pipeline = project.pipeline()?;
    let nonce = args.nonce.as_deref();

    let tags = if args.refs.is_empty() {
        pipeline.tags(nonce)
    } else {
        pipeline.tags_for(&args.refs, nonce)
    };
    println!("{}", tags);
    Ok(())
}
