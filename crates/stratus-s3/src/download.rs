//! Writing a downloaded object body to a fresh local file.

use std::path::Path;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// Copy `reader` into a newly created file at `path`.
///
/// The file must not exist yet. If the copy fails part-way the file is
/// removed again, so a failed download never leaves a truncated object
/// behind. Returns the number of bytes written.
pub(crate) async fn write_new_file<R>(mut reader: R, path: &Path) -> anyhow::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .with_context(|| format!("cannot create {}", path.display()))?;

    let copied = async {
        let written = tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok::<u64, std::io::Error>(written)
    }
    .await;

    match copied {
        Ok(written) => Ok(written),
        Err(e) => {
            drop(file);
            if let Err(rm) = tokio::fs::remove_file(path).await {
                tracing::warn!(path = %path.display(), error = %rm, "Could not remove partial download");
            } else {
                tracing::warn!(path = %path.display(), "Removed partial download");
            }
            Err(anyhow::Error::new(e).context(format!("writing {} failed", path.display())))
        }
    }
}
