use std::{io::ErrorKind, path::Path};

use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{self, AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Reads the whole file under a shared lock. A missing file yields `None`.
pub async fn read_locked(path: &Path) -> Result<Option<Vec<u8>>, io::Error> {
    let mut file = match File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    file.lock_shared()?;
    let mut contents = Vec::new();
    let result = file.read_to_end(&mut contents).await;
    file.unlock_async().await?;
    result?;

    debug!("Read {} bytes from {path:?}", contents.len());
    Ok(Some(contents))
}

/// Replaces the file contents under an exclusive lock. The file is truncated only after the lock
/// is taken, so readers never see a half written document.
pub async fn overwrite_locked(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .read(true)
        .truncate(false)
        .open(path)
        .await?;

    // Semi-safe acquire-release for a file
    file.lock_exclusive()?;
    let result = write_whole(&mut file, contents).await;
    file.unlock_async().await?;
    result
}

async fn write_whole(file: &mut File, contents: &[u8]) -> Result<(), io::Error> {
    file.set_len(0).await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_data().await
}

pub async fn remove_if_exists(path: &Path) -> Result<(), io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
