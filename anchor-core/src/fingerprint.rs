//! Fingerprints of on-disk data blobs.

use crate::types::Fingerprint;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const READ_CHUNK: usize = 64 * 1024;

/// Fingerprint an in-memory blob.
pub fn fingerprint(data: &[u8]) -> Fingerprint {
    Sha256::digest(data).into()
}

/// Fingerprint everything readable from `reader`.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Fingerprint the current contents of the file at `path`.
pub fn fingerprint_file(path: impl AsRef<Path>) -> io::Result<Fingerprint> {
    let file = File::open(path.as_ref())?;
    fingerprint_reader(file)
}

/// [`fingerprint_reader`] on the blocking thread pool, keeping large video
/// segments off the runtime's worker threads.
#[cfg(feature = "async")]
pub async fn fingerprint_reader_blocking<R>(reader: R) -> io::Result<Fingerprint>
where
    R: Read + Send + 'static,
{
    tokio::task::spawn_blocking(move || fingerprint_reader(reader))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// [`fingerprint_file`] on the blocking thread pool.
#[cfg(feature = "async")]
pub async fn fingerprint_file_blocking(path: impl AsRef<Path>) -> io::Result<Fingerprint> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_file(path))
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
}

/// Fingerprint a file from async code, off the runtime threads when tokio is enabled.
#[cfg(feature = "async")]
pub(crate) async fn fingerprint_file_from_task(path: &Path) -> io::Result<Fingerprint> {
    fingerprint_file_blocking(path).await
}

#[cfg(not(feature = "async"))]
pub(crate) async fn fingerprint_file_from_task(path: &Path) -> io::Result<Fingerprint> {
    fingerprint_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    #[test]
    fn test_known_digest() {
        // SHA-256("abc")
        assert_eq!(
            hex::encode(fingerprint(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_file_matches_in_memory() {
        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();

        assert_eq!(fingerprint_file(file.path()).unwrap(), fingerprint(&data));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = fingerprint_file(dir.path().join("absent.h264")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_blocking_variant_hashes_off_the_runtime_thread() {
        use std::sync::{Arc, Mutex};
        use std::thread::{self, ThreadId};

        struct Recording {
            inner: io::Cursor<Vec<u8>>,
            seen: Arc<Mutex<Vec<ThreadId>>>,
        }

        impl Read for Recording {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                self.seen.lock().unwrap().push(thread::current().id());
                self.inner.read(buf)
            }
        }

        let data = vec![7u8; 3 * READ_CHUNK + 5];
        let seen = Arc::new(Mutex::new(Vec::new()));
        let reader = Recording {
            inner: io::Cursor::new(data.clone()),
            seen: seen.clone(),
        };

        let fp = fingerprint_reader_blocking(reader).await.unwrap();

        assert_eq!(fp, fingerprint(&data));
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|id| *id != thread::current().id()));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_blocking_file_variant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"camera segment").unwrap();

        assert_eq!(
            fingerprint_file_blocking(file.path()).await.unwrap(),
            fingerprint(b"camera segment")
        );
        let dir = tempfile::tempdir().unwrap();
        let err = fingerprint_file_blocking(dir.path().join("absent.h264")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    proptest! {
        #[test]
        fn prop_repeated_calls_agree(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            prop_assert_eq!(fingerprint(&data), fingerprint(&data));
            prop_assert_eq!(fingerprint_reader(data.as_slice()).unwrap(), fingerprint(&data));
        }

        #[test]
        fn prop_any_byte_change_alters_fingerprint(
            data in proptest::collection::vec(any::<u8>(), 1..4096),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let mut mutated = data.clone();
            let i = index.index(mutated.len());
            mutated[i] ^= flip;
            prop_assert_ne!(fingerprint(&data), fingerprint(&mutated));
        }
    }
}
