use futures::stream::{self, StreamExt};

use crate::capability::{AccessKind, Capability, CapabilityWithPath, EntryPoint, WritableCapability};
use crate::vault::{FileWrapper, Network};

use super::cache::{
    capability_cache_dir, existing_capability_cache_dir, load_cache, save_cache,
    CacheLookup, CapabilitiesFromUser, HomeDirSupplier,
};
use super::log::{append_link, sharing_file, sharing_file_size};
use super::resolver::resolve_or_skip;
use super::{SharingConfig, SharingError};

/// Appends capabilities to sharing logs and reads them back, resolved,
///  through the recipient's snapshot cache.
///
/// The store holds no state of its own beyond its collaborators; every log
///  and snapshot lives in the vault.
#[derive(Debug, Clone)]
pub struct SharingStore<N> {
    network: N,
    config: SharingConfig,
}

/// Where a load starts, and what it starts from
struct ResumePoint {
    offset: u64,
    prior: Vec<CapabilityWithPath>,
    cache_existed: bool,
}

impl<N: Network> SharingStore<N> {
    pub fn new(network: N, config: SharingConfig) -> Self {
        Self { network, config }
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn config(&self) -> &SharingConfig {
        &self.config
    }

    /* Append */

    /// Share `cap` read-only. A writable capability is logged as its
    ///  read-only projection.
    pub async fn add_read_only_sharing_link(
        &self,
        shared_dir: &FileWrapper,
        cap: &Capability,
    ) -> Result<FileWrapper, SharingError> {
        self.add_link(shared_dir, cap, AccessKind::Read).await
    }

    /// Share `cap` with write access
    pub async fn add_edit_sharing_link(
        &self,
        shared_dir: &FileWrapper,
        cap: &WritableCapability,
    ) -> Result<FileWrapper, SharingError> {
        self.add_link(shared_dir, &cap.clone().into(), AccessKind::Write)
            .await
    }

    /// Append `cap` to the `kind` log in `shared_dir`, which must be a
    ///  writable directory. Returns the updated directory.
    pub async fn add_link(
        &self,
        shared_dir: &FileWrapper,
        cap: &Capability,
        kind: AccessKind,
    ) -> Result<FileWrapper, SharingError> {
        let record = match kind {
            AccessKind::Read => cap.read_only(),
            AccessKind::Write if cap.is_writable() => cap.clone(),
            AccessKind::Write => {
                return Err(SharingError::InvalidArgument(
                    "an edit link needs a writable capability".to_string(),
                ))
            }
        };
        append_link(shared_dir, &record, kind, self.config.append_attempts).await
    }

    /* Load */

    pub async fn load_all_read<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        self.load_all(home, friend_dir, friend_name, AccessKind::Read, save_cache)
            .await
    }

    pub async fn load_all_write<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        self.load_all(home, friend_dir, friend_name, AccessKind::Write, save_cache)
            .await
    }

    /// Every capability `friend_name` has logged for `kind` in `friend_dir`,
    ///  resolved, with `bytes_read` set to the log length.
    ///
    /// Starts from the cached snapshot when there is one and only resolves
    ///  what was appended after it. With `save_cache` the result is written
    ///  back, except on a first load that resolved nothing.
    pub async fn load_all<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        kind: AccessKind,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        let Some(log) = sharing_file(friend_dir, kind).await? else {
            return Ok(CapabilitiesFromUser::default());
        };
        let log_len = log.size();

        let cache_dir = self.cache_dir(home, save_cache).await;
        let lookup = match &cache_dir {
            Some(dir) => load_cache(dir, friend_name, kind).await,
            None => CacheLookup::Missing,
        };

        let mut resume = match lookup {
            CacheLookup::Hit(snapshot) if snapshot.bytes_read == log_len => {
                tracing::debug!(
                    "{} log from {} unchanged at {} bytes",
                    kind,
                    friend_name,
                    log_len
                );
                return Ok(snapshot);
            }
            CacheLookup::Hit(snapshot) if snapshot.bytes_read < log_len => ResumePoint {
                offset: snapshot.bytes_read,
                prior: snapshot.capabilities,
                cache_existed: true,
            },
            CacheLookup::Hit(snapshot) => {
                tracing::warn!(
                    "cached {} offset {} from {} is past the log end {}, rebuilding",
                    kind,
                    snapshot.bytes_read,
                    friend_name,
                    log_len
                );
                ResumePoint {
                    offset: 0,
                    prior: Vec::new(),
                    cache_existed: true,
                }
            }
            CacheLookup::Unusable => ResumePoint {
                offset: 0,
                prior: Vec::new(),
                cache_existed: true,
            },
            CacheLookup::Missing => ResumePoint {
                offset: 0,
                prior: Vec::new(),
                cache_existed: false,
            },
        };

        let new_caps = match self
            .read_sharing_file(&log, friend_name, resume.offset, log_len)
            .await
        {
            // an offset inside a record means the snapshot is bad, not the log
            Err(SharingError::CorruptLog { offset, source }) if resume.offset > 0 => {
                tracing::warn!(
                    "cached {} offset {} from {} does not parse ({} at {}), rebuilding",
                    kind,
                    resume.offset,
                    friend_name,
                    source,
                    offset
                );
                resume = ResumePoint {
                    offset: 0,
                    prior: Vec::new(),
                    cache_existed: true,
                };
                self.read_sharing_file(&log, friend_name, 0, log_len)
                    .await?
            }
            result => result?,
        };
        let persist = !new_caps.is_empty() || resume.cache_existed;

        let mut capabilities = resume.prior;
        capabilities.extend(new_caps);
        let snapshot = CapabilitiesFromUser::new(log_len, capabilities);

        if save_cache && persist {
            if let Some(dir) = &cache_dir {
                self.persist(dir, friend_name, kind, &snapshot).await;
            }
        }
        Ok(snapshot)
    }

    pub async fn load_from_read<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        start_offset: u64,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        self.load_from(
            home,
            friend_dir,
            friend_name,
            start_offset,
            AccessKind::Read,
            save_cache,
        )
        .await
    }

    pub async fn load_from_write<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        start_offset: u64,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        self.load_from(
            home,
            friend_dir,
            friend_name,
            start_offset,
            AccessKind::Write,
            save_cache,
        )
        .await
    }

    /// Capabilities logged at or after `start_offset`, which must be a
    ///  record boundary. `bytes_read` in the result is the length of the
    ///  slice that was read, `L - start_offset`.
    ///
    /// With `save_cache` the snapshot is extended only when it can stay
    ///  whole: when reading from the start, or when the cached snapshot ends
    ///  exactly at `start_offset`. Otherwise the cache is left alone.
    pub async fn load_from<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        friend_dir: &FileWrapper,
        friend_name: &str,
        start_offset: u64,
        kind: AccessKind,
        save_cache: bool,
    ) -> Result<CapabilitiesFromUser, SharingError> {
        let Some(log) = sharing_file(friend_dir, kind).await? else {
            return Ok(CapabilitiesFromUser::default());
        };
        let log_len = log.size();
        if start_offset > log_len {
            return Err(SharingError::InvalidArgument(format!(
                "offset {} is past the end of the {} log ({} bytes)",
                start_offset, kind, log_len
            )));
        }

        let new_caps = self
            .read_sharing_file(&log, friend_name, start_offset, log_len)
            .await?;

        if save_cache {
            if let Some(dir) = self.cache_dir(home, true).await {
                let prior = if start_offset == 0 {
                    Some(Vec::new())
                } else {
                    match load_cache(&dir, friend_name, kind).await {
                        CacheLookup::Hit(snapshot) if snapshot.bytes_read == start_offset => {
                            Some(snapshot.capabilities)
                        }
                        _ => None,
                    }
                };
                match prior {
                    Some(mut capabilities) => {
                        capabilities.extend(new_caps.iter().cloned());
                        let snapshot = CapabilitiesFromUser::new(log_len, capabilities);
                        self.persist(&dir, friend_name, kind, &snapshot).await;
                    }
                    None => tracing::debug!(
                        "cached {} snapshot from {} does not end at {}, leaving it",
                        kind,
                        friend_name,
                        start_offset
                    ),
                }
            }
        }

        Ok(CapabilitiesFromUser::new(log_len - start_offset, new_caps))
    }

    /* Size */

    pub async fn capability_file_size(
        &self,
        friend_dir: &FileWrapper,
        kind: AccessKind,
    ) -> Result<u64, SharingError> {
        Ok(sharing_file_size(friend_dir, kind).await?)
    }

    pub async fn read_capability_file_size(
        &self,
        friend_dir: &FileWrapper,
    ) -> Result<u64, SharingError> {
        self.capability_file_size(friend_dir, AccessKind::Read).await
    }

    pub async fn write_capability_file_size(
        &self,
        friend_dir: &FileWrapper,
    ) -> Result<u64, SharingError> {
        self.capability_file_size(friend_dir, AccessKind::Write).await
    }

    /* Internal helpers */

    /// Parse the records in `[start, end)` of `log` and resolve them.
    ///  Records in one chunk resolve concurrently; results keep log order.
    async fn read_sharing_file(
        &self,
        log: &FileWrapper,
        friend_name: &str,
        start: u64,
        end: u64,
    ) -> Result<Vec<CapabilityWithPath>, SharingError> {
        let mut reader = log.reader().await?;
        reader.seek(start)?;

        let mut resolved = Vec::new();
        while reader.position() < end {
            let offset = reader.position();
            let budget = (end - offset).min(self.config.read_chunk_size);
            let parsed = reader
                .parse_stream::<Capability>(budget)
                .map_err(|source| SharingError::CorruptLog { offset, source })?;
            tracing::debug!(
                "parsed {} records from {} at [{}, {})",
                parsed.records.len(),
                friend_name,
                offset,
                reader.position()
            );

            let batch: Vec<Vec<CapabilityWithPath>> = stream::iter(parsed.records)
                .map(|cap| resolve_or_skip(&self.network, EntryPoint::new(cap, friend_name)))
                .buffered(self.config.resolve_concurrency.max(1))
                .collect()
                .await;
            resolved.extend(batch.into_iter().flatten());
        }
        Ok(resolved)
    }

    /// The recipient's cache directory, or `None` if it cannot be had.
    ///  Only created when `create` is set.
    async fn cache_dir<H: HomeDirSupplier + ?Sized>(
        &self,
        home: &H,
        create: bool,
    ) -> Option<FileWrapper> {
        let home = match home.home().await {
            Ok(home) => home,
            Err(e) => {
                tracing::warn!("home directory unavailable, skipping capability cache: {}", e);
                return None;
            }
        };
        let dir = if create {
            capability_cache_dir(&home).await.map(Some)
        } else {
            existing_capability_cache_dir(&home).await
        };
        match dir {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("capability cache unavailable: {}", e);
                None
            }
        }
    }

    async fn persist(
        &self,
        cache_dir: &FileWrapper,
        friend_name: &str,
        kind: AccessKind,
        snapshot: &CapabilitiesFromUser,
    ) {
        if let Err(e) = save_cache(cache_dir, friend_name, kind, snapshot).await {
            tracing::warn!(
                "failed to cache {} capabilities from {}: {}",
                kind,
                friend_name,
                e
            );
        }
    }
}
