//! Resolution of logged capabilities against the network

use crate::capability::{CapabilityWithPath, EntryPoint};
use crate::vault::{FsError, Network};

/// Look an entry point up and pair its capability with the path it
///  currently has in the owner's namespace.
///
/// An unknown entry point and a transport failure both resolve to nothing.
///  Reconstructing the path can still fail, most commonly with
///  [`FsError::MissingAncestor`] once a directory above the shared node has
///  been removed; that error is returned as-is.
pub async fn resolve<N: Network + ?Sized>(
    network: &N,
    entry: EntryPoint,
) -> Result<Vec<CapabilityWithPath>, FsError> {
    let file = match network.retrieve_entry_point(&entry).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            tracing::debug!(
                "entry point {} from {} not found",
                entry.pointer.location(),
                entry.owner_name
            );
            return Ok(Vec::new());
        }
        Err(e) => {
            tracing::debug!(
                "entry point {} from {} unavailable: {}",
                entry.pointer.location(),
                entry.owner_name,
                e
            );
            return Ok(Vec::new());
        }
    };

    let path = file.path().await?;
    tracing::debug!("resolved {} to {:?}", entry.pointer.location(), path);
    Ok(vec![CapabilityWithPath::new(path, entry.pointer)])
}

/// [`resolve`], with any failure contributing no results
pub async fn resolve_or_skip<N: Network + ?Sized>(
    network: &N,
    entry: EntryPoint,
) -> Vec<CapabilityWithPath> {
    let location = entry.pointer.location();
    match resolve(network, entry).await {
        Ok(found) => found,
        Err(FsError::MissingAncestor { partial, .. }) => {
            tracing::debug!(
                "a file ancestor no longer exists for {} (below {:?})",
                location,
                partial
            );
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("failed to resolve {}: {}", location, e);
            Vec::new()
        }
    }
}
