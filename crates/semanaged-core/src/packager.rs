//! Deployment packaging
//!
//! Combines an application archive with auxiliary archives (test support
//! libraries, extensions) into a single archive that can be handed to
//! [`ManagedContainer::deploy`](crate::deploy::ManagedContainer::deploy).

use crate::archive::{Archive, ArchiveKind, MemoryArchive};
use crate::{Error, Result};

/// Build the deployable archive.
///
/// A classpath root application keeps its own entries and gains every
/// auxiliary as an additional entry. Any other application keeps its name and
/// kind and absorbs the content of each auxiliary into its own tree.
pub fn generate_deployment(
    application: MemoryArchive,
    auxiliaries: Vec<Box<dyn Archive>>,
) -> Result<MemoryArchive> {
    let mut deployment = application;
    tracing::debug!(
        deployment = deployment.name(),
        kind = ?deployment.kind(),
        auxiliaries = auxiliaries.len(),
        "Generating deployment"
    );

    if deployment.kind() == ArchiveKind::ClassPath {
        for auxiliary in auxiliaries {
            deployment.push_archive(auxiliary);
        }
        return Ok(deployment);
    }

    for auxiliary in auxiliaries {
        let name = auxiliary.name().to_string();
        deployment.merge(auxiliary).map_err(|e| {
            Error::materialize(
                format!("Could not merge {} into {}: {}", name, deployment.name(), e),
                "Check that packaged auxiliaries are valid jar files",
            )
        })?;
    }
    Ok(deployment)
}
