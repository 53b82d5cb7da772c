//! Managed container
//!
//! This module sequences materialization, command assembly, process launch
//! and readiness polling for deploy, and the reverse for undeploy.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashSet};

use crate::archive::{Archive, Asset, SYSTEM_PROPERTIES_PATH};
use crate::config::Config;
use crate::properties;
use crate::{Error, Result};

use super::command::{CommandBuilder, render};
use super::materialize::{MaterializedFile, Materializer};
use super::metadata::{ProtocolContext, ProtocolMetadata};
use super::process::ProcessSupervisor;
use super::readiness::ReadinessProbe;
use super::state::DeploymentState;

/// Extension of dependency archives picked up from `libraries_path`
const JAR_EXTENSION: &str = "jar";

/// Runs one deployment at a time in a separate worker JVM
#[derive(Debug)]
pub struct ManagedContainer {
    config: Config,
    java_opts: Vec<String>,
    materialized_files: Vec<MaterializedFile>,
    dependency_jars: Vec<Utf8PathBuf>,
    process: ProcessSupervisor,
    state: DeploymentState,
}

impl ManagedContainer {
    /// Create a container from its configuration
    pub fn setup(config: Config) -> Self {
        let java_opts = config.java_opts();
        Self {
            config,
            java_opts,
            materialized_files: Vec::new(),
            dependency_jars: Vec::new(),
            process: ProcessSupervisor::new(),
            state: DeploymentState::Idle,
        }
    }

    /// Container start hook; the worker is launched per deployment instead
    pub fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Container stop hook; the worker is stopped by `undeploy` instead
    pub fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> DeploymentState {
        self.state
    }

    /// Files created by the last deploy call
    pub fn materialized_files(&self) -> &[MaterializedFile] {
        &self.materialized_files
    }

    /// Dependency archives found in `libraries_path` so far
    pub fn dependency_jars(&self) -> &[Utf8PathBuf] {
        &self.dependency_jars
    }

    pub fn is_process_running(&mut self) -> bool {
        self.process.is_running()
    }

    pub fn process_id(&self) -> Option<u32> {
        self.process.id()
    }

    /// Deploy `archive` into a freshly launched worker.
    ///
    /// On failure the container is left in [`DeploymentState::DeployFailed`];
    /// materialized files and a possibly running worker stay in place until
    /// [`undeploy`](Self::undeploy) is called.
    pub fn deploy(&mut self, archive: &dyn Archive) -> Result<ProtocolMetadata> {
        tracing::info!(archive = archive.name(), "Deploying");

        let result = self.try_deploy(archive);
        self.state = match result {
            Ok(_) => DeploymentState::Deployed,
            Err(_) => DeploymentState::DeployFailed,
        };
        result
    }

    /// Materialize `archive` and return the worker command without
    /// launching anything.
    ///
    /// The materialized files stay on disk until [`undeploy`](Self::undeploy).
    pub fn dry_run(&mut self, archive: &dyn Archive) -> Result<Vec<String>> {
        let result = self.prepare(archive);
        self.state = match result {
            Ok(_) => DeploymentState::Idle,
            Err(_) => DeploymentState::DeployFailed,
        };
        result
    }

    fn try_deploy(&mut self, archive: &dyn Archive) -> Result<ProtocolMetadata> {
        let command = self.prepare(archive)?;
        tracing::debug!("Executing command: {}", render(&command));

        self.state = DeploymentState::Launching;
        self.process.start(&command)?;

        self.state = DeploymentState::AwaitingReady;
        let endpoint = self.config.endpoint();
        let timeout = self.config.startup_timeout();
        if !ReadinessProbe::new(endpoint.clone(), timeout).wait_until_ready() {
            return Err(Error::readiness_timeout(&endpoint, timeout.as_secs()));
        }

        tracing::info!(archive = archive.name(), %endpoint, "Deployed");
        Ok(ProtocolMetadata::new().with_context(ProtocolContext::Jmx(endpoint)))
    }

    fn prepare(&mut self, archive: &dyn Archive) -> Result<Vec<String>> {
        self.state = DeploymentState::Materializing;

        // Entries from the previous deploy would otherwise pile up on the class path
        self.materialized_files.clear();
        Materializer::new(&self.config.output_dir)
            .materialize(archive, &mut self.materialized_files)?;

        let system_properties = read_system_properties(archive)?;
        self.scan_dependency_jars()?;

        self.build_command(system_properties.as_ref())
    }

    /// Assemble the worker command for the current state
    pub fn build_command(
        &self,
        system_properties: Option<&BTreeMap<String, String>>,
    ) -> Result<Vec<String>> {
        let mut builder = CommandBuilder::new(&self.config, &self.java_opts)
            .class_path(self.materialized_files.iter().map(MaterializedFile::path))
            .class_path(&self.dependency_jars);
        if let Some(properties) = system_properties {
            builder = builder.system_properties(properties);
        }
        builder.build()
    }

    /// Stop the worker and delete the materialized files.
    ///
    /// File deletion is skipped when `keep_deployment_archives` is set and
    /// its failures are only logged. An error from stopping the worker is
    /// returned after cleanup has run.
    pub fn undeploy(&mut self, archive: &dyn Archive) -> Result<()> {
        tracing::info!(archive = archive.name(), "Undeploying");

        self.state = DeploymentState::Stopping;
        let stopped = self.process.stop();

        self.state = DeploymentState::Cleaning;
        if self.config.keep_deployment_archives {
            tracing::debug!(
                count = self.materialized_files.len(),
                "Keeping materialized files"
            );
        } else {
            Materializer::remove(&self.materialized_files);
        }

        self.state = DeploymentState::Idle;
        stopped
    }

    /// Rescan `libraries_path` for `.jar` files, adding ones not seen before
    fn scan_dependency_jars(&mut self) -> Result<()> {
        let Some(ref libraries_path) = self.config.libraries_path else {
            return Ok(());
        };

        let found = list_jars(libraries_path)?;
        let known: HashSet<Utf8PathBuf> = self.dependency_jars.iter().cloned().collect();
        let added: Vec<Utf8PathBuf> = found.into_iter().filter(|jar| !known.contains(jar)).collect();

        if !added.is_empty() {
            tracing::debug!(count = added.len(), path = %libraries_path, "Found dependency jars");
        }
        self.dependency_jars.extend(added);
        Ok(())
    }
}

/// `.jar` files directly inside `dir`, sorted by path
fn list_jars(dir: &Utf8Path) -> Result<Vec<Utf8PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::config(
            format!("Cannot read files from {}", dir),
            "Set `libraries_path` to an existing directory",
        ));
    }

    let entries = dir.read_dir_utf8().map_err(|e| {
        Error::config(
            format!("Cannot read files from {}: {}", dir, e),
            "Check directory permissions",
        )
    })?;

    let mut jars = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.path().extension() == Some(JAR_EXTENSION) {
            jars.push(entry.into_path());
        }
    }
    jars.sort();
    Ok(jars)
}

/// Parse the reserved system properties resource, if the archive has one
fn read_system_properties(archive: &dyn Archive) -> Result<Option<BTreeMap<String, String>>> {
    let Some(node) = archive.get(SYSTEM_PROPERTIES_PATH) else {
        return Ok(None);
    };

    let Some(Asset::Resource(source)) = node.asset() else {
        tracing::warn!(path = SYSTEM_PROPERTIES_PATH, "System properties node is not a resource");
        return Ok(None);
    };

    let mut input = source.open().map_err(|e| {
        Error::properties(
            format!("Could not load system properties: {}", e),
            "Check the system properties resource",
        )
    })?;
    let properties = properties::parse(&mut input)?;
    tracing::debug!(count = properties.len(), "Loaded system properties");
    Ok(Some(properties))
}
