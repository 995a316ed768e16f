//! Purpose: Load and unload the virtual files as one unit.
//! Exports: `Module`, `TeardownReport`.
//! Role: Lifecycle manager; builds the shared store and registers every file with a host.
//! Invariants: A failed load leaves nothing registered on the host.
//! Invariants: Teardown runs exactly once, from `unload` or from `Drop`.
#![allow(clippy::result_large_err)]

use std::sync::Arc;

use tracing::{info, warn};

use super::namespace::{ApiResult, FileHost};
use crate::config::ModuleConfig;
use crate::core::error::{Error, ErrorKind};
use crate::core::file::{IdentityOverrideFile, RunningTotalFile, SortedListFile, VirtualFile};
use crate::core::identity::IdentityOverride;
use crate::core::store::Store;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TeardownReport {
    pub released_nodes: usize,
    pub unregistered: usize,
}

pub struct Module<H: FileHost> {
    host: Arc<H>,
    store: Arc<Store>,
    registered: Vec<String>,
    torn_down: bool,
}

impl<H: FileHost> Module<H> {
    pub fn load(
        host: Arc<H>,
        config: &ModuleConfig,
        identity: Arc<dyn IdentityOverride>,
    ) -> ApiResult<Self> {
        config.validate()?;
        let store = Arc::new(Store::new());
        info!("state store initialized");

        let files: Vec<Arc<dyn VirtualFile>> = build_files(config, &store, identity);
        let mut registered = Vec::with_capacity(files.len());
        for file in files {
            let name = file.name().to_string();
            if let Err(err) = host.register(file) {
                warn!(file = %name, error = %err, "registration failed, rolling back");
                rollback(host.as_ref(), &registered);
                return Err(Error::new(ErrorKind::RegistrationFailure)
                    .with_message("failed to register virtual file")
                    .with_file(name)
                    .with_source(err));
            }
            info!(file = %name, "virtual file registered");
            registered.push(name);
        }

        Ok(Self {
            host,
            store,
            registered,
            torn_down: false,
        })
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn file_names(&self) -> &[String] {
        &self.registered
    }

    pub fn unload(mut self) -> TeardownReport {
        self.teardown()
    }

    fn teardown(&mut self) -> TeardownReport {
        if self.torn_down {
            return TeardownReport::default();
        }
        self.torn_down = true;

        let mut unregistered = 0;
        for name in self.registered.drain(..) {
            if self.host.unregister(&name) {
                unregistered += 1;
                info!(file = %name, "virtual file unregistered");
            } else {
                warn!(file = %name, "virtual file was already gone");
            }
        }
        let released_nodes = self.store.teardown();
        info!(released_nodes, unregistered, "module unloaded");
        TeardownReport {
            released_nodes,
            unregistered,
        }
    }
}

impl<H: FileHost> Drop for Module<H> {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

fn build_files(
    config: &ModuleConfig,
    store: &Arc<Store>,
    identity: Arc<dyn IdentityOverride>,
) -> Vec<Arc<dyn VirtualFile>> {
    let max = config.max_write_bytes;
    let mut files: Vec<Arc<dyn VirtualFile>> = vec![
        Arc::new(
            RunningTotalFile::new(
                config.running_total.name.as_str(),
                config.running_total.file_mode(),
                Arc::clone(store),
            )
            .with_max_write_bytes(max),
        ),
        Arc::new(
            SortedListFile::new(
                config.sorted_list.name.as_str(),
                config.sorted_list.file_mode(),
                Arc::clone(store),
            )
            .with_max_write_bytes(max),
        ),
    ];
    if config.identity_override_enabled {
        files.push(Arc::new(
            IdentityOverrideFile::new(
                config.identity_override.name.as_str(),
                config.identity_override.file_mode(),
                identity,
            )
            .with_max_write_bytes(max),
        ));
    }
    files
}

fn rollback<H: FileHost + ?Sized>(host: &H, registered: &[String]) {
    for name in registered.iter().rev() {
        if host.unregister(name) {
            info!(file = %name, "rolled back registration");
        }
    }
}
