//! # Service registry: name index and install-time wiring.
//!
//! The registry maps names to controllers and performs installation under a
//! single lock, so concurrent installs cannot race each other into a cycle.
//!
//! ## Install
//! ```text
//! create()
//!   └─► install (registry lock held)
//!         ├─ duplicate? ──────────────► InstallError::DuplicateService
//!         ├─ resolve names  (missing + forward refs ⇒ placeholder)
//!         ├─ resolve handles (other container ⇒ ForeignController)
//!         ├─ dependency path back to self? ► InstallError::CircularDependency
//!         ├─ wire edges (parent being removed ⇒ roll back, MissingDependency)
//!         └─ define + activate + index
//!   └─► schedule first evaluation (lock released)
//! ```
//!
//! ## Rules
//! - A failed install leaves the registry unchanged.
//! - A placeholder is filled in place when its name is installed, so dependents
//!   wired to it keep their edges.
//! - A placeholder is dropped from the index when its last dependent is removed.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::controller::{ControllerCore, Definition, Mode};
use crate::error::InstallError;
use crate::executor::ExecutorSlot;
use crate::listeners::ListenerRef;
use crate::name::ServiceName;
use crate::service::{NullService, ServiceRef};
use crate::value::{ImmediateValue, Injection, ValueRef};

/// Everything a `ServiceBuilder` collected.
pub(crate) struct InstallRequest {
    pub(crate) name: ServiceName,
    pub(crate) service: ValueRef<ServiceRef>,
    pub(crate) dependency_names: Vec<ServiceName>,
    pub(crate) dependency_handles: Vec<Arc<ControllerCore>>,
    pub(crate) injections: Vec<Box<dyn Injection>>,
    pub(crate) listeners: Vec<ListenerRef>,
    pub(crate) mode: Mode,
}

/// Name index of one container, plus its root controller.
pub(crate) struct Registry {
    services: Mutex<HashMap<ServiceName, Arc<ControllerCore>>>,
    root: Arc<ControllerCore>,
    executor: Arc<ExecutorSlot>,
    forward_references: bool,
}

impl Registry {
    pub(crate) fn new(executor: Arc<ExecutorSlot>, forward_references: bool) -> Arc<Self> {
        Arc::new_cyclic(|me| Registry {
            services: Mutex::new(HashMap::new()),
            root: ControllerCore::new(None, Arc::clone(&executor), me.clone()),
            executor,
            forward_references,
        })
    }

    pub(crate) fn root(&self) -> &Arc<ControllerCore> {
        &self.root
    }

    /// Defines and activates the root. Called once, right after construction.
    pub(crate) fn start_root(&self, mode: Mode) {
        let service: ValueRef<ServiceRef> = ImmediateValue::arc(NullService::arc());
        self.root.define(Definition {
            service,
            dependencies: Vec::new(),
            injections: Vec::new(),
        });
        self.root.activate(mode, Vec::new());
        self.root.schedule();
    }

    /// Installed controller by name; placeholders are not visible.
    pub(crate) fn get(&self, name: &ServiceName) -> Option<Arc<ControllerCore>> {
        self.services
            .lock()
            .get(name)
            .filter(|c| !c.is_placeholder())
            .cloned()
    }

    /// Installed controllers, sorted by name.
    pub(crate) fn controllers(&self) -> Vec<Arc<ControllerCore>> {
        let mut out: Vec<Arc<ControllerCore>> = self
            .services
            .lock()
            .values()
            .filter(|c| !c.is_placeholder())
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name().cmp(&b.name()));
        out
    }

    pub(crate) fn install(
        self: &Arc<Self>,
        request: InstallRequest,
    ) -> Result<Arc<ControllerCore>, InstallError> {
        let InstallRequest {
            name,
            service,
            dependency_names,
            dependency_handles,
            injections,
            listeners,
            mode,
        } = request;
        let me = Arc::downgrade(self);
        let mut services = self.services.lock();

        let core = match services.get(&name) {
            Some(existing) if existing.is_placeholder() => Arc::clone(existing),
            Some(_) => return Err(InstallError::DuplicateService { name }),
            None => ControllerCore::new(Some(name.clone()), Arc::clone(&self.executor), me.clone()),
        };

        let mut placeholders: Vec<Arc<ControllerCore>> = Vec::new();
        let mut dependencies = vec![Arc::clone(&self.root)];
        for dependency in dependency_names {
            let resolved = if dependency == name {
                Arc::clone(&core)
            } else if let Some(found) = services.get(&dependency) {
                Arc::clone(found)
            } else if let Some(pending) = placeholders
                .iter()
                .find(|p| p.name() == Some(&dependency))
            {
                Arc::clone(pending)
            } else if self.forward_references {
                let placeholder = ControllerCore::new(
                    Some(dependency.clone()),
                    Arc::clone(&self.executor),
                    me.clone(),
                );
                placeholders.push(Arc::clone(&placeholder));
                placeholder
            } else {
                return Err(InstallError::MissingDependency { name, dependency });
            };
            dependencies.push(resolved);
        }
        for handle in dependency_handles {
            if !handle.belongs_to(&me) {
                return Err(InstallError::ForeignController {
                    dependency: handle.display_name(),
                });
            }
            dependencies.push(handle);
        }
        dependencies.sort_by_key(|d| d.id());
        dependencies.dedup_by_key(|d| d.id());

        if let Some(path) = cycle_path(&core, &dependencies) {
            return Err(InstallError::CircularDependency { path });
        }

        core.prepare_wiring(dependencies.len());
        for (wired, parent) in dependencies.iter().enumerate() {
            match parent.add_dependent(&core) {
                Some((up, requesting_stop)) => core.dependency_wired(up, requesting_stop),
                None => {
                    for earlier in &dependencies[..wired] {
                        earlier.forget_dependent(&core);
                    }
                    return Err(InstallError::MissingDependency {
                        name,
                        dependency: parent.display_name(),
                    });
                }
            }
        }

        let defined = core.define(Definition {
            service,
            dependencies,
            injections,
        });
        debug_assert!(defined, "controller defined twice");
        core.activate(mode, listeners);
        services.insert(name.clone(), Arc::clone(&core));
        for placeholder in placeholders {
            if let Some(pending) = placeholder.name().cloned() {
                tracing::debug!(service = %pending, dependent = %name, "forward reference");
                services.insert(pending, placeholder);
            }
        }
        drop(services);

        tracing::debug!(service = %name, mode = %mode, "installed");
        core.schedule();
        Ok(core)
    }

    /// Drops a removed controller from the index.
    pub(crate) fn forget(&self, core: &ControllerCore) {
        let Some(name) = core.name() else {
            return;
        };
        let mut services = self.services.lock();
        if services
            .get(name)
            .is_some_and(|c| std::ptr::eq(Arc::as_ptr(c), core))
        {
            services.remove(name);
        }
    }

    /// Drops a placeholder that no longer has dependents.
    pub(crate) fn drop_placeholder(&self, core: &Arc<ControllerCore>) {
        let Some(name) = core.name() else {
            return;
        };
        let mut services = self.services.lock();
        let orphaned = services.get(name).is_some_and(|c| {
            Arc::ptr_eq(c, core) && c.is_placeholder() && !c.has_dependents()
        });
        if orphaned {
            services.remove(name);
            tracing::debug!(service = %name, "forward reference dropped");
        }
    }
}

/// Finds a dependency path from any of `dependencies` back to `target`.
///
/// Returns the cycle as `target -> ... -> target`.
fn cycle_path(
    target: &Arc<ControllerCore>,
    dependencies: &[Arc<ControllerCore>],
) -> Option<Vec<ServiceName>> {
    let target_name = target.display_name();
    let mut visited = HashSet::new();
    for start in dependencies {
        if start.id() == target.id() {
            return Some(vec![target_name.clone(), target_name]);
        }
        if !visited.insert(start.id()) {
            continue;
        }
        let mut stack: Vec<(Arc<ControllerCore>, usize)> = vec![(Arc::clone(start), 0)];
        while let Some((node, next)) = stack.last_mut() {
            let parents = node.dependencies();
            if *next >= parents.len() {
                stack.pop();
                continue;
            }
            let parent = Arc::clone(&parents[*next]);
            *next += 1;
            if parent.id() == target.id() {
                let mut path = vec![target_name.clone()];
                path.extend(stack.iter().map(|(c, _)| c.display_name()));
                path.push(target_name);
                return Some(path);
            }
            if visited.insert(parent.id()) {
                stack.push((parent, 0));
            }
        }
    }
    None
}
