//! Profile parameters.
//!
//! Parameters are declared up front on a [`ParameterContext`] (name, type,
//! default, descriptions, advanced flag) and then bound against user supplied
//! string values. Binding validates every value and produces an immutable
//! [`ParameterSet`]; any problem aborts the whole run with a
//! [`ValidationErrors`] naming each offending parameter.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::address::MAX_HOST_OFFSET;
use crate::error::{Result, ValidationErrors};

/// Parameter names as the platform exposes them.
pub mod names {
    pub const NODE_COUNT: &str = "nodeCount";
    pub const NODE_TYPE: &str = "nodeType";
    pub const START_KUBERNETES: &str = "startKubernetes";
    pub const TEMP_FILESYSTEM_SIZE: &str = "tempFileSystemSize";
    pub const EXCLUSIVE_HOSTING: &str = "exclusiveHosting";
    pub const CORE_COUNT: &str = "coreCount";
    pub const CORE_PER_VM: &str = "corePerVM";
    pub const WORKER_RAM: &str = "workerRAM";
    pub const EXCLUSIVE: &str = "exclusive";
}

/// Below this many nodes the cluster still builds, but is not very useful.
pub const RECOMMENDED_MIN_NODES: u32 = 3;

/// Value type of a declared parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    Integer,
    Boolean,
    /// Platform hardware type. Membership is checked by the platform, not here.
    NodeType,
    String,
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::NodeType => "node type",
            ParameterType::String => "string",
        };
        f.write_str(name)
    }
}

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl ParameterValue {
    /// Parse `raw` as a value of type `kind`.
    pub fn parse(kind: ParameterType, raw: &str) -> std::result::Result<Self, String> {
        let raw = raw.trim();
        match kind {
            ParameterType::Integer => raw
                .parse::<i64>()
                .map(ParameterValue::Integer)
                .map_err(|_| format!("expected an integer, got {:?}", raw)),
            ParameterType::Boolean => {
                if raw.eq_ignore_ascii_case("true") {
                    Ok(ParameterValue::Boolean(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Ok(ParameterValue::Boolean(false))
                } else {
                    Err(format!("expected true or false, got {:?}", raw))
                }
            }
            ParameterType::NodeType => {
                if raw.is_empty() {
                    Err("hardware type must not be empty".to_string())
                } else {
                    Ok(ParameterValue::Text(raw.to_string()))
                }
            }
            ParameterType::String => Ok(ParameterValue::Text(raw.to_string())),
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Integer(v) => write!(f, "{}", v),
            ParameterValue::Boolean(v) => write!(f, "{}", v),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

/// Declaration of one user-facing parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterDecl {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    pub default: ParameterValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    /// Hidden from the default parameter form.
    pub advanced: bool,
}

impl ParameterDecl {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        kind: ParameterType,
        default: ParameterValue,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            kind,
            default,
            long_description: None,
            advanced: false,
        }
    }

    pub fn long_description(mut self, text: impl Into<String>) -> Self {
        self.long_description = Some(text.into());
        self
    }

    pub fn advanced(mut self) -> Self {
        self.advanced = true;
        self
    }
}

/// Ordered set of parameter declarations.
#[derive(Debug, Clone, Default)]
pub struct ParameterContext {
    decls: Vec<ParameterDecl>,
}

impl ParameterContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter. A later declaration with the same name replaces
    /// the earlier one in place.
    pub fn define(&mut self, decl: ParameterDecl) -> &mut Self {
        match self.decls.iter_mut().find(|d| d.name == decl.name) {
            Some(existing) => *existing = decl,
            None => self.decls.push(decl),
        }
        self
    }

    pub fn declarations(&self) -> &[ParameterDecl] {
        &self.decls
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDecl> {
        self.decls.iter().find(|d| d.name == name)
    }

    /// The parameters this profile exposes.
    pub fn profile() -> Self {
        use names::*;

        let mut ctx = Self::new();
        ctx.define(ParameterDecl::new(
            NODE_COUNT,
            "Number of nodes in the experiment. It is recommended that at least 3 be used.",
            ParameterType::Integer,
            ParameterValue::Integer(3),
        ))
        .define(
            ParameterDecl::new(
                NODE_TYPE,
                "Node Hardware Type",
                ParameterType::NodeType,
                ParameterValue::Text("m510".to_string()),
            )
            .long_description(
                "A specific hardware type to use for the control node and any physical hosts. \
                 Primarily tested with m510 and xl170 nodes.",
            ),
        )
        .define(
            ParameterDecl::new(
                START_KUBERNETES,
                "Create Kubernetes cluster",
                ParameterType::Boolean,
                ParameterValue::Boolean(true),
            )
            .long_description(
                "Create a Kubernetes cluster with flannel and multus networking once the nodes boot.",
            ),
        )
        .define(
            ParameterDecl::new(
                TEMP_FILESYSTEM_SIZE,
                "Temporary Filesystem Size",
                ParameterType::Integer,
                ParameterValue::Integer(0),
            )
            .advanced()
            .long_description(
                "The size in GB of a temporary file system to mount on each of your nodes. \
                 Temporary means that they are deleted when your experiment is terminated. \
                 0 GB indicates maximum size.",
            ),
        )
        .define(
            ParameterDecl::new(
                EXCLUSIVE_HOSTING,
                "Pack workers onto physical hosts",
                ParameterType::Boolean,
                ParameterValue::Boolean(false),
            )
            .advanced()
            .long_description(
                "Run coreCount worker VMs on each of nodeCount - 1 physical hosts instead of \
                 one worker per slot.",
            ),
        )
        .define(
            ParameterDecl::new(
                CORE_COUNT,
                "Worker VMs per physical host",
                ParameterType::Integer,
                ParameterValue::Integer(4),
            )
            .advanced(),
        )
        .define(
            ParameterDecl::new(
                CORE_PER_VM,
                "Cores per worker VM",
                ParameterType::Integer,
                ParameterValue::Integer(1),
            )
            .advanced(),
        )
        .define(
            ParameterDecl::new(
                WORKER_RAM,
                "RAM per worker VM (MB)",
                ParameterType::Integer,
                ParameterValue::Integer(4096),
            )
            .advanced(),
        )
        .define(
            ParameterDecl::new(
                EXCLUSIVE,
                "Dedicated physical hosts",
                ParameterType::Boolean,
                ParameterValue::Boolean(true),
            )
            .advanced()
            .long_description(
                "Allocate one physical host per slot and pin its worker VMs to it so they do \
                 not share hardware with other experiments.",
            ),
        );
        ctx
    }

    /// Bind user supplied values against the declarations and validate them.
    ///
    /// Parameters not present in `supplied` take their declared default.
    pub fn bind(&self, supplied: &BTreeMap<String, String>) -> Result<ParameterSet> {
        let mut errors = ValidationErrors::new();

        for name in supplied.keys() {
            if self.get(name).is_none() {
                errors.push(name.as_str(), "unknown parameter");
            }
        }

        let mut bound = BTreeMap::new();
        for decl in &self.decls {
            let value = match supplied.get(&decl.name) {
                Some(raw) => match ParameterValue::parse(decl.kind, raw) {
                    Ok(v) => v,
                    Err(reason) => {
                        errors.push(decl.name.as_str(), reason);
                        continue;
                    }
                },
                None => decl.default.clone(),
            };
            debug!(parameter = %decl.name, value = %value, "bound parameter");
            bound.insert(decl.name.clone(), value);
        }

        let values = BoundValues { values: bound };
        let params = ParameterSet::from_bound(&values, &mut errors);
        errors.into_result()?;

        if params.node_count < RECOMMENDED_MIN_NODES {
            warn!(
                node_count = params.node_count,
                "fewer than {} nodes requested", RECOMMENDED_MIN_NODES
            );
        }
        Ok(params)
    }
}

struct BoundValues {
    values: BTreeMap<String, ParameterValue>,
}

impl BoundValues {
    /// Integer parameter converted to `u32`, recording an error when it is
    /// missing, below `min`, or too large.
    fn count(&self, name: &str, min: u32, errors: &mut ValidationErrors) -> u32 {
        match self.values.get(name) {
            Some(ParameterValue::Integer(v)) => {
                if *v < 0 {
                    errors.push(name, format!("must be non-negative, got {}", v));
                    0
                } else if *v < i64::from(min) {
                    errors.push(name, format!("must be at least {}, got {}", min, v));
                    0
                } else {
                    u32::try_from(*v).unwrap_or_else(|_| {
                        errors.push(name, format!("{} is out of range", v));
                        0
                    })
                }
            }
            // Already reported by the type parse.
            None => 0,
            Some(other) => {
                errors.push(name, format!("expected an integer, got {}", other));
                0
            }
        }
    }

    fn flag(&self, name: &str, errors: &mut ValidationErrors) -> bool {
        match self.values.get(name) {
            Some(ParameterValue::Boolean(v)) => *v,
            None => false,
            Some(other) => {
                errors.push(name, format!("expected true or false, got {}", other));
                false
            }
        }
    }

    fn text(&self, name: &str, errors: &mut ValidationErrors) -> String {
        match self.values.get(name) {
            Some(ParameterValue::Text(v)) => v.clone(),
            None => String::new(),
            Some(other) => {
                errors.push(name, format!("expected a string, got {}", other));
                String::new()
            }
        }
    }
}

/// How worker nodes are laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hosting {
    /// One worker VM per slot.
    Fixed,
    /// `core_count` worker VMs per physical-host slot.
    Exclusive(ExclusiveHosting),
}

/// Shape of the exclusive-physical-host layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusiveHosting {
    /// Worker VMs per physical host.
    pub core_count: u32,
    pub cores_per_vm: u32,
    pub worker_ram_mb: u32,
    /// Allocate a dedicated physical host per slot and pin its workers to it.
    pub exclusive: bool,
}

/// Validated, immutable profile parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    /// Total slots, control node included.
    pub node_count: u32,
    pub node_type: String,
    pub start_kubernetes: bool,
    /// Ephemeral volume size in GB; 0 means as large as the platform allows.
    pub temp_fs_size_gb: u32,
    pub hosting: Hosting,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            node_count: 3,
            node_type: "m510".to_string(),
            start_kubernetes: true,
            temp_fs_size_gb: 0,
            hosting: Hosting::Fixed,
        }
    }
}

impl ParameterSet {
    fn from_bound(values: &BoundValues, errors: &mut ValidationErrors) -> Self {
        use names::*;

        let node_count = values.count(NODE_COUNT, 1, errors);
        let node_type = values.text(NODE_TYPE, errors);
        let start_kubernetes = values.flag(START_KUBERNETES, errors);
        let temp_fs_size_gb = values.count(TEMP_FILESYSTEM_SIZE, 0, errors);
        let exclusive_hosting = values.flag(EXCLUSIVE_HOSTING, errors);
        let core_count = values.count(CORE_COUNT, 1, errors);
        let cores_per_vm = values.count(CORE_PER_VM, 1, errors);
        let worker_ram_mb = values.count(WORKER_RAM, 0, errors);
        let exclusive = values.flag(EXCLUSIVE, errors);

        let hosting = if exclusive_hosting {
            Hosting::Exclusive(ExclusiveHosting {
                core_count,
                cores_per_vm,
                worker_ram_mb,
                exclusive,
            })
        } else {
            Hosting::Fixed
        };

        let params = Self {
            node_count,
            node_type,
            start_kubernetes,
            temp_fs_size_gb,
            hosting,
        };

        if node_count >= 1 && !errors.contains(CORE_COUNT) {
            let requested = params.addressed_node_count();
            if requested > u64::from(MAX_HOST_OFFSET) {
                let reason = format!(
                    "{} nodes need addresses but the subnet holds {}",
                    requested, MAX_HOST_OFFSET
                );
                if let Hosting::Exclusive(_) = params.hosting {
                    errors.push(CORE_COUNT, reason.clone());
                }
                errors.push(NODE_COUNT, reason);
            }
        }
        params
    }

    /// Number of worker nodes the builder will create.
    ///
    /// This is also the cluster size handed to the primary's bootstrap.
    pub fn worker_count(&self) -> u64 {
        let slots = u64::from(self.node_count.saturating_sub(1));
        match &self.hosting {
            Hosting::Fixed => slots,
            Hosting::Exclusive(shape) => slots * u64::from(shape.core_count),
        }
    }

    /// Nodes that consume an address: control node plus workers.
    pub fn addressed_node_count(&self) -> u64 {
        1 + self.worker_count()
    }
}
