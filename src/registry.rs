//! Operation name → constructor tables.
//!
//! Two tiers are kept apart. The standard tier holds every operation whose
//! programmatic constructor needs only a device and a name. The extended tier
//! holds the data leaves and the convolution/pooling family whose programmatic
//! constructors also take a shape. Both tiers take [`NodeArgs`] so that the
//! configuration path can hand the same constructors a full record.

use std::collections::HashMap;

use crate::config::ConfigRecord;
use crate::element::Element;
use crate::error::GraphError;
use crate::node::{ComputationNode, DeviceId, NodeParams, OperationKind};

/// Constructor arguments, one variant per constructor shape.
#[derive(Debug, Clone)]
pub enum NodeArgs<'a> {
    Standard {
        device: DeviceId,
        name: String,
    },
    Configured {
        device: DeviceId,
        name: String,
        record: &'a ConfigRecord,
    },
}

impl<'a> NodeArgs<'a> {
    pub fn standard(device: DeviceId, name: impl Into<String>) -> Self {
        NodeArgs::Standard {
            device,
            name: name.into(),
        }
    }

    pub fn configured(device: DeviceId, name: impl Into<String>, record: &'a ConfigRecord) -> Self {
        NodeArgs::Configured {
            device,
            name: name.into(),
            record,
        }
    }

    pub fn device(&self) -> DeviceId {
        match self {
            NodeArgs::Standard { device, .. } | NodeArgs::Configured { device, .. } => *device,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            NodeArgs::Standard { name, .. } | NodeArgs::Configured { name, .. } => name.as_str(),
        }
    }

    pub fn record(&self) -> Option<&'a ConfigRecord> {
        match self {
            NodeArgs::Standard { .. } => None,
            NodeArgs::Configured { record, .. } => Some(*record),
        }
    }
}

pub type Constructor<E> =
    fn(OperationKind, &NodeArgs<'_>) -> Result<ComputationNode<E>, GraphError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Standard,
    Extended,
}

struct Entry<E: Element> {
    kind: OperationKind,
    tier: Tier,
    alias_of: Option<&'static str>,
    construct: Constructor<E>,
}

impl<E: Element> Clone for Entry<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Element> Copy for Entry<E> {}

const EXTENDED_OPERATIONS: &[OperationKind] = &[
    OperationKind::AveragePooling,
    OperationKind::Convolution,
    OperationKind::InputValue,
    OperationKind::LearnableParameter,
    OperationKind::MaxPooling,
    OperationKind::SparseLearnableParameter,
];

const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("Delay", "PastValue"),
    ("PerDimMeanVarNormalizationNode", "PerDimMeanVarNormalization"),
    ("PerDimMeanVarDeNormalizationNode", "PerDimMeanVarDeNormalization"),
];

/// Name-keyed constructor table for one element type.
pub struct OperationRegistry<E: Element> {
    entries: HashMap<&'static str, Entry<E>>,
}

impl<E: Element> OperationRegistry<E> {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Full vocabulary: every [`OperationKind`], `SparseInputValue`, and the legacy aliases.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for kind in OperationKind::ALL {
            let tier = if EXTENDED_OPERATIONS.contains(kind) {
                Tier::Extended
            } else {
                Tier::Standard
            };
            let entry = Entry {
                kind: *kind,
                tier,
                alias_of: None,
                construct: construct_node::<E>,
            };
            registry.insert(kind.name(), entry);
        }
        let sparse_input = Entry {
            kind: OperationKind::InputValue,
            tier: Tier::Extended,
            alias_of: None,
            construct: construct_sparse_input::<E>,
        };
        registry.insert("SparseInputValue", sparse_input);
        for &(alias, canonical) in LEGACY_ALIASES {
            if let Some(entry) = registry.entries.get(canonical).copied() {
                let aliased = Entry {
                    alias_of: Some(canonical),
                    ..entry
                };
                registry.insert(alias, aliased);
            }
        }

        tracing::debug!(
            precision = %E::ELEMENT_TYPE,
            standard = registry.names_in(Tier::Standard).len(),
            extended = registry.names_in(Tier::Extended).len(),
            "operation registry initialised"
        );
        registry
    }

    pub fn register_standard(
        &mut self,
        name: &'static str,
        kind: OperationKind,
        construct: Constructor<E>,
    ) -> Result<(), GraphError> {
        self.register(name, kind, Tier::Standard, construct)
    }

    pub fn register_extended(
        &mut self,
        name: &'static str,
        kind: OperationKind,
        construct: Constructor<E>,
    ) -> Result<(), GraphError> {
        self.register(name, kind, Tier::Extended, construct)
    }

    /// Add `alias` as a second name for the entry registered under `canonical`.
    pub fn register_alias(
        &mut self,
        alias: &'static str,
        canonical: &'static str,
    ) -> Result<(), GraphError> {
        let entry = self
            .entries
            .get(canonical)
            .copied()
            .ok_or_else(|| GraphError::OperationNotRecognized {
                name: canonical.to_string(),
            })?;
        self.ensure_unregistered(alias)?;
        let aliased = Entry {
            alias_of: Some(entry.alias_of.unwrap_or(canonical)),
            ..entry
        };
        self.insert(alias, aliased);
        Ok(())
    }

    /// Standard-tier lookup. `None` means the name is not in this tier.
    pub fn resolve_standard(
        &self,
        name: &str,
        args: &NodeArgs<'_>,
    ) -> Option<Result<ComputationNode<E>, GraphError>> {
        self.resolve_in(Tier::Standard, name, args)
    }

    /// Extended-tier lookup. `None` means the name is not in this tier.
    pub fn resolve_extended(
        &self,
        name: &str,
        args: &NodeArgs<'_>,
    ) -> Option<Result<ComputationNode<E>, GraphError>> {
        self.resolve_in(Tier::Extended, name, args)
    }

    pub fn kind_of(&self, name: &str) -> Option<OperationKind> {
        self.entries.get(name).map(|entry| entry.kind)
    }

    pub fn tier_of(&self, name: &str) -> Option<Tier> {
        self.entries.get(name).map(|entry| entry.tier)
    }

    /// Canonical name an alias stands for, `None` for canonical names and unknown names.
    pub fn alias_target(&self, name: &str) -> Option<&'static str> {
        self.entries.get(name).and_then(|entry| entry.alias_of)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Every registered name, aliases included, sorted.
    pub fn operation_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn names_in(&self, tier: Tier) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.tier == tier)
            .map(|(name, _)| *name)
            .collect();
        names.sort_unstable();
        names
    }

    fn resolve_in(
        &self,
        tier: Tier,
        name: &str,
        args: &NodeArgs<'_>,
    ) -> Option<Result<ComputationNode<E>, GraphError>> {
        let entry = self.entries.get(name).filter(|entry| entry.tier == tier)?;
        Some((entry.construct)(entry.kind, args))
    }

    fn register(
        &mut self,
        name: &'static str,
        kind: OperationKind,
        tier: Tier,
        construct: Constructor<E>,
    ) -> Result<(), GraphError> {
        self.ensure_unregistered(name)?;
        let entry = Entry {
            kind,
            tier,
            alias_of: None,
            construct,
        };
        self.insert(name, entry);
        Ok(())
    }

    fn ensure_unregistered(&self, name: &str) -> Result<(), GraphError> {
        if self.entries.contains_key(name) {
            return Err(GraphError::DuplicateOperation {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&mut self, name: &'static str, entry: Entry<E>) {
        self.entries.entry(name).or_insert(entry);
    }
}

impl<E: Element> Default for OperationRegistry<E> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// One registry per supported element type.
pub struct OperationRegistries {
    pub float: OperationRegistry<f32>,
    pub double: OperationRegistry<f64>,
}

impl OperationRegistries {
    pub fn with_defaults() -> Self {
        Self {
            float: OperationRegistry::with_defaults(),
            double: OperationRegistry::with_defaults(),
        }
    }
}

impl Default for OperationRegistries {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Default constructor: parameters come from the record when there is one.
pub fn construct_node<E: Element>(
    kind: OperationKind,
    args: &NodeArgs<'_>,
) -> Result<ComputationNode<E>, GraphError> {
    let params = match args.record() {
        Some(record) => NodeParams::from_record(kind, record)?,
        None => NodeParams::default_for(kind),
    };
    ComputationNode::with_params(kind, args.device(), args.name(), params)
}

fn construct_sparse_input<E: Element>(
    kind: OperationKind,
    args: &NodeArgs<'_>,
) -> Result<ComputationNode<E>, GraphError> {
    let mut params = match args.record() {
        Some(record) => NodeParams::from_record(kind, record)?,
        None => NodeParams::default_for(kind),
    };
    if let NodeParams::Input(input) = &mut params {
        input.sparse = true;
    }
    ComputationNode::with_params(kind, args.device(), args.name(), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{InputParams, NodeBase};

    fn args(name: &str) -> NodeArgs<'static> {
        NodeArgs::standard(DeviceId::CPU, name)
    }

    fn resolve<E: Element>(registry: &OperationRegistry<E>, name: &str) -> ComputationNode<E> {
        registry
            .resolve_standard(name, &args("n"))
            .or_else(|| registry.resolve_extended(name, &args("n")))
            .unwrap_or_else(|| panic!("{name} not registered"))
            .unwrap()
    }

    fn check_vocabulary<E: Element>() {
        let registry = OperationRegistry::<E>::with_defaults();
        for name in registry.operation_names() {
            let node = resolve(&registry, name);
            let canonical = registry.alias_target(name).unwrap_or(name);
            let expected = match OperationKind::from_name(canonical) {
                Some(kind) => kind,
                None if name == "SparseInputValue" => OperationKind::InputValue,
                None => panic!("{name} has no operation kind"),
            };
            assert_eq!(node.operation(), expected, "{name}");
            assert_eq!(node.element_type(), E::ELEMENT_TYPE);
        }
    }

    #[test]
    fn every_name_resolves_for_float() {
        check_vocabulary::<f32>();
    }

    #[test]
    fn every_name_resolves_for_double() {
        check_vocabulary::<f64>();
    }

    #[test]
    fn aliases_share_the_canonical_kind() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let delay = resolve(&registry, "Delay");
        assert_eq!(delay.operation(), OperationKind::PastValue);
        assert_eq!(
            delay.params(),
            resolve(&registry, "PastValue").params()
        );
        assert_eq!(
            registry.kind_of("PerDimMeanVarNormalizationNode"),
            Some(OperationKind::PerDimMeanVarNormalization)
        );
        assert_eq!(
            registry.kind_of("PerDimMeanVarDeNormalizationNode"),
            Some(OperationKind::PerDimMeanVarDeNormalization)
        );
        assert_eq!(registry.alias_target("Delay"), Some("PastValue"));
        assert_eq!(registry.alias_target("PastValue"), None);
    }

    #[test]
    fn tiers_are_disjoint() {
        let registry = OperationRegistry::<f64>::with_defaults();
        let conv = args("c");
        assert!(registry.resolve_standard("Convolution", &conv).is_none());
        assert!(registry.resolve_extended("Convolution", &conv).is_some());
        assert!(registry.resolve_extended("Plus", &args("p")).is_none());
        assert_eq!(
            registry.names_in(Tier::Extended),
            [
                "AveragePooling",
                "Convolution",
                "InputValue",
                "LearnableParameter",
                "MaxPooling",
                "SparseInputValue",
                "SparseLearnableParameter",
            ]
        );
    }

    #[test]
    fn unknown_names_are_not_found() {
        let registry = OperationRegistry::<f32>::with_defaults();
        for name in ["", "plus", "PLUS", "Plus ", "Foo"] {
            assert!(registry.resolve_standard(name, &args("x")).is_none());
            assert!(registry.resolve_extended(name, &args("x")).is_none());
        }
    }

    #[test]
    fn sparse_input_sets_the_flag() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let node = resolve(&registry, "SparseInputValue");
        assert_eq!(node.operation(), OperationKind::InputValue);
        let sparse = InputParams::matrix(0, 1, true);
        assert_eq!(node.params(), &NodeParams::Input(sparse));
    }

    #[test]
    fn names_are_sorted_and_unique() {
        let registry = OperationRegistry::<f32>::with_defaults();
        let names = registry.operation_names();
        let mut sorted = names.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(names, sorted);
        let sparse_input = 1;
        let expected = OperationKind::ALL.len() + sparse_input + LEGACY_ALIASES.len();
        assert_eq!(names.len(), expected);
    }

    #[test]
    fn registration_never_replaces_an_entry() {
        let mut registry = OperationRegistry::<f32>::with_defaults();
        let err = registry
            .register_standard("Plus", OperationKind::Minus, construct_node::<f32>)
            .unwrap_err();
        match err {
            GraphError::DuplicateOperation { name } => assert_eq!(name, "Plus"),
            other => panic!("expected DuplicateOperation, got {other:?}"),
        }
        assert!(registry.register_alias("Plus", "Minus").is_err());
        assert_eq!(registry.kind_of("Plus"), Some(OperationKind::Plus));
    }

    #[test]
    fn custom_entries_and_aliases() {
        let mut registry = OperationRegistry::<f64>::empty();
        registry
            .register_standard("Add", OperationKind::Plus, construct_node::<f64>)
            .unwrap();
        registry.register_alias("Sum2", "Add").unwrap();
        registry.register_alias("Sum3", "Sum2").unwrap();

        assert_eq!(resolve(&registry, "Sum2").operation(), OperationKind::Plus);
        assert_eq!(registry.alias_target("Sum3"), Some("Add"));
        assert!(matches!(
            registry.register_alias("Other", "Missing"),
            Err(GraphError::OperationNotRecognized { .. })
        ));
    }
}
