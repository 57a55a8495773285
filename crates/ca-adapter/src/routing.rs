//! Input routing.
//!
//! Inputs arrive keyed by the entity they address. Flat adapters only need to
//! pick one value per attribute; hierarchical adapters first group channel
//! inputs under the controller that owns the channel.

use std::collections::BTreeMap;

use ca_core::{AttrValue, EntityId, SourceId};
use tracing::warn;

use crate::error::AdapterResult;
use crate::protocol::Inputs;

/// Per-source values of one attribute.
pub type SourceValues = BTreeMap<SourceId, AttrValue>;

/// Value applied when one attribute receives several sources.
///
/// Sources are ordered, so the lexicographically smallest source wins.
pub fn first_source<'a>(
    entity: &EntityId,
    attr: &str,
    sources: &'a SourceValues,
) -> Option<(&'a SourceId, &'a AttrValue)> {
    let first = sources.iter().next();
    if sources.len() > 1 {
        if let Some((source, _)) = first {
            warn!(
                entity = %entity,
                attr,
                sources = sources.len(),
                chosen = %source,
                "several sources for a single-valued attribute"
            );
        }
    }
    first
}

/// Who an input entity id belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Controller(EntityId),
    Channel {
        controller: EntityId,
        channel: EntityId,
    },
}

/// Inputs grouped for one controller.
#[derive(Debug, Default, PartialEq)]
pub struct ControllerInputs {
    /// Attributes addressed to the controller itself.
    pub direct: BTreeMap<String, SourceValues>,
    /// Channel attributes, per channel.
    pub channels: BTreeMap<EntityId, BTreeMap<String, SourceValues>>,
}

/// Group `inputs` by owning controller. `route` fails for ids the adapter does not own.
pub fn partition<F>(inputs: &Inputs, route: F) -> AdapterResult<BTreeMap<EntityId, ControllerInputs>>
where
    F: Fn(&EntityId) -> AdapterResult<Route>,
{
    let mut grouped: BTreeMap<EntityId, ControllerInputs> = BTreeMap::new();
    for (eid, attrs) in inputs {
        match route(eid)? {
            Route::Controller(controller) => {
                let entry = grouped.entry(controller).or_default();
                for (attr, sources) in attrs {
                    entry
                        .direct
                        .entry(attr.clone())
                        .or_default()
                        .extend(sources.iter().map(|(s, v)| (s.clone(), v.clone())));
                }
            }
            Route::Channel {
                controller,
                channel,
            } => {
                let entry = grouped.entry(controller).or_default();
                let channel_attrs = entry.channels.entry(channel).or_default();
                for (attr, sources) in attrs {
                    channel_attrs
                        .entry(attr.clone())
                        .or_default()
                        .extend(sources.iter().map(|(s, v)| (s.clone(), v.clone())));
                }
            }
        }
    }
    Ok(grouped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdapterError;

    fn sources(pairs: &[(&str, f64)]) -> SourceValues {
        pairs
            .iter()
            .map(|(s, v)| (SourceId::new(*s), AttrValue::Float(*v)))
            .collect()
    }

    fn route(eid: &EntityId) -> AdapterResult<Route> {
        match eid.as_str() {
            "Net_0" => Ok(Route::Controller(eid.clone())),
            "Net_0_Port_0" | "Net_0_Port_1" => Ok(Route::Channel {
                controller: EntityId::new("Net_0"),
                channel: eid.clone(),
            }),
            other => Err(AdapterError::UnknownFlatEntity {
                id: other.to_string(),
                kind: "Net".to_string(),
            }),
        }
    }

    #[test]
    fn smallest_source_wins() {
        let values = sources(&[("b", 2.0), ("a", 1.0)]);
        let (source, value) = first_source(&EntityId::new("X_0"), "p", &values).unwrap();
        assert_eq!(source.as_str(), "a");
        assert_eq!(value, &AttrValue::Float(1.0));
        assert!(first_source(&EntityId::new("X_0"), "p", &SourceValues::new()).is_none());
    }

    #[test]
    fn partitions_by_controller() {
        let mut inputs = Inputs::new();
        inputs.insert(
            EntityId::new("Net_0"),
            BTreeMap::from([("limit".to_string(), sources(&[("x", 1.0)]))]),
        );
        inputs.insert(
            EntityId::new("Net_0_Port_1"),
            BTreeMap::from([("demand".to_string(), sources(&[("B", 4.0)]))]),
        );

        let grouped = partition(&inputs, route).unwrap();
        assert_eq!(grouped.len(), 1);
        let net = &grouped[&EntityId::new("Net_0")];
        assert!(net.direct.contains_key("limit"));
        assert_eq!(
            net.channels[&EntityId::new("Net_0_Port_1")]["demand"],
            sources(&[("B", 4.0)])
        );
    }

    #[test]
    fn unknown_entity_propagates() {
        let mut inputs = Inputs::new();
        inputs.insert(EntityId::new("Other_3"), BTreeMap::new());
        assert!(partition(&inputs, route).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn tie_break_ignores_insertion_order(
                values in prop::collection::btree_map("[a-z]{1,6}", -1.0e6..1.0e6f64, 1..8),
            ) {
                let forward: SourceValues = values
                    .iter()
                    .map(|(s, v)| (SourceId::new(s.as_str()), AttrValue::Float(*v)))
                    .collect();
                let backward: SourceValues = values
                    .iter()
                    .rev()
                    .map(|(s, v)| (SourceId::new(s.as_str()), AttrValue::Float(*v)))
                    .collect();

                let entity = EntityId::new("X_0");
                let (a, _) = first_source(&entity, "p", &forward).unwrap();
                let (b, _) = first_source(&entity, "p", &backward).unwrap();
                prop_assert_eq!(a, b);
                let smallest = values.keys().next().unwrap();
                prop_assert_eq!(a.as_str(), smallest.as_str());
            }
        }
    }
}
