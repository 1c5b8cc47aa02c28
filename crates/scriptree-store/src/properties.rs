//! Property store operations
//!
//! At most one property exists per (node, name). Reconciliation replaces a
//! node's whole property set and reports every transition so the caller can
//! audit it.

use crate::error::StoreError;
use crate::tables::Tables;
use indexmap::IndexMap;
use scriptree_model::{NodeId, Property, PropertyMap};
use serde_json::Value;

/// One property transition produced by [`Tables::reconcile_properties`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyChange {
    /// Name was absent and is now stored
    Inserted(Property),
    /// Stored value changed
    Updated {
        /// Previous record
        old: Property,
        /// Replacement record
        new: Property,
    },
    /// Name was absent from the desired set and was deleted
    Removed(Property),
}

impl PropertyChange {
    /// Name of the affected property
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Inserted(p) | Self::Removed(p) => &p.name,
            Self::Updated { new, .. } => &new.name,
        }
    }
}

impl Tables {
    /// Stored properties of `id` in insertion order
    pub fn properties(&self, id: NodeId) -> impl Iterator<Item = &Property> {
        self.properties.get(&id).into_iter().flat_map(IndexMap::values)
    }

    /// One stored property
    #[must_use]
    pub fn property(&self, id: NodeId, name: &str) -> Option<&Property> {
        self.properties.get(&id).and_then(|props| props.get(name))
    }

    /// Upsert a property, inferring its type tag from `value`
    ///
    /// Returns the replaced record, if any.
    ///
    /// # Errors
    /// Fails if the node is missing or the value cannot be encoded; nothing is
    /// written in either case.
    pub fn set_property(
        &mut self,
        id: NodeId,
        name: &str,
        value: &Value,
    ) -> Result<Option<Property>, StoreError> {
        self.require(id)?;
        let property = Property::encode(name, value)?;
        Ok(self.put_property(id, property))
    }

    /// Store an already-encoded record verbatim
    pub fn put_property(&mut self, id: NodeId, property: Property) -> Option<Property> {
        self.properties
            .entry(id)
            .or_default()
            .insert(property.name.clone(), property)
    }

    /// Toggle the enabled flag of a stored property
    ///
    /// Returns `false` if no such property exists.
    pub fn set_property_enabled(&mut self, id: NodeId, name: &str, enabled: bool) -> bool {
        match self.properties.get_mut(&id).and_then(|p| p.get_mut(name)) {
            Some(property) => {
                property.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Replace the property set of `id` with `desired`
    ///
    /// Unchanged values produce no entry. Every desired value is encoded
    /// before anything is written.
    ///
    /// # Errors
    /// Fails if the node is missing or a value cannot be encoded.
    pub fn reconcile_properties(
        &mut self,
        id: NodeId,
        desired: &PropertyMap,
    ) -> Result<Vec<PropertyChange>, StoreError> {
        self.require(id)?;
        let encoded = desired
            .iter()
            .map(|(name, value)| Property::encode(name.as_str(), value))
            .collect::<Result<Vec<_>, _>>()?;

        let stored = self.properties.entry(id).or_default();
        let mut changes = Vec::new();
        for property in encoded {
            match stored.get_mut(&property.name) {
                None => {
                    changes.push(PropertyChange::Inserted(property.clone()));
                    stored.insert(property.name.clone(), property);
                }
                Some(current) if current.differs_from(&property) => {
                    let old = current.clone();
                    current.kind = property.kind;
                    current.raw.clone_from(&property.raw);
                    changes.push(PropertyChange::Updated {
                        old,
                        new: current.clone(),
                    });
                }
                Some(_) => {}
            }
        }

        let absent: Vec<String> = stored
            .keys()
            .filter(|name| !desired.contains_key(name.as_str()))
            .cloned()
            .collect();
        for name in absent {
            if let Some(old) = stored.shift_remove(&name) {
                changes.push(PropertyChange::Removed(old));
            }
        }
        Ok(changes)
    }

    /// Decoded name -> value mapping, skipping disabled properties unless asked
    ///
    /// # Errors
    /// Returns [`StoreError::Model`] if a stored payload is corrupt.
    pub fn read_properties(
        &self,
        id: NodeId,
        include_disabled: bool,
    ) -> Result<IndexMap<String, Value>, StoreError> {
        self.properties(id)
            .filter(|p| include_disabled || p.enabled)
            .map(|p| Ok((p.name.clone(), p.decode()?)))
            .collect()
    }

    /// Decoded value of one enabled property
    ///
    /// # Errors
    /// Returns [`StoreError::Model`] if the stored payload is corrupt.
    pub fn read_property(&self, id: NodeId, name: &str) -> Result<Option<Value>, StoreError> {
        match self.property(id, name) {
            Some(p) if p.enabled => Ok(Some(p.decode()?)),
            _ => Ok(None),
        }
    }

    /// Copy every property record of `from` onto `to` verbatim
    pub fn copy_properties(&mut self, from: NodeId, to: NodeId) {
        let copied: Vec<Property> = self.properties(from).cloned().collect();
        for property in copied {
            self.put_property(to, property);
        }
    }
}
