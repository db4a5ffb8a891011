//! Schema mapping between display names and physical backend names.

use std::collections::HashMap;

use crate::models::mapping::{PartialSchemaMapping, SchemaMapping, SchemaMappingType};
use crate::models::schema::{DatabaseSchema, PropertyDefinition, DEFAULT_DATABASE};

/// Read-only index over the configured schema mappings.
///
/// Built once per data source instance. Incomplete mappings are dropped at
/// construction, so every index only ever contains valid entries.
#[derive(Debug, Clone, Default)]
pub struct SchemaMapper {
    enabled: bool,
    mappings_by_database: HashMap<String, Vec<SchemaMapping>>,
    by_display_name: HashMap<String, SchemaMapping>,
    by_name: HashMap<String, SchemaMapping>,
    by_value: HashMap<String, SchemaMapping>,
}

impl SchemaMapper {
    /// Build the mapper from raw settings entries.
    pub fn new<'a>(
        enabled: bool,
        mappings: impl IntoIterator<Item = &'a PartialSchemaMapping>,
    ) -> Self {
        let mut mapper = Self { enabled, ..Self::default() };

        for mapping in mappings.into_iter().filter_map(PartialSchemaMapping::validate) {
            mapper
                .mappings_by_database
                .entry(mapping.database.clone())
                .or_default()
                .push(mapping.clone());
            mapper.by_display_name.insert(mapping.display_name.clone(), mapping.clone());
            mapper.by_name.insert(mapping.name.clone(), mapping.clone());
            mapper.by_value.insert(mapping.value.clone(), mapping);
        }

        mapper
    }

    /// Check if mapping is enabled for this data source.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Look up a mapping by the value written into queries.
    ///
    /// Returns `None` when mapping is disabled or nothing matches; callers
    /// then use the value unchanged.
    pub fn get_mapping_by_value(&self, value: &str) -> Option<&SchemaMapping> {
        if !self.enabled || value.is_empty() {
            return None;
        }
        self.by_value.get(value)
    }

    /// Look up a mapping by its physical name.
    pub fn get_mapping_by_name(&self, name: &str) -> Option<&SchemaMapping> {
        if !self.enabled || name.is_empty() {
            return None;
        }
        self.by_name.get(name)
    }

    /// Look up a mapping by its display name.
    pub fn get_mapping_by_display_name(&self, display_name: &str) -> Option<&SchemaMapping> {
        if !self.enabled || display_name.is_empty() {
            return None;
        }
        self.by_display_name.get(display_name)
    }

    /// Physical name to search the schema for, given a name from the editor.
    pub fn physical_name<'a>(&'a self, value: &'a str) -> &'a str {
        self.get_mapping_by_value(value).map_or(value, |mapping| mapping.name.as_str())
    }

    /// Mapped tables that exist in the fetched schema, as editor options.
    ///
    /// Options carry the display name and the mapped value; physical names
    /// stay hidden from the user.
    pub fn get_table_options(&self, database: &DatabaseSchema) -> Vec<PropertyDefinition> {
        let Some(mappings) = self.mappings_by_database.get(DEFAULT_DATABASE) else {
            return Vec::new();
        };

        mappings
            .iter()
            .filter(|mapping| mapping.mapping_type == SchemaMappingType::Table)
            .filter(|mapping| database.has_table(&mapping.name))
            .map(|mapping| PropertyDefinition::string(&mapping.display_name, &mapping.value))
            .collect()
    }

    /// All valid mappings declared for a database.
    pub fn mappings_for_database(&self, database: &str) -> &[SchemaMapping] {
        self.mappings_by_database.get(database).map(Vec::as_slice).unwrap_or_default()
    }
}
