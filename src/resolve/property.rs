use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::caches::ItemCache;
use crate::record::{PropertyValueType, VariationRecord};
use crate::services::{CoreServices, ServiceError};

/// A resolved structured property value. Text, selection and empty-typed
/// properties all render as text; int and float keep their numeric payload.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Int(i64),
    Float(f64),
}

impl PropertyValue {
    pub fn render(&self) -> String {
        match self {
            PropertyValue::Text(value) => value.clone(),
            PropertyValue::Int(value) => value.to_string(),
            PropertyValue::Float(value) => value.to_string(),
        }
    }
}

/// Resolves structured properties for the variation currently under the
/// cursor, with the typed map and the free-text concatenation each cached
/// per parent item.
#[derive(Debug, Default)]
pub struct PropertyResolver {
    values: ItemCache<HashMap<u32, PropertyValue>>,
    free_text: ItemCache<String>,
}

impl PropertyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered value for one property id, empty when the id is absent.
    pub async fn value<S: CoreServices>(
        &mut self,
        services: &S,
        record: &VariationRecord,
        property_id: u32,
        lang: &str,
    ) -> Result<String, ServiceError> {
        self.ensure_map(services, record, lang).await?;
        Ok(self
            .values
            .get(record.item_id())
            .and_then(|map| map.get(&property_id))
            .map(PropertyValue::render)
            .unwrap_or_default())
    }

    /// Space-joined concatenation of every text and selection value, used for
    /// full-text search fields. Int, float and presence-marker properties are
    /// ignored here.
    #[allow(dead_code)]
    pub async fn free_text<S: CoreServices>(
        &mut self,
        services: &S,
        record: &VariationRecord,
        lang: &str,
    ) -> Result<String, ServiceError> {
        let item_id = record.item_id();
        if let Some(text) = self.free_text.get(item_id) {
            return Ok(text.clone());
        }

        let mut parts = Vec::new();
        for entry in &record.data.properties {
            let Some(property_id) = entry.property.id else {
                continue;
            };
            if !matches!(
                entry.property.value_type,
                PropertyValueType::Text | PropertyValueType::Selection
            ) {
                continue;
            }
            if services.property_name(property_id, lang).await?.is_none() {
                continue;
            }
            match entry.property.value_type {
                PropertyValueType::Text => {
                    if let Some(texts) = &entry.texts {
                        parts.push(texts.value.clone());
                    }
                }
                PropertyValueType::Selection => {
                    if let Some(selection) = &entry.selection {
                        parts.push(selection.name.clone());
                    }
                }
                _ => {}
            }
        }

        let joined = parts.join(" ");
        self.free_text.put(item_id, joined.clone());
        Ok(joined)
    }

    async fn ensure_map<S: CoreServices>(
        &mut self,
        services: &S,
        record: &VariationRecord,
        lang: &str,
    ) -> Result<(), ServiceError> {
        let item_id = record.item_id();
        if self.values.get(item_id).is_some() {
            return Ok(());
        }

        let mut map = HashMap::new();
        for entry in &record.data.properties {
            let Some(property_id) = entry.property.id else {
                continue;
            };
            if entry.property.value_type == PropertyValueType::File {
                continue;
            }
            // Properties without a registered display name are not exported.
            let Some(display_name) = services.property_name(property_id, lang).await? else {
                continue;
            };
            match entry.property.value_type {
                PropertyValueType::Text => {
                    if let Some(texts) = &entry.texts {
                        map.insert(property_id, PropertyValue::Text(texts.value.clone()));
                    }
                }
                PropertyValueType::Selection => {
                    if let Some(selection) = &entry.selection {
                        map.insert(property_id, PropertyValue::Text(selection.name.clone()));
                    }
                }
                // The property name itself doubles as a presence marker.
                PropertyValueType::Empty => {
                    map.insert(property_id, PropertyValue::Text(display_name));
                }
                PropertyValueType::Int => {
                    if let Some(value) = entry.value_int {
                        map.insert(property_id, PropertyValue::Int(value));
                    }
                }
                PropertyValueType::Float => {
                    if let Some(value) = entry.value_float {
                        map.insert(property_id, PropertyValue::Float(value));
                    }
                }
                PropertyValueType::File | PropertyValueType::Unknown => {}
            }
        }

        debug!(
            target: "feed.properties",
            item_id,
            variation_id = record.id,
            values = ?map,
            "property list resolved"
        );
        self.values.put(item_id, map);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fixtures::StaticServices;

    fn record_with_properties() -> VariationRecord {
        serde_json::from_value(serde_json::json!({
            "id": 3001,
            "data": {
                "item": { "id": 11 },
                "variation": { "isMain": true },
                "properties": [
                    {
                        "property": { "id": 100, "valueType": "text" },
                        "texts": { "value": "GoreTex Membran", "lang": "de" }
                    },
                    {
                        "property": { "id": 101, "valueType": "selection" },
                        "selection": { "name": "Touring", "lang": "de" }
                    },
                    {
                        "property": { "id": 102, "valueType": "empty" }
                    },
                    {
                        "property": { "id": 103, "valueType": "int" },
                        "valueInt": 4
                    },
                    {
                        "property": { "id": 104, "valueType": "float" },
                        "valueFloat": 1.5
                    },
                    {
                        "property": { "id": 105, "valueType": "file" }
                    },
                    {
                        "property": { "id": 106, "valueType": "int" }
                    }
                ]
            }
        }))
        .expect("record")
    }

    fn services() -> StaticServices {
        let mut services = StaticServices::default();
        for id in 100..=106 {
            services
                .property_names
                .insert(id, format!("Eigenschaft {id}"));
        }
        services
    }

    #[tokio::test]
    async fn typed_dispatch_covers_every_value_type() {
        let services = services();
        let record = record_with_properties();
        let mut resolver = PropertyResolver::new();

        assert_eq!(
            resolver.value(&services, &record, 100, "de").await.unwrap(),
            "GoreTex Membran"
        );
        assert_eq!(
            resolver.value(&services, &record, 101, "de").await.unwrap(),
            "Touring"
        );
        assert_eq!(
            resolver.value(&services, &record, 102, "de").await.unwrap(),
            "Eigenschaft 102"
        );
        assert_eq!(
            resolver.value(&services, &record, 103, "de").await.unwrap(),
            "4"
        );
        assert_eq!(
            resolver.value(&services, &record, 104, "de").await.unwrap(),
            "1.5"
        );
    }

    #[tokio::test]
    async fn file_properties_and_null_numerics_are_skipped() {
        let services = services();
        let record = record_with_properties();
        let mut resolver = PropertyResolver::new();

        assert_eq!(
            resolver.value(&services, &record, 105, "de").await.unwrap(),
            ""
        );
        assert_eq!(
            resolver.value(&services, &record, 106, "de").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn unregistered_properties_are_excluded() {
        let mut services = services();
        services.property_names.remove(&100);
        let record = record_with_properties();
        let mut resolver = PropertyResolver::new();

        assert_eq!(
            resolver.value(&services, &record, 100, "de").await.unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn free_text_joins_text_and_selection_only() {
        let services = services();
        let record = record_with_properties();
        let mut resolver = PropertyResolver::new();

        let text = resolver
            .free_text(&services, &record, "de")
            .await
            .expect("free text");
        assert_eq!(text, "GoreTex Membran Touring");
    }
}
