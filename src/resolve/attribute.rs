use std::collections::HashMap;

use tracing::debug;

use crate::caches::ItemCache;
use crate::record::VariationRecord;
use crate::services::{CoreServices, ServiceError};

/// Resolves legacy attribute values (colour, size and the like encoded as
/// attribute-value names) for the variation currently under the cursor.
///
/// The attribute-id → display-name map is built once per parent item and
/// reused for every variation of that item. Values without a registered
/// external display name are silently excluded.
#[derive(Debug, Default)]
pub struct AttributeResolver {
    values: ItemCache<HashMap<u32, String>>,
}

impl AttributeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn value<S: CoreServices>(
        &mut self,
        services: &S,
        record: &VariationRecord,
        attribute_id: u32,
        lang: &str,
    ) -> Result<String, ServiceError> {
        let item_id = record.item_id();
        if self.values.get(item_id).is_none() {
            let map = build_value_map(services, record, lang).await?;
            debug!(
                target: "feed.attributes",
                item_id,
                variation_id = record.id,
                values = ?map,
                "attribute value map built"
            );
            self.values.put(item_id, map);
        }
        Ok(self
            .values
            .get(item_id)
            .and_then(|map| map.get(&attribute_id))
            .cloned()
            .unwrap_or_default())
    }
}

async fn build_value_map<S: CoreServices>(
    services: &S,
    record: &VariationRecord,
    lang: &str,
) -> Result<HashMap<u32, String>, ServiceError> {
    let mut map = HashMap::new();
    for entry in &record.data.attributes {
        let Some(name) = services.attribute_value_name(entry.value_id, lang).await? else {
            continue;
        };
        map.insert(entry.attribute_id, name);
    }
    Ok(map)
}

/// "Name: Value" pairs for every attribute carried by the variation, joined
/// with ", ". Entries missing either side are dropped; the result is empty
/// exactly when the variation has no usable attributes.
pub async fn name_value_combination<S: CoreServices>(
    services: &S,
    record: &VariationRecord,
    lang: &str,
) -> Result<String, ServiceError> {
    let mut pairs = Vec::new();
    for entry in &record.data.attributes {
        let Some(attribute) = services.attribute_name(entry.attribute_id, lang).await? else {
            continue;
        };
        let Some(value) = entry.localized_value_name(lang) else {
            continue;
        };
        pairs.push(format!("{attribute}: {value}"));
    }
    Ok(pairs.join(", "))
}

/// Value names only, for the variant-name feed column.
pub fn value_combination(record: &VariationRecord, lang: &str) -> String {
    record
        .data
        .attributes
        .iter()
        .filter_map(|entry| entry.localized_value_name(lang))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::VariationRecord;
    use crate::services::fixtures::StaticServices;

    fn record_with_attributes() -> VariationRecord {
        serde_json::from_value(serde_json::json!({
            "id": 2001,
            "data": {
                "item": { "id": 9 },
                "variation": { "isMain": false },
                "attributes": [
                    {
                        "attributeId": 1,
                        "valueId": 10,
                        "names": [ { "lang": "de", "name": "Rot" } ]
                    },
                    {
                        "attributeId": 2,
                        "valueId": 20,
                        "names": [ { "lang": "de", "name": "XL" } ]
                    }
                ]
            }
        }))
        .expect("record")
    }

    fn services() -> StaticServices {
        let mut services = StaticServices::default();
        services.attribute_names.insert(1, "Farbe".into());
        services.attribute_names.insert(2, "Größe".into());
        services.attribute_value_names.insert(10, "Rot".into());
        services.attribute_value_names.insert(20, "XL".into());
        services
    }

    #[tokio::test]
    async fn resolves_value_by_attribute_id() {
        let services = services();
        let record = record_with_attributes();
        let mut resolver = AttributeResolver::new();
        let value = resolver
            .value(&services, &record, 1, "de")
            .await
            .expect("resolve");
        assert_eq!(value, "Rot");
    }

    #[tokio::test]
    async fn unknown_attribute_id_resolves_empty() {
        let services = services();
        let record = record_with_attributes();
        let mut resolver = AttributeResolver::new();
        let value = resolver
            .value(&services, &record, 99, "de")
            .await
            .expect("resolve");
        assert_eq!(value, "");
    }

    #[tokio::test]
    async fn unregistered_values_are_skipped_silently() {
        let mut services = services();
        services.attribute_value_names.remove(&20);
        let record = record_with_attributes();
        let mut resolver = AttributeResolver::new();
        let value = resolver
            .value(&services, &record, 2, "de")
            .await
            .expect("resolve");
        assert_eq!(value, "");
    }

    #[tokio::test]
    async fn value_map_is_built_once_per_item() {
        let services = services();
        let record = record_with_attributes();
        let mut resolver = AttributeResolver::new();
        resolver
            .value(&services, &record, 1, "de")
            .await
            .expect("resolve");
        resolver
            .value(&services, &record, 2, "de")
            .await
            .expect("resolve");
        assert_eq!(services.value_name_calls.get(), 2);
    }

    #[tokio::test]
    async fn combinations_pair_names_and_values() {
        let services = services();
        let record = record_with_attributes();
        let combined = name_value_combination(&services, &record, "de")
            .await
            .expect("combination");
        assert_eq!(combined, "Farbe: Rot, Größe: XL");
        assert_eq!(value_combination(&record, "de"), "Rot, XL");
    }

    #[tokio::test]
    async fn combination_is_empty_without_attributes() {
        let services = services();
        let record: VariationRecord = serde_json::from_value(serde_json::json!({
            "id": 2002,
            "data": { "item": { "id": 9 }, "variation": { "isMain": true } }
        }))
        .expect("record");
        let combined = name_value_combination(&services, &record, "de")
            .await
            .expect("combination");
        assert_eq!(combined, "");
    }
}
