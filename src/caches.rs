use tracing::debug;

use crate::pricing::format_amount;
use crate::record::VariationRecord;
use crate::services::{CoreServices, ServiceError};

/// Single-slot cache keyed by id. The variation stream is ordered by item id,
/// so only the current item's entry is ever live; replacing the slot on a key
/// change keeps memory flat over a full run.
#[derive(Debug, Default)]
pub struct ItemCache<T> {
    slot: Option<(u64, T)>,
}

impl<T> ItemCache<T> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    pub fn get(&self, key: u64) -> Option<&T> {
        self.slot.as_ref().filter(|(k, _)| *k == key).map(|(_, v)| v)
    }

    pub fn put(&mut self, key: u64, value: T) {
        self.slot = Some((key, value));
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    pub fn get_or_compute(&mut self, key: u64, compute: impl FnOnce() -> T) -> &T {
        if self.get(key).is_none() {
            let value = compute();
            self.put(key, value);
        }
        self.slot
            .as_ref()
            .map(|(_, value)| value)
            .expect("slot populated above")
    }
}

/// Availability labels for status ids 1..=10, built once per run from the
/// configured slots. The slot value "0" is the sentinel for "no label".
#[derive(Debug, Clone)]
pub struct AvailabilityLabels {
    labels: [String; 10],
}

impl AvailabilityLabels {
    pub fn from_config(slots: &[String; 10]) -> Self {
        let labels = std::array::from_fn(|index| {
            let raw = slots[index].trim();
            if raw == "0" {
                String::new()
            } else {
                raw.to_string()
            }
        });
        Self { labels }
    }

    pub fn label(&self, availability_id: u32) -> &str {
        if (1..=10).contains(&availability_id) {
            &self.labels[(availability_id - 1) as usize]
        } else {
            ""
        }
    }
}

/// Per-parent-item derived values, rebuilt whenever the stream cursor crosses
/// an item boundary. Shipping cost and manufacturer name are computed
/// eagerly on refresh; the image list lazily on first use.
#[derive(Debug, Default)]
pub struct ItemLevelCache {
    shipping_cost: ItemCache<String>,
    manufacturer: ItemCache<String>,
    images: ItemCache<Vec<String>>,
}

impl ItemLevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn refresh<S: CoreServices>(
        &mut self,
        services: &S,
        record: &VariationRecord,
    ) -> Result<(), ServiceError> {
        let item_id = record.item_id();
        self.shipping_cost.invalidate();
        self.manufacturer.invalidate();
        self.images.invalidate();

        let cost = services.shipping_cost(item_id).await?.unwrap_or(0.0);
        self.shipping_cost.put(item_id, format_amount(cost));

        if let Some(manufacturer_id) = record.manufacturer_id() {
            let name = services.manufacturer_name(manufacturer_id).await?;
            self.manufacturer.put(manufacturer_id, name);
        }

        debug!(target: "feed.caches", item_id, "item caches rebuilt");
        Ok(())
    }

    pub fn shipping_cost(&self, item_id: u64) -> &str {
        self.shipping_cost
            .get(item_id)
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn manufacturer_name(&self, manufacturer_id: Option<u64>) -> &str {
        manufacturer_id
            .and_then(|id| self.manufacturer.get(id))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn image_list(&mut self, record: &VariationRecord, referrer: f64) -> &[String] {
        self.images
            .get_or_compute(record.item_id(), || record.images_in_order(referrer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_cache_replaces_on_key_change() {
        let mut cache = ItemCache::new();
        cache.put(1, "a");
        assert_eq!(cache.get(1), Some(&"a"));
        assert_eq!(cache.get(2), None);
        cache.put(2, "b");
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.get(2), Some(&"b"));
    }

    #[test]
    fn get_or_compute_runs_the_closure_once_per_key() {
        let mut cache = ItemCache::new();
        let mut calls = 0;
        cache.get_or_compute(7, || {
            calls += 1;
            "value"
        });
        cache.get_or_compute(7, || {
            calls += 1;
            "value"
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn availability_sentinel_maps_to_empty_label() {
        let mut slots: [String; 10] = Default::default();
        slots[0] = "Sofort lieferbar".into();
        slots[1] = "0".into();
        let labels = AvailabilityLabels::from_config(&slots);
        assert_eq!(labels.label(1), "Sofort lieferbar");
        assert_eq!(labels.label(2), "");
        assert_eq!(labels.label(3), "");
        assert_eq!(labels.label(11), "");
        assert_eq!(labels.label(0), "");
    }
}
