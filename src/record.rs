use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use crate::config::{DescriptionKind, ExportSettings};
use crate::pricing::PriceFacts;

/// One variation document as delivered by the index scroll. Field names
/// mirror the index schema, not the feed columns.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariationRecord {
    pub id: u64,
    pub data: VariationData,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationData {
    pub item: ItemRef,
    pub variation: VariationCore,
    #[serde(default)]
    pub skus: Vec<SkuEntry>,
    #[serde(default)]
    pub texts: Vec<LocalizedText>,
    #[serde(default)]
    pub default_categories: Vec<CategoryRef>,
    #[serde(default)]
    pub barcodes: Vec<BarcodeEntry>,
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
    #[serde(default)]
    pub properties: Vec<PropertyEntry>,
    #[serde(default)]
    pub images: ImageSet,
    #[serde(default)]
    pub sales_prices: Vec<SalesPriceEntry>,
    #[serde(default)]
    pub stock: Option<StockInfo>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ItemRef {
    pub id: u64,
    #[serde(default)]
    pub manufacturer: Option<ManufacturerRef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ManufacturerRef {
    pub id: u64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VariationCore {
    #[serde(default)]
    pub availability: AvailabilityRef,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub is_main: bool,
    #[serde(default)]
    pub weight_g: f64,
    #[serde(default)]
    pub released_at: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub available_until: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<FixedOffset>>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AvailabilityRef {
    pub id: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkuEntry {
    #[serde(default)]
    pub sku: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub name1: String,
    #[serde(default)]
    pub name2: String,
    #[serde(default)]
    pub name3: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technical_data: String,
    #[serde(default)]
    pub url_path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRef {
    pub id: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BarcodeEntry {
    #[serde(default)]
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeEntry {
    #[serde(default)]
    pub attribute_value_set_id: Option<u64>,
    pub attribute_id: u32,
    pub value_id: u32,
    #[serde(default)]
    pub names: Vec<AttributeValueName>,
}

impl AttributeEntry {
    /// Localized display name of this entry's attribute value, taken from the
    /// document itself (as opposed to the external name lookup).
    pub fn localized_value_name(&self, lang: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|name| name.lang.eq_ignore_ascii_case(lang))
            .map(|name| name.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttributeValueName {
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub name: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyEntry {
    pub property: PropertyRef,
    #[serde(default)]
    pub selection: Option<SelectionPayload>,
    #[serde(default)]
    pub texts: Option<TextPayload>,
    #[serde(default)]
    pub value_int: Option<i64>,
    #[serde(default)]
    pub value_float: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRef {
    #[serde(default)]
    pub id: Option<u32>,
    #[serde(default)]
    pub value_type: PropertyValueType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyValueType {
    Text,
    Selection,
    Empty,
    Int,
    Float,
    File,
    #[serde(other)]
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionPayload {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lang: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TextPayload {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub lang: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageSet {
    #[serde(default)]
    pub all: Vec<ImageEntry>,
    #[serde(default)]
    pub item: Vec<ImageEntry>,
    #[serde(default)]
    pub variation: Vec<ImageEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_middle: String,
    #[serde(default)]
    pub url_preview: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub availabilities: Vec<ImageAvailability>,
}

impl ImageEntry {
    fn best_url(&self) -> &str {
        if self.url_middle.is_empty() {
            &self.url
        } else {
            &self.url_middle
        }
    }

    /// An image with no availability entries is unrestricted; otherwise it
    /// must carry a marketplace link matching the referrer.
    fn available_for(&self, referrer: f64) -> bool {
        if referrer < 0.0 || self.availabilities.is_empty() {
            return true;
        }
        self.availabilities
            .iter()
            .any(|entry| entry.kind == "marketplace" && (entry.value - referrer).abs() < 1e-9)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageAvailability {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesPriceEntry {
    #[serde(default)]
    pub price: f64,
    #[serde(rename = "type", default)]
    pub kind: SalesPriceKind,
    #[serde(default)]
    pub referrers: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SalesPriceKind {
    #[default]
    Default,
    SpecialOffer,
    Rrp,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StockInfo {
    #[serde(default)]
    pub net: f64,
}

impl VariationRecord {
    pub fn item_id(&self) -> u64 {
        self.data.item.id
    }

    pub fn manufacturer_id(&self) -> Option<u64> {
        self.data.item.manufacturer.as_ref().map(|m| m.id)
    }

    pub fn availability_id(&self) -> u32 {
        self.data.variation.availability.id
    }

    pub fn default_category_id(&self) -> Option<u64> {
        self.data.default_categories.first().map(|c| c.id)
    }

    pub fn primary_sku(&self) -> Option<&str> {
        self.data
            .skus
            .first()
            .map(|entry| entry.sku.as_str())
            .filter(|sku| !sku.is_empty())
    }

    fn text(&self, lang: &str) -> Option<&LocalizedText> {
        self.data
            .texts
            .iter()
            .find(|text| text.lang.eq_ignore_ascii_case(lang))
            .or_else(|| self.data.texts.first())
    }

    /// Item name from the configured name slot, falling back to slot 1 when
    /// the configured slot is empty for this language.
    pub fn name(&self, settings: &ExportSettings) -> &str {
        let Some(text) = self.text(&settings.lang) else {
            return "";
        };
        let slot = match settings.name_slot {
            2 => &text.name2,
            3 => &text.name3,
            _ => &text.name1,
        };
        if slot.is_empty() { &text.name1 } else { slot }
    }

    pub fn mutated_name(&self, settings: &ExportSettings, max_length: usize) -> String {
        truncate(self.name(settings), max_length)
    }

    pub fn mutated_description(&self, settings: &ExportSettings) -> String {
        let Some(text) = self.text(&settings.lang) else {
            return String::new();
        };
        let raw = match settings.description_type {
            DescriptionKind::ItemShortDescription => text.short_description.clone(),
            DescriptionKind::ItemDescription => text.description.clone(),
            DescriptionKind::TechnicalData => text.technical_data.clone(),
            DescriptionKind::ItemDescriptionAndTechnicalData => [
                text.description.as_str(),
                text.technical_data.as_str(),
            ]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n\n"),
        };
        truncate(&raw, settings.description_max_length)
    }

    pub fn barcode(&self, kind: &str) -> Option<&str> {
        self.data
            .barcodes
            .iter()
            .find(|entry| entry.kind.eq_ignore_ascii_case(kind))
            .map(|entry| entry.code.as_str())
            .filter(|code| !code.is_empty())
    }

    /// Image URLs for this variation in display order. Variation images take
    /// precedence over item images; the market filter applies when a referrer
    /// is configured.
    pub fn images_in_order(&self, referrer: f64) -> Vec<String> {
        let source = if !self.data.images.variation.is_empty() {
            &self.data.images.variation
        } else if !self.data.images.item.is_empty() {
            &self.data.images.item
        } else {
            &self.data.images.all
        };

        let mut entries: Vec<&ImageEntry> = source
            .iter()
            .filter(|image| image.available_for(referrer))
            .collect();
        entries.sort_by_key(|image| image.position);
        entries
            .into_iter()
            .map(|image| image.best_url().to_string())
            .filter(|url| !url.is_empty())
            .collect()
    }

    pub fn stock_net(&self) -> f64 {
        self.data.stock.as_ref().map(|stock| stock.net).unwrap_or(0.0)
    }

    fn sales_price(&self, kind: SalesPriceKind, referrer: f64) -> f64 {
        self.data
            .sales_prices
            .iter()
            .filter(|entry| entry.kind == kind)
            .find(|entry| {
                entry.referrers.is_empty()
                    || entry
                        .referrers
                        .iter()
                        .any(|linked| (linked - referrer).abs() < 1e-9)
            })
            .map(|entry| entry.price)
            .unwrap_or(0.0)
    }

    pub fn price_facts(&self, referrer: f64) -> PriceFacts {
        PriceFacts {
            price: self.sales_price(SalesPriceKind::Default, referrer),
            special_price: self.sales_price(SalesPriceKind::SpecialOffer, referrer),
            recommended_retail_price: self.sales_price(SalesPriceKind::Rrp, referrer),
        }
    }
}

/// Character-safe truncation with a trailing ellipsis marker.
pub fn truncate(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let cut: String = value.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportSettings;

    fn sample_record() -> VariationRecord {
        serde_json::from_value(serde_json::json!({
            "id": 1001,
            "data": {
                "item": { "id": 7, "manufacturer": { "id": 21 } },
                "variation": {
                    "availability": { "id": 2 },
                    "model": "RX-7",
                    "isMain": false,
                    "weightG": 1500.0
                },
                "skus": [ { "sku": "ART-1001" } ],
                "texts": [
                    {
                        "lang": "de",
                        "name1": "Lederkombi",
                        "name2": "",
                        "name3": "Lederkombi Pro",
                        "shortDescription": "Kurz",
                        "description": "Lang",
                        "technicalData": "Cordura"
                    }
                ],
                "defaultCategories": [ { "id": 501 } ],
                "barcodes": [ { "code": "4011234567890", "type": "EAN_13" } ],
                "attributes": [],
                "properties": [],
                "images": {
                    "variation": [
                        { "url": "https://img/second.jpg", "position": 2 },
                        { "url": "https://img/first.jpg", "position": 1 }
                    ]
                },
                "salesPrices": [
                    { "price": 199.9, "type": "default" },
                    { "price": 149.9, "type": "specialOffer" },
                    { "price": 249.0, "type": "rrp" }
                ],
                "stock": { "net": 5.0 }
            }
        }))
        .expect("sample record")
    }

    #[test]
    fn name_slot_falls_back_to_first_slot() {
        let record = sample_record();
        let mut settings = ExportSettings::default();
        settings.name_slot = 2;
        assert_eq!(record.name(&settings), "Lederkombi");
        settings.name_slot = 3;
        assert_eq!(record.name(&settings), "Lederkombi Pro");
    }

    #[test]
    fn barcode_lookup_matches_type_case_insensitively() {
        let record = sample_record();
        assert_eq!(record.barcode("ean_13"), Some("4011234567890"));
        assert_eq!(record.barcode("UPC"), None);
    }

    #[test]
    fn images_come_back_in_position_order() {
        let record = sample_record();
        let urls = record.images_in_order(-1.0);
        assert_eq!(urls, vec!["https://img/first.jpg", "https://img/second.jpg"]);
    }

    #[test]
    fn market_filter_drops_unlinked_images() {
        let mut record = sample_record();
        record.data.images.variation[0].availabilities = vec![ImageAvailability {
            kind: "marketplace".into(),
            value: 143.02,
        }];
        let urls = record.images_in_order(150.0);
        assert_eq!(urls, vec!["https://img/first.jpg"]);
    }

    #[test]
    fn price_facts_pick_each_kind() {
        let record = sample_record();
        let facts = record.price_facts(-1.0);
        assert_eq!(facts.price, 199.9);
        assert_eq!(facts.special_price, 149.9);
        assert_eq!(facts.recommended_retail_price, 249.0);
    }

    #[test]
    fn truncate_keeps_char_boundaries() {
        assert_eq!(truncate("Grün", 10), "Grün");
        let long = "Größenverstellbare Motorradjacke";
        let cut = truncate(long, 12);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= 12);
    }
}
