use serde::Serialize;
use uuid::Uuid;

/// One finished feed line in marketplace column order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedRow {
    pub sku: String,
    pub master_sku: String,
    pub gtin: String,
    pub oem_product_number: String,
    pub name: String,
    pub master_name: String,
    pub variant_name: String,
    pub manufacturer: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub size: String,
    pub colour: String,
    pub material: String,
    pub gender: String,
    pub driving_style: String,
    pub price: String,
    pub shipping: String,
    pub srp: String,
    pub date_changed: String,
    pub date_valid_from: String,
    pub date_valid_to: String,
    pub availability: String,
    pub delivery_period: String,
    pub offered_amount: String,
    pub weight: String,
}

impl FeedRow {
    pub const COLUMNS: [&'static str; 26] = [
        "sku",
        "master_sku",
        "gtin",
        "oem_product_number",
        "name",
        "master_name",
        "variant_name",
        "manufacturer",
        "description",
        "image_url",
        "category",
        "size",
        "colour",
        "material",
        "gender",
        "driving_style",
        "price",
        "shipping",
        "srp",
        "date_changed",
        "date_valid_from",
        "date_valid_to",
        "availability",
        "delivery_period",
        "offered_amount",
        "weight",
    ];

    /// Field values in `COLUMNS` order.
    pub fn values(&self) -> [&str; 26] {
        [
            &self.sku,
            &self.master_sku,
            &self.gtin,
            &self.oem_product_number,
            &self.name,
            &self.master_name,
            &self.variant_name,
            &self.manufacturer,
            &self.description,
            &self.image_url,
            &self.category,
            &self.size,
            &self.colour,
            &self.material,
            &self.gender,
            &self.driving_style,
            &self.price,
            &self.shipping,
            &self.srp,
            &self.date_changed,
            &self.date_valid_from,
            &self.date_valid_to,
            &self.availability,
            &self.delivery_period,
            &self.offered_amount,
            &self.weight,
        ]
    }
}

/// Outcome summary of one export run.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub run_id: Uuid,
    pub total: u64,
    pub shards: u32,
    pub rows_written: u64,
    pub filtered: u64,
    pub skipped_no_price: u64,
    pub row_failures: u64,
}

impl ExportReport {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            total: 0,
            shards: 0,
            rows_written: 0,
            filtered: 0,
            skipped_no_price: 0,
            row_failures: 0,
        }
    }
}
