use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::caches::{AvailabilityLabels, ItemLevelCache};
use crate::config::{ExportConfig, ExportSettings};
use crate::filters::{FilterCriteria, FiltrationService};
use crate::index::BatchProducer;
use crate::metrics;
use crate::models::{ExportReport, FeedRow};
use crate::pricing::{self, format_amount};
use crate::record::VariationRecord;
use crate::resolve::{AttributeResolver, PropertyResolver, attribute, facet};
use crate::services::{self, CoreServices, ServiceError};
use crate::sink::RecordSink;
use crate::units;

const DOCUMENTS_PER_SHARD: usize = 250;
const MASTER_NAME_MAX_LENGTH: usize = 256;

/// A failure that ends the whole export: the index stopped answering or the
/// sink stopped accepting rows. Everything per-record is contained instead.
#[derive(Debug, Error)]
#[error("stage `{stage}` failed: {message}")]
pub struct ExportError {
    stage: &'static str,
    message: String,
}

impl ExportError {
    fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    #[allow(dead_code)]
    pub fn stage(&self) -> &'static str {
        self.stage
    }
}

/// A contained per-record failure during field resolution.
#[derive(Debug, Error)]
#[error("{stage}: {source}")]
struct RowError {
    stage: &'static str,
    #[source]
    source: ServiceError,
}

fn stage(stage: &'static str) -> impl Fn(ServiceError) -> RowError {
    move |source| RowError { stage, source }
}

enum RowOutcome {
    Row(Box<FeedRow>),
    Skip(SkipReason),
}

enum SkipReason {
    MissingPrice,
}

#[derive(Default)]
struct FacetValues {
    gender: String,
    driving_style: String,
    color: String,
    size: String,
    material: String,
}

/// Single pass over the streamed variation batches: filter, resolve, refresh
/// the item caches on parent boundaries, and emit one row per surviving
/// variation.
pub struct ExportPipeline<S: CoreServices> {
    services: S,
    config: ExportConfig,
    settings: ExportSettings,
    filtration: FiltrationService,
    limit: Option<u64>,
    attributes: AttributeResolver,
    properties: PropertyResolver,
    item_cache: ItemLevelCache,
    availability: AvailabilityLabels,
    referrer: f64,
}

impl<S: CoreServices> ExportPipeline<S> {
    pub fn new(
        services: S,
        config: ExportConfig,
        settings: ExportSettings,
        criteria: FilterCriteria,
    ) -> Self {
        let availability = AvailabilityLabels::from_config(&config.availability);
        let referrer = settings.effective_referrer(config.marketplace_id);
        let filtration = FiltrationService::new(&criteria);
        Self {
            services,
            config,
            settings,
            filtration,
            limit: criteria.limit,
            attributes: AttributeResolver::new(),
            properties: PropertyResolver::new(),
            item_cache: ItemLevelCache::new(),
            availability,
            referrer,
        }
    }

    pub async fn run<P: BatchProducer, K: RecordSink>(
        &mut self,
        producer: &mut P,
        sink: &mut K,
    ) -> Result<ExportReport, ExportError> {
        let run_id = Uuid::new_v4();
        let mut report = ExportReport::new(run_id);
        info!(target: "feed.pipeline", %run_id, "export run started");

        sink.write_header()
            .map_err(|err| ExportError::new("write_header", err.to_string()))?;
        producer.set_page_size(DOCUMENTS_PER_SHARD);

        let mut previous_item: Option<u64> = None;
        // Counts every record that survives the routine filters, whether or
        // not its row made it out; the limit applies to this counter.
        let mut counted: u64 = 0;
        let mut limit_reached = false;

        loop {
            if limit_reached {
                break;
            }
            let started = Instant::now();
            let batch = producer
                .fetch_next()
                .await
                .map_err(|err| ExportError::new("fetch_shard", err.to_string()))?;
            report.shards += 1;
            if report.shards == 1 {
                report.total = batch.total;
                info!(target: "feed.pipeline", total = batch.total, "index reported result count");
            }
            if !batch.errors.is_empty() {
                error!(
                    target: "feed.pipeline",
                    shard = report.shards,
                    errors = ?batch.errors,
                    "index shard reported errors"
                );
            }

            for record in &batch.documents {
                if self.limit == Some(counted) {
                    limit_reached = true;
                    break;
                }

                if self.filtration.should_skip(record) {
                    report.filtered += 1;
                    continue;
                }

                let attributes_combined = match attribute::name_value_combination(
                    &self.services,
                    record,
                    &self.settings.lang,
                )
                .await
                {
                    Ok(value) => value,
                    Err(err) => {
                        error!(
                            target: "feed.pipeline",
                            variation_id = record.id,
                            error = %err,
                            "attribute resolution failed"
                        );
                        report.row_failures += 1;
                        counted += 1;
                        continue;
                    }
                };
                // Non-main variations must carry distinguishing attributes to
                // be worth exporting standalone.
                if attributes_combined.is_empty() && !record.data.variation.is_main {
                    report.filtered += 1;
                    continue;
                }

                if self.config.barcode_only
                    && record.barcode(&self.settings.barcode_type).is_none()
                {
                    report.filtered += 1;
                    continue;
                }

                let facets = match self.resolve_facets(record).await {
                    Ok(facets) => facets,
                    Err(err) => {
                        error!(
                            target: "feed.pipeline",
                            variation_id = record.id,
                            error = %err,
                            "facet resolution failed"
                        );
                        report.row_failures += 1;
                        counted += 1;
                        continue;
                    }
                };

                let item_id = record.item_id();
                if previous_item != Some(item_id) {
                    previous_item = Some(item_id);
                    if let Err(err) = self.item_cache.refresh(&self.services, record).await {
                        error!(
                            target: "feed.pipeline",
                            variation_id = record.id,
                            item_id,
                            error = %err,
                            "item cache refresh failed"
                        );
                        report.row_failures += 1;
                        counted += 1;
                        continue;
                    }
                }

                match self.build_row(record, &attributes_combined, &facets).await {
                    Ok(RowOutcome::Row(row)) => {
                        sink.write_row(&row)
                            .map_err(|err| ExportError::new("write_row", err.to_string()))?;
                        metrics::row_written(record.id);
                        report.rows_written += 1;
                        debug!(
                            target: "feed.pipeline",
                            item_id,
                            variation_id = record.id,
                            updated_at = ?record.data.variation.updated_at,
                            released_at = ?record.data.variation.released_at,
                            available_until = ?record.data.variation.available_until,
                            "row written"
                        );
                    }
                    Ok(RowOutcome::Skip(SkipReason::MissingPrice)) => {
                        info!(
                            target: "feed.pipeline",
                            variation_id = record.id,
                            "variation has no export price"
                        );
                        report.skipped_no_price += 1;
                    }
                    Err(err) => {
                        error!(
                            target: "feed.pipeline",
                            variation_id = record.id,
                            error = %err,
                            "row build failed"
                        );
                        report.row_failures += 1;
                    }
                }
                counted += 1;
            }

            metrics::shard_elapsed(report.shards, started.elapsed().as_millis());
            if !producer.has_more() {
                break;
            }
        }

        sink.finish()
            .map_err(|err| ExportError::new("flush", err.to_string()))?;
        info!(
            target: "feed.pipeline",
            %run_id,
            rows = report.rows_written,
            filtered = report.filtered,
            no_price = report.skipped_no_price,
            failures = report.row_failures,
            shards = report.shards,
            "export run finished"
        );
        Ok(report)
    }

    async fn resolve_facets(&mut self, record: &VariationRecord) -> Result<FacetValues, RowError> {
        let mut values = FacetValues::default();
        if self.config.gender.active {
            values.gender = facet::resolve(
                &self.services,
                &mut self.attributes,
                &mut self.properties,
                record,
                &self.config.gender.strategy,
                &self.settings.lang,
            )
            .await
            .map_err(stage("resolve_gender"))?;
        }
        if self.config.driving_style.active {
            values.driving_style = facet::resolve(
                &self.services,
                &mut self.attributes,
                &mut self.properties,
                record,
                &self.config.driving_style.strategy,
                &self.settings.lang,
            )
            .await
            .map_err(stage("resolve_driving_style"))?;
        }
        if self.config.color.active {
            values.color = facet::resolve(
                &self.services,
                &mut self.attributes,
                &mut self.properties,
                record,
                &self.config.color.strategy,
                &self.settings.lang,
            )
            .await
            .map_err(stage("resolve_color"))?;
        }
        if self.config.size.active {
            values.size = facet::resolve(
                &self.services,
                &mut self.attributes,
                &mut self.properties,
                record,
                &self.config.size.strategy,
                &self.settings.lang,
            )
            .await
            .map_err(stage("resolve_size"))?;
        }
        if self.config.material.active {
            values.material = facet::resolve(
                &self.services,
                &mut self.attributes,
                &mut self.properties,
                record,
                &self.config.material.strategy,
                &self.settings.lang,
            )
            .await
            .map_err(stage("resolve_material"))?;
        }
        Ok(values)
    }

    async fn build_row(
        &mut self,
        record: &VariationRecord,
        attributes_combined: &str,
        facets: &FacetValues,
    ) -> Result<RowOutcome, RowError> {
        let facts = record.price_facts(self.referrer);
        let selected = pricing::select_prices(&facts);
        // Only variations with a positive sale price are exported.
        let Some(price) = selected.price.filter(|value| *value > 0.0) else {
            return Ok(RowOutcome::Skip(SkipReason::MissingPrice));
        };

        let item_id = record.item_id();
        let category = match record.default_category_id() {
            Some(category_id) => self
                .services
                .category_path(category_id, &self.settings.lang)
                .await
                .map_err(stage("category"))?,
            None => String::new(),
        };
        let delivery_period = self
            .services
            .delivery_text(record.availability_id(), &self.settings.lang)
            .await
            .map_err(stage("delivery_period"))?;
        let image_url = self.item_cache.image_list(record, self.referrer).join(" ");

        let base_name = record.mutated_name(&self.settings, self.settings.name_max_length);
        let name = if attributes_combined.is_empty() {
            base_name
        } else {
            format!("{base_name}, {attributes_combined}")
        };
        let master_name = if attributes_combined.is_empty() {
            String::new()
        } else {
            record.mutated_name(&self.settings, MASTER_NAME_MAX_LENGTH)
        };
        let gender = if facets.gender.is_empty() {
            self.config.gender_default.clone()
        } else {
            facets.gender.clone()
        };

        let row = FeedRow {
            sku: services::generate_sku(record.id, record.primary_sku()),
            master_sku: format!("P_{item_id}"),
            gtin: record
                .barcode(&self.settings.barcode_type)
                .unwrap_or("")
                .to_string(),
            oem_product_number: record.data.variation.model.clone(),
            name,
            master_name,
            variant_name: attribute::value_combination(record, &self.settings.lang),
            manufacturer: self
                .item_cache
                .manufacturer_name(record.manufacturer_id())
                .to_string(),
            description: record.mutated_description(&self.settings),
            image_url,
            category,
            size: facets.size.clone(),
            colour: facets.color.clone(),
            material: facets.material.clone(),
            gender,
            driving_style: facets.driving_style.clone(),
            price: format_amount(price),
            shipping: self.item_cache.shipping_cost(item_id).to_string(),
            srp: selected.old_price.map(format_amount).unwrap_or_default(),
            date_changed: record
                .data
                .variation
                .updated_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            date_valid_from: record
                .data
                .variation
                .released_at
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            date_valid_to: record
                .data
                .variation
                .available_until
                .map(|ts| ts.to_rfc3339())
                .unwrap_or_default(),
            availability: self.availability.label(record.availability_id()).to_string(),
            delivery_period,
            offered_amount: (record.stock_net().floor() as i64).to_string(),
            weight: units::grams_to_kilograms(record.data.variation.weight_g),
        };
        Ok(RowOutcome::Row(Box::new(row)))
    }
}
