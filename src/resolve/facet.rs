use crate::config::{FacetStrategy, ValueSource};
use crate::record::VariationRecord;
use crate::resolve::attribute::AttributeResolver;
use crate::resolve::property::PropertyResolver;
use crate::services::{CoreServices, ServiceError};

/// Resolves one configured facet (gender, colour, size, material or driving
/// style) for a variation.
///
/// With an id strategy, candidate ids are tried in configured order and the
/// first non-empty value wins. With a name-pattern strategy, the attribute
/// *names* are matched against the configured synonym instead; the first
/// matching attribute with a non-empty value wins. Inactive facets are gated
/// by the caller; a facet that resolves nothing yields an empty string.
pub async fn resolve<S: CoreServices>(
    services: &S,
    attributes: &mut AttributeResolver,
    properties: &mut PropertyResolver,
    record: &VariationRecord,
    strategy: &FacetStrategy,
    lang: &str,
) -> Result<String, ServiceError> {
    match strategy {
        FacetStrategy::ById {
            source,
            candidate_ids,
        } => {
            for candidate in candidate_ids {
                let value = match source {
                    ValueSource::Attribute => {
                        attributes.value(services, record, *candidate, lang).await?
                    }
                    ValueSource::Property => {
                        properties.value(services, record, *candidate, lang).await?
                    }
                };
                if !value.is_empty() {
                    return Ok(value);
                }
            }
            Ok(String::new())
        }
        FacetStrategy::ByNamePattern { pattern } => {
            for entry in &record.data.attributes {
                let Some(name) = services.attribute_name(entry.attribute_id, lang).await? else {
                    continue;
                };
                if !pattern.is_match(&name) {
                    continue;
                }
                let value = attributes
                    .value(services, record, entry.attribute_id, lang)
                    .await?;
                if !value.is_empty() {
                    return Ok(value);
                }
            }
            Ok(String::new())
        }
    }
}
