pub mod attribute;
pub mod facet;
pub mod property;

pub use attribute::AttributeResolver;
pub use property::PropertyResolver;
