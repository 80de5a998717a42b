//! Named filters and the registry that holds them.
//!
//! A [`FilterCatalog`] is built once, then shared read-only (usually behind an
//! `Arc`) with everything that needs to look filters up. Registration order is
//! preserved and drives the order of [`FilterCatalog::definitions`].

use crate::{
    Channel, Effect, PixelFilterError, PixelFilterResult, Texture,
    base_effect::{GrayscaleConfig, InvertConfig},
    channel_effect::{ChannelMaskConfig, EmphasisConfig},
    filter_effect::SepiaConfig,
};
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Names of the built-in filters. Renaming one breaks every caller that
/// requests it by name.
pub mod names {
    pub const GRAYSCALE: &str = "Grayscale";
    pub const RED_EMPHASIS: &str = "Red emphasis";
    pub const GREEN_EMPHASIS: &str = "Green emphasis";
    pub const BLUE_EMPHASIS: &str = "Blue emphasis";
    pub const SEPIA: &str = "Sepia";
    pub const RED: &str = "Red";
    pub const GREEN: &str = "Green";
    pub const BLUE: &str = "Blue";
    pub const REDLESS: &str = "Redless";
    pub const GREENLESS: &str = "Greenless";
    pub const BLUELESS: &str = "Blueless";
    pub const INVERT: &str = "Invert";

    pub const ALL: [&str; 12] = [
        GRAYSCALE,
        RED_EMPHASIS,
        GREEN_EMPHASIS,
        BLUE_EMPHASIS,
        SEPIA,
        RED,
        GREEN,
        BLUE,
        REDLESS,
        GREENLESS,
        BLUELESS,
        INVERT,
    ];
}

pub type Modifier = dyn Fn(&mut Texture) + Send + Sync;

#[derive(Clone)]
pub struct Filter {
    name: String,
    modifier: Arc<Modifier>,
}

impl Filter {
    pub fn new<F>(name: impl Into<String>, modifier: F) -> Self
    where
        F: Fn(&mut Texture) + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            modifier: Arc::new(modifier),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the filter over `texture` in place.
    pub fn apply(&self, texture: &mut Texture) {
        (self.modifier)(texture);
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterCatalog {
    filters: IndexMap<String, Filter>,
}

impl FilterCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The twelve filters every preview gallery shows, in display order.
    pub fn builtin() -> PixelFilterResult<Self> {
        let mut catalog = Self::new();

        catalog.define_effect(names::GRAYSCALE, GrayscaleConfig::new())?;
        catalog.define_effect(names::RED_EMPHASIS, EmphasisConfig::of(Channel::Red))?;
        catalog.define_effect(names::GREEN_EMPHASIS, EmphasisConfig::of(Channel::Green))?;
        catalog.define_effect(names::BLUE_EMPHASIS, EmphasisConfig::of(Channel::Blue))?;
        catalog.define_effect(names::SEPIA, SepiaConfig::new())?;
        catalog.define_effect(names::RED, ChannelMaskConfig::isolate(Channel::Red))?;
        catalog.define_effect(names::GREEN, ChannelMaskConfig::isolate(Channel::Green))?;
        catalog.define_effect(names::BLUE, ChannelMaskConfig::isolate(Channel::Blue))?;
        catalog.define_effect(names::REDLESS, ChannelMaskConfig::remove(Channel::Red))?;
        catalog.define_effect(names::GREENLESS, ChannelMaskConfig::remove(Channel::Green))?;
        catalog.define_effect(names::BLUELESS, ChannelMaskConfig::remove(Channel::Blue))?;
        catalog.define_effect(names::INVERT, InvertConfig::new())?;

        log::debug!("built-in filter catalog ready: {} filters", catalog.len());
        Ok(catalog)
    }

    pub fn define<F>(&mut self, name: impl Into<String>, modifier: F) -> PixelFilterResult<()>
    where
        F: Fn(&mut Texture) + Send + Sync + 'static,
    {
        let name = name.into();
        if self.filters.contains_key(&name) {
            return Err(PixelFilterError::DuplicateFilter(name));
        }

        let filter = Filter::new(name.clone(), modifier);
        self.filters.insert(name, filter);
        Ok(())
    }

    pub fn define_effect<E>(&mut self, name: impl Into<String>, effect: E) -> PixelFilterResult<()>
    where
        E: Effect + Send + Sync + 'static,
    {
        self.define(name, move |texture| effect.apply(texture))
    }

    pub fn find(&self, name: &str) -> PixelFilterResult<&Filter> {
        self.filters
            .get(name)
            .ok_or_else(|| PixelFilterError::UndefinedFilter(name.to_string()))
    }

    /// Filter names in registration order.
    pub fn definitions(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.filters.get_index_of(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.filters.values()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_find() {
        let mut catalog = FilterCatalog::new();
        catalog.define("Clear", |texture| texture.for_each(|px| px[3] = 0)).unwrap();

        let filter = catalog.find("Clear").unwrap();
        assert_eq!(filter.name(), "Clear");

        let mut texture = Texture::from_raw(1, 1, vec![1, 2, 3, 4]).unwrap();
        filter.apply(&mut texture);
        assert_eq!(texture.as_raw(), &[1, 2, 3, 0]);
    }

    #[test]
    fn test_duplicate_define_fails() {
        let mut catalog = FilterCatalog::new();
        catalog.define("Same", |_| {}).unwrap();

        let err = catalog.define("Same", |texture| texture.invert()).unwrap_err();
        assert_eq!(err, PixelFilterError::DuplicateFilter("Same".to_string()));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_undefined_filter() {
        let catalog = FilterCatalog::builtin().unwrap();
        let err = catalog.find("NoSuchFilter").unwrap_err();
        assert_eq!(err, PixelFilterError::UndefinedFilter("NoSuchFilter".to_string()));
        assert_eq!(err.to_string(), "Undefined filter 'NoSuchFilter' name");
    }

    #[test]
    fn test_definitions_keep_insertion_order() {
        let mut catalog = FilterCatalog::new();
        for name in ["b", "c", "a"] {
            catalog.define(name, |_| {}).unwrap();
        }
        assert_eq!(catalog.definitions(), vec!["b", "c", "a"]);
        assert_eq!(catalog.position("a"), Some(2));
        assert_eq!(catalog.position("z"), None);
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = FilterCatalog::builtin().unwrap();
        assert_eq!(catalog.definitions(), names::ALL.to_vec());
        assert_eq!(catalog.definitions(), catalog.definitions());
        assert!(catalog.iter().map(Filter::name).eq(names::ALL));
    }
}
