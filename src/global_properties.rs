//! Typed, write-once configuration values stored in the `Context`.
//!
//! A global property is declared with [`define_global_property!`], optionally with a validator.
//! Values are checked when they are set and cannot be changed afterwards, so every module
//! reading a property during a run sees the same value.
use std::any::{Any, TypeId};
use std::fs;
use std::path::Path;

use log::trace;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::SimError;
use crate::hashing::HashMap;

/// Defines a global property with the following parameters:
/// * `$global_property`: Name for the identifier type of the global property
/// * `$value`: The type of the property's value
/// * `$validate`: A function (or closure) that checks the validity of the property (optional)
#[macro_export]
macro_rules! define_global_property {
    ($global_property:ident, $value:ty, $validate: expr) => {
        #[derive(Copy, Clone)]
        pub struct $global_property;

        impl $crate::global_properties::GlobalProperty for $global_property {
            type Value = $value;

            fn name() -> &'static str {
                stringify!($global_property)
            }

            fn validate(val: &$value) -> Result<(), $crate::error::SimError> {
                $validate(val)
            }
        }
    };

    ($global_property: ident, $value: ty) => {
        $crate::define_global_property!($global_property, $value, |_| { Ok(()) });
    };
}
pub use define_global_property;

pub trait GlobalProperty: Any {
    type Value: Any;

    fn name() -> &'static str;

    fn validate(value: &Self::Value) -> Result<(), SimError>;
}

#[derive(Default)]
struct GlobalPropertiesDataContainer {
    global_property_container: HashMap<TypeId, Box<dyn Any>>,
}

define_data_plugin!(
    GlobalPropertiesPlugin,
    GlobalPropertiesDataContainer,
    GlobalPropertiesDataContainer::default()
);

pub trait ContextGlobalPropertiesExt {
    /// Validates and stores `value`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value fails validation or the property was already set.
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        property: T,
        value: T::Value,
    ) -> Result<(), SimError>;

    /// Returns the value of the property, or `None` if it has not been set.
    fn get_global_property_value<T: GlobalProperty>(&self, property: T) -> Option<&T::Value>;

    /// Reads a JSON file into a value of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as `T`.
    fn load_parameters_from_json<T: DeserializeOwned>(&mut self, file_name: &Path)
        -> Result<T, SimError>;

    /// Reads a JSON file and stores it as the value of `property`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if setting the property fails.
    fn load_global_property_from_json<T: GlobalProperty>(
        &mut self,
        property: T,
        file_name: &Path,
    ) -> Result<(), SimError>
    where
        T::Value: DeserializeOwned,
    {
        let value = self.load_parameters_from_json::<T::Value>(file_name)?;
        self.set_global_property_value(property, value)
    }
}

impl ContextGlobalPropertiesExt for Context {
    fn set_global_property_value<T: GlobalProperty>(
        &mut self,
        _property: T,
        value: T::Value,
    ) -> Result<(), SimError> {
        T::validate(&value)?;
        let data_container = self.get_data_container_mut(GlobalPropertiesPlugin);
        if data_container
            .global_property_container
            .contains_key(&TypeId::of::<T>())
        {
            return Err(SimError::GlobalPropertyError(format!(
                "global property {} is already set",
                T::name()
            )));
        }
        trace!("setting global property {}", T::name());
        data_container
            .global_property_container
            .insert(TypeId::of::<T>(), Box::new(value));
        Ok(())
    }

    fn get_global_property_value<T: GlobalProperty>(&self, _property: T) -> Option<&T::Value> {
        self.get_data_container(GlobalPropertiesPlugin)?
            .global_property_container
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T::Value>())
    }

    fn load_parameters_from_json<T: DeserializeOwned>(
        &mut self,
        file_name: &Path,
    ) -> Result<T, SimError> {
        trace!("loading parameters from {}", file_name.display());
        let config_file = fs::read_to_string(file_name)?;
        let parameters = serde_json::from_str(&config_file)?;
        Ok(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub struct BedCount {
        beds: u32,
    }

    define_global_property!(Beds, BedCount, |value: &BedCount| {
        if value.beds == 0 {
            Err(SimError::InvalidParameters("no beds".to_string()))
        } else {
            Ok(())
        }
    });
    define_global_property!(Label, String);

    #[test]
    fn set_and_get() {
        let mut context = Context::new();
        assert!(context.get_global_property_value(Label).is_none());
        context
            .set_global_property_value(Label, "north".to_string())
            .unwrap();
        assert_eq!(context.get_global_property_value(Label).unwrap(), "north");
    }

    #[test]
    fn properties_are_write_once() {
        let mut context = Context::new();
        context
            .set_global_property_value(Label, "north".to_string())
            .unwrap();
        let err = context
            .set_global_property_value(Label, "south".to_string())
            .unwrap_err();
        assert!(matches!(err, SimError::GlobalPropertyError(_)));
        assert_eq!(context.get_global_property_value(Label).unwrap(), "north");
    }

    #[test]
    fn validation_runs_on_set() {
        let mut context = Context::new();
        let err = context
            .set_global_property_value(Beds, BedCount { beds: 0 })
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameters(_)));
        assert!(context.get_global_property_value(Beds).is_none());
    }

    #[test]
    fn load_from_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"beds": 12}}"#).unwrap();
        let mut context = Context::new();
        context
            .load_global_property_from_json(Beds, file.path())
            .unwrap();
        assert_eq!(
            context.get_global_property_value(Beds),
            Some(&BedCount { beds: 12 })
        );
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let mut context = Context::new();
        let err = context
            .load_global_property_from_json(Beds, file.path())
            .unwrap_err();
        assert!(matches!(err, SimError::JsonError(_)));
    }
}
