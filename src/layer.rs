//! The Layer domain record and its test assertion helper.

use serde::Serialize;
use std::any::Any;

/// One geospatial data layer as the CMS publishes it.
///
/// Constructed by the application under test; this crate only inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layer {
    /// Short layer name, e.g. `nic_admin`. Never empty for a valid layer.
    pub name: String,
    pub title: String,
    /// Qualified `workspace:name` identifier used by the map server.
    pub typename: String,
}

/// Asserts that `candidate` is a valid [`Layer`].
///
/// Panics unless the runtime type is exactly `Layer` and its name is
/// non-empty. Intended for use from test harnesses, where a failed upload
/// should abort the test with a readable message.
pub fn check_layer(candidate: &dyn Any) {
    let layer = match candidate.downcast_ref::<Layer>() {
        Some(layer) => layer,
        None => panic!("was expecting a layer object, got a value of another type"),
    };

    assert!(
        !layer.name.is_empty(),
        "the layer does not have a valid name: {:?}",
        layer.name
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> Layer {
        Layer {
            name: name.to_string(),
            title: "NIC Administrative Boundaries".to_string(),
            typename: format!("base:{}", name),
        }
    }

    #[test]
    fn check_layer_accepts_named_layer() {
        check_layer(&layer("nic_admin"));
    }

    #[test]
    #[should_panic(expected = "does not have a valid name")]
    fn check_layer_rejects_empty_name() {
        check_layer(&layer(""));
    }

    #[test]
    #[should_panic(expected = "was expecting a layer object")]
    fn check_layer_rejects_other_types() {
        check_layer(&"nic_admin");
    }

    #[test]
    #[should_panic(expected = "was expecting a layer object")]
    fn check_layer_rejects_layer_name_string() {
        let name = String::from("nic_admin");
        check_layer(&name);
    }
}
