use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{config_error, MissionError, Result};
use crate::orbital::{
    AnalyticalPropagator, Constellation, NumericalPropagator, Propagator, TrainConstellation,
    WalkerDeltaConstellation,
};

pub const TYPE_KEY: &str = "@type";

pub const J2_ANALYTICAL: &str = "J2 ANALYTICAL PROPAGATOR";
pub const TWO_BODY: &str = "TWO BODY PROPAGATOR";
pub const NUMERICAL: &str = "NUMERICAL PROPAGATOR";
pub const WALKER_DELTA: &str = "WALKERDELTACONSTELLATION";
pub const TRAIN: &str = "TRAINCONSTELLATION";

pub type Constructor<T> = fn(&Value) -> Result<T>;

/// Type tag -> constructor map for one kind of configurable object.
///
/// Tags are matched case-insensitively. Registering an existing tag replaces
/// its constructor.
pub struct Factory<T> {
    kind: &'static str,
    constructors: HashMap<String, Constructor<T>>,
}

impl<T> Factory<T> {
    pub fn new(kind: &'static str) -> Self {
        Factory { kind, constructors: HashMap::new() }
    }

    pub fn register(
        &mut self,
        tag: &str,
        constructor: Constructor<T>,
    ) -> Option<Constructor<T>> {
        self.constructors.insert(normalize(tag), constructor)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(&normalize(tag))
    }

    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build from a tagged specification, `{"@type": "...", ...}`.
    pub fn build(&self, spec: &Value) -> Result<T> {
        let tag = spec.get(TYPE_KEY).and_then(Value::as_str).ok_or_else(|| {
            config_error!("{} specification has no '{}' string", self.kind, TYPE_KEY)
        })?;
        let constructor = self.constructors.get(&normalize(tag)).ok_or_else(|| {
            MissionError::UnknownType {
                kind: self.kind,
                tag: tag.to_string(),
            }
        })?;
        constructor(spec)
    }
}

fn normalize(tag: &str) -> String {
    tag.trim().to_uppercase()
}

/// Deserialize the fields of a tagged specification, config error on mismatch.
pub fn from_spec<T: DeserializeOwned>(kind: &str, spec: &Value) -> Result<T> {
    serde_json::from_value(spec.clone())
        .map_err(|e| config_error!("invalid {} specification: {}", kind, e))
}

// ---------------------------------------------------------------------------
// Built-in registries
// ---------------------------------------------------------------------------

pub fn propagator_factory() -> Factory<Box<dyn Propagator>> {
    let mut f: Factory<Box<dyn Propagator>> = Factory::new("propagator");
    f.register(J2_ANALYTICAL, |_| Ok(Box::new(AnalyticalPropagator::j2())));
    f.register(TWO_BODY, |_| Ok(Box::new(AnalyticalPropagator::two_body())));
    f.register(NUMERICAL, |spec| {
        let prop: NumericalPropagator = from_spec("numerical propagator", spec)?;
        if !(prop.max_step > 0.0) {
            return Err(config_error!(
                "numerical propagator maxStep must be positive, got {}",
                prop.max_step
            ));
        }
        Ok(Box::new(prop))
    });
    f
}

pub fn constellation_factory() -> Factory<Box<dyn Constellation>> {
    let mut f: Factory<Box<dyn Constellation>> = Factory::new("constellation");
    f.register(WALKER_DELTA, |spec| {
        let c: WalkerDeltaConstellation = from_spec("Walker-Delta constellation", spec)?;
        Ok(Box::new(c))
    });
    f.register(TRAIN, |spec| {
        let c: TrainConstellation = from_spec("train constellation", spec)?;
        Ok(Box::new(c))
    });
    f
}

/// The registries a mission run builds its engines from.
pub struct Factories {
    pub propagators: Factory<Box<dyn Propagator>>,
    pub constellations: Factory<Box<dyn Constellation>>,
}

impl Default for Factories {
    fn default() -> Self {
        Factories {
            propagators: propagator_factory(),
            constellations: constellation_factory(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_propagators() {
        let f = propagator_factory();
        assert_eq!(f.tags(), vec![J2_ANALYTICAL, NUMERICAL, TWO_BODY]);
        let j2 = f.build(&json!({ "@type": "J2 Analytical Propagator" })).unwrap();
        assert_eq!(j2.name(), "J2 analytical");
        let two_body = f.build(&json!({ "@type": "two body propagator" })).unwrap();
        assert_eq!(two_body.name(), "two-body");
    }

    #[test]
    fn numerical_defaults_and_overrides() {
        let f = propagator_factory();
        assert!(f.build(&json!({ "@type": NUMERICAL })).is_ok());
        assert!(f.build(&json!({ "@type": NUMERICAL, "maxStep": 5, "j2": false })).is_ok());
        assert!(f.build(&json!({ "@type": NUMERICAL, "maxStep": 0 })).is_err());
    }

    #[test]
    fn unknown_or_missing_tag() {
        let f = constellation_factory();
        match f.build(&json!({ "@type": "FLOWER" })) {
            Err(MissionError::UnknownType { kind, tag }) => {
                assert_eq!(kind, "constellation");
                assert_eq!(tag, "FLOWER");
            }
            other => panic!("unexpected {:?}", other.map(|c| c.id().to_string())),
        }
        assert!(matches!(f.build(&json!({ "numberSatellites": 4 })), Err(MissionError::Config(_))));
    }

    #[test]
    fn walker_from_tagged_spec() {
        let spec = json!({
            "@type": "WalkerDeltaConstellation",
            "@id": "abc",
            "numberSatellites": 6, "numberPlanes": 3, "relativeSpacing": 2,
            "alt": 700, "ecc": 0.001, "inc": 98, "aop": 10
        });
        let c = constellation_factory().build(&spec).unwrap();
        assert_eq!(c.id(), "abc");
        assert_eq!(c.generate().unwrap().len(), 6);
    }

    #[test]
    fn registration_extends_and_replaces() {
        let mut f = propagator_factory();
        assert!(!f.contains("frozen"));
        assert!(f.register("frozen", |_| Ok(Box::new(AnalyticalPropagator::two_body()))).is_none());
        assert!(f.contains("FROZEN"));
        assert!(f.register(TWO_BODY, |_| Ok(Box::new(NumericalPropagator::default()))).is_some());
        assert_eq!(f.build(&json!({ "@type": TWO_BODY })).unwrap().name(), "numerical RK4");
    }
}
