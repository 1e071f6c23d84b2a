//! Module configuration loaded from a JSON document.
//!
//! A deployment configures the index through a single JSON object with
//! one section per module name. Sections decode tolerantly: an absent
//! section falls back to the module's defaults and unknown properties are
//! ignored, so hand-edited files keep working across versions.

use crate::{PhtError, PhtResult};

/// Bounds required of a module configuration type.
///
/// Serialization must be tolerant of missing properties (serde defaults
/// on every field) because config files are written by humans.
pub trait ModConfig:
    'static
    + Sized
    + Default
    + std::fmt::Debug
    + serde::Serialize
    + serde::de::DeserializeOwned
    + Send
    + Sync
{
}

/// A configuration document: one JSON object section per module.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Config(serde_json::Map<String, serde_json::Value>);

impl Config {
    /// Parse a configuration document from JSON text.
    pub fn from_json(text: &str) -> PhtResult<Self> {
        serde_json::from_str(text)
            .map_err(|e| PhtError::codec("config document", e))
    }

    /// Render the document as JSON text, for generating an example
    /// configuration file.
    pub fn to_json(&self) -> PhtResult<String> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|e| PhtError::codec("config document", e))
    }

    /// Seed the section `name` with `M`'s default values.
    ///
    /// Refuses to overwrite a section that is already present.
    pub fn set_default<M: ModConfig>(&mut self, name: &str) -> PhtResult<()> {
        if self.0.contains_key(name) {
            return Err(PhtError::other(format!(
                "duplicate module config section: {name}"
            )));
        }
        let section = serde_json::to_value(M::default())
            .map_err(|e| PhtError::codec(name, e))?;
        self.0.insert(name.to_string(), section);
        Ok(())
    }

    /// Decode the section `name`, falling back to `M`'s defaults when
    /// the section is absent.
    pub fn module<M: ModConfig>(&self, name: &str) -> PhtResult<M> {
        match self.0.get(name) {
            None => Ok(M::default()),
            Some(section) => serde_json::from_value(section.clone())
                .map_err(|e| PhtError::codec(name, e)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Debug, Default, serde::Serialize, serde::Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct TestMod {
        #[serde(default)]
        bucket_size: u32,
        #[serde(default)]
        index_name: String,
    }

    impl ModConfig for TestMod {}

    #[test]
    fn defaults_render_and_refuse_overwrite() {
        let mut config = Config::default();
        config.set_default::<TestMod>("testMod").unwrap();

        let text = config.to_json().unwrap();
        assert!(text.contains("\"bucketSize\": 0"));
        assert!(text.contains("\"indexName\": \"\""));

        // a second registration under the same name is refused
        assert!(config.set_default::<TestMod>("testMod").is_err());
    }

    #[test]
    fn sections_decode_tolerantly() {
        let config = Config::from_json(
            r#"{
              "somethingElse": { "foo": "bar" },
              "testMod": { "bucketSize": 42, "unknown": true }
            }"#,
        )
        .unwrap();

        // unknown properties are ignored, missing ones default
        assert_eq!(
            TestMod {
                bucket_size: 42,
                index_name: "".to_string(),
            },
            config.module::<TestMod>("testMod").unwrap(),
        );

        // absent sections fall back to the module defaults
        assert_eq!(
            TestMod::default(),
            config.module::<TestMod>("missing").unwrap(),
        );
    }

    #[test]
    fn malformed_documents_are_codec_errors() {
        assert!(matches!(
            Config::from_json("not json"),
            Err(PhtError::Codec { .. })
        ));
    }
}
