//! Storage credentials (explicit override or ambient environment)

use std::collections::BTreeMap;
use std::fmt;

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactError;

/// Credentials and destination for an S3-compatible bucket.
///
/// All fields are required together. `s3_prefix` may be empty, meaning
/// objects land at the bucket root.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Credentials {
    endpoint_url: String,
    bucket_name: String,
    s3_prefix: String,
    access_key_id: String,
    secret_access_key: String,
    region: String,
}

/// Environment shape read by [`S3Credentials::from_env`] (`AWS_` prefix stripped).
///
/// Scalars of any type are accepted, so a bucket named `2024` still loads.
#[derive(Debug, Default, Deserialize)]
struct AmbientS3 {
    #[serde(default, deserialize_with = "scalar_string")]
    s3_endpoint: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    s3_bucket: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    s3_prefix: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    access_key_id: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    secret_access_key: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    default_region: Option<String>,
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    struct Scalar;

    impl<'de> Visitor<'de> for Scalar {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_char<E: de::Error>(self, v: char) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<Self::Value, D2::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(Scalar)
}

impl S3Credentials {
    /// Create a credential set from explicit values.
    #[must_use]
    pub fn new(
        endpoint_url: impl Into<String>,
        bucket_name: impl Into<String>,
        s3_prefix: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            bucket_name: bucket_name.into(),
            s3_prefix: s3_prefix.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
        }
    }

    /// Read ambient credentials from `AWS_S3_ENDPOINT`, `AWS_S3_BUCKET`,
    /// `AWS_S3_PREFIX`, `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// `AWS_DEFAULT_REGION`.
    ///
    /// Returns `Ok(None)` when none of them are set. Values are taken
    /// verbatim: `AWS_ACCESS_KEY_ID=0042` stays `"0042"`.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::IncompleteCredentials`] when only some are set.
    pub fn from_env() -> Result<Option<Self>, ArtifactError> {
        let raw: BTreeMap<String, String> = Env::prefixed("AWS_")
            .iter()
            .map(|(key, value)| (key.as_str().to_string(), value))
            .collect();
        Self::from_figment(&Figment::from(Serialized::defaults(raw)))
    }

    /// Same as [`from_env`](Self::from_env) but over an arbitrary figment,
    /// with keys named as in the environment minus the `AWS_` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::IncompleteCredentials`] for partial sets and
    /// [`ArtifactError::InvalidCredentials`] when the figment cannot be read.
    pub fn from_figment(figment: &Figment) -> Result<Option<Self>, ArtifactError> {
        let ambient: AmbientS3 = figment
            .extract()
            .map_err(|e| ArtifactError::InvalidCredentials(e.to_string()))?;

        let required = [
            ("AWS_S3_ENDPOINT", &ambient.s3_endpoint),
            ("AWS_S3_BUCKET", &ambient.s3_bucket),
            ("AWS_ACCESS_KEY_ID", &ambient.access_key_id),
            ("AWS_SECRET_ACCESS_KEY", &ambient.secret_access_key),
            ("AWS_DEFAULT_REGION", &ambient.default_region),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
            .map(|(name, _)| *name)
            .collect();

        if missing.len() == required.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(ArtifactError::IncompleteCredentials { missing });
        }

        Ok(Some(Self {
            endpoint_url: ambient.s3_endpoint.unwrap_or_default(),
            bucket_name: ambient.s3_bucket.unwrap_or_default(),
            s3_prefix: ambient.s3_prefix.unwrap_or_default(),
            access_key_id: ambient.access_key_id.unwrap_or_default(),
            secret_access_key: ambient.secret_access_key.unwrap_or_default(),
            region: ambient.default_region.unwrap_or_default(),
        }))
    }

    /// Check that every required field is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError::IncompleteCredentials`] naming the empty fields.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let fields = [
            ("endpoint_url", &self.endpoint_url),
            ("bucket_name", &self.bucket_name),
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("region", &self.region),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ArtifactError::IncompleteCredentials { missing })
        }
    }

    /// Storage endpoint (e.g. `http://minio:9000`).
    #[must_use]
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Target bucket.
    #[must_use]
    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Key prefix inside the bucket, without surrounding slashes.
    #[must_use]
    pub fn s3_prefix(&self) -> &str {
        self.s3_prefix.trim_matches('/')
    }

    /// Access key id.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Secret access key.
    #[must_use]
    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Bucket region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Join the prefix and a derived key into a full object key.
    #[must_use]
    pub fn object_key(&self, derived: &str) -> String {
        let derived = derived.trim_start_matches('/');
        if self.s3_prefix().is_empty() {
            derived.to_string()
        } else {
            format!("{}/{derived}", self.s3_prefix())
        }
    }
}

// Secrets stay out of logs and panic messages.
impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("endpoint_url", &self.endpoint_url)
            .field("bucket_name", &self.bucket_name)
            .field("s3_prefix", &self.s3_prefix)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("region", &self.region)
            .finish()
    }
}
