use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Creation and modification timestamps carried by every stored entity.
/// Serialized as Unix timestamps.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Times {
    /// The date and time it was created.
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,

    /// The date and time it was last modified.
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

/// `time::serde::timestamp` for optional timestamps.
pub mod timestamp_option {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::OffsetDateTime;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(time) => serializer.serialize_some(&time.unix_timestamp()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'a, D: Deserializer<'a>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let timestamp: Option<i64> = Option::deserialize(deserializer)?;

        Ok(timestamp.map(OffsetDateTime::from_unix_timestamp))
    }
}

impl Times {
    pub fn created(now: OffsetDateTime) -> Self {
        Times {
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = now;
    }
}
