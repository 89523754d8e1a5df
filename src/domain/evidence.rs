use chrono::DateTime;
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Verified flag as reported by the social platform.
///
/// Some clients send a boolean, others the string form; rules compare the
/// stringified value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flag {
    Bool(bool),
    Text(String),
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Bool(b) => write!(f, "{}", b),
            Flag::Text(s) => f.write_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Number(serde_json::Number),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Flag::Bool(b),
            Raw::Number(n) => Flag::Text(n.to_string()),
            Raw::Text(s) => Flag::Text(s),
        })
    }
}

/// Facts about the subject under evaluation, supplied by the caller.
///
/// Field names follow the compact keys the client sends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserEvidence {
    /// Text of the post being checked
    #[serde(default, rename = "post", alias = "postText")]
    pub post: Option<String>,

    /// Follower count
    #[serde(default, rename = "fol", alias = "followerCount", deserialize_with = "de_number")]
    pub followers: Option<f64>,

    /// Following count
    #[serde(default, rename = "friend", deserialize_with = "de_number")]
    pub friends: Option<f64>,

    /// Verified flag
    #[serde(default, rename = "v")]
    pub verified: Option<Flag>,

    /// Account creation time in unix seconds
    #[serde(default, rename = "c", deserialize_with = "de_created_at")]
    pub created_at: Option<f64>,
}

impl UserEvidence {
    pub fn with_post(post: impl Into<String>) -> Self {
        UserEvidence {
            post: Some(post.into()),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
}

/// Numeric coercion of a scalar: blank text is zero, unparsable text is NaN
/// and so fails every comparison.
fn coerce(value: Scalar) -> f64 {
    match value {
        Scalar::Number(n) => n,
        Scalar::Bool(b) => f64::from(u8::from(b)),
        Scalar::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
    }
}

fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(coerce))
}

/// Accepts epoch seconds (number or numeric string) or an RFC 3339 timestamp.
fn de_created_at<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|value| match value {
        Scalar::Text(s) => match DateTime::parse_from_rfc3339(s.trim()) {
            Ok(dt) => dt.timestamp() as f64,
            Err(_) => coerce(Scalar::Text(s)),
        },
        other => coerce(other),
    }))
}
