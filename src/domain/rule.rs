use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Marketplace and ticketing integrations verified outside this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Marketplace {
    Venmo,
    Ticketmaster,
    Axs,
    Shopify,
    Stubhub,
    Vivid,
    Seatgeek,
}

impl Marketplace {
    pub const ALL: [Marketplace; 7] = [
        Marketplace::Venmo,
        Marketplace::Ticketmaster,
        Marketplace::Axs,
        Marketplace::Shopify,
        Marketplace::Stubhub,
        Marketplace::Vivid,
        Marketplace::Seatgeek,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Marketplace::Venmo => "venmo",
            Marketplace::Ticketmaster => "ticketmaster",
            Marketplace::Axs => "axs",
            Marketplace::Shopify => "shopify",
            Marketplace::Stubhub => "stubhub",
            Marketplace::Vivid => "vivid",
            Marketplace::Seatgeek => "seatgeek",
        }
    }
}

/// Rule kind tag as sent by clients.
///
/// Parsing never fails: unrecognized tags become [`RuleKind::Unknown`] and
/// keep their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Follow,
    Followers,
    Friends,
    Post,
    Reply,
    Verified,
    Validator,
    Expiration,
    CreatedBefore,
    Payment,
    Choice,
    Custom,
    Marketplace(Marketplace),
    Unknown(String),
}

impl RuleKind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            RuleKind::Follow => "follow",
            RuleKind::Followers => "followers",
            RuleKind::Friends => "friends",
            RuleKind::Post => "post",
            RuleKind::Reply => "reply",
            RuleKind::Verified => "validated",
            RuleKind::Validator => "validator",
            RuleKind::Expiration => "expiration",
            RuleKind::CreatedBefore => "createdBeforeOn",
            RuleKind::Payment => "payment",
            RuleKind::Choice => "choice",
            RuleKind::Custom => "custom",
            RuleKind::Marketplace(m) => m.as_str(),
            RuleKind::Unknown(tag) => tag,
        }
    }

    /// Attestation short code, or `None` when the caller's message is used verbatim.
    pub fn short_code(&self) -> Option<&'static str> {
        match self {
            RuleKind::Follow | RuleKind::Followers | RuleKind::Friends => Some("fol"),
            RuleKind::Post | RuleKind::Reply => Some("xpost"),
            RuleKind::Verified => Some("xv"),
            RuleKind::Validator => Some("val"),
            RuleKind::Expiration => Some("exp"),
            RuleKind::CreatedBefore => Some("xb4"),
            RuleKind::Payment => Some("pay"),
            RuleKind::Choice => Some("choice"),
            RuleKind::Custom => Some("c"),
            RuleKind::Marketplace(Marketplace::Axs) => None,
            RuleKind::Marketplace(_) => Some("tix"),
            RuleKind::Unknown(_) => None,
        }
    }
}

impl FromStr for RuleKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "follow" => RuleKind::Follow,
            "followers" => RuleKind::Followers,
            "friends" => RuleKind::Friends,
            "post" => RuleKind::Post,
            "reply" => RuleKind::Reply,
            "validated" => RuleKind::Verified,
            "validator" => RuleKind::Validator,
            "expiration" => RuleKind::Expiration,
            "createdBeforeOn" => RuleKind::CreatedBefore,
            "payment" => RuleKind::Payment,
            "choice" => RuleKind::Choice,
            "custom" => RuleKind::Custom,
            other => Marketplace::ALL
                .iter()
                .find(|m| m.as_str() == other)
                .map(|m| RuleKind::Marketplace(*m))
                .unwrap_or_else(|| RuleKind::Unknown(other.to_string())),
        };
        Ok(kind)
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for RuleKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RuleKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        match tag.parse::<RuleKind>() {
            Ok(kind) => Ok(kind),
            Err(never) => match never {},
        }
    }
}

/// Number that may arrive as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Numeric(pub f64);

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Numeric(n)),
            Raw::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Numeric)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Loose rule parameters as supplied on the wire.
///
/// Which field matters depends on the kind; [`Rule::new`] picks it out.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleValue {
    #[serde(default)]
    pub count: Option<Numeric>,

    #[serde(default)]
    pub time: Option<Numeric>,

    #[serde(default)]
    pub message: Option<String>,
}

/// A rule with its kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Account must have been created at or before `time`.
    CreatedBefore { time: Option<f64> },
    Followers { count: Option<f64> },
    Friends { count: Option<f64> },
    Verified,
    Post { message: Option<String> },
    Reply { message: Option<String> },
    Choice { message: Option<String> },
    /// Enforced elsewhere (on-chain programs or external integrations).
    Deferred(RuleKind),
    Unsupported(String),
}

impl Rule {
    /// Build a typed rule from a kind tag and its wire parameters.
    pub fn new(kind: RuleKind, value: RuleValue) -> Self {
        match kind {
            RuleKind::CreatedBefore => Rule::CreatedBefore {
                time: value.time.map(|n| n.0),
            },
            RuleKind::Followers => Rule::Followers {
                count: value.count.map(|n| n.0),
            },
            RuleKind::Friends => Rule::Friends {
                count: value.count.map(|n| n.0),
            },
            RuleKind::Verified => Rule::Verified,
            RuleKind::Post => Rule::Post {
                message: value.message,
            },
            RuleKind::Reply => Rule::Reply {
                message: value.message,
            },
            RuleKind::Choice => Rule::Choice {
                message: value.message,
            },
            RuleKind::Follow
            | RuleKind::Expiration
            | RuleKind::Custom
            | RuleKind::Validator
            | RuleKind::Payment
            | RuleKind::Marketplace(_) => Rule::Deferred(kind),
            RuleKind::Unknown(tag) => Rule::Unsupported(tag),
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::CreatedBefore { .. } => RuleKind::CreatedBefore,
            Rule::Followers { .. } => RuleKind::Followers,
            Rule::Friends { .. } => RuleKind::Friends,
            Rule::Verified => RuleKind::Verified,
            Rule::Post { .. } => RuleKind::Post,
            Rule::Reply { .. } => RuleKind::Reply,
            Rule::Choice { .. } => RuleKind::Choice,
            Rule::Deferred(kind) => kind.clone(),
            Rule::Unsupported(tag) => RuleKind::Unknown(tag.clone()),
        }
    }
}
