use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// Quality label attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    Abandon,
    Best,
    Blunder,
    Book,
    Brilliant,
    Checkmated,
    Draw,
    Excellent,
    Forced,
    Good,
    Great,
    Inaccuracy,
    Interesting,
    Megablunder,
    Miss,
    Mistake,
    Resign,
    Timeout,
    Winner,
}

/// Which tint of a side-colored badge to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BadgeVariant {
    White,
    Black,
}

impl BadgeVariant {
    pub fn for_side(side: Side) -> Self {
        match side {
            Side::Right => BadgeVariant::White,
            Side::Left => BadgeVariant::Black,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BadgeVariant::White => "white",
            BadgeVariant::Black => "black",
        }
    }
}

impl Classification {
    pub const ALL: [Classification; 19] = [
        Classification::Abandon,
        Classification::Best,
        Classification::Blunder,
        Classification::Book,
        Classification::Brilliant,
        Classification::Checkmated,
        Classification::Draw,
        Classification::Excellent,
        Classification::Forced,
        Classification::Good,
        Classification::Great,
        Classification::Inaccuracy,
        Classification::Interesting,
        Classification::Megablunder,
        Classification::Miss,
        Classification::Mistake,
        Classification::Resign,
        Classification::Timeout,
        Classification::Winner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Classification::Abandon => "abandon",
            Classification::Best => "best",
            Classification::Blunder => "blunder",
            Classification::Book => "book",
            Classification::Brilliant => "brilliant",
            Classification::Checkmated => "checkmated",
            Classification::Draw => "draw",
            Classification::Excellent => "excellent",
            Classification::Forced => "forced",
            Classification::Good => "good",
            Classification::Great => "great",
            Classification::Inaccuracy => "inaccuracy",
            Classification::Interesting => "interesting",
            Classification::Megablunder => "megablunder",
            Classification::Miss => "miss",
            Classification::Mistake => "mistake",
            Classification::Resign => "resign",
            Classification::Timeout => "timeout",
            Classification::Winner => "winner",
        }
    }

    /// Game-ending labels. These are also the ones whose badge comes in a
    /// white and a black tint.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Classification::Abandon
                | Classification::Checkmated
                | Classification::Draw
                | Classification::Resign
                | Classification::Timeout
                | Classification::Winner
        )
    }

    pub fn is_side_colored(self) -> bool {
        self.is_terminal()
    }

    /// Relative path of the badge icon inside an asset directory.
    pub fn icon_path(self, variant: BadgeVariant) -> String {
        if self.is_side_colored() {
            format!("{}_{}.png", self.as_str(), variant.as_str())
        } else {
            format!("{}.png", self.as_str())
        }
    }

    /// Human label used in tallies: "Megablunder", "Inaccuracy", ...
    pub fn label(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
            None => String::new(),
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownClassification(pub String);

impl fmt::Display for UnknownClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown classification {:?}", self.0)
    }
}

impl std::error::Error for UnknownClassification {}

impl FromStr for Classification {
    type Err = UnknownClassification;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Classification::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| UnknownClassification(s.to_string()))
    }
}

impl Serialize for Classification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Classification {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One chat message. Order within a conversation matters: it drives the
/// vertical flow and same-side spacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub side: Side,
    pub content: String,
    #[serde(default)]
    pub classification: Option<Classification>,
    #[serde(default)]
    pub unsent: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "avatar_ref", alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

impl Message {
    pub fn new(side: Side, content: impl Into<String>) -> Self {
        Self {
            side,
            content: content.into(),
            classification: None,
            unsent: false,
            username: None,
            avatar_url: None,
        }
    }

    pub fn classified(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn unsent(mut self) -> Self {
        self.unsent = true;
        self
    }

    pub fn by(mut self, username: impl Into<String>, avatar_url: Option<&str>) -> Self {
        self.username = Some(username.into());
        self.avatar_url = avatar_url.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SideColorData {
    pub bubble_hex: String,
    pub text_hex: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorData {
    #[serde(default)]
    pub left: Option<SideColorData>,
    #[serde(default)]
    pub right: Option<SideColorData>,
    #[serde(default)]
    pub background_hex: Option<String>,
}

/// Estimated rating per side, shown in the summary table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EloData {
    #[serde(default)]
    pub left: Option<u32>,
    #[serde(default)]
    pub right: Option<u32>,
}

/// Conversation document as emitted by the upstream message producer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub color: Option<ColorData>,
    #[serde(default)]
    pub elo: Option<EloData>,
}
