use bitflags::bitflags;
use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

bitflags! {
    /// Heuristics that fired while scoring a message.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
    pub struct RiskFactors: u16 {
        const URGENT_LANGUAGE = 1 << 0;
        const EXTERNAL_LINKS = 1 << 1;
        const LOW_SENDER_REPUTATION = 1 << 2;
        const PERSONAL_INFO_REQUEST = 1 << 3;
        const SUSPICIOUS_LINK = 1 << 4;
        const EXECUTABLE_LINK = 1 << 5;
    }
}

/// Stable wire names and human labels, in declaration order.
const NAMES: [(RiskFactors, &str, &str); 6] = [
    (RiskFactors::URGENT_LANGUAGE, "urgent_language", "Urgent language"),
    (RiskFactors::EXTERNAL_LINKS, "external_links", "External links"),
    (RiskFactors::LOW_SENDER_REPUTATION, "low_sender_reputation", "Low sender reputation"),
    (RiskFactors::PERSONAL_INFO_REQUEST, "personal_info_request", "Requests personal information"),
    (RiskFactors::SUSPICIOUS_LINK, "suspicious_link", "Suspicious link"),
    (RiskFactors::EXECUTABLE_LINK, "executable_link", "Link to executable content"),
];

impl RiskFactors {
    /// Snake-case names of every set factor, in a stable order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES.iter().filter(move |(flag, ..)| self.contains(*flag)).map(|(_, name, _)| *name)
    }

    /// Human-readable labels of every set factor, in a stable order.
    pub fn labels(self) -> impl Iterator<Item = &'static str> {
        NAMES.iter().filter(move |(flag, ..)| self.contains(*flag)).map(|(.., label)| *label)
    }

    /// Resolves a single factor from its snake-case wire name.
    ///
    /// `bitflags` already provides `from_name` for the constant names.
    #[must_use]
    pub fn from_wire_name(name: &str) -> Option<Self> {
        NAMES.iter().find(|(_, n, _)| *n == name).map(|(flag, ..)| *flag)
    }
}

impl fmt::Display for RiskFactors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(", ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for RiskFactors {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for name in self.names() {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for RiskFactors {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FactorVisitor;

        impl<'de> Visitor<'de> for FactorVisitor {
            type Value = RiskFactors;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a list of risk factor names")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut factors = RiskFactors::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    let flag = RiskFactors::from_wire_name(&name)
                        .ok_or_else(|| de::Error::custom(format_args!("unknown risk factor `{name}`")))?;
                    factors |= flag;
                }
                Ok(factors)
            }
        }

        deserializer.deserialize_seq(FactorVisitor)
    }
}
