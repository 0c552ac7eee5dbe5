use crate::error::EngineError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// The 12 standard ECG leads.
///
/// Frontal leads view the heart through a fixed hexaxial angle; precordial
/// leads use empirical amplitude tables instead (see [`crate::projection`]).
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Lead {
    DI,
    DII,
    DIII,
    #[serde(rename = "aVR")]
    AVR,
    #[serde(rename = "aVL")]
    AVL,
    #[serde(rename = "aVF")]
    AVF,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

/// Anatomical grouping of the chest leads used by the morphology tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecordialGroup {
    /// V1-V2
    Septal,
    /// V3-V4
    Transition,
    /// V5-V6
    Lateral,
}

impl Lead {
    pub const COUNT: usize = 12;

    pub const ALL: [Lead; Lead::COUNT] = [
        Lead::DI,
        Lead::DII,
        Lead::DIII,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
        Lead::V1,
        Lead::V2,
        Lead::V3,
        Lead::V4,
        Lead::V5,
        Lead::V6,
    ];

    pub const FRONTAL: [Lead; 6] = [
        Lead::DI,
        Lead::DII,
        Lead::DIII,
        Lead::AVR,
        Lead::AVL,
        Lead::AVF,
    ];

    pub const PRECORDIAL: [Lead; 6] = [Lead::V1, Lead::V2, Lead::V3, Lead::V4, Lead::V5, Lead::V6];

    /// Position of the lead in [`Lead::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Lead::DI => "DI",
            Lead::DII => "DII",
            Lead::DIII => "DIII",
            Lead::AVR => "aVR",
            Lead::AVL => "aVL",
            Lead::AVF => "aVF",
            Lead::V1 => "V1",
            Lead::V2 => "V2",
            Lead::V3 => "V3",
            Lead::V4 => "V4",
            Lead::V5 => "V5",
            Lead::V6 => "V6",
        }
    }

    /// Hexaxial axis angle in degrees, `None` for chest leads.
    pub fn axis(self) -> Option<f64> {
        match self {
            Lead::DI => Some(0.0),
            Lead::DII => Some(60.0),
            Lead::DIII => Some(120.0),
            Lead::AVR => Some(-150.0),
            Lead::AVL => Some(-30.0),
            Lead::AVF => Some(90.0),
            _ => None,
        }
    }

    pub fn is_precordial(self) -> bool {
        self.axis().is_none()
    }

    /// Zero-based chest position (V1 = 0), `None` for frontal leads.
    pub fn precordial_index(self) -> Option<usize> {
        self.index().checked_sub(Lead::FRONTAL.len())
    }

    pub fn precordial_group(self) -> Option<PrecordialGroup> {
        match self {
            Lead::V1 | Lead::V2 => Some(PrecordialGroup::Septal),
            Lead::V3 | Lead::V4 => Some(PrecordialGroup::Transition),
            Lead::V5 | Lead::V6 => Some(PrecordialGroup::Lateral),
            _ => None,
        }
    }
}

impl fmt::Display for Lead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Lead {
    type Err = EngineError;

    /// Accepts the canonical names case-insensitively, plus the Einthoven
    /// shorthand `I`, `II` and `III`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        let alias = match wanted.to_ascii_uppercase().as_str() {
            "I" => Some(Lead::DI),
            "II" => Some(Lead::DII),
            "III" => Some(Lead::DIII),
            _ => None,
        };
        alias
            .or_else(|| {
                Lead::ALL
                    .into_iter()
                    .find(|lead| lead.name().eq_ignore_ascii_case(wanted))
            })
            .ok_or_else(|| EngineError::UnknownLead(s.to_string()))
    }
}

/// Fixed-size per-lead storage indexed by [`Lead`].
#[derive(Debug, Clone, PartialEq)]
pub struct LeadMap<T> {
    slots: [T; Lead::COUNT],
}

impl<T: Default> Default for LeadMap<T> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| T::default()),
        }
    }
}

impl<T> LeadMap<T> {
    pub fn from_fn(mut f: impl FnMut(Lead) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|i| f(Lead::ALL[i])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Lead, &T)> {
        Lead::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Lead, &mut T)> {
        Lead::ALL.into_iter().zip(self.slots.iter_mut())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter()
    }
}

impl<T> Index<Lead> for LeadMap<T> {
    type Output = T;

    fn index(&self, lead: Lead) -> &T {
        &self.slots[lead.index()]
    }
}

impl<T> IndexMut<Lead> for LeadMap<T> {
    fn index_mut(&mut self, lead: Lead) -> &mut T {
        &mut self.slots[lead.index()]
    }
}

/// Serialises as an object keyed by lead name (`{"DI": .., "aVR": ..}`).
impl<T: Serialize> Serialize for LeadMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Lead::COUNT))?;
        for (lead, value) in self.iter() {
            map.serialize_entry(lead.name(), value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_indexed_in_declaration_order() {
        for (i, lead) in Lead::ALL.into_iter().enumerate() {
            assert_eq!(lead.index(), i);
        }
        assert_eq!(Lead::V1.precordial_index(), Some(0));
        assert_eq!(Lead::AVF.precordial_index(), None);
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("avr".parse::<Lead>().unwrap(), Lead::AVR);
        assert_eq!("II".parse::<Lead>().unwrap(), Lead::DII);
        assert_eq!("v6".parse::<Lead>().unwrap(), Lead::V6);
        assert_eq!(
            "V7".parse::<Lead>(),
            Err(EngineError::UnknownLead("V7".into()))
        );
    }

    #[test]
    fn lead_map_serialises_by_name() {
        let map = LeadMap::from_fn(|lead| lead.index());
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["aVL"], 4);
        assert_eq!(json["V6"], 11);
        assert_eq!(json.as_object().unwrap().len(), 12);
    }
}
