use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Communication technology supported by devices and requested by specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Technology {
    H323,
    Sip,
    AdobeConnect,
    Skype,
    BigBlueButton,
    OpenMeetings,
    /// Marks an alias provider whose aliases work in every technology of its device.
    All,
}

impl Technology {
    pub fn get_name(&self) -> &'static str {
        match self {
            Technology::H323 => "H.323",
            Technology::Sip => "SIP",
            Technology::AdobeConnect => "Adobe Connect",
            Technology::Skype => "Skype",
            Technology::BigBlueButton => "BigBlueButton",
            Technology::OpenMeetings => "OpenMeetings",
            Technology::All => "All",
        }
    }

    /// Computes the technology sets a single room must support to connect endpoint groups
    /// supporting the given technology sets.
    ///
    /// Groups sharing at least one technology are merged into their common technologies
    /// first. Each returned set then picks one technology from every remaining group.
    pub fn interconnect(groups: &[BTreeSet<Technology>]) -> BTreeSet<BTreeSet<Technology>> {
        let mut merged: Vec<BTreeSet<Technology>> = Vec::new();
        for group in groups.iter().filter(|group| !group.is_empty()) {
            merged.push(group.clone());
        }

        let mut changed = true;
        while changed {
            changed = false;
            'outer: for first in 0..merged.len() {
                for second in (first + 1)..merged.len() {
                    let common: BTreeSet<Technology> = merged[first].intersection(&merged[second]).copied().collect();
                    if !common.is_empty() {
                        merged[first] = common;
                        merged.remove(second);
                        changed = true;
                        break 'outer;
                    }
                }
            }
        }

        let mut combinations: BTreeSet<BTreeSet<Technology>> = BTreeSet::new();
        if merged.is_empty() {
            return combinations;
        }

        let mut partial: Vec<BTreeSet<Technology>> = vec![BTreeSet::new()];
        for group in &merged {
            let mut next = Vec::with_capacity(partial.len() * group.len());
            for combination in &partial {
                for technology in group {
                    let mut extended = combination.clone();
                    extended.insert(*technology);
                    next.push(extended);
                }
            }
            partial = next;
        }

        combinations.extend(partial);
        combinations
    }

    pub fn format_set(technologies: &BTreeSet<Technology>) -> String {
        if technologies.is_empty() {
            return "Any".to_string();
        }
        technologies.iter().map(|technology| technology.get_name()).collect::<Vec<_>>().join(", ")
    }

    pub fn format_variants(variants: &BTreeSet<BTreeSet<Technology>>) -> String {
        variants.iter().map(|variant| format!("[{}]", Technology::format_set(variant))).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_name())
    }
}

/// Type of an alias which determines the technology it can be used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AliasType {
    RoomName,
    H323E164,
    H323Uri,
    H323Ip,
    SipUri,
    SipIp,
    AdobeConnectUri,
    SkypeUri,
    WebClientUri,
}

impl AliasType {
    pub fn get_technology(&self) -> Technology {
        match self {
            AliasType::RoomName | AliasType::WebClientUri => Technology::All,
            AliasType::H323E164 | AliasType::H323Uri | AliasType::H323Ip => Technology::H323,
            AliasType::SipUri | AliasType::SipIp => Technology::Sip,
            AliasType::AdobeConnectUri => Technology::AdobeConnect,
            AliasType::SkypeUri => Technology::Skype,
        }
    }
}

/// Concrete alias (e.g. a phone number or URI) by which an endpoint can be dialed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    pub alias_type: AliasType,
    pub technology: Technology,
    pub value: String,
}

impl Alias {
    pub fn new(alias_type: AliasType, value: impl Into<String>) -> Alias {
        Alias { alias_type, technology: alias_type.get_technology(), value: value.into() }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}:{}", self.alias_type, self.value)
    }
}

/// Which side dials when a connection between a room and a terminal is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallInitiation {
    Terminal,
    VirtualRoom,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(technologies: &[Technology]) -> BTreeSet<Technology> {
        technologies.iter().copied().collect()
    }

    #[test]
    fn test_interconnect_merges_overlapping_groups() {
        let variants = Technology::interconnect(&[set(&[Technology::H323, Technology::Sip]), set(&[Technology::H323])]);
        assert_eq!(variants, [set(&[Technology::H323])].into_iter().collect());
    }

    #[test]
    fn test_interconnect_disjoint_groups() {
        let groups = [
            set(&[Technology::H323, Technology::Sip]),
            set(&[Technology::AdobeConnect, Technology::Skype]),
            set(&[Technology::BigBlueButton, Technology::OpenMeetings]),
        ];
        let variants = Technology::interconnect(&groups);
        assert_eq!(variants.len(), 8);
        assert!(variants.contains(&set(&[Technology::H323, Technology::AdobeConnect, Technology::BigBlueButton])));
        assert!(variants.iter().all(|variant| variant.len() == 3));
    }

    #[test]
    fn test_interconnect_without_groups() {
        assert!(Technology::interconnect(&[]).is_empty());
        assert!(Technology::interconnect(&[BTreeSet::new()]).is_empty());
    }

    #[test]
    fn test_alias_technology_follows_type() {
        let alias = Alias::new(AliasType::SipUri, "001@cesnet.cz");
        assert_eq!(alias.technology, Technology::Sip);
    }
}
