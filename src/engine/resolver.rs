//! Meeting → contract resolution.
//!
//! Resolution is a strict table lookup. There is no fallback by proximity or
//! date arithmetic: a meeting missing from the table fails the run.

use std::collections::BTreeMap;

use crate::domain::{ContractId, InstitutionConfig, MeetingId};
use crate::error::EngineError;

/// Looks up the contract that feeds each meeting of one institution.
#[derive(Debug, Clone, Copy)]
pub struct ContractResolver<'a> {
    institution: &'a str,
    mapping: &'a BTreeMap<MeetingId, ContractId>,
}

impl<'a> ContractResolver<'a> {
    pub fn new(institution: &'a str, mapping: &'a BTreeMap<MeetingId, ContractId>) -> Self {
        Self { institution, mapping }
    }

    pub fn for_config(config: &'a InstitutionConfig) -> Self {
        Self::new(config.id(), &config.contract_mapping)
    }

    pub fn resolve(&self, meeting: &MeetingId) -> Result<&'a ContractId, EngineError> {
        self.mapping
            .get(meeting)
            .ok_or_else(|| EngineError::MappingMissing {
                institution: self.institution.to_string(),
                meeting: meeting.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> BTreeMap<MeetingId, ContractId> {
        BTreeMap::from([
            (MeetingId::from("2026-10-28"), ContractId::from("ZQX26")),
            (MeetingId::from("2027-01-27"), ContractId::from("ZQG27")),
        ])
    }

    #[test]
    fn resolves_mapped_meeting() {
        let table = mapping();
        let resolver = ContractResolver::new("FED", &table);
        let contract = resolver.resolve(&MeetingId::from("2026-10-28")).unwrap();
        assert_eq!(contract.as_str(), "ZQX26");
        // Idempotent.
        assert_eq!(resolver.resolve(&MeetingId::from("2026-10-28")).unwrap(), contract);
    }

    #[test]
    fn unmapped_meeting_between_mapped_ones_is_not_guessed() {
        let table = mapping();
        let resolver = ContractResolver::new("FED", &table);
        let err = resolver.resolve(&MeetingId::from("2026-12-09")).unwrap_err();
        assert_eq!(
            err,
            EngineError::MappingMissing {
                institution: "FED".to_string(),
                meeting: MeetingId::from("2026-12-09"),
            }
        );
    }
}
