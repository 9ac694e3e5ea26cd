use std::fmt;

/// BMC vendor, discriminated by SNMP enterprise OID per §6, mirroring the
/// teacher's `BMCVendor` sum type and its several construction paths.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub enum BmcVendor {
    Dell,
    Supermicro,
    Hpe,
    Lenovo,
    #[default]
    Unknown,
}

impl fmt::Display for BmcVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{self:?}").to_lowercase();
        write!(f, "{s}")
    }
}

impl BmcVendor {
    /// Matches the leading enterprise-number component of a `sysObjectID.0`
    /// SNMP response (e.g. `.1.3.6.1.4.1.674...` for Dell) against the known
    /// enterprise OIDs from §6, per the REDESIGN FLAG in spec.md §9 ("model
    /// as a sum type; SNMP OID prefix is the discriminator").
    pub fn from_sys_object_id(oid: &str) -> Self {
        let enterprise = oid
            .trim_start_matches('.')
            .split('.')
            .nth(6)
            .unwrap_or_default();
        match enterprise {
            "674" => BmcVendor::Dell,
            "10876" => BmcVendor::Supermicro,
            "232" => BmcVendor::Hpe,
            "19046" => BmcVendor::Lenovo,
            _ => BmcVendor::Unknown,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, BmcVendor::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_dell_enterprise_oid() {
        assert_eq!(
            BmcVendor::from_sys_object_id(".1.3.6.1.4.1.674.10892.5"),
            BmcVendor::Dell
        );
    }

    #[test]
    fn unrecognized_oid_is_unknown() {
        assert_eq!(BmcVendor::from_sys_object_id(".1.3.6.1.4.1.99999.1"), BmcVendor::Unknown);
        assert!(BmcVendor::from_sys_object_id(".1.3.6.1.4.1.99999.1").is_unknown());
    }
}
