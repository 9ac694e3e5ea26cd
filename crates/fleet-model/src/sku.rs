use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Catalog entry describing CPU/RAM/storage of a server model, §3. Matched
/// by exact string equality during validation (§4.5 `check_validated`) — no
/// fuzzy or numeric comparison, by design of the source system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Sku {
    pub name: String,
    pub cpu: String,
    pub ram: String,
    pub storage: String,
}

/// Observed hardware facts reported by the validation agent (§6
/// `validation_script`), compared field-by-field against the [`Sku`]
/// catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedHardware {
    pub cpu: String,
    pub ram: String,
    pub storage: String,
}

impl Sku {
    pub fn matches(&self, observed: &ObservedHardware) -> bool {
        self.cpu == observed.cpu && self.ram == observed.ram && self.storage == observed.storage
    }

    /// Finds the first catalog SKU whose fields exactly match `observed`.
    pub fn find_match<'a>(catalog: &'a [Sku], observed: &ObservedHardware) -> Option<&'a Sku> {
        catalog.iter().find(|sku| sku.matches(observed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Vec<Sku> {
        vec![Sku {
            name: "sku-a".into(),
            cpu: "2x EPYC 7742".into(),
            ram: "512GB".into(),
            storage: "4x 3.84TB NVMe".into(),
        }]
    }

    #[test]
    fn exact_match_is_found() {
        let observed = ObservedHardware {
            cpu: "2x EPYC 7742".into(),
            ram: "512GB".into(),
            storage: "4x 3.84TB NVMe".into(),
        };
        assert_eq!(Sku::find_match(&catalog(), &observed).unwrap().name, "sku-a");
    }

    #[test]
    fn mismatched_ram_is_not_found() {
        let observed = ObservedHardware {
            cpu: "2x EPYC 7742".into(),
            ram: "128GB".into(),
            storage: "4x 3.84TB NVMe".into(),
        };
        assert!(Sku::find_match(&catalog(), &observed).is_none());
    }
}
