use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::ContractorChange;

/// Active contractor joined with its reference attributes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contractor {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub name_full: Option<String>,
    pub inn: Option<String>,
    pub ogrn: Option<String>,
    pub country_id: String,
    pub country: Option<String>,
    pub industry_id: i32,
    pub industry: Option<String>,
    pub org_form_id: i32,
    pub org_form: Option<String>,
    pub create_date: DateTime<Utc>,
    pub modify_date: Option<DateTime<Utc>>,
    pub create_user_id: Option<String>,
    pub modify_user_id: Option<String>,
}

impl Contractor {
    /// Builds the downstream notification for this contractor as of `at`.
    pub fn change(&self, at: DateTime<Utc>) -> ContractorChange {
        ContractorChange {
            id: self.id.clone(),
            name: self.name.clone(),
            inn: self.inn.clone(),
            modify_date_time: at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_carries_identity_fields() {
        let now = Utc::now();
        let contractor = Contractor {
            id: "CTR001".to_string(),
            parent_id: None,
            name: "Acme".to_string(),
            name_full: Some("Acme Holdings".to_string()),
            inn: Some("7702165310".to_string()),
            ogrn: None,
            country_id: "RUS".to_string(),
            country: Some("Russia".to_string()),
            industry_id: 8,
            industry: Some("Finance".to_string()),
            org_form_id: 56,
            org_form: None,
            create_date: now,
            modify_date: None,
            create_user_id: Some("user-1".to_string()),
            modify_user_id: None,
        };

        let change = contractor.change(now);
        assert_eq!(change.id, "CTR001");
        assert_eq!(change.name, "Acme");
        assert_eq!(change.inn.as_deref(), Some("7702165310"));
        assert_eq!(change.modify_date_time, now);
    }
}
