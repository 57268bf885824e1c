use chrono::{DateTime, Utc};
use contractor_core::Contractor;
use serde::{Deserialize, Serialize};

const MAX_ID_LEN: usize = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveContractorRequest {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub name_full: Option<String>,
    pub inn: Option<String>,
    pub ogrn: Option<String>,
    pub country_id: String,
    pub industry_id: i32,
    pub org_form_id: i32,
}

impl SaveContractorRequest {
    /// Checks the shape of the request; reference lookups happen in the
    /// service.
    pub fn validate(&self) -> Result<(), String> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err("id is required".to_string());
        }
        if id.chars().count() > MAX_ID_LEN {
            return Err(format!("id must be at most {MAX_ID_LEN} characters"));
        }
        if let Some(parent_id) = self.parent_id.as_deref() {
            if parent_id.chars().count() > MAX_ID_LEN {
                return Err(format!("parent_id must be at most {MAX_ID_LEN} characters"));
            }
            if parent_id == id {
                return Err("contractor cannot be its own parent".to_string());
            }
        }
        if self.name.trim().is_empty() {
            return Err("name must not be blank".to_string());
        }
        if self.country_id.trim().is_empty() {
            return Err("country_id is required".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReferenceName {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractorResponse {
    pub id: String,
    pub parent_id: Option<String>,
    pub name: String,
    pub name_full: Option<String>,
    pub inn: Option<String>,
    pub ogrn: Option<String>,
    pub country: ReferenceName,
    pub industry: ReferenceName,
    pub org_form: ReferenceName,
    pub create_date: DateTime<Utc>,
    pub modify_date: Option<DateTime<Utc>>,
    pub create_user_id: Option<String>,
    pub modify_user_id: Option<String>,
}

impl From<Contractor> for ContractorResponse {
    fn from(contractor: Contractor) -> Self {
        Self {
            id: contractor.id,
            parent_id: contractor.parent_id,
            name: contractor.name,
            name_full: contractor.name_full,
            inn: contractor.inn,
            ogrn: contractor.ogrn,
            country: ReferenceName {
                id: contractor.country_id,
                name: contractor.country,
            },
            industry: ReferenceName {
                id: contractor.industry_id.to_string(),
                name: contractor.industry,
            },
            org_form: ReferenceName {
                id: contractor.org_form_id.to_string(),
                name: contractor.org_form,
            },
            create_date: contractor.create_date,
            modify_date: contractor.modify_date,
            create_user_id: contractor.create_user_id,
            modify_user_id: contractor.modify_user_id,
        }
    }
}
