use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account. The email is the login identity.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_destinations: Vec<String>,
    pub travel_interests: Vec<String>,
    pub budget_range: Option<String>,
    pub is_email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn mark_email_verified(&mut self) {
        self.is_email_verified = true;
        self.updated_at = Utc::now();
    }
}

/// Validated input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewUser {
    pub fn into_user(self, id: Uuid) -> User {
        let now = Utc::now();
        User {
            id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: None,
            address: None,
            city: None,
            state: None,
            country: None,
            postal_code: None,
            date_of_birth: None,
            preferred_destinations: Vec::new(),
            travel_interests: Vec::new(),
            budget_range: None,
            is_email_verified: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial profile edit. `None` leaves a field untouched; email is not editable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub preferred_destinations: Option<Vec<String>>,
    pub travel_interests: Option<Vec<String>>,
    pub budget_range: Option<String>,
}

impl ProfileUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(v) = self.first_name { user.first_name = v; }
        if let Some(v) = self.last_name { user.last_name = v; }
        if let Some(v) = self.phone { user.phone = Some(v); }
        if let Some(v) = self.address { user.address = Some(v); }
        if let Some(v) = self.city { user.city = Some(v); }
        if let Some(v) = self.state { user.state = Some(v); }
        if let Some(v) = self.country { user.country = Some(v); }
        if let Some(v) = self.postal_code { user.postal_code = Some(v); }
        if let Some(v) = self.date_of_birth { user.date_of_birth = Some(v); }
        if let Some(v) = self.preferred_destinations { user.preferred_destinations = clean_list(v); }
        if let Some(v) = self.travel_interests { user.travel_interests = clean_list(v); }
        if let Some(v) = self.budget_range { user.budget_range = Some(v); }
        user.updated_at = Utc::now();
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
