//! Matching a lead to an existing client.

use chrono::{DateTime, Utc};
use quote_core::{Client, Lead};

/// First client whose name matches the lead's contact name, or whose email
/// matches the lead's email. Comparison ignores case.
pub fn find_matching_client<'a>(lead: &Lead, clients: &'a [Client]) -> Option<&'a Client> {
    let name = lead.potential_client_name.trim().to_lowercase();
    let email = lead
        .contact_email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty());
    clients.iter().find(|c| {
        c.name.trim().to_lowercase() == name
            || match &email {
                Some(email) => !c.email.is_empty() && c.email.trim().to_lowercase() == *email,
                None => false,
            }
    })
}

/// New client built from the lead's contact fields.
pub fn client_from_lead(lead: &Lead, id: String, now: DateTime<Utc>) -> Client {
    Client {
        id,
        name: lead.potential_client_name.clone(),
        email: lead.contact_email.clone().unwrap_or_default(),
        phone: lead.contact_phone.clone().unwrap_or_default(),
        tax_id: String::new(),
        address: String::new(),
        notes: None,
        created_at: now,
        updated_at: now,
    }
}
