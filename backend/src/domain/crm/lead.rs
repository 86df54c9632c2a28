//! Leads submitted through the public intake form.
//!
//! A submission carries only contact details. It becomes a deal in the entry
//! stage, attributed to [`UserId::SYSTEM`](crate::domain::UserId::SYSTEM).

use super::deal::DealDraft;
use super::validation::{self, optional_text, required_text, CrmValidationError, MAX_NAME_LEN};

const DEFAULT_SOURCE: &str = "web";
const DEFAULT_CHANNEL: &str = "web form";

/// Contact details from an anonymous visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublicLead {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: Option<String>,
    pub source: Option<String>,
    /// Where on the source the form lives, e.g. a landing page name.
    pub source_detail: Option<String>,
}

/// A validated lead ready to be opened as a deal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadIntake {
    pub draft: DealDraft,
    /// Title of the activity logged when the deal opens.
    pub opening_note: String,
}

impl PublicLead {
    /// Check the submission and shape it into a draft.
    ///
    /// Fields shared with [`DealDraft`] are validated again when the deal
    /// is created.
    ///
    /// # Examples
    /// ```
    /// use crm_backend::domain::crm::PublicLead;
    ///
    /// let intake = PublicLead {
    ///     first_name: "Marta".to_owned(),
    ///     last_name: "Gómez".to_owned(),
    ///     email: "Marta@Example.co".to_owned(),
    ///     ..PublicLead::default()
    /// }
    /// .into_intake()
    /// .expect("valid lead");
    /// assert_eq!(intake.draft.name, "Marta Gómez");
    /// assert_eq!(intake.draft.source.as_deref(), Some("web"));
    /// ```
    pub fn into_intake(self) -> Result<LeadIntake, CrmValidationError> {
        let first_name = required_text(&self.first_name, "firstName", MAX_NAME_LEN)?;
        let last_name = optional_text(Some(&self.last_name), "lastName", MAX_NAME_LEN)?;
        let email = validation::email(Some(&self.email))?
            .ok_or(CrmValidationError::Empty { field: "email" })?;
        let source = optional_text(self.source.as_deref(), "source", MAX_NAME_LEN)?
            .unwrap_or_else(|| DEFAULT_SOURCE.to_owned());
        let channel = optional_text(self.source_detail.as_deref(), "sourceDetail", MAX_NAME_LEN)?
            .unwrap_or_else(|| DEFAULT_CHANNEL.to_owned());

        let name = match last_name {
            Some(last_name) => format!("{first_name} {last_name}"),
            None => first_name,
        };
        Ok(LeadIntake {
            draft: DealDraft {
                name,
                company: self.company,
                email: Some(email),
                phone: self.phone,
                source: Some(source),
                notes: self.message,
                ..DealDraft::default()
            },
            opening_note: format!("Lead received via {channel}"),
        })
    }
}
