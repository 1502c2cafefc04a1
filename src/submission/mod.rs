//! Submission assembly - the final gate before the listing is sent.
//!
//! Aggregates the scalar form fields with the queue's completed image URLs
//! into one payload. Submission is refused while any upload is pending and
//! requires at least one completed image; both refusals carry the field they
//! concern so the form can surface them in place.

use crate::queue::entry::EntrySnapshot;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    New,
    LikeNew,
    Used,
    ForParts,
}

impl FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "like-new" => Ok(Condition::LikeNew),
            "used" => Ok(Condition::Used),
            "for-parts" => Ok(Condition::ForParts),
            other => Err(format!("unknown condition: {other:?}")),
        }
    }
}

/// Flat scalar record accumulated across the wizard steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingForm {
    pub title: String,
    pub category: String,
    pub condition: Condition,
    pub price: u64,
    pub negotiable: bool,
    pub description: String,
    pub city: String,
    pub contact_phone: String,
}

/// The single batched write handed to the submission target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPayload {
    #[serde(flatten)]
    pub form: ListingForm,
    /// First completed image in submission order.
    pub cover_url: String,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("uploads are still in progress; wait for them to finish")]
    UploadsPending,
    #[error("{field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl SubmitError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        SubmitError::Invalid {
            field,
            message: message.into(),
        }
    }

    /// The form field a validation refusal is associated with, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            SubmitError::Invalid { field, .. } => Some(field),
            SubmitError::UploadsPending => None,
        }
    }
}

/// Assemble the final payload from the form and a queue snapshot.
///
/// URLs are taken from Complete entries in original insertion order; the
/// first one becomes the cover image.
pub fn assemble_payload(
    form: &ListingForm,
    entries: &[EntrySnapshot],
) -> Result<ListingPayload, SubmitError> {
    if entries.iter().any(|entry| entry.state.is_pending()) {
        return Err(SubmitError::UploadsPending);
    }

    validate_form(form)?;

    let image_urls: Vec<String> = entries
        .iter()
        .filter_map(|entry| entry.state.url().map(str::to_string))
        .collect();
    let cover_url = image_urls
        .first()
        .cloned()
        .ok_or_else(|| SubmitError::invalid("images", "add at least one image before submitting"))?;

    Ok(ListingPayload {
        form: form.clone(),
        cover_url,
        image_urls,
    })
}

fn validate_form(form: &ListingForm) -> Result<(), SubmitError> {
    if form.title.trim().is_empty() {
        return Err(SubmitError::invalid("title", "title is required"));
    }
    if form.category.trim().is_empty() {
        return Err(SubmitError::invalid("category", "pick a category"));
    }
    if form.price == 0 {
        return Err(SubmitError::invalid("price", "price must be greater than zero"));
    }
    if form.city.trim().is_empty() {
        return Err(SubmitError::invalid("city", "city is required"));
    }
    if form.contact_phone.trim().is_empty() {
        return Err(SubmitError::invalid(
            "contactPhone",
            "a contact phone number is required",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::entry::EntryState;
    use uuid::Uuid;

    fn form() -> ListingForm {
        ListingForm {
            title: "Ultrasound scanner".to_string(),
            category: "imaging".to_string(),
            condition: Condition::Used,
            price: 250_000,
            negotiable: true,
            description: "Lightly used, serviced annually.".to_string(),
            city: "Lisbon".to_string(),
            contact_phone: "+351 900 000 000".to_string(),
        }
    }

    fn snapshot(state: EntryState) -> EntrySnapshot {
        EntrySnapshot {
            id: Uuid::new_v4(),
            file_name: "scan.jpg".to_string(),
            state,
            preview_path: None,
        }
    }

    fn complete(url: &str) -> EntrySnapshot {
        snapshot(EntryState::Complete {
            url: url.to_string(),
        })
    }

    #[test]
    fn refuses_while_any_upload_is_pending() {
        for pending in [EntryState::Waiting, EntryState::Uploading] {
            let entries = vec![complete("https://cdn.example.test/a.jpg"), snapshot(pending)];
            assert_eq!(
                assemble_payload(&form(), &entries),
                Err(SubmitError::UploadsPending)
            );
        }
    }

    #[test]
    fn refuses_without_any_completed_image() {
        let entries = vec![snapshot(EntryState::Error {
            message: "storage rejected the object".to_string(),
        })];
        let error = assemble_payload(&form(), &entries).unwrap_err();
        assert_eq!(error.field(), Some("images"));
    }

    #[test]
    fn keeps_insertion_order_and_flags_first_url_as_cover() {
        let entries = vec![
            complete("https://cdn.example.test/a.jpg"),
            snapshot(EntryState::Error {
                message: "network".to_string(),
            }),
            complete("https://cdn.example.test/b.jpg"),
        ];
        let payload = assemble_payload(&form(), &entries).unwrap();
        assert_eq!(
            payload.image_urls,
            vec![
                "https://cdn.example.test/a.jpg",
                "https://cdn.example.test/b.jpg"
            ]
        );
        assert_eq!(payload.cover_url, "https://cdn.example.test/a.jpg");
    }

    #[test]
    fn field_errors_name_the_offending_field() {
        let mut missing_title = form();
        missing_title.title = "  ".to_string();
        assert_eq!(
            assemble_payload(&missing_title, &[complete("https://x/y.jpg")])
                .unwrap_err()
                .field(),
            Some("title")
        );

        let mut free = form();
        free.price = 0;
        assert_eq!(
            assemble_payload(&free, &[complete("https://x/y.jpg")])
                .unwrap_err()
                .field(),
            Some("price")
        );
    }

    #[test]
    fn payload_serializes_flat_with_camel_case_keys() {
        let payload = assemble_payload(&form(), &[complete("https://x/y.jpg")]).unwrap();
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["coverUrl"], "https://x/y.jpg");
        assert_eq!(value["contactPhone"], "+351 900 000 000");
        assert_eq!(value["condition"], "used");
    }
}
